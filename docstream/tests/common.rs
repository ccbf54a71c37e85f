// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::io;
use std::rc::Rc;
use docstream::{AllocError, Allocator, Context, Error, OperationKind, Result, Stream, Whence};
use docstream::backend::{Backend, Capability};
use docstream::stream::Cursor;

#[ctor::ctor]
fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

pub const ABCD: &[u8] = &[0x41, 0x42, 0x43, 0x44];

/// Generates `len` bytes of a repeating, position-dependent pattern.
pub fn pattern(len: usize) -> Vec<u8> {
	(0..len).map(|i| (i * 31 % 251) as u8).collect()
}

/// Counts calls into a [`MockBackend`], shared with the test.
#[derive(Clone, Default)]
pub struct Probe {
	pub reads: Rc<Cell<usize>>,
	pub closes: Rc<Cell<usize>>,
	pub rebinds: Rc<Cell<usize>>,
}

impl Probe {
	pub fn reads(&self) -> usize { self.reads.get() }
	pub fn closes(&self) -> usize { self.closes.get() }
	pub fn rebinds(&self) -> usize { self.rebinds.get() }
}

/// A backend over a vector, optionally seekable, failing reads or closes on
/// request, and optionally wrapping another stream.
pub struct MockBackend<'d> {
	pub data: Vec<u8>,
	pub pos: usize,
	pub probe: Probe,
	pub seekable: bool,
	pub fail_read_at: Option<usize>,
	pub fail_close: bool,
	pub inner: Option<Stream<'d>>,
}

impl<'d> MockBackend<'d> {
	pub fn new(data: Vec<u8>, probe: &Probe) -> Self {
		Self {
			data,
			pos: 0,
			probe: probe.clone(),
			seekable: false,
			fail_read_at: None,
			fail_close: false,
			inner: None,
		}
	}

	pub fn seekable(mut self) -> Self {
		self.seekable = true;
		self
	}

	pub fn fail_read_at(mut self, read: usize) -> Self {
		self.fail_read_at = Some(read);
		self
	}

	pub fn fail_close(mut self) -> Self {
		self.fail_close = true;
		self
	}

	pub fn wrapping(mut self, inner: &Stream<'d>) -> Self {
		self.inner = Some(inner.keep());
		self
	}
}

impl<'d> Backend<'d> for MockBackend<'d> {
	fn name(&self) -> &'static str { "mock" }

	fn read(&mut self, _ctx: &Context, buf: &mut [u8]) -> Result<usize> {
		let reads = self.probe.reads.get();
		self.probe.reads.set(reads + 1);
		if self.fail_read_at == Some(reads) {
			return Err(Error::io(
				OperationKind::Read,
				io::Error::new(io::ErrorKind::Other, "injected read failure")
			))
		}

		let remaining = &self.data[self.pos..];
		let count = buf.len().min(remaining.len());
		buf[..count].copy_from_slice(&remaining[..count]);
		self.pos += count;
		Ok(count)
	}

	fn close(&mut self, _ctx: &Context) -> Result {
		self.probe.closes.set(self.probe.closes.get() + 1);
		self.inner.take();
		if self.fail_close {
			Err(Error::io(
				OperationKind::Close,
				io::Error::new(io::ErrorKind::Other, "injected close failure")
			))
		} else {
			Ok(())
		}
	}

	fn supports(&self, capability: Capability) -> bool {
		match capability {
			Capability::Seek => self.seekable,
			Capability::Rebind => self.inner.is_some(),
			Capability::Reopen => false,
		}
	}

	fn seek(&mut self, _ctx: &Context, cursor: &mut Cursor, offset: i64, whence: Whence) -> Result {
		let pos = whence.resolve(offset, cursor.tell(), self.data.len() as u64);
		self.pos = pos as usize;
		cursor.pos = pos;
		cursor.window.invalidate();
		Ok(())
	}

	fn rebind(&mut self) -> Option<&Stream<'d>> {
		self.probe.rebinds.set(self.probe.rebinds.get() + 1);
		self.inner.as_ref()
	}
}

/// An allocator refusing its `fail_on`-th request (zero-based), counting all
/// requests and releases.
#[derive(Default)]
pub struct FaultyAllocator {
	pub fail_on: Option<usize>,
	pub calls: Cell<usize>,
	pub granted: Cell<usize>,
	pub freed: Cell<usize>,
}

impl FaultyAllocator {
	pub fn failing_on(call: usize) -> Rc<Self> {
		Rc::new(Self { fail_on: Some(call), ..Self::default() })
	}
}

impl Allocator for FaultyAllocator {
	fn alloc(&self, what: &'static str, size: usize) -> std::result::Result<(), AllocError> {
		let call = self.calls.get();
		self.calls.set(call + 1);
		if self.fail_on == Some(call) {
			Err(AllocError { what, size })
		} else {
			self.granted.set(self.granted.get() + size);
			Ok(())
		}
	}

	fn free(&self, size: usize) {
		self.freed.set(self.freed.get() + size);
	}
}

/// Collects every warning emitted by `ctx`.
pub fn capture_warnings(ctx: &Context) -> Rc<RefCell<Vec<String>>> {
	let warnings = Rc::new(RefCell::new(Vec::new()));
	let sink = Rc::clone(&warnings);
	ctx.set_warning_handler(move |message| sink.borrow_mut().push(message.to_owned()));
	warnings
}

/// Reads the stream to its end.
pub fn read_to_end(stream: &Stream) -> Result<Vec<u8>> {
	let mut data = Vec::new();
	let mut buf = [0; 100];
	loop {
		let count = stream.read(&mut buf)?;
		if count == 0 {
			break Ok(data)
		}
		data.extend_from_slice(&buf[..count]);
	}
}
