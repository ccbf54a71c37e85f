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

mod read;
mod seeking;
mod window;

pub use seeking::*;
pub use window::*;

use std::cell::RefCell;
use std::error::Error as StdError;
use std::{fmt, io, mem, result};
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::rc::Rc;
use amplify_derive::Display;
use log::{debug, trace};
use crate::backend::{Backend, Capability};
use crate::{AllocError, Context, error, OpenError};
use self::ErrorKind::{Alloc, Closed, Eos, Io, Open, Other, Unsupported};

pub type Error = error::Error<OperationKind, ErrorKind>;
pub type Result<T = ()> = result::Result<T, Error>;

#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq)]
pub enum OperationKind {
	#[default]
	#[display("unknown operation")]
	Unknown,
	#[display("allocate stream")]
	Alloc,
	#[display("open stream")]
	Open,
	#[display("read stream")]
	Read,
	#[display("seek stream")]
	Seek,
	#[display("reopen stream")]
	Reopen,
	#[display("close stream")]
	Close,
	#[display("{0}")]
	Other(&'static str)
}

impl error::OperationKind for OperationKind { }

#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum ErrorKind {
	#[display("out of memory")]
	Alloc,
	#[display("cannot open resource")]
	Open,
	#[display("premature end-of-stream")]
	Eos,
	#[display("IO error")]
	Io,
	#[display("operation not supported")]
	Unsupported,
	#[display("stream closed")]
	Closed,
	#[display("{0}")]
	Other(&'static str),
}

impl error::ErrorKind for ErrorKind {
	fn other(message: &'static str) -> Self { Other(message) }
}

impl From<io::Error> for Error {
	fn from(value: io::Error) -> Self {
		if let io::ErrorKind::UnexpectedEof = value.kind() {
			Self::eos(OperationKind::Unknown)
		} else {
			Self::io(OperationKind::Unknown, value)
		}
	}
}

impl From<AllocError> for Error {
	fn from(value: AllocError) -> Self { Self::alloc(value) }
}

impl From<Error> for io::Error {
	fn from(value: Error) -> Self {
		let kind = match value.kind() {
			Eos => io::ErrorKind::UnexpectedEof,
			Unsupported => io::ErrorKind::Unsupported,
			Alloc => io::ErrorKind::OutOfMemory,
			Open | Io => value.io_source().map_or(io::ErrorKind::Other, io::Error::kind),
			Closed | Other(_) => io::ErrorKind::Other,
		};
		io::Error::new(kind, value)
	}
}

impl Error {
	/// Creates a new allocation error.
	pub fn alloc(error: AllocError) -> Self {
		Self::new(OperationKind::Alloc, Alloc, Some(error.into()))
	}

	/// Creates a new open error.
	pub fn open(error: OpenError) -> Self {
		Self::new(OperationKind::Open, Open, Some(error.into()))
	}

	/// Creates a new "end-of-stream" error.
	pub fn eos(op: OperationKind) -> Self { Self::new(op, Eos, None) }

	/// Creates a new IO error.
	pub fn io(op: OperationKind, error: io::Error) -> Self {
		Self::new(op, Io, Some(error.into()))
	}

	/// Creates a new "unsupported operation" error.
	pub fn unsupported(op: OperationKind) -> Self {
		Self::new(op, Unsupported, None)
	}

	/// Creates a new "closed" error.
	pub fn closed(op: OperationKind) -> Self {
		Self::new(op, Closed, None)
	}

	/// Returns the source downcast into an IO Error, if possible. For open
	/// errors, this is the error returned by the OS.
	pub fn io_source(&self) -> Option<&io::Error> {
		let source = self.source()?;
		source.downcast_ref::<io::Error>()
			  .or_else(|| source.downcast_ref::<OpenError>().map(|open| &open.source))
	}

	/// Returns `true` if the error is an "unsupported operation" error.
	pub fn is_unsupported(&self) -> bool { matches!(self.kind, Unsupported) }

	/// Returns `true` if the error is an "end-of-stream" error.
	pub fn is_eos(&self) -> bool { matches!(self.kind, Eos) }
}

/// The stream state behind all handles to a stream.
struct Envelope<'d> {
	ctx: Context,
	/// The context the envelope was charged to, unchanged by rebinding.
	charge: Context,
	cursor: Cursor,
	eof: bool,
	error: bool,
	/// Residual bits for bit-level reads, the low `avail` bits being unread.
	bits: u32,
	avail: u32,
	/// The owned window and the context it was charged to, allocated on the
	/// first fill.
	window: Option<(Box<[u8; WINDOW_SIZE]>, Context)>,
	backend: Box<dyn Backend<'d> + 'd>,
}

/// A reference-counted handle to a buffered input stream.
///
/// Cloning the handle with [`keep`](Self::keep) shares the stream: both handles
/// see the same position. Dropping (or [`close`](Self::close)-ing) the last
/// handle closes the backend. Use [`clone_stream`](Self::clone_stream) for an
/// independent cursor over the same data.
///
/// Streams are not thread-safe; the reference count is not atomic.
pub struct Stream<'d>(Rc<RefCell<Envelope<'d>>>);

/// Closes a backend whose stream couldn't be constructed, unless disarmed.
struct CloseGuard<'c, 'd, B: Backend<'d>> {
	ctx: &'c Context,
	backend: Option<B>,
	_data: PhantomData<&'d ()>,
}

impl<'c, 'd, B: Backend<'d>> CloseGuard<'c, 'd, B> {
	fn new(ctx: &'c Context, backend: B) -> Self {
		Self { ctx, backend: Some(backend), _data: PhantomData }
	}

	fn disarm(mut self) -> B {
		self.backend
			.take()
			.expect("backend should be held until the guard is disarmed")
	}
}

impl<'d, B: Backend<'d>> Drop for CloseGuard<'_, 'd, B> {
	fn drop(&mut self) {
		if let Some(mut backend) = self.backend.take() {
			close_backend(self.ctx, &mut backend);
		}
	}
}

fn close_backend<'d>(ctx: &Context, backend: &mut (impl Backend<'d> + ?Sized)) {
	if let Err(error) = backend.close(ctx) {
		ctx.warn(&error.with_operation(OperationKind::Close).to_string());
	}
}

impl<'d> Stream<'d> {
	/// Creates a stream reading from `backend`. If the stream can't be allocated,
	/// the backend is closed before the error is returned; it's consumed either
	/// way.
	pub fn new<B: Backend<'d> + 'd>(ctx: &Context, backend: B) -> Result<Self> {
		let guard = CloseGuard::new(ctx, backend);
		ctx.alloc("stream", mem::size_of::<Envelope<'d>>())?;
		let backend = guard.disarm();
		let cursor = match backend.mapped() {
			Some(data) => Cursor {
				pos: data.len() as u64,
				window: Window::spanning(data.len()),
			},
			None => Cursor::default()
		};

		debug!("[context {}] opened {} stream", ctx.id(), backend.name());
		Ok(Self(Rc::new(RefCell::new(Envelope {
			ctx: ctx.clone(),
			charge: ctx.clone(),
			cursor,
			eof: false,
			error: false,
			bits: 0,
			avail: 0,
			window: None,
			backend: Box::new(backend),
		}))))
	}

	/// Returns another handle to this stream, incrementing its reference count.
	#[inline]
	pub fn keep(&self) -> Self { Self(Rc::clone(&self.0)) }

	/// Releases this handle. The backend is closed when the last handle is
	/// released; failures while closing are reported to the context as warnings.
	#[inline]
	pub fn close(self) { drop(self) }

	/// Returns the number of handles to this stream.
	#[inline]
	pub fn refs(&self) -> usize { Rc::strong_count(&self.0) }

	/// Returns `true` if both handles refer to the same stream.
	#[inline]
	pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

	/// Returns the context the stream is currently bound to.
	pub fn context(&self) -> Context { self.0.borrow().ctx.clone() }

	/// Returns `true` if the stream's backend implements `capability`.
	pub fn supports(&self, capability: Capability) -> bool {
		self.0.borrow().backend.supports(capability)
	}

	/// Returns `true` once a backend read has returned no data. Cleared by a
	/// successful seek.
	pub fn is_eof_flagged(&self) -> bool { self.0.borrow().eof }

	/// Returns `true` if a backend read has failed.
	pub fn is_error_flagged(&self) -> bool { self.0.borrow().error }

	/// Returns the backend position, past any buffered bytes.
	pub fn backend_pos(&self) -> u64 { self.0.borrow().cursor.pos }

	/// Returns the number of buffered, unread bytes.
	pub fn buffered(&self) -> usize { self.0.borrow().cursor.window.available() }

	/// Opens an independent stream over the same data, positioned at this
	/// stream's current position. Fails with an unsupported-operation error if
	/// the backend can't be reopened.
	pub fn clone_stream(&self, ctx: &Context) -> Result<Stream<'d>> {
		let (clone, pos) = {
			let inner = self.0.borrow();
			if !inner.backend.supports(Capability::Reopen) {
				return Err(Error::unsupported(OperationKind::Reopen))
			}

			let clone = inner.backend
							 .reopen(ctx)
							 .map_err(|err| err.with_operation(OperationKind::Reopen))?;
			(clone, inner.cursor.tell())
		};

		let pos = i64::try_from(pos).map_err(|_|
			Error::other(OperationKind::Reopen, "position exceeds the seekable range", None)
		)?;
		clone.seek(pos, Whence::Start)?;
		Ok(clone)
	}

	/// Moves this stream, and every stream it wraps, to `ctx`. Does nothing if
	/// the stream is already bound to `ctx`. Later allocations are charged to
	/// `ctx`; earlier ones are released to the context that made them.
	pub fn rebind(&self, ctx: &Context) {
		if self.0.borrow().ctx == *ctx { return }

		debug!("[context {}] rebinding stream chain", ctx.id());
		let mut next = Some(self.keep());
		while let Some(stream) = next {
			let mut inner = stream.0.borrow_mut();
			inner.ctx = ctx.clone();
			next = if inner.backend.supports(Capability::Rebind) {
				inner.backend.rebind().map(Stream::keep)
			} else {
				None
			};
		}
	}

	/// Reads at most `buf.len()` bytes into `buf`, returning the number of bytes
	/// read. Returns `0` at end-of-stream.
	pub fn read(&self, buf: &mut [u8]) -> Result<usize> {
		self.0.borrow_mut().read(buf)
	}

	/// Seeks to `offset` from `whence`, returning the new position. Fails with an
	/// unsupported-operation error if the backend can't seek.
	///
	/// Targets still held in the window are reached by moving the read cursor
	/// alone, without calling the backend.
	pub fn seek(&self, offset: i64, whence: Whence) -> Result<u64> {
		self.0.borrow_mut().seek(offset, whence)
	}

	/// Seeks back to the start of the stream.
	pub fn rewind(&self) -> Result {
		self.seek(0, Whence::Start)?;
		Ok(())
	}

	/// Returns the current position.
	pub fn tell(&self) -> u64 { self.0.borrow().cursor.tell() }
}

impl Clone for Stream<'_> {
	fn clone(&self) -> Self { self.keep() }
}

impl Debug for Stream<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self.0.try_borrow() {
			Ok(inner) =>
				f.debug_struct("Stream")
				 .field("backend", &inner.backend.name())
				 .field("context", &inner.ctx.id())
				 .field("refs", &self.refs())
				 .field("cursor", &inner.cursor)
				 .field("eof", &inner.eof)
				 .field("error", &inner.error)
				 .finish_non_exhaustive(),
			Err(_) => f.debug_struct("Stream").finish_non_exhaustive()
		}
	}
}

impl<'d> Envelope<'d> {
	/// Copies unread window bytes into `buf`, returning the number copied.
	fn take_window(&mut self, buf: &mut [u8]) -> usize {
		let Self { backend, window, cursor, .. } = self;
		let data: &[u8] = match (backend.mapped(), window) {
			(Some(data), _) => data,
			(None, Some((window, _))) => &window[..],
			(None, None) => &[]
		};

		let start = cursor.window.rp();
		let count = cursor.window.consume(buf.len());
		buf[..count].copy_from_slice(&data[start..start + count]);
		count
	}

	/// Records the result of a backend read of `count` bytes.
	fn advance(&mut self, result: Result<usize>) -> Result<usize> {
		match result {
			Ok(0) => {
				self.eof = true;
				Ok(0)
			}
			Ok(count) => {
				self.cursor.pos += count as u64;
				Ok(count)
			}
			Err(error) => {
				self.error = true;
				Err(error.with_operation(OperationKind::Read))
			}
		}
	}

	/// Refills an exhausted window from the backend, returning the number of
	/// bytes available.
	fn fill(&mut self) -> Result<usize> {
		if !self.cursor.window.is_exhausted() {
			return Ok(self.cursor.window.available())
		}

		if self.eof || self.error {
			return Ok(0)
		}

		if self.backend.mapped().is_some() {
			// The window already spans all data.
			self.eof = true;
			return Ok(0)
		}

		let Self { ctx, backend, window, cursor, .. } = self;
		let window = match window {
			Some((window, _)) => window,
			None => {
				ctx.alloc("stream window", WINDOW_SIZE)?;
				cursor.window.set_capacity(WINDOW_SIZE);
				&mut window.insert((Box::new([0; WINDOW_SIZE]), ctx.clone())).0
			}
		};
		let result = backend.read(ctx, &mut window[..]);
		let count = self.advance(result)?;
		assert!(count <= WINDOW_SIZE, "backend read past the end of the window");
		self.cursor.window.set_filled(count);
		trace!("[context {}] filled {count} bytes from {}", self.ctx.id(), self.backend.name());
		Ok(count)
	}

	fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
		let mut count = self.take_window(buf);
		if count == buf.len() || self.eof || self.error {
			return Ok(count)
		}

		let remaining = buf.len() - count;
		if remaining < WINDOW_SIZE && self.backend.mapped().is_none() {
			self.fill()?;
			count += self.take_window(&mut buf[count..]);
		} else {
			if self.backend.mapped().is_none() {
				// The window no longer precedes the backend position.
				self.cursor.window.invalidate();
			}

			let Self { ctx, backend, .. } = self;
			let result = backend.read(ctx, &mut buf[count..]);
			count += self.advance(result)?;
		}
		Ok(count)
	}

	fn seek(&mut self, offset: i64, whence: Whence) -> Result<u64> {
		if !self.backend.supports(Capability::Seek) {
			return Err(Error::unsupported(OperationKind::Seek))
		}

		// Buffered bytes put the backend ahead of the logical position, so
		// relative seeks are resolved here.
		let (offset, whence) = match whence {
			Whence::Current => (
				(self.cursor.tell() as i64).saturating_add(offset),
				Whence::Start
			),
			whence => (offset, whence)
		};

		let Cursor { pos, window } = self.cursor;
		let held = window.wp() as u64;
		match u64::try_from(offset) {
			Ok(target) if whence == Whence::Start && target <= pos && pos - target <= held => {
				// The target is still in the window.
				self.cursor.window.set_read((held - (pos - target)) as usize);
			}
			_ => {
				let Self { ctx, backend, cursor, .. } = self;
				backend.seek(ctx, cursor, offset, whence)
					   .map_err(|err| err.with_operation(OperationKind::Seek))?;
			}
		}

		self.eof = false;
		self.bits = 0;
		self.avail = 0;
		Ok(self.cursor.tell())
	}
}

impl Drop for Envelope<'_> {
	fn drop(&mut self) {
		debug!("[context {}] closing {} stream", self.ctx.id(), self.backend.name());
		close_backend(&self.ctx, self.backend.as_mut());
		if let Some((_, charge)) = self.window.take() {
			charge.free(WINDOW_SIZE);
		}
		self.charge.free(mem::size_of::<Self>());
	}
}
