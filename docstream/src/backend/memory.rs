// SPDX-License-Identifier: Apache-2.0

use crate::{Buffer, Context};
use crate::stream::{Cursor, Error, OperationKind, Result, Stream, Whence};
use super::{Backend, Capability};

/// A [`Backend`] over bytes held in memory, either borrowed from the caller or
/// held through a reference-counted [`Buffer`].
///
/// The data is mapped directly as the stream's window, so reads never go
/// through the backend. Seeking moves the window cursor over the data, and
/// reopening deep-copies the data into a new buffer.
#[derive(Debug)]
pub enum MemoryBackend<'d> {
	/// Caller-owned memory, outliving the stream.
	Raw(&'d [u8]),
	/// A buffer reference, released on close.
	Buffer(Option<Buffer>),
}

impl<'d> Backend<'d> for MemoryBackend<'d> {
	fn name(&self) -> &'static str {
		match self {
			Self::Raw(_) => "memory",
			Self::Buffer(_) => "buffer"
		}
	}

	/// Reads nothing; all data is delivered through the window.
	fn read(&mut self, _ctx: &Context, _buf: &mut [u8]) -> Result<usize> {
		Ok(0)
	}

	fn close(&mut self, _ctx: &Context) -> Result {
		if let Self::Buffer(buffer) = self {
			buffer.take();
		}
		Ok(())
	}

	fn supports(&self, capability: Capability) -> bool {
		matches!(capability, Capability::Seek | Capability::Reopen)
	}

	fn seek(
		&mut self,
		_ctx: &Context,
		cursor: &mut Cursor,
		offset: i64,
		whence: Whence
	) -> Result {
		let window = &mut cursor.window;
		let len = window.ep() as u64;
		let rp = whence.resolve(offset, window.rp() as u64, len);
		window.seek_spanning(rp as usize);
		Ok(())
	}

	fn reopen(&self, ctx: &Context) -> Result<Stream<'d>> {
		let data = self.mapped().ok_or_else(|| Error::closed(OperationKind::Reopen))?;
		let copy = Buffer::copy_from(ctx, data)?;
		open_buffer(ctx, &copy)
	}

	fn mapped(&self) -> Option<&[u8]> {
		match self {
			Self::Raw(data) => Some(*data),
			Self::Buffer(buffer) => buffer.as_deref()
		}
	}
}

/// Opens a stream over `buffer`, holding a reference to it until the stream is
/// closed.
pub fn open_buffer<'d>(ctx: &Context, buffer: &Buffer) -> Result<Stream<'d>> {
	Stream::new(ctx, MemoryBackend::Buffer(Some(buffer.keep())))
}

/// Opens a stream over caller-owned memory. The data isn't copied.
pub fn open_memory<'d>(ctx: &Context, data: &'d [u8]) -> Result<Stream<'d>> {
	Stream::new(ctx, MemoryBackend::Raw(data))
}
