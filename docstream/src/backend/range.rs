// SPDX-License-Identifier: Apache-2.0

use crate::Context;
use crate::stream::{Cursor, Error, OperationKind, Result, Stream, Whence};
use super::{Backend, Capability};

/// A [`Backend`] reading a range of bytes from another stream, its *chain*.
///
/// The chain may be shared with other readers, so every read first seeks the
/// chain back to where this range left off, if the chain can seek. A chain that
/// can't seek must already be positioned at the start of the range, and is
/// read from wherever it is. Rebinding a range stream rebinds its chain too.
#[derive(Debug)]
pub struct RangeBackend<'d> {
	chain: Option<Stream<'d>>,
	offset: u64,
	len: u64,
	/// The position within the range.
	pos: u64,
}

impl<'d> RangeBackend<'d> {
	/// Creates a backend over `len` bytes of `chain`, starting at `offset`.
	pub fn new(chain: Stream<'d>, offset: u64, len: u64) -> Self {
		Self { chain: Some(chain), offset, len, pos: 0 }
	}

	fn chain(&self, op: OperationKind) -> Result<&Stream<'d>> {
		self.chain.as_ref().ok_or_else(|| Error::closed(op))
	}
}

impl<'d> Backend<'d> for RangeBackend<'d> {
	fn name(&self) -> &'static str { "range" }

	fn read(&mut self, _ctx: &Context, buf: &mut [u8]) -> Result<usize> {
		let remaining = self.len - self.pos;
		if remaining == 0 {
			return Ok(0)
		}

		let chain = self.chain(OperationKind::Read)?;
		let start = self.offset + self.pos;
		if chain.supports(Capability::Seek) {
			let start = i64::try_from(start).map_err(|_|
				Error::other(OperationKind::Seek, "range offset exceeds the seekable range", None)
			)?;
			chain.seek(start, Whence::Start)?;
		} else if chain.tell() != start {
			// Moved by another holder; the range can't be recovered.
			return Err(Error::unsupported(OperationKind::Seek))
		}

		let count = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
		let read = chain.read(&mut buf[..count])?;
		self.pos += read as u64;
		Ok(read)
	}

	/// Releases the reference to the chain.
	fn close(&mut self, _ctx: &Context) -> Result {
		self.chain.take();
		Ok(())
	}

	fn supports(&self, capability: Capability) -> bool {
		match capability {
			Capability::Seek => self.chain.as_ref().is_some_and(|chain| chain.supports(Capability::Seek)),
			Capability::Rebind => true,
			Capability::Reopen => false,
		}
	}

	fn seek(
		&mut self,
		_ctx: &Context,
		cursor: &mut Cursor,
		offset: i64,
		whence: Whence
	) -> Result {
		self.pos = whence.resolve(offset, cursor.tell(), self.len);
		cursor.pos = self.pos;
		cursor.window.invalidate();
		Ok(())
	}

	fn rebind(&mut self) -> Option<&Stream<'d>> {
		self.chain.as_ref()
	}
}

/// Opens a stream over `len` bytes of `chain` starting at `offset`, holding a
/// reference to the chain until closed. Reads stop early if the chain ends
/// before the range does.
///
/// Fails with an unsupported-operation error if `chain` can't seek and isn't
/// positioned at `offset`.
pub fn open_range<'d>(ctx: &Context, chain: &Stream<'d>, offset: u64, len: u64) -> Result<Stream<'d>> {
	if !chain.supports(Capability::Seek) && chain.tell() != offset {
		return Err(Error::unsupported(OperationKind::Seek))
	}

	Stream::new(ctx, RangeBackend::new(chain.keep(), offset, len))
}
