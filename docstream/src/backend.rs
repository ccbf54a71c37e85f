// SPDX-License-Identifier: Apache-2.0

//! Byte sources plugged into a [`Stream`].
//!
//! A backend implements [`read`](Backend::read) and [`close`](Backend::close),
//! and optionally seeking, rebinding, and reopening. Optional operations are
//! advertised through [`supports`](Backend::supports); the stream core checks
//! it before calling them, failing with an unsupported-operation error when the
//! capability is missing.

mod file;
mod memory;
mod range;

pub use file::*;
pub use memory::*;
pub use range::*;

use amplify_derive::Display;
use crate::Context;
use crate::stream::{Cursor, Error, OperationKind, Result, Stream, Whence};

/// An optional backend operation.
#[derive(Copy, Clone, Debug, Display, Eq, PartialEq)]
pub enum Capability {
	#[display("seek")]
	Seek,
	#[display("rebind")]
	Rebind,
	#[display("reopen")]
	Reopen,
}

pub trait Backend<'d> {
	/// Returns a short name for the backend, used in log output.
	fn name(&self) -> &'static str;

	/// Reads at most `buf.len()` bytes into `buf`, returning the number of bytes
	/// read. Returns `0` at end-of-stream.
	fn read(&mut self, ctx: &Context, buf: &mut [u8]) -> Result<usize>;

	/// Releases the backend's resources. Called exactly once, either when the
	/// last reference to its stream is closed, or when the stream fails to be
	/// constructed. Errors are reported as warnings.
	fn close(&mut self, ctx: &Context) -> Result;

	/// Returns `true` if the backend implements `capability`.
	fn supports(&self, _capability: Capability) -> bool { false }

	/// Repositions the backend. On success, the backend must leave `cursor`
	/// consistent with its new position: either by setting `pos` and
	/// invalidating the window, or by moving the read cursor within a window it
	/// maps.
	fn seek(
		&mut self,
		_ctx: &Context,
		_cursor: &mut Cursor,
		_offset: i64,
		_whence: Whence
	) -> Result {
		Err(Error::unsupported(OperationKind::Seek))
	}

	/// Returns the next stream in the chain this backend wraps, if any.
	fn rebind(&mut self) -> Option<&Stream<'d>> { None }

	/// Opens an independent stream over the same data, positioned at the start.
	fn reopen(&self, _ctx: &Context) -> Result<Stream<'d>> {
		Err(Error::unsupported(OperationKind::Reopen))
	}

	/// Returns the backend's data if it's held in memory. A mapped backend's data
	/// is used as the stream window directly; the stream never fills it.
	fn mapped(&self) -> Option<&[u8]> { None }
}
