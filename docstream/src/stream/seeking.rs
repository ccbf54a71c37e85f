// SPDX-License-Identifier: Apache-2.0

use std::io::SeekFrom;
use amplify_derive::Display;

/// The reference point of a seek offset, as the `whence` argument of `lseek`.
#[derive(Copy, Clone, Debug, Default, Display, Eq, PartialEq)]
pub enum Whence {
	/// Seek from the start of the stream.
	#[default]
	#[display("start")]
	Start,
	/// Seek from the current position.
	#[display("current")]
	Current,
	/// Seek from the end of the stream.
	#[display("end")]
	End,
}

impl Whence {
	/// Resolves `offset` to a start-based position given a current `pos` and
	/// `len`, clamped to `0..=len`.
	pub fn resolve(self, offset: i64, pos: u64, len: u64) -> u64 {
		let base = match self {
			Whence::Start   => 0,
			Whence::Current => pos,
			Whence::End     => len,
		};

		let target = if offset >= 0 {
			base.saturating_add(offset as u64)
		} else {
			base.saturating_sub(offset.unsigned_abs())
		};
		target.min(len)
	}

	/// Converts an `offset` from this reference point into [`std::io`]'s
	/// [`SeekFrom`] enum. Returns `None` for a negative offset from the start,
	/// which has no representation.
	pub fn seek_from(self, offset: i64) -> Option<SeekFrom> {
		match self {
			Whence::Start   => u64::try_from(offset).ok().map(SeekFrom::Start),
			Whence::Current => Some(SeekFrom::Current(offset)),
			Whence::End     => Some(SeekFrom::End(offset)),
		}
	}

	/// Splits a [`SeekFrom`] into an offset and reference point. Start offsets
	/// past `i64::MAX` saturate.
	pub fn split(pos: SeekFrom) -> (i64, Self) {
		match pos {
			SeekFrom::Start  (off) => (i64::try_from(off).unwrap_or(i64::MAX), Whence::Start),
			SeekFrom::Current(off) => (off, Whence::Current),
			SeekFrom::End    (off) => (off, Whence::End),
		}
	}
}
