// SPDX-License-Identifier: Apache-2.0

use all_asserts::assert_le;

/// The capacity of a stream's owned read-ahead window.
pub const WINDOW_SIZE: usize = 4096;

/// Read-ahead window indices. The window's base is always index `0`; `rp` is
/// the next unread byte, `wp` the end of valid data, `ep` the capacity. The
/// indices always satisfy `rp <= wp <= ep`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Window {
	rp: usize,
	wp: usize,
	ep: usize,
}

impl Window {
	/// Creates a window spanning `len` bytes, all unread.
	pub const fn spanning(len: usize) -> Self {
		Self { rp: 0, wp: len, ep: len }
	}

	/// The read cursor.
	#[inline]
	pub fn rp(&self) -> usize { self.rp }

	/// The end of valid data.
	#[inline]
	pub fn wp(&self) -> usize { self.wp }

	/// The capacity.
	#[inline]
	pub fn ep(&self) -> usize { self.ep }

	/// Returns the number of unread bytes.
	#[inline]
	pub fn available(&self) -> usize { self.wp - self.rp }

	/// Returns `true` if all valid data has been read.
	#[inline]
	pub fn is_exhausted(&self) -> bool { self.rp == self.wp }

	/// Advances the read cursor by at most `count` bytes, returning the number
	/// of bytes consumed.
	pub fn consume(&mut self, count: usize) -> usize {
		let count = count.min(self.available());
		self.rp += count;
		count
	}

	/// Steps the read cursor back one byte, returning `false` if it's already
	/// at the base.
	pub fn unconsume(&mut self) -> bool {
		if self.rp > 0 {
			self.rp -= 1;
			true
		} else {
			false
		}
	}

	/// Moves the read cursor to `rp` within the valid data.
	pub fn set_read(&mut self, rp: usize) {
		assert_le!(rp, self.wp);
		self.rp = rp;
	}

	/// Marks `len` freshly-filled bytes as valid and unread.
	pub fn set_filled(&mut self, len: usize) {
		assert_le!(len, self.ep);
		self.rp = 0;
		self.wp = len;
	}

	/// Sets the capacity, discarding any valid data.
	pub fn set_capacity(&mut self, ep: usize) {
		*self = Self { rp: 0, wp: 0, ep };
	}

	/// Discards all valid data. The next read must go to the backend.
	pub fn invalidate(&mut self) {
		self.rp = 0;
		self.wp = 0;
	}

	/// Moves the read cursor to `rp`, clamped to the capacity, and marks the
	/// whole capacity as valid. Used by backends whose window is their data.
	pub fn seek_spanning(&mut self, rp: usize) {
		self.rp = rp.min(self.ep);
		self.wp = self.ep;
	}
}

/// The stream position state handed to backends when seeking: the absolute
/// backend position and the window over the bytes preceding it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Cursor {
	/// The backend position, just past the window's valid data.
	pub pos: u64,
	pub window: Window,
}

impl Cursor {
	/// Returns the logical stream position, the backend position less any
	/// unread buffered bytes.
	#[inline]
	pub fn tell(&self) -> u64 {
		self.pos - self.window.available() as u64
	}
}
