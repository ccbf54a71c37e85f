// SPDX-License-Identifier: Apache-2.0

use all_asserts::assert_le;
use bytemuck::Pod;
use num_traits::PrimInt;
use crate::{AllocError, Buffer};
use super::{Envelope, Error, OperationKind, Result, Stream};

/// The minimum capacity [`Stream::read_all`] starts with.
const MIN_READ_ALL: usize = 1024;

impl Envelope<'_> {
	fn read_byte(&mut self) -> Result<Option<u8>> {
		if self.fill()? == 0 {
			return Ok(None)
		}

		let mut byte = [0];
		self.take_window(&mut byte);
		Ok(Some(byte[0]))
	}

	/// Reads the next byte for bit-level reads. Bytes past the end read as all
	/// ones.
	fn read_bits_byte(&mut self) -> Result<u32> {
		Ok(self.read_byte()?.map_or(0xFF, u32::from))
	}
}

/// Returns a mask of the low `n` bits.
#[inline]
fn mask(n: u32) -> u32 {
	if n >= u32::BITS { u32::MAX } else { (1 << n) - 1 }
}

impl<'d> Stream<'d> {
	/// Returns the number of bytes available without blocking on the backend,
	/// refilling the window first if it's exhausted. Returns `0` at end-of-stream.
	pub fn available(&self) -> Result<usize> {
		self.0.borrow_mut().fill()
	}

	/// Reads one byte, returning `None` at end-of-stream.
	pub fn read_byte(&self) -> Result<Option<u8>> {
		self.0.borrow_mut().read_byte()
	}

	/// Returns the next byte without consuming it, or `None` at end-of-stream.
	pub fn peek_byte(&self) -> Result<Option<u8>> {
		let mut inner = self.0.borrow_mut();
		let byte = inner.read_byte()?;
		if byte.is_some() {
			inner.cursor.window.unconsume();
		}
		Ok(byte)
	}

	/// Steps back over the last byte read from the window. Returns `false` if no
	/// byte before the read cursor is still buffered.
	pub fn unread_byte(&self) -> bool {
		self.0.borrow_mut().cursor.window.unconsume()
	}

	/// Returns `true` if no bytes remain.
	pub fn is_eof(&self) -> Result<bool> {
		{
			let inner = self.0.borrow();
			if !inner.cursor.window.is_exhausted() {
				return Ok(false)
			}

			if inner.eof {
				return Ok(true)
			}
		}
		Ok(self.peek_byte()?.is_none())
	}

	/// Skips at most `count` bytes, returning the number of bytes skipped.
	pub fn skip(&self, count: usize) -> Result<usize> {
		let mut inner = self.0.borrow_mut();
		let mut skipped = 0;
		while skipped < count && inner.fill()? > 0 {
			skipped += inner.cursor.window.consume(count - skipped);
		}
		Ok(skipped)
	}

	/// Fills `buf` completely, failing with an end-of-stream error if the stream
	/// ends first. Bytes read before the end are consumed.
	pub fn read_exact(&self, buf: &mut [u8]) -> Result {
		let mut inner = self.0.borrow_mut();
		let mut count = 0;
		while count < buf.len() {
			let read = inner.read(&mut buf[count..])?;
			if read == 0 {
				return Err(Error::eos(OperationKind::Read))
			}
			count += read;
		}
		Ok(())
	}

	/// Reads all remaining bytes into a new buffer, starting with a capacity of
	/// `initial` bytes and doubling as needed. The buffer is charged to the
	/// stream's context.
	pub fn read_all(&self, initial: usize) -> Result<Buffer> {
		let mut inner = self.0.borrow_mut();
		let mut data = Vec::new();
		let mut additional = initial.max(MIN_READ_ALL);
		loop {
			if data.len() == data.capacity() {
				data.try_reserve_exact(additional).map_err(|_|
					Error::alloc(AllocError { what: "buffer", size: additional })
						.with_operation(OperationKind::Read)
				)?;
				additional = data.capacity();
			}

			let len = data.len();
			data.resize(data.capacity(), 0);
			let read = inner.read(&mut data[len..])?;
			data.truncate(len + read);
			if read == 0 {
				break
			}
		}

		let ctx = inner.ctx.clone();
		Ok(Buffer::from_vec_in(&ctx, data)?)
	}

	/// Reads a big-endian integer.
	pub fn read_int<T: PrimInt + Pod>(&self) -> Result<T> {
		let mut value = T::zeroed();
		self.read_exact(bytemuck::bytes_of_mut(&mut value))?;
		Ok(T::from_be(value))
	}

	/// Reads a little-endian integer.
	pub fn read_int_le<T: PrimInt + Pod>(&self) -> Result<T> {
		let mut value = T::zeroed();
		self.read_exact(bytemuck::bytes_of_mut(&mut value))?;
		Ok(T::from_le(value))
	}

	/// Reads a big-endian 24-bit integer.
	pub fn read_u24(&self) -> Result<u32> {
		let mut bytes = [0; 4];
		self.read_exact(&mut bytes[1..])?;
		Ok(u32::from_be_bytes(bytes))
	}

	/// Reads a little-endian 24-bit integer.
	pub fn read_u24_le(&self) -> Result<u32> {
		let mut bytes = [0; 4];
		self.read_exact(&mut bytes[..3])?;
		Ok(u32::from_le_bytes(bytes))
	}

	/// Reads `n` bits, most significant first, continuing from the residual bits
	/// of the last bit-level read. Bits past the end of the stream read as ones.
	///
	/// # Panics
	///
	/// Panics if `n` is more than 32.
	pub fn read_bits(&self, mut n: u32) -> Result<u32> {
		assert_le!(n, u32::BITS);
		let mut inner = self.0.borrow_mut();
		if n <= inner.avail {
			inner.avail -= n;
			return Ok((inner.bits >> inner.avail) & mask(n))
		}

		let mut value = inner.bits & mask(inner.avail);
		n -= inner.avail;
		inner.avail = 0;

		while n > 8 {
			value = (value << 8) | inner.read_bits_byte()?;
			n -= 8;
		}

		if n > 0 {
			inner.bits = inner.read_bits_byte()?;
			inner.avail = 8 - n;
			value = (value << n) | (inner.bits >> inner.avail);
		}
		Ok(value)
	}

	/// Discards residual bits, aligning the next bit-level read to a byte.
	pub fn sync_bits(&self) {
		self.0.borrow_mut().avail = 0;
	}

	/// Returns `true` if no bytes remain and no residual bits are left.
	pub fn is_eof_bits(&self) -> Result<bool> {
		Ok(self.is_eof()? && self.0.borrow().avail == 0)
	}
}
