// SPDX-License-Identifier: Apache-2.0

use std::io;
use std::io::{Read, Seek, SeekFrom};
use crate::stream::{Stream, Whence};

/// A wrapper implementing the [`Read`] and [`Seek`] traits for a [`Stream`].
#[derive(Clone, Debug)]
pub struct StreamReader<'d>(Stream<'d>);

impl<'d> StreamReader<'d> {
	/// Returns the wrapped stream.
	pub fn into_inner(self) -> Stream<'d> { self.0 }

	/// Returns the wrapped stream.
	pub fn get_ref(&self) -> &Stream<'d> { &self.0 }
}

impl<'d> From<Stream<'d>> for StreamReader<'d> {
	fn from(value: Stream<'d>) -> Self { Self(value) }
}

impl<'d> Stream<'d> {
	/// Wraps the stream in a [`std::io`] reader.
	pub fn into_reader(self) -> StreamReader<'d> { self.into() }
}

impl Read for StreamReader<'_> {
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		let Self(stream) = self;
		Ok(stream.read(buf)?)
	}

	fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
		let Self(stream) = self;
		Ok(stream.read_exact(buf)?)
	}
}

impl Seek for StreamReader<'_> {
	fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
		let Self(stream) = self;
		let (offset, whence) = Whence::split(pos);
		Ok(stream.seek(offset, whence)?)
	}

	fn stream_position(&mut self) -> io::Result<u64> {
		Ok(self.0.tell())
	}
}
