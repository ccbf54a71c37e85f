// SPDX-License-Identifier: Apache-2.0

use std::fs::File;
use std::io;
use std::io::{Read, Seek};
use std::path::Path;
use cfg_if::cfg_if;
use log::debug;
use crate::{Context, OpenError};
use crate::stream::{Cursor, Error, OperationKind, Result, Stream, Whence};
use super::{Backend, Capability};

/// A [`Backend`] reading from a [file](File) it owns. Closing the stream closes
/// the file.
///
/// Seeking repositions the file and discards the stream window, unless the
/// target is still buffered. Such seeks only move the stream's read cursor:
/// the file keeps its position, so [`Stream::backend_pos`] is unchanged and
/// [`Stream::buffered`] counts the bytes from the target onward.
///
/// File streams can seek but can't be reopened: there's no reliable way to
/// duplicate an arbitrary descriptor with an independent position, so
/// [`Stream::clone_stream`] fails with an unsupported-operation error.
#[derive(Debug)]
pub struct FileBackend {
	file: Option<File>,
}

impl From<File> for FileBackend {
	fn from(file: File) -> Self {
		Self { file: Some(file) }
	}
}

impl FileBackend {
	fn file(&mut self, op: OperationKind) -> Result<&mut File> {
		self.file.as_mut().ok_or_else(|| Error::closed(op))
	}
}

impl<'d> Backend<'d> for FileBackend {
	fn name(&self) -> &'static str { "file" }

	fn read(&mut self, _ctx: &Context, buf: &mut [u8]) -> Result<usize> {
		let file = self.file(OperationKind::Read)?;
		loop {
			match file.read(buf) {
				Ok(count) => break Ok(count),
				Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
				Err(error) => break Err(Error::io(OperationKind::Read, error))
			}
		}
	}

	fn close(&mut self, _ctx: &Context) -> Result {
		match self.file.take() {
			Some(file) => close_file(file).map_err(|error| Error::io(OperationKind::Close, error)),
			None => Ok(())
		}
	}

	fn supports(&self, capability: Capability) -> bool {
		matches!(capability, Capability::Seek)
	}

	fn seek(
		&mut self,
		_ctx: &Context,
		cursor: &mut Cursor,
		offset: i64,
		whence: Whence
	) -> Result {
		let pos = whence.seek_from(offset).ok_or_else(||
			Error::io(
				OperationKind::Seek,
				io::Error::new(io::ErrorKind::InvalidInput, "negative offset from the start")
			)
		)?;
		cursor.pos = self.file(OperationKind::Seek)?
						 .seek(pos)
						 .map_err(|error| Error::io(OperationKind::Seek, error))?;
		cursor.window.invalidate();
		Ok(())
	}
}

/// Closes `file`, returning any error reported by the OS.
fn close_file(file: File) -> io::Result<()> {
	cfg_if! {
		if #[cfg(unix)] {
			use std::os::fd::IntoRawFd;

			let fd = file.into_raw_fd();
			// Safety: the descriptor was just released from an owned file, so it's
			// valid and closed exactly once.
			if unsafe { libc::close(fd) } == 0 {
				Ok(())
			} else {
				Err(io::Error::last_os_error())
			}
		} else {
			// Errors on close aren't observable here; dropping releases the handle.
			drop(file);
			Ok(())
		}
	}
}

/// Opens a stream reading from an owned file or descriptor. The stream takes
/// ownership, closing it when the stream is closed.
pub fn open_fd<'d>(ctx: &Context, fd: impl Into<File>) -> Result<Stream<'d>> {
	Stream::new(ctx, FileBackend::from(fd.into()))
}

/// Opens the file at `path` for reading, failing with an open error carrying the
/// path and the OS reason.
pub fn open_file<'d>(ctx: &Context, path: impl AsRef<Path>) -> Result<Stream<'d>> {
	let path = path.as_ref();
	let file = File::open(path).map_err(|source|
		Error::open(OpenError { path: path.to_owned(), source })
	)?;
	debug!("[context {}] opened {}", ctx.id(), path.display());
	open_fd(ctx, file)
}
