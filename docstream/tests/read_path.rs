// SPDX-License-Identifier: Apache-2.0

mod common;

use pretty_assertions::assert_eq;
use docstream::{Context, ErrorKind, OperationKind, Result, Stream, Whence, WINDOW_SIZE};
use common::{pattern, read_to_end, MockBackend, Probe};

#[test]
fn small_reads_share_a_fill() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let data = pattern(1000);
	let stream = Stream::new(&ctx, MockBackend::new(data.clone(), &probe))?;

	let mut buf = [0; 10];
	for chunk in data.chunks(10) {
		stream.read_exact(&mut buf)?;
		assert_eq!(&buf[..], chunk);
	}
	assert_eq!(probe.reads(), 1);
	assert_eq!(stream.read(&mut buf)?, 0);
	assert!(stream.is_eof_flagged());
	Ok(())
}

#[test]
fn refills_when_exhausted() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let data = pattern(3 * WINDOW_SIZE + 7);
	let stream = Stream::new(&ctx, MockBackend::new(data.clone(), &probe))?;
	assert_eq!(read_to_end(&stream)?, data);
	// Three full windows, the remainder, then the zero-length read.
	assert_eq!(probe.reads(), 5);
	Ok(())
}

#[test]
fn forward_only_seek_unsupported() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let stream = Stream::new(&ctx, MockBackend::new(pattern(10), &probe))?;
	stream.skip(2)?;

	let error = stream.seek(0, Whence::Start).unwrap_err();
	assert!(error.is_unsupported());
	assert_eq!(error.operation(), OperationKind::Seek);
	assert_eq!(stream.tell(), 2);
	Ok(())
}

#[test]
fn read_error_is_sticky() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let data = pattern(2 * WINDOW_SIZE);
	let stream = Stream::new(&ctx, MockBackend::new(data.clone(), &probe).fail_read_at(1))?;

	assert_eq!(stream.read_byte()?, Some(data[0]));
	assert_eq!(stream.skip(WINDOW_SIZE - 1)?, WINDOW_SIZE - 1);

	let error = stream.read_byte().unwrap_err();
	assert_eq!(error.kind(), ErrorKind::Io);
	assert_eq!(error.operation(), OperationKind::Read);
	assert!(stream.is_error_flagged());

	assert_eq!(stream.read(&mut [0; 16])?, 0);
	assert_eq!(stream.read_byte()?, None);
	assert_eq!(probe.reads(), 2);
	Ok(())
}

#[test]
fn seek_keeps_error_flag() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let data = pattern(100);
	let backend = MockBackend::new(data.clone(), &probe).seekable().fail_read_at(0);
	let stream = Stream::new(&ctx, backend)?;

	assert!(stream.read_byte().is_err());
	stream.seek(10, Whence::Start)?;
	assert!(stream.is_error_flagged());
	assert_eq!(stream.read_byte()?, None);
	Ok(())
}

#[test]
fn seek_in_window_skips_backend() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let data = pattern(10_000);
	let stream = Stream::new(&ctx, MockBackend::new(data.clone(), &probe).seekable())?;

	stream.skip(3000)?;
	assert_eq!(stream.seek(100, Whence::Start)?, 100);
	assert_eq!(stream.seek(50, Whence::Current)?, 150);
	assert_eq!(stream.read_byte()?, Some(data[150]));
	assert_eq!(probe.reads(), 1);

	assert_eq!(stream.seek(-1, Whence::End)?, 9999);
	assert_eq!(read_to_end(&stream)?, &data[9999..]);
	assert_eq!(probe.reads(), 3);
	Ok(())
}

#[test]
fn unread_stops_at_window_start() -> Result {
	let ctx = Context::new();
	let probe = Probe::default();
	let data = pattern(WINDOW_SIZE + 1);
	let stream = Stream::new(&ctx, MockBackend::new(data.clone(), &probe))?;

	stream.skip(WINDOW_SIZE)?;
	assert_eq!(stream.read_byte()?, Some(data[WINDOW_SIZE]));
	assert!(stream.unread_byte());
	assert!(!stream.unread_byte());
	assert_eq!(stream.read_byte()?, Some(data[WINDOW_SIZE]));
	Ok(())
}
