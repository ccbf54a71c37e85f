// SPDX-License-Identifier: Apache-2.0

mod common;

use std::io::{self, Read, Seek, SeekFrom};
use pretty_assertions::assert_eq;
use docstream::{open_memory, Context, Stream};
use common::{pattern, MockBackend, Probe, ABCD};

#[test]
fn read_to_end() -> io::Result<()> {
	let ctx = Context::new();
	let data = pattern(10_000);
	let mut reader = open_memory(&ctx, &data)?.into_reader();
	let mut target = Vec::new();
	assert_eq!(reader.read_to_end(&mut target)?, data.len());
	assert_eq!(target, data);
	Ok(())
}

#[test]
fn seek() -> io::Result<()> {
	let ctx = Context::new();
	let mut reader = open_memory(&ctx, ABCD)?.into_reader();
	assert_eq!(reader.seek(SeekFrom::End(-2))?, 2);
	assert_eq!(reader.stream_position()?, 2);

	let mut buf = [0; 2];
	reader.read_exact(&mut buf)?;
	assert_eq!(buf, [0x43, 0x44]);
	assert_eq!(reader.seek(SeekFrom::Current(-3))?, 1);
	assert_eq!(reader.get_ref().tell(), 1);
	Ok(())
}

#[test]
fn errors_convert() -> io::Result<()> {
	let ctx = Context::new();
	let probe = Probe::default();
	let mut reader = Stream::new(&ctx, MockBackend::new(vec![1], &probe))?.into_reader();

	let error = reader.seek(SeekFrom::Start(0)).unwrap_err();
	assert_eq!(error.kind(), io::ErrorKind::Unsupported);

	let error = reader.read_exact(&mut [0; 2]).unwrap_err();
	assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
	Ok(())
}
