// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;
use std::rc::Rc;
use crate::{AllocError, Context};

struct Inner {
	data: Box<[u8]>,
	/// The context the data was charged to, if any.
	charge: Option<Context>,
}

impl Drop for Inner {
	fn drop(&mut self) {
		if let Some(ctx) = self.charge.take() {
			ctx.free(self.data.len());
		}
	}
}

/// A reference-counted, immutable byte array. Cloning a buffer shares its data,
/// see [`keep`](Self::keep).
#[derive(Clone)]
pub struct Buffer(Rc<Inner>);

impl Buffer {
	/// Creates a buffer from `data`, charging its length to `ctx`. Fails if the
	/// context refuses the allocation, dropping `data`.
	pub fn from_vec_in(ctx: &Context, data: Vec<u8>) -> Result<Self, AllocError> {
		ctx.alloc("buffer", data.len())?;
		Ok(Self(Rc::new(Inner {
			data: data.into_boxed_slice(),
			charge: Some(ctx.clone()),
		})))
	}

	/// Copies `data` into a new buffer charged to `ctx`.
	pub fn copy_from(ctx: &Context, data: &[u8]) -> Result<Self, AllocError> {
		let mut vec = Vec::new();
		vec.try_reserve_exact(data.len())
		   .map_err(|_| AllocError { what: "buffer", size: data.len() })?;
		vec.extend_from_slice(data);
		Self::from_vec_in(ctx, vec)
	}

	/// Returns another reference to the same data.
	#[inline]
	pub fn keep(&self) -> Self { self.clone() }

	/// Returns the number of references to the data.
	#[inline]
	pub fn refs(&self) -> usize { Rc::strong_count(&self.0) }

	/// Returns `true` if both buffers share the same data.
	#[inline]
	pub fn ptr_eq(&self, other: &Self) -> bool { Rc::ptr_eq(&self.0, &other.0) }

	#[inline]
	pub fn as_slice(&self) -> &[u8] { &self.0.data }
}

impl From<Vec<u8>> for Buffer {
	/// Wraps `data` without charging it to any context.
	fn from(data: Vec<u8>) -> Self {
		Self(Rc::new(Inner { data: data.into_boxed_slice(), charge: None }))
	}
}

impl From<&[u8]> for Buffer {
	fn from(data: &[u8]) -> Self { data.to_vec().into() }
}

impl Deref for Buffer {
	type Target = [u8];

	fn deref(&self) -> &[u8] { self.as_slice() }
}

impl AsRef<[u8]> for Buffer {
	fn as_ref(&self) -> &[u8] { self.as_slice() }
}

impl PartialEq for Buffer {
	fn eq(&self, other: &Self) -> bool {
		self.as_slice() == other.as_slice()
	}
}

impl Eq for Buffer { }

impl Debug for Buffer {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Buffer")
			.field("len", &self.len())
			.field("refs", &self.refs())
			.finish_non_exhaustive()
	}
}
