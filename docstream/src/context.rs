// SPDX-License-Identifier: Apache-2.0

//! The execution context streams allocate through and report warnings to.

mod options;

pub use options::*;

use std::cell::{Cell, RefCell};
use std::fmt;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use log::warn;
use crate::AllocError;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Gates the memory a [`Context`] hands out. Allocation itself is left to the
/// global allocator; implementations only decide whether a request may proceed
/// and track what is released.
pub trait Allocator {
	/// Requests `size` bytes for `what`.
	fn alloc(&self, what: &'static str, size: usize) -> Result<(), AllocError>;

	/// Releases `size` bytes previously granted by [`alloc`](Self::alloc).
	fn free(&self, _size: usize) { }
}

/// The default allocator, granting every request.
#[derive(Copy, Clone, Debug, Default)]
pub struct Heap;

impl Allocator for Heap {
	fn alloc(&self, _what: &'static str, _size: usize) -> Result<(), AllocError> {
		Ok(())
	}
}

impl<A: Allocator + ?Sized> Allocator for Rc<A> {
	fn alloc(&self, what: &'static str, size: usize) -> Result<(), AllocError> {
		(**self).alloc(what, size)
	}

	fn free(&self, size: usize) {
		(**self).free(size)
	}
}

type WarningHandler = Box<dyn Fn(&str)>;

#[derive(Default)]
struct Warnings {
	last: String,
	repeats: usize,
	count: usize,
}

struct Inner {
	id: u64,
	options: ContextOptions,
	allocator: Box<dyn Allocator>,
	allocated: Cell<usize>,
	warnings: RefCell<Warnings>,
	handler: RefCell<Option<WarningHandler>>,
}

/// A shared handle to an execution context. Streams hold the context they were
/// last bound to, allocate through it, and report warnings to it.
///
/// Contexts are compared by identity: two handles are equal only if they refer
/// to the same context. Like streams, contexts are confined to one thread.
#[derive(Clone)]
pub struct Context(Rc<Inner>);

impl Default for Context {
	fn default() -> Self { Self::new() }
}

impl From<ContextOptions> for Context {
	fn from(options: ContextOptions) -> Self {
		Self::with_allocator(options, Heap)
	}
}

impl PartialEq for Context {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for Context { }

impl Debug for Context {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Context")
			.field("id", &self.0.id)
			.field("options", &self.0.options)
			.field("allocated", &self.0.allocated.get())
			.finish_non_exhaustive()
	}
}

impl Context {
	/// Creates a new context with default options.
	pub fn new() -> Self { ContextOptions::default().into() }

	/// Creates a new context with `options`, gating allocations through
	/// `allocator`.
	pub fn with_allocator(options: ContextOptions, allocator: impl Allocator + 'static) -> Self {
		Self(Rc::new(Inner {
			id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
			options,
			allocator: Box::new(allocator),
			allocated: Cell::new(0),
			warnings: RefCell::default(),
			handler: RefCell::default(),
		}))
	}

	/// Returns a number identifying this context in log output.
	pub fn id(&self) -> u64 { self.0.id }

	/// Returns the context options.
	pub fn options(&self) -> ContextOptions { self.0.options }

	/// Returns the number of bytes currently allocated through the context.
	pub fn allocated(&self) -> usize { self.0.allocated.get() }

	/// Requests `size` bytes for `what`, failing if the allocation limit would be
	/// exceeded or the allocator refuses.
	pub fn alloc(&self, what: &'static str, size: usize) -> Result<(), AllocError> {
		let Inner { options, allocator, allocated, .. } = &*self.0;
		let total = allocated.get()
							 .checked_add(size)
							 .filter(|&total| total <= options.alloc_limit)
							 .ok_or(AllocError { what, size })?;
		allocator.alloc(what, size)?;
		allocated.set(total);
		Ok(())
	}

	/// Releases `size` bytes granted by [`alloc`](Self::alloc).
	pub fn free(&self, size: usize) {
		let Inner { allocator, allocated, .. } = &*self.0;
		allocated.set(allocated.get().saturating_sub(size));
		allocator.free(size);
	}

	/// Sets a handler receiving every emitted warning, replacing any previous
	/// handler.
	pub fn set_warning_handler(&self, handler: impl Fn(&str) + 'static) {
		*self.0.handler.borrow_mut() = Some(Box::new(handler));
	}

	/// Returns the number of warnings reported, including coalesced repeats.
	pub fn warning_count(&self) -> usize {
		self.0.warnings.borrow().count
	}

	/// Reports a warning. Warnings never interrupt the caller.
	pub fn warn(&self, message: &str) {
		let coalesce = self.0.options.coalesce_warnings;
		{
			let mut warnings = self.0.warnings.borrow_mut();
			warnings.count += 1;
			if coalesce && warnings.last == message {
				warnings.repeats += 1;
				return
			}
		}

		self.flush_warnings();
		self.emit(message);
		if coalesce {
			let mut warnings = self.0.warnings.borrow_mut();
			message.clone_into(&mut warnings.last);
		}
	}

	/// Emits the repetition count of the last coalesced warning, if it repeated.
	pub fn flush_warnings(&self) {
		let repeats = {
			let mut warnings = self.0.warnings.borrow_mut();
			warnings.last.clear();
			std::mem::take(&mut warnings.repeats)
		};

		if repeats > 0 {
			self.emit(&format!("... repeated {repeats} times..."));
		}
	}

	fn emit(&self, message: &str) {
		if self.0.options.log_warnings {
			warn!("[context {}] {message}", self.0.id);
		}

		if let Some(handler) = self.0.handler.borrow().as_ref() {
			handler(message);
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		let repeats = self.warnings.get_mut().repeats;
		if repeats > 0 && self.options.log_warnings {
			warn!("[context {}] ... repeated {repeats} times...", self.id);
		}
	}
}
