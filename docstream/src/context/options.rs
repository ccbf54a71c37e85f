// SPDX-License-Identifier: Apache-2.0

/// Options for tuning a [`Context`](super::Context)'s behavior.
///
/// # Allocation limit
///
/// The maximum number of bytes streams and buffers may hold at once through
/// the context, counting stream envelopes, read-ahead windows, and buffers
/// copied or read through it. Defaults to `usize::MAX`, effectively no limit.
/// Allocations past the limit fail with an [`AllocError`](crate::AllocError)
/// before reaching the allocator.
///
/// # Warnings
///
/// Warnings are emitted for failures that can't be propagated, such as a file
/// failing to close. By default they are logged at the `warn` level as well as
/// passed to the context's warning handler, if set. Consecutive identical
/// warnings are coalesced into one, followed by a count of repetitions when a
/// different warning arrives or the context is flushed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct ContextOptions {
	pub alloc_limit: usize,
	pub log_warnings: bool,
	pub coalesce_warnings: bool,
}

impl Default for ContextOptions {
	fn default() -> Self { Self::new() }
}

impl ContextOptions {
	/// Creates a new set of context options.
	pub const fn new() -> Self {
		Self {
			alloc_limit: usize::MAX,
			log_warnings: true,
			coalesce_warnings: true,
		}
	}

	/// Returns the allocation limit.
	#[inline]
	pub const fn alloc_limit(&self) -> usize { self.alloc_limit }

	/// Returns whether warnings are logged.
	#[inline]
	pub const fn log_warnings(&self) -> bool { self.log_warnings }

	/// Returns whether repeated warnings are coalesced.
	#[inline]
	pub const fn coalesce_warnings(&self) -> bool { self.coalesce_warnings }

	/// Sets the allocation limit.
	#[inline]
	pub fn set_alloc_limit(&mut self, value: usize) {
		self.alloc_limit = value;
	}

	/// Sets whether warnings are logged.
	#[inline]
	pub fn set_log_warnings(&mut self, value: bool) {
		self.log_warnings = value;
	}

	/// Sets whether repeated warnings are coalesced.
	#[inline]
	pub fn set_coalesce_warnings(&mut self, value: bool) {
		self.coalesce_warnings = value;
	}

	/// Sets the allocation limit.
	#[inline]
	pub const fn with_alloc_limit(mut self, value: usize) -> Self {
		self.alloc_limit = value;
		self
	}

	/// Sets whether warnings are logged.
	#[inline]
	pub const fn with_log_warnings(mut self, value: bool) -> Self {
		self.log_warnings = value;
		self
	}

	/// Sets whether repeated warnings are coalesced.
	#[inline]
	pub const fn with_coalesce_warnings(mut self, value: bool) -> Self {
		self.coalesce_warnings = value;
		self
	}
}
