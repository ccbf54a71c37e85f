// Copyright 2023 Strixpyrr
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! ## How it works
//!
//! Parsers read from a [`Stream`], a reference-counted handle to a buffered
//! input stream. Where the bytes come from is decided by the stream's *backend*:
//! a file, a buffer, caller-owned memory, or another stream wrapped by a filter.
//! Backends implement [`Backend`](backend::Backend): `read` and `close` are
//! required, while seeking, rebinding, and reopening are optional capabilities
//! the stream checks for before use.
//!
//! ### Windows
//!
//! Each stream reads ahead into a fixed-size *window*, 4096B, allocated on the
//! first read. Small reads are served from the window, refilling it from the
//! backend when it runs dry; reads larger than the window go to the backend
//! directly. Backends holding their data in memory skip this: their data *is*
//! the window, so reading and seeking only move a cursor over it.
//!
//! The window's read cursor trails the backend position by the number of
//! buffered bytes. Seeks landing in the window only move the cursor, others go
//! to the backend and discard the window.
//!
//! ### Sharing and cloning
//!
//! [`Stream::keep`] returns another handle to the same stream; the backend is
//! closed exactly once, when the last handle is closed. For an independent
//! cursor, [`Stream::clone_stream`] reopens the backend at the same position.
//! Memory streams reopen as a deep copy of their data; file streams can't be
//! reopened.
//!
//! ### Contexts
//!
//! Streams allocate through, and report warnings to, a [`Context`]. A chain of
//! streams wrapping one another can be moved to a different context with
//! [`Stream::rebind`]. Contexts, like streams, are confined to one thread.

mod buffer;
mod error;
mod std_io;
pub mod backend;
pub mod context;
pub mod stream;

pub use buffer::*;
pub use context::{Allocator, Context, ContextOptions, Heap};
pub use error::{AllocError, ErrorBox, OpenError};
pub use std_io::*;
pub use stream::{Error, ErrorKind, OperationKind, Result, Stream, Whence, WINDOW_SIZE};
pub use backend::{open_buffer, open_fd, open_file, open_memory, open_range};
