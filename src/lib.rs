//! A segregated-fit dynamic memory allocator core.
//!
//! `segalloc` implements the allocator described by the spec this crate
//! grew from: an implicit block list threaded through a caller-provided,
//! monotonically growing region, with 8-byte bit-packed headers, footer
//! elision on allocated blocks, a singly linked mini (16-byte) class, and a
//! 15-bucket segregated free list searched best-of-3 for placement.
//!
//! The core never talks to the OS or the global allocator directly; it asks
//! a [`PageExtender`] to grow the region and trusts the bounds it returns.
//! That keeps the crate usable from `no_std` contexts (a kernel heap, an
//! embedded arena) as well as hosted ones (enable `global-allocator` for a
//! ready-made `GlobalAlloc` over a `Vec`-backed region).
//!
//! ```
//! use segalloc::{Heap, extender::test_util::VecExtender};
//!
//! let mut heap = Heap::new(VecExtender::new(1 << 20));
//! let p = heap.allocate(100);
//! assert!(!p.is_null());
//! heap.free(p);
//! assert!(heap.self_check().is_ok());
//! ```
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod block;
pub mod check;
pub mod coalesce;
pub mod error;
pub mod extender;
pub mod fit;
pub mod freelist;
pub mod header;
pub mod heap;

#[cfg(feature = "global-allocator")]
pub mod global;

pub use check::CheckViolation;
pub use error::AllocError;
pub use extender::PageExtender;
pub use heap::Heap;

#[cfg(feature = "global-allocator")]
pub use global::LockedHeap;
