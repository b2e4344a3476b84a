//! Typed internal error values.
//!
//! The public API (spec §6-7) exposes failures as a null pointer, matching
//! the C-shaped `allocate`/`free`/`reallocate`/`zero_allocate` contract.
//! Internally, [`AllocError`] lets `find_fit`/`extend_heap` propagate with
//! `?` instead of threading sentinel pointers by hand.

/// The two sourced failure kinds from spec §7 (programmer misuse is
/// undefined behavior, not an error value).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The page extender could not grow the heap far enough.
    OutOfMemory,
    /// `count * elem_size` overflowed in `zero_allocate`.
    SizeOverflow,
}
