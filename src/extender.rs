//! The page extender: the allocator's only external collaborator.
//!
//! The core never maps pages or talks to the OS itself; it asks a
//! caller-supplied [`PageExtender`] to grow a contiguous region and trusts
//! the returned bounds. Production embedders (a kernel heap, a hosted
//! `sbrk`-backed allocator, a WASM linear memory grower) each implement
//! this trait once; tests use [`test_util::VecExtender`].

/// Grows (monotonically) a contiguous byte region and reports its bounds.
///
/// Implementations must never shrink the region and must keep previously
/// returned addresses valid for the lifetime of the extender.
pub trait PageExtender {
    /// Grows the region by `delta` bytes (`delta == 0` queries the current
    /// break without growing) and returns the address of the *previous*
    /// break on success, or `None` if the region cannot grow that far.
    fn extend(&mut self, delta: isize) -> Option<*mut u8>;

    /// Inclusive lower bound of the current region.
    fn lo(&self) -> *mut u8;

    /// Inclusive upper bound of the current region.
    fn hi(&self) -> *mut u8;

    /// The extender's native page size, informational only.
    fn page_size(&self) -> usize;
}

#[cfg(any(test, feature = "test-util"))]
pub mod test_util {
    //! A [`PageExtender`] backed by a growable `Vec<u8>`, the same role
    //! `memlib-passthrough.c` plays for the original C test driver: a
    //! hosted stand-in for a real page-granular heap, used only by tests.

    extern crate std;
    use std::vec::Vec;

    use super::PageExtender;

    /// Default simulated page size, used only for [`PageExtender::page_size`].
    const SIMULATED_PAGE_SIZE: usize = 4096;

    /// Capacity reserved up front for an "unbounded" extender. The backing
    /// buffer's capacity is fixed at construction and never reallocated, so
    /// addresses handed out by `extend` stay valid for the extender's
    /// lifetime — mirroring `memlib-passthrough.c`'s single upfront `mmap`
    /// of `MAX_HEAP` bytes rather than a naively-growing `Vec`.
    const DEFAULT_RESERVE: usize = 256 * 1024 * 1024;

    /// An optional cap on total growth, to exercise out-of-memory paths.
    ///
    /// The backing buffer's capacity is reserved once, at construction, and
    /// is never reallocated: `extend` only ever changes the logical length
    /// within that fixed capacity, so pointers it returns remain valid for
    /// the lifetime of the `VecExtender`.
    pub struct VecExtender {
        buf: Vec<u8>,
        max_size: usize,
    }

    impl VecExtender {
        pub fn new(max_size: usize) -> Self {
            Self {
                buf: Vec::with_capacity(max_size),
                max_size,
            }
        }

        pub fn unbounded() -> Self {
            Self::new(DEFAULT_RESERVE)
        }

        /// Current occupied length of the backing buffer.
        pub fn len(&self) -> usize {
            self.buf.len()
        }
    }

    impl PageExtender for VecExtender {
        fn extend(&mut self, delta: isize) -> Option<*mut u8> {
            if delta < 0 {
                return None;
            }
            let delta = delta as usize;
            let old_len = self.buf.len();
            let new_len = old_len.checked_add(delta)?;
            if new_len > self.max_size {
                return None;
            }
            debug_assert!(new_len <= self.buf.capacity(), "VecExtender must never reallocate");
            self.buf.resize(new_len, 0);
            Some(self.buf.as_mut_ptr().wrapping_add(old_len))
        }

        fn lo(&self) -> *mut u8 {
            self.buf.as_ptr() as *mut u8
        }

        fn hi(&self) -> *mut u8 {
            if self.buf.is_empty() {
                self.buf.as_ptr() as *mut u8
            } else {
                unsafe { (self.buf.as_ptr() as *mut u8).add(self.buf.len() - 1) }
            }
        }

        fn page_size(&self) -> usize {
            SIMULATED_PAGE_SIZE
        }
    }
}
