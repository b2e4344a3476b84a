//! An optional `GlobalAlloc` front for [`crate::heap::Heap`], behind the
//! `global-allocator` feature.
//!
//! Mirrors the teacher's `KERNEL_HEAP: IrqMutex<KernelHeap>` pattern in
//! `mm/src/kernel_heap.rs`: one lock, acquired once per entry point, never
//! held across a call boundary. This does not retract the core's
//! single-caller assumption (spec §5) — the lock simply serializes callers
//! into it.

use core::alloc::{GlobalAlloc, Layout};

use spin::Mutex;

use crate::header::WORD_SIZE;
use crate::heap::{Heap, PageExtender};

/// A `GlobalAlloc` implementation wrapping a `Heap<E>` behind a spinlock.
///
/// The allocator's payload alignment is fixed at 16 bytes (spec §1);
/// `alloc`/`dealloc` reject (by returning null, or asserting in `dealloc`)
/// any `Layout` requesting a coarser alignment, since the core has no
/// mechanism to honor one.
pub struct LockedHeap<E: PageExtender> {
    inner: Mutex<Heap<E>>,
}

impl<E: PageExtender> LockedHeap<E> {
    pub const fn new(extender: E) -> Self {
        Self {
            inner: Mutex::new(Heap::new(extender)),
        }
    }

    /// Runs `self_check` under the lock, for diagnostics or tests.
    pub fn self_check(&self) -> Result<(), crate::check::CheckViolation> {
        self.inner.lock().self_check()
    }
}

unsafe impl<E: PageExtender + Send> GlobalAlloc for LockedHeap<E> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if layout.align() > WORD_SIZE * 2 {
            return core::ptr::null_mut();
        }
        self.inner.lock().allocate(layout.size())
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        self.inner.lock().free(ptr);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        if layout.align() > WORD_SIZE * 2 {
            return core::ptr::null_mut();
        }
        self.inner.lock().reallocate(ptr, new_size)
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if layout.align() > WORD_SIZE * 2 {
            return core::ptr::null_mut();
        }
        self.inner.lock().zero_allocate(1, layout.size())
    }
}
