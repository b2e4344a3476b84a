//! Heap lifecycle, fit/placement, and the public allocator API.
//!
//! Control flow (spec §2): `allocate` → size adjust → `find_fit` →
//! (`extend_heap` on miss) → mark allocated → split → reinsert remainder.
//! `free` → mark free → coalesce → insert into bucket.

use core::ptr;

pub use crate::extender::PageExtender;
use crate::block::{read_header, write_block};
use crate::coalesce::coalesce;
use crate::error::AllocError;
use crate::fit::{BEST_OF_K, adjusted_size};
use crate::freelist::{NUM_BUCKETS, SegList, class};
use crate::header::{ALIGNMENT, BlockFlags, Header, MIN_BLOCK_SIZE, WORD_SIZE};

/// A segregated-fit heap over a caller-provided, monotonically growing
/// region of memory.
///
/// `Heap` assumes a single caller at a time (spec §5): every public method
/// runs to completion before the next is invoked, and no method suspends.
/// Wrap it in a lock yourself (or enable the `global-allocator` feature) to
/// share it across threads.
pub struct Heap<E: PageExtender> {
    extender: E,
    seglist: SegList,
    prologue: *mut u8,
    epilogue: *mut u8,
    heap_lo: *mut u8,
    initialized: bool,
}

// SAFETY: `Heap` holds no thread-local state; the raw pointers it stores
// all point into memory owned by `extender`, which travels with `self`.
unsafe impl<E: PageExtender + Send> Send for Heap<E> {}

impl<E: PageExtender> Heap<E> {
    /// Heap-extension granularity used when no fit is found, matching the
    /// original implementation's `chunksize`.
    pub const CHUNK_SIZE: usize = 4096;

    /// Wraps `extender`. Does not touch the heap yet; initialization is
    /// lazy, on the first `allocate` call (or via an explicit [`Heap::init`]).
    pub const fn new(extender: E) -> Self {
        Self {
            extender,
            seglist: SegList::new(),
            prologue: ptr::null_mut(),
            epilogue: ptr::null_mut(),
            heap_lo: ptr::null_mut(),
            initialized: false,
        }
    }

    /// Consumes the heap, returning the underlying extender.
    pub fn into_extender(self) -> E {
        self.extender
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    #[inline]
    pub(crate) fn prologue_addr(&self) -> *mut u8 {
        self.prologue
    }

    #[inline]
    pub(crate) fn epilogue_addr(&self) -> *mut u8 {
        self.epilogue
    }

    #[inline]
    pub(crate) fn heap_lo_addr(&self) -> *mut u8 {
        self.heap_lo
    }

    #[inline]
    pub(crate) fn heap_hi_addr(&self) -> *mut u8 {
        self.epilogue
    }

    #[inline]
    pub(crate) fn bucket_members(&self, bucket: usize) -> alloc::vec::Vec<*mut u8> {
        self.seglist.members(bucket)
    }

    #[inline]
    pub(crate) fn seglist_is_symmetric(&self, bucket: usize) -> bool {
        self.seglist.is_symmetric(bucket)
    }

    /// Test-only window into bucket membership and heap extent, for
    /// integration tests exercising spec §8 scenarios directly.
    #[cfg(any(test, feature = "test-util"))]
    pub fn bucket_members_for_test(&self, bucket: usize) -> alloc::vec::Vec<*mut u8> {
        self.bucket_members(bucket)
    }

    /// Current occupied length of the underlying extender's region, used by
    /// tests to detect whether an `allocate` call grew the heap.
    #[cfg(any(test, feature = "test-util"))]
    pub fn extender_len_for_test(&self) -> usize {
        if self.heap_lo.is_null() {
            return 0;
        }
        (self.extender.hi() as usize) - (self.extender.lo() as usize) + 1
    }

    /// Explicit initialization. Idempotent; `allocate` calls this
    /// automatically on first use. Returns `false` if the extender could
    /// not satisfy either of the two extends required (one for the
    /// prologue/epilogue pair, one for the initial free chunk).
    pub fn init(&mut self) -> bool {
        if self.initialized {
            return true;
        }

        let base = match self.extender.extend(2 * WORD_SIZE as isize) {
            Some(b) => b,
            None => return false,
        };

        self.prologue = base;
        unsafe { crate::block::write_header(base, Header::pack(0, BlockFlags::ALLOC)) };

        let epilogue = unsafe { base.add(WORD_SIZE) };
        // No previous real block exists yet; encode that as prev-alloc so
        // the coalescer never tries to merge the first block with one.
        unsafe {
            crate::block::write_header(
                epilogue,
                Header::pack(0, BlockFlags::ALLOC | BlockFlags::PREV_ALLOC),
            )
        };
        self.epilogue = epilogue;
        self.heap_lo = unsafe { base.add(WORD_SIZE) };

        if self.extend_heap(Self::CHUNK_SIZE).is_none() {
            return false;
        }

        self.initialized = true;
        log::debug!("segalloc: heap initialized, initial chunk {} bytes", Self::CHUNK_SIZE);
        true
    }

    /// Grows the heap by at least `min_size` bytes, forming a new free
    /// block (coalesced with the previous block if it was free), inserts
    /// it into the free list, and returns its address.
    fn extend_heap(&mut self, min_size: usize) -> Option<*mut u8> {
        let size = round_up(min_size, ALIGNMENT);
        let old_epilogue = self.epilogue;
        let seed = unsafe { read_header(old_epilogue) };

        // The extender's current break sits one word past the epilogue
        // header (the epilogue occupies the heap's last word); `extend`
        // returns that break, and the new block reuses the epilogue's own
        // address as its header, exactly as spec §9's "epilogue as
        // extension seed" note describes.
        let expected_break = unsafe { old_epilogue.add(WORD_SIZE) };
        let base = self.extender.extend(size as isize)?;
        debug_assert_eq!(base, expected_break, "extender broke heap contiguity");

        let new_block = old_epilogue;
        let new_epilogue = unsafe { new_block.add(size) };
        // Placeholder; `write_block` below fixes up prev-alloc/prev-mini.
        unsafe { crate::block::write_header(new_epilogue, Header::pack(0, BlockFlags::ALLOC)) };
        self.epilogue = new_epilogue;

        unsafe { write_block(new_block, size, false, seed.prev_alloc(), seed.prev_mini()) };

        let merged = unsafe { coalesce(&mut self.seglist, new_block) };
        unsafe { self.seglist.insert(merged) };

        log::trace!("segalloc: extended heap by {} bytes at {:p}", size, new_block);
        Some(merged)
    }

    /// Locates a free block of at least `asize` bytes, extending the heap
    /// if no existing free block fits.
    fn find_fit(&mut self, asize: usize) -> Result<*mut u8, AllocError> {
        if let Some(found) = self.search_buckets(asize) {
            return Ok(found);
        }
        self.extend_heap(asize.max(Self::CHUNK_SIZE))
            .ok_or(AllocError::OutOfMemory)
    }

    fn search_buckets(&self, asize: usize) -> Option<*mut u8> {
        let i = class(asize);
        if i == 0 {
            let head = self.seglist.mini_head();
            if !head.is_null() {
                return Some(head);
            }
        }
        let start = if i == 0 { 1 } else { i };
        for bucket in start..NUM_BUCKETS {
            let cand = unsafe { self.seglist.find_best_of_k(bucket, asize, BEST_OF_K) };
            if !cand.is_null() {
                return Some(cand);
            }
        }
        None
    }

    /// Marks `block` allocated at `asize` bytes, splitting off and
    /// reinserting the remainder if it would be at least [`MIN_BLOCK_SIZE`].
    fn place(&mut self, block: *mut u8, asize: usize) {
        unsafe { self.seglist.delete(block) };

        let header = unsafe { read_header(block) };
        let size = header.size();
        let prev_alloc = header.prev_alloc();
        let prev_mini = header.prev_mini();

        if size - asize >= MIN_BLOCK_SIZE {
            let remainder = unsafe { block.add(asize) };
            let remainder_size = size - asize;
            // Remainder first: its successor (the original next block)
            // already has a valid header, so `write_block` can fix up that
            // successor's prev-alloc/prev-mini bits safely.
            unsafe {
                write_block(remainder, remainder_size, false, true, asize == 16);
                write_block(block, asize, true, prev_alloc, prev_mini);
                self.seglist.insert(remainder);
            }
        } else {
            unsafe { write_block(block, size, true, prev_alloc, prev_mini) };
        }
    }

    /// Allocates `size` bytes, returning a 16-byte-aligned payload address,
    /// or null on `size == 0` or out-of-memory.
    pub fn allocate(&mut self, size: usize) -> *mut u8 {
        if !self.initialized && !self.init() {
            return ptr::null_mut();
        }
        if size == 0 {
            return ptr::null_mut();
        }

        let asize = adjusted_size(size);
        let block = match self.find_fit(asize) {
            Ok(b) => b,
            Err(_) => {
                log::warn!("segalloc: allocate({}) failed: out of memory", size);
                return ptr::null_mut();
            }
        };

        self.place(block, asize);
        self.debug_self_check();
        unsafe { payload_ptr(block) }
    }

    /// Frees a block previously returned by `allocate`/`reallocate`/
    /// `zero_allocate`. `ptr` null is a no-op.
    pub fn free(&mut self, ptr: *mut u8) {
        if ptr.is_null() {
            return;
        }
        let block = unsafe { block_from_payload(ptr) };
        let header = unsafe { read_header(block) };
        debug_assert!(header.alloc(), "free() called on a non-allocated block");

        unsafe { write_block(block, header.size(), false, header.prev_alloc(), header.prev_mini()) };
        let merged = unsafe { coalesce(&mut self.seglist, block) };
        unsafe { self.seglist.insert(merged) };
        self.debug_self_check();
    }

    /// Runs [`Heap::self_check`] and panics on violation, but only in
    /// builds with `debug_assertions` enabled (spec §4.7).
    #[cfg(debug_assertions)]
    fn debug_self_check(&self) {
        if let Err(violation) = self.self_check() {
            panic!("segalloc: self-check failed: {:?}", violation);
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline(always)]
    fn debug_self_check(&self) {}

    /// Resizes the allocation at `ptr` to `size` bytes, per spec §4.6:
    /// `ptr == null` behaves as `allocate`; `size == 0` behaves as `free`
    /// and returns null; otherwise copies `min(size, old payload size)`
    /// bytes into a new block (which may be the same address) and frees
    /// the old one. Leaves `ptr` untouched and returns null on OOM.
    pub fn reallocate(&mut self, ptr: *mut u8, size: usize) -> *mut u8 {
        if ptr.is_null() {
            return self.allocate(size);
        }
        if size == 0 {
            self.free(ptr);
            return ptr::null_mut();
        }

        let block = unsafe { block_from_payload(ptr) };
        let old_payload_size = unsafe { read_header(block) }.size() - WORD_SIZE;

        let new_ptr = self.allocate(size);
        if new_ptr.is_null() {
            return ptr::null_mut();
        }

        let copy_len = old_payload_size.min(size);
        unsafe { ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
        self.free(ptr);
        new_ptr
    }

    /// Allocates space for `count` elements of `elem_size` bytes each and
    /// zero-fills the entire region. Returns null if `count == 0` or if
    /// `count * elem_size` overflows.
    pub fn zero_allocate(&mut self, count: usize, elem_size: usize) -> *mut u8 {
        if count == 0 {
            return ptr::null_mut();
        }
        let total = match count.checked_mul(elem_size) {
            Some(t) => t,
            None => return ptr::null_mut(),
        };

        let ptr = self.allocate(total);
        if !ptr.is_null() {
            unsafe { ptr::write_bytes(ptr, 0, total) };
        }
        ptr
    }
}

#[inline]
const fn round_up(value: usize, alignment: usize) -> usize {
    (value + alignment - 1) & !(alignment - 1)
}

/// # Safety
/// `block` must be a valid, allocated block header address.
#[inline]
unsafe fn payload_ptr(block: *mut u8) -> *mut u8 {
    unsafe { block.add(WORD_SIZE) }
}

/// # Safety
/// `payload` must have been returned by [`payload_ptr`] for a still-live
/// allocation.
#[inline]
unsafe fn block_from_payload(payload: *mut u8) -> *mut u8 {
    unsafe { payload.sub(WORD_SIZE) }
}
