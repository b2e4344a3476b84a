//! Self-check: walks the heap block by block verifying the invariants of
//! spec §3. Debug-only by contract (spec §4.7); always compiled so tests
//! can call it unconditionally.

use alloc::collections::BTreeSet;

use crate::block::{find_next, read_footer, read_header};
use crate::freelist::{NUM_BUCKETS, class};
use crate::header::WORD_SIZE;
use crate::heap::{Heap, PageExtender};

/// A single violated invariant, identified by the block address (if any)
/// where the walker detected it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckViolation {
    /// A block's size is not a multiple of 16.
    BadSize { addr: usize },
    /// A block's address lies outside `[lo, hi]`.
    OutOfBounds { addr: usize },
    /// A block's prev-alloc/prev-mini bits disagree with its physical
    /// predecessor.
    BackReferenceMismatch { addr: usize },
    /// A free, non-mini block's footer does not equal its header.
    FooterMismatch { addr: usize },
    /// Two physically adjacent blocks are both free.
    AdjacentFreeBlocks { first: usize, second: usize },
    /// The prologue is malformed.
    BadPrologue,
    /// The epilogue is malformed.
    BadEpilogue,
    /// A block is listed in a bucket whose class does not match its size.
    WrongBucket { addr: usize, bucket: usize },
    /// A free block is absent from every bucket, or a bucket member is not
    /// actually free on the implicit list.
    BucketMembershipMismatch { addr: usize },
    /// A doubly linked bucket's next/prev pointers are not symmetric.
    AsymmetricBucket { bucket: usize },
}

impl<E: PageExtender> Heap<E> {
    /// Walks the entire heap and free-list structure, checking every
    /// invariant in spec §3. Returns the first violation found, if any.
    pub fn self_check(&self) -> Result<(), CheckViolation> {
        if !self.is_initialized() {
            return Ok(());
        }

        let lo = self.heap_lo_addr() as usize;
        let hi = self.heap_hi_addr() as usize;

        let prologue = self.prologue_addr();
        let prologue_header = unsafe { read_header(prologue) };
        if prologue_header.size() != 0 || !prologue_header.alloc() {
            return Err(CheckViolation::BadPrologue);
        }

        let mut free_on_implicit_list = BTreeSet::new();
        let mut cursor = unsafe { prologue.add(WORD_SIZE) };
        let mut prev_free_addr: Option<usize> = None;
        let mut expected_prev_alloc = true;
        let mut expected_prev_mini = false;

        loop {
            let addr = cursor as usize;
            if addr < lo || addr > hi {
                return Err(CheckViolation::OutOfBounds { addr });
            }

            let header = unsafe { read_header(cursor) };

            if header.size() == 0 {
                if cursor != self.epilogue_addr() || !header.alloc() {
                    return Err(CheckViolation::BadEpilogue);
                }
                if header.prev_alloc() != expected_prev_alloc || header.prev_mini() != expected_prev_mini {
                    return Err(CheckViolation::BackReferenceMismatch { addr });
                }
                break;
            }

            if header.size() % 16 != 0 {
                return Err(CheckViolation::BadSize { addr });
            }
            if header.prev_alloc() != expected_prev_alloc || header.prev_mini() != expected_prev_mini {
                return Err(CheckViolation::BackReferenceMismatch { addr });
            }

            let is_free = !header.alloc();
            if is_free {
                if header.size() > 16 {
                    let footer = unsafe { read_footer(cursor, header.size()) };
                    if footer != header {
                        return Err(CheckViolation::FooterMismatch { addr });
                    }
                }
                if let Some(prev_addr) = prev_free_addr {
                    return Err(CheckViolation::AdjacentFreeBlocks {
                        first: prev_addr,
                        second: addr,
                    });
                }
                free_on_implicit_list.insert(addr);
            }

            expected_prev_alloc = header.alloc();
            expected_prev_mini = header.size() == 16;
            prev_free_addr = if is_free { Some(addr) } else { None };
            cursor = unsafe { find_next(cursor) };
        }

        self.check_buckets(&free_on_implicit_list)
    }

    fn check_buckets(&self, free_on_implicit_list: &BTreeSet<usize>) -> Result<(), CheckViolation> {
        let lo = self.heap_lo_addr() as usize;
        let hi = self.heap_hi_addr() as usize;
        let mut seen_in_buckets = BTreeSet::new();

        for bucket in 0..NUM_BUCKETS {
            if bucket >= 1 && !self.seglist_is_symmetric(bucket) {
                return Err(CheckViolation::AsymmetricBucket { bucket });
            }
            for addr in self.bucket_members(bucket) {
                let a = addr as usize;
                if a < lo || a > hi {
                    return Err(CheckViolation::OutOfBounds { addr: a });
                }
                let header = unsafe { read_header(addr) };
                if class(header.size()) != bucket {
                    return Err(CheckViolation::WrongBucket { addr: a, bucket });
                }
                if !free_on_implicit_list.contains(&a) {
                    return Err(CheckViolation::BucketMembershipMismatch { addr: a });
                }
                seen_in_buckets.insert(a);
            }
        }

        if seen_in_buckets.len() != free_on_implicit_list.len() {
            let missing = free_on_implicit_list
                .iter()
                .find(|a| !seen_in_buckets.contains(*a))
                .copied()
                .unwrap_or(0);
            return Err(CheckViolation::BucketMembershipMismatch { addr: missing });
        }

        Ok(())
    }
}
