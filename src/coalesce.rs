//! Coalescer: merges a newly-freed block with its free physical neighbors.

use crate::block::{find_next, find_prev, read_header, write_block};
use crate::freelist::SegList;

/// Merges `block` (already marked free, not yet present in any bucket) with
/// its free physical neighbors, returning the address of the resulting
/// (possibly merged) block.
///
/// Implements the four cases of spec §4.4: neither neighbor free, only the
/// next neighbor free, only the previous neighbor free, or both.
///
/// # Safety
/// `block` must be a free block, currently absent from `seglist`, whose
/// header already carries correct size/prev-alloc/prev-mini bits.
pub unsafe fn coalesce(seglist: &mut SegList, block: *mut u8) -> *mut u8 {
    let header = unsafe { read_header(block) };
    let prev_alloc = header.prev_alloc();
    let prev_mini = header.prev_mini();
    let size = header.size();

    let next = unsafe { find_next(block) };
    let next_header = unsafe { read_header(next) };
    let next_free = !next_header.alloc();

    if prev_alloc && !next_free {
        unsafe { write_block(block, size, false, prev_alloc, prev_mini) };
        return block;
    }

    if prev_alloc && next_free {
        let next_size = next_header.size();
        unsafe {
            seglist.delete(next);
            write_block(block, size + next_size, false, prev_alloc, prev_mini);
        }
        return block;
    }

    // prev is free: find_prev is guaranteed Some because prev_alloc is false.
    let prev = unsafe { find_prev(block) }.expect("prev-alloc clear implies a previous block");
    let prev_header = unsafe { read_header(prev) };
    let prev_prev_alloc = prev_header.prev_alloc();
    let prev_prev_mini = prev_header.prev_mini();
    let prev_size = prev_header.size();

    if !next_free {
        unsafe {
            seglist.delete(prev);
            write_block(prev, prev_size + size, false, prev_prev_alloc, prev_prev_mini);
        }
        return prev;
    }

    let next_size = next_header.size();
    unsafe {
        seglist.delete(prev);
        seglist.delete(next);
        write_block(
            prev,
            prev_size + size + next_size,
            false,
            prev_prev_alloc,
            prev_prev_mini,
        );
    }
    prev
}
