//! The implicit list navigator: raw access to header/footer words and
//! physical next/previous traversal.
//!
//! A "block" is identified by a `*mut u8` pointing at its header word. All
//! functions here are address arithmetic and raw reads/writes; they carry no
//! opinion about free-list membership, which lives in [`crate::freelist`].

use core::ptr;

use crate::header::{BlockFlags, Header, WORD_SIZE};

/// Reads the header word at `block`.
///
/// # Safety
/// `block` must point to a valid header word within the heap.
#[inline]
pub unsafe fn read_header(block: *mut u8) -> Header {
    unsafe { Header::from_raw(ptr::read(block as *const u64)) }
}

/// Writes `header` to the header word at `block`.
///
/// # Safety
/// `block` must point to valid, writable memory for one word.
#[inline]
pub unsafe fn write_header(block: *mut u8, header: Header) {
    unsafe { ptr::write(block as *mut u64, header.to_raw()) };
}

/// Address of a free, non-mini block's footer word (mirrors the header).
///
/// # Safety
/// `block` must be a regular (non-mini) block of the given `size`.
#[inline]
pub unsafe fn footer_addr(block: *mut u8, size: usize) -> *mut u8 {
    unsafe { block.add(size - WORD_SIZE) }
}

/// Reads the footer word of a free, non-mini block.
///
/// # Safety
/// `block` must be a free, non-mini block with a valid footer.
#[inline]
pub unsafe fn read_footer(block: *mut u8, size: usize) -> Header {
    unsafe { read_header(footer_addr(block, size)) }
}

/// Writes `header` to both the header and footer words of a free, non-mini
/// block.
///
/// # Safety
/// `block` must have room for a header and a footer (`size >= 32`).
#[inline]
pub unsafe fn write_header_and_footer(block: *mut u8, header: Header) {
    unsafe {
        write_header(block, header);
        write_header(footer_addr(block, header.size()), header);
    }
}

/// Returns the address of the block physically following `block`.
///
/// # Safety
/// `block`'s header must be valid and `size(block) > 0` (i.e. `block` is
/// not the epilogue).
#[inline]
pub unsafe fn find_next(block: *mut u8) -> *mut u8 {
    let size = unsafe { read_header(block) }.size();
    debug_assert!(size > 0, "find_next called on the epilogue");
    unsafe { block.add(size) }
}

/// Returns the physically preceding block, or `None` if `block` is the
/// first real block on the heap (its predecessor is the prologue).
///
/// # Safety
/// `block`'s header must be valid, and if `prev_mini` is unset the word
/// immediately preceding `block` must be a valid mirrored header (the
/// previous block's footer).
pub unsafe fn find_prev(block: *mut u8) -> Option<*mut u8> {
    let header = unsafe { read_header(block) };
    if header.prev_mini() {
        let prev = unsafe { block.sub(16) };
        // The mini predecessor's header is a size-0 prologue only when
        // `block` is the heap's first real block, but a mini block can
        // never be the prologue (size 16 != 0), so this is always a real
        // previous block.
        return Some(prev);
    }

    let mirrored = unsafe { read_header(block.sub(WORD_SIZE)) };
    if mirrored.size() == 0 {
        return None;
    }
    Some(unsafe { block.sub(mirrored.size()) })
}

/// The single point responsible for writing a block's header/footer *and*
/// propagating its alloc-ness and mini-ness into the physically next
/// block's `prev-alloc`/`prev-mini` bits.
///
/// This is the only function in the crate that writes a block's primary
/// header; every structural mutation (allocation, free, split, coalesce,
/// heap extension) routes through it so the back-reference bits required
/// by [`find_prev`] are never allowed to go stale.
///
/// # Safety
/// `block` must be a valid block with a valid, readable next physical
/// block (or epilogue) at `block + size`.
pub unsafe fn write_block(block: *mut u8, size: usize, alloc: bool, prev_alloc: bool, prev_mini: bool) {
    let mut flags = BlockFlags::empty();
    flags.set(BlockFlags::ALLOC, alloc);
    flags.set(BlockFlags::PREV_ALLOC, prev_alloc);
    flags.set(BlockFlags::PREV_MINI, prev_mini);
    let header = Header::pack(size, flags);

    if alloc || size == 16 {
        unsafe { write_header(block, header) };
    } else {
        unsafe { write_header_and_footer(block, header) };
    }

    let next = unsafe { block.add(size) };
    let next_header = unsafe { read_header(next) };
    let updated_next = next_header.with_prev(alloc, size == 16);
    if updated_next != next_header {
        if next_header.alloc() || next_header.size() == 16 {
            unsafe { write_header(next, updated_next) };
        } else {
            unsafe { write_header_and_footer(next, updated_next) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ALIGNMENT;

    fn make_region(words: usize) -> Vec<u8> {
        vec![0u8; words * WORD_SIZE]
    }

    #[test]
    fn write_block_updates_successor_prev_bits() {
        let mut region = make_region(8);
        let base = region.as_mut_ptr();
        unsafe {
            // A free regular block of size 32, followed by an allocated
            // epilogue-like sentinel of size 0.
            write_header(base.add(32), Header::pack(0, BlockFlags::ALLOC));
            write_block(base, 32, false, true, false);

            let next_header = read_header(base.add(32));
            assert!(!next_header.prev_alloc());
            assert!(!next_header.prev_mini());

            let footer = read_footer(base, 32);
            assert_eq!(footer.size(), 32);
            assert!(!footer.alloc());
        }
    }

    #[test]
    fn write_block_mini_sets_prev_mini_on_successor() {
        let mut region = make_region(8);
        let base = region.as_mut_ptr();
        unsafe {
            write_header(base.add(16), Header::pack(0, BlockFlags::ALLOC));
            write_block(base, 16, true, true, false);

            let next_header = read_header(base.add(16));
            assert!(next_header.prev_alloc());
            assert!(next_header.prev_mini());
        }
    }

    #[test]
    fn find_next_and_find_prev_roundtrip() {
        let mut region = make_region(16);
        let base = region.as_mut_ptr();
        unsafe {
            write_header(base, Header::pack(0, BlockFlags::ALLOC)); // prologue
            let first = base.add(WORD_SIZE);
            write_block(first, 32, false, true, false);
            let second = find_next(first);
            assert_eq!(second, first.add(32));
            write_header(second, Header::pack(0, BlockFlags::ALLOC)); // epilogue

            assert_eq!(find_prev(second), Some(first));
            assert_eq!(find_prev(first), None);
        }
    }

    #[test]
    fn alignment_constant_matches_word_layout() {
        assert_eq!(ALIGNMENT, 2 * WORD_SIZE);
    }
}
