//! Header/footer codec: packs `{size, alloc, prev-alloc, prev-mini}` into a
//! single 8-byte word.
//!
//! Footers (present only on free, non-mini blocks) are a verbatim copy of
//! the header word and are decoded with the same [`Header`] type.

use bitflags::bitflags;

/// Size in bytes of a header or footer word.
pub const WORD_SIZE: usize = 8;

/// Payload/block alignment, in bytes. Also the minimum block size.
pub const ALIGNMENT: usize = 16;

/// The size of the smallest ("mini") block class.
pub const MIN_BLOCK_SIZE: usize = ALIGNMENT;

bitflags! {
    /// The three live bits of a header word. Bit 3 is reserved and always zero.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct BlockFlags: u64 {
        /// This block is allocated.
        const ALLOC      = 0b001;
        /// The physically previous block is allocated.
        const PREV_ALLOC = 0b010;
        /// The physically previous block has size 16 (the mini class).
        const PREV_MINI  = 0b100;
    }
}

const SIZE_MASK: u64 = !0xF;

/// A decoded header (or footer) word.
///
/// `size` is always a multiple of 16. For the prologue and epilogue
/// sentinels, `size` is 0.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Header(u64);

impl Header {
    /// Packs `size` and the three flag bits into a header word.
    ///
    /// `size` must already be a multiple of 16; low bits of `size` are
    /// discarded rather than checked, matching the original encoding (the
    /// caller is responsible for size adjustment upstream).
    #[inline]
    pub const fn pack(size: usize, flags: BlockFlags) -> Header {
        Header((size as u64 & SIZE_MASK) | flags.bits())
    }

    /// Reinterprets a raw word read from memory as a header.
    #[inline]
    pub const fn from_raw(word: u64) -> Header {
        Header(word)
    }

    /// The raw word, suitable for writing back to memory.
    #[inline]
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn size(self) -> usize {
        (self.0 & SIZE_MASK) as usize
    }

    #[inline]
    pub fn flags(self) -> BlockFlags {
        BlockFlags::from_bits_truncate(self.0 & !SIZE_MASK)
    }

    #[inline]
    pub fn alloc(self) -> bool {
        self.flags().contains(BlockFlags::ALLOC)
    }

    #[inline]
    pub fn prev_alloc(self) -> bool {
        self.flags().contains(BlockFlags::PREV_ALLOC)
    }

    #[inline]
    pub fn prev_mini(self) -> bool {
        self.flags().contains(BlockFlags::PREV_MINI)
    }

    /// Returns a copy of this header with `PREV_ALLOC`/`PREV_MINI` replaced.
    #[inline]
    pub fn with_prev(self, prev_alloc: bool, prev_mini: bool) -> Header {
        let mut flags = self.flags();
        flags.set(BlockFlags::PREV_ALLOC, prev_alloc);
        flags.set(BlockFlags::PREV_MINI, prev_mini);
        Header::pack(self.size(), flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrips_all_fields() {
        let h = Header::pack(
            64,
            BlockFlags::ALLOC | BlockFlags::PREV_ALLOC | BlockFlags::PREV_MINI,
        );
        assert_eq!(h.size(), 64);
        assert!(h.alloc());
        assert!(h.prev_alloc());
        assert!(h.prev_mini());
    }

    #[test]
    fn pack_clears_low_bits_of_size() {
        // Size is always pre-aligned by the caller; stray low bits must not
        // leak into the flag bits.
        let h = Header::pack(0x31, BlockFlags::empty());
        assert_eq!(h.size(), 0x30);
    }

    #[test]
    fn with_prev_preserves_size_and_alloc() {
        let h = Header::pack(32, BlockFlags::ALLOC);
        let h2 = h.with_prev(true, true);
        assert_eq!(h2.size(), 32);
        assert!(h2.alloc());
        assert!(h2.prev_alloc());
        assert!(h2.prev_mini());
    }

    #[test]
    fn zero_sized_sentinel_roundtrips() {
        let prologue = Header::pack(0, BlockFlags::ALLOC);
        assert_eq!(prologue.size(), 0);
        assert!(prologue.alloc());
        assert!(!prologue.prev_alloc());
        assert!(!prologue.prev_mini());
    }
}
