//! Property tests for spec §8 (P1-P9), driven by a small deterministic
//! xorshift PRNG rather than an external property-testing crate, matching
//! the teacher's own plain `#[test]`-based test style.

use segalloc::Heap;
use segalloc::extender::test_util::VecExtender;

/// A tiny deterministic PRNG. Reproducible failures matter more here than
/// statistical quality.
struct Xorshift(u64);

impl Xorshift {
    fn new(seed: u64) -> Self {
        Self(seed | 1)
    }

    fn next(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next() as usize) % bound
    }
}

struct Live {
    ptr: *mut u8,
    size: usize,
    tag: u8,
}

#[test]
fn random_alloc_free_sequence_upholds_invariants() {
    let mut h: Heap<VecExtender> = Heap::new(VecExtender::new(8 << 20));
    let mut rng = Xorshift::new(0xC0FFEE);
    let mut live: Vec<Live> = Vec::new();

    for step in 0..4000u32 {
        let op = rng.below(3);
        if op == 0 || live.is_empty() {
            let size = 1 + rng.below(512);
            let ptr = h.allocate(size);
            if !ptr.is_null() {
                let tag = (step % 251) as u8;
                unsafe { core::ptr::write_bytes(ptr, tag, size) };
                live.push(Live { ptr, size, tag });
            }
        } else if op == 1 {
            let idx = rng.below(live.len());
            let entry = live.swap_remove(idx);
            assert_written(&entry);
            h.free(entry.ptr);
        } else {
            let idx = rng.below(live.len());
            let new_size = 1 + rng.below(512);
            let old = live.swap_remove(idx);
            assert_written(&old);
            let q = h.reallocate(old.ptr, new_size);
            if q.is_null() {
                // P8: original must still be valid and untouched.
                live.push(old);
            } else {
                let copy_len = old.size.min(new_size);
                let mut ok = true;
                for i in 0..copy_len {
                    if unsafe { *q.add(i) } != old.tag {
                        ok = false;
                        break;
                    }
                }
                assert!(ok, "reallocate did not preserve the shared prefix (P8)");
                live.push(Live { ptr: q, size: new_size, tag: old.tag });
            }
        }

        assert_non_overlap(&live);
        h.self_check().expect("self-check failed mid-sequence");
    }

    for entry in &live {
        assert_written(entry);
    }
}

fn assert_written(entry: &Live) {
    for i in 0..entry.size {
        let byte = unsafe { *entry.ptr.add(i) };
        assert_eq!(byte, entry.tag, "P5: live payload was clobbered");
    }
}

fn assert_non_overlap(live: &[Live]) {
    for i in 0..live.len() {
        for j in (i + 1)..live.len() {
            let (a, b) = (&live[i], &live[j]);
            let a_lo = a.ptr as usize;
            let a_hi = a_lo + a.size;
            let b_lo = b.ptr as usize;
            let b_hi = b_lo + b.size;
            assert!(a_hi <= b_lo || b_hi <= a_lo, "P2: overlapping live allocations");
        }
    }
}

#[test]
fn alignment_and_size_adequacy_hold_for_many_sizes() {
    let mut h: Heap<VecExtender> = Heap::new(VecExtender::new(4 << 20));
    for r in 0..=600usize {
        let p = h.allocate(r);
        if p.is_null() {
            continue;
        }
        assert_eq!((p as usize) % 16, 0, "P1: misaligned payload");
        unsafe { core::ptr::write_bytes(p, 0x42, r) }; // P4: region is at least r bytes
        h.free(p);
    }
    assert!(h.self_check().is_ok());
}

#[test]
fn zero_allocate_zeros_the_entire_region() {
    let mut h: Heap<VecExtender> = Heap::new(VecExtender::new(1 << 20));
    let p = h.zero_allocate(64, 3);
    assert!(!p.is_null());
    for i in 0..64 * 3 {
        assert_eq!(unsafe { *p.add(i) }, 0, "P9: zero-allocate left a non-zero byte");
    }
}

#[test]
fn out_of_memory_leaves_original_block_untouched() {
    let mut h: Heap<VecExtender> = Heap::new(VecExtender::new(1 << 16));
    let p = h.allocate(16);
    assert!(!p.is_null());
    unsafe { core::ptr::write_bytes(p, 0x7, 16) };

    let q = h.reallocate(p, 1 << 30);
    assert!(q.is_null(), "request exceeding the extender's cap must fail");
    for i in 0..16 {
        assert_eq!(unsafe { *p.add(i) }, 0x7, "P8: original must survive a failed reallocate");
    }
}
