//! Concrete scenarios from spec §8, exercised against a `VecExtender`-backed
//! heap. Requires the `test-util` feature (see `Cargo.toml` dev-dependency).

use segalloc::Heap;
use segalloc::extender::test_util::VecExtender;

fn heap(max: usize) -> Heap<VecExtender> {
    Heap::new(VecExtender::new(max))
}

#[test]
fn scenario_1_reuse_after_free_has_no_overlap() {
    let mut h = heap(1 << 16);
    let a1 = h.allocate(8);
    assert!(!a1.is_null());
    unsafe { core::ptr::write_bytes(a1, 0xAA, 8) };

    let a2 = h.allocate(8);
    assert!(!a2.is_null());
    assert_ne!(a1, a2);

    h.free(a1);
    h.free(a2);
    assert!(h.self_check().is_ok());

    let a3 = h.allocate(8);
    assert!(!a3.is_null());
}

#[test]
fn scenario_2_freed_block_is_reused_lifo() {
    let mut h = heap(1 << 20);
    let a = h.allocate(4096);
    let b = h.allocate(4096);
    assert!(!a.is_null() && !b.is_null());

    h.free(a);
    let c = h.allocate(4096);
    assert_eq!(a, c);
}

#[test]
fn scenario_3_three_way_coalesce_then_reuse() {
    let mut h = heap(1 << 16);
    let a = h.allocate(24);
    let b = h.allocate(24);
    let c = h.allocate(24);
    assert!(!a.is_null() && !b.is_null() && !c.is_null());

    h.free(a);
    h.free(c);
    h.free(b);
    assert!(h.self_check().is_ok());

    // The three adjacent blocks merged into one; a 72-byte request should
    // now fit without growing the backing store.
    let before = backing_len(&h);
    let d = h.allocate(72);
    assert!(!d.is_null());
    assert_eq!(before, backing_len(&h));
}

#[test]
fn scenario_4_reallocate_null_and_zero() {
    let mut h = heap(1 << 16);
    let p = h.reallocate(core::ptr::null_mut(), 100);
    assert!(!p.is_null());

    let q = h.reallocate(p, 0);
    assert!(q.is_null());
    assert!(h.self_check().is_ok());
}

#[test]
fn scenario_5_zero_allocate_rejects_zero_and_overflow() {
    let mut h = heap(1 << 16);
    assert!(h.zero_allocate(0, 8).is_null());
    assert!(h.zero_allocate(usize::MAX, 2).is_null());
}

#[test]
fn scenario_6_mini_block_bucket_holds_one_entry() {
    let mut h = heap(1 << 16);
    let a = h.allocate(1);
    assert!(!a.is_null());
    h.free(a);

    assert_eq!(h.bucket_members_for_test(0).len(), 1);
    let a2 = h.allocate(1);
    assert_eq!(a, a2);
}

fn backing_len(h: &Heap<VecExtender>) -> usize {
    // Heap growth only happens via `extend`, so tracking the extender's
    // reported length is enough to detect whether `allocate` grew the heap.
    h.extender_len_for_test()
}
