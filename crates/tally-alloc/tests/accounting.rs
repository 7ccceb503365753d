//! Property tests: allocator accounting stays balanced under arbitrary
//! interleavings of allocations and frees.

use std::ptr::NonNull;

use proptest::prelude::*;
use tally_alloc::TrackedAllocator;
use tally_test_utils::{init_test_logging, FailingBackend};

#[derive(Clone, Debug)]
enum Op {
    Alloc(usize),
    Free(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1usize..512).prop_map(Op::Alloc),
        (0usize..32).prop_map(Op::Free),
    ]
}

proptest! {
    #[test]
    fn matched_pairs_balance_to_zero(ops in prop::collection::vec(arb_op(), 1..64)) {
        let alloc = TrackedAllocator::new();
        let mut held: Vec<(NonNull<u8>, usize)> = Vec::new();
        let mut expected_live = 0u64;

        for op in ops {
            match op {
                Op::Alloc(bytes) => {
                    let ptr = alloc.allocate_array::<u8>(bytes).unwrap();
                    held.push((ptr, bytes));
                    expected_live += bytes as u64;
                }
                Op::Free(i) if !held.is_empty() => {
                    let (ptr, bytes) = held.remove(i % held.len());
                    unsafe { alloc.deallocate(Some(ptr)).unwrap() };
                    expected_live -= bytes as u64;
                }
                Op::Free(_) => {}
            }
            let stats = alloc.stats();
            prop_assert!(stats.freed <= stats.allocated);
            prop_assert_eq!(alloc.live_bytes(), expected_live);
            prop_assert_eq!(stats.live_blocks, held.len());
        }

        for (ptr, _) in held.drain(..) {
            unsafe { alloc.deallocate(Some(ptr)).unwrap() };
        }
        prop_assert_eq!(alloc.live_bytes(), 0);
        prop_assert_eq!(alloc.allocated_bytes(), alloc.freed_bytes());
        prop_assert!(alloc.live_blocks().is_empty());
    }

    #[test]
    fn failed_allocations_are_never_booked(
        budget in 0usize..8,
        sizes in prop::collection::vec(1usize..128, 1..16),
    ) {
        let (backend, switch) = FailingBackend::new();
        let alloc = TrackedAllocator::with_backend(backend);
        switch.fail_after(budget);

        let mut held = Vec::new();
        let mut booked = 0u64;
        for &bytes in &sizes {
            if let Ok(ptr) = alloc.allocate_array::<u8>(bytes) {
                held.push(ptr);
                booked += bytes as u64;
            }
        }
        prop_assert_eq!(held.len(), budget.min(sizes.len()));
        prop_assert_eq!(alloc.allocated_bytes(), booked);

        for ptr in held {
            unsafe { alloc.deallocate(Some(ptr)).unwrap() };
        }
        prop_assert_eq!(alloc.live_bytes(), 0);
    }
}

#[test]
fn demo_roundtrip_three_ints() {
    init_test_logging();
    let alloc = TrackedAllocator::new();
    let ptr = alloc.allocate_array::<i32>(3).unwrap();
    assert_eq!(alloc.live_bytes(), 12);
    unsafe { alloc.deallocate(Some(ptr.cast())).unwrap() };
    assert_eq!(alloc.live_bytes(), 0);
}
