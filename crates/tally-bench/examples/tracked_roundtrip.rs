//! Tracked allocation walkthrough.
//!
//! Demonstrates: allocate three integers → free them → check the ledger →
//! grow, edit and drop an array → print the final statistics. Run with
//! `RUST_LOG=tally=debug` to see every allocator event.

use tally_alloc::TrackedAllocator;
use tally_array::DynArray;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("=== Tally Tracked Roundtrip ===\n");
    let alloc = TrackedAllocator::new();

    // --- Raw blocks ---
    let ints = alloc.allocate_array::<i32>(3).unwrap();
    // SAFETY: `ints` has room for three i32 values.
    unsafe {
        for i in 0..3 {
            ints.as_ptr().add(i).write(i as i32 * 10);
        }
    }
    println!("after allocating 3 x i32: live = {} bytes", alloc.live_bytes());
    for block in alloc.live_blocks() {
        println!("  {block}");
    }
    // SAFETY: `ints` came from `alloc` and is freed once.
    unsafe { alloc.deallocate(Some(ints.cast())).unwrap() };
    println!("after freeing: live = {} bytes\n", alloc.live_bytes());

    // --- Array ---
    let mut arr = DynArray::new_in(alloc.clone()).unwrap();
    arr.extend_from_slice(&[10, 20, 30]).unwrap();
    arr.insert(1, 99).unwrap();
    let removed = arr.remove(0).unwrap();
    println!("removed {removed}, array = {arr:?}");

    arr.resize(5).unwrap();
    println!("resized to 5: {arr:?} (capacity {})", arr.capacity());
    arr.resize(1).unwrap();
    println!("resized to 1: {arr:?}");

    for i in 0..20 {
        arr.push(i).unwrap();
    }
    println!(
        "after 20 pushes: len {} capacity {} live {} bytes",
        arr.len(),
        arr.capacity(),
        alloc.live_bytes()
    );

    drop(arr);
    println!("\n{}", alloc.stats());
    assert_eq!(alloc.live_bytes(), 0);
    println!("\nDone.");
}
