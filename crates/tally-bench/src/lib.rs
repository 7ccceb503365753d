//! Workload profiles for benchmarking the Tally allocator and array.
//!
//! - [`fill_sequential`]: append `0..n` one element at a time
//! - [`front_churn`]: repeated insert-at-front / remove-at-front, the
//!   worst case for element shifting
//! - [`interleaved_profile`]: mixed pushes, middle inserts and removals
//!   with a fixed, reproducible pattern

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use tally_alloc::TrackedAllocator;
use tally_array::DynArray;
use tally_core::{ArrayError, GrowthPolicy};

/// Build an array holding `0..n`, grown one push at a time.
pub fn fill_sequential(alloc: &TrackedAllocator, n: usize) -> Result<DynArray<u64>, ArrayError> {
    let mut arr = DynArray::new_in(alloc.clone())?;
    for i in 0..n as u64 {
        arr.push(i)?;
    }
    Ok(arr)
}

/// Same as [`fill_sequential`] but with an explicit growth policy.
pub fn fill_with_policy(
    alloc: &TrackedAllocator,
    policy: GrowthPolicy,
    n: usize,
) -> Result<DynArray<u64>, ArrayError> {
    let mut arr = DynArray::with_policy(alloc.clone(), policy)?;
    for i in 0..n as u64 {
        arr.push(i)?;
    }
    Ok(arr)
}

/// Insert at the front and remove from the front, `rounds` times.
///
/// Returns the sum of removed values so the work cannot be optimized away.
pub fn front_churn(arr: &mut DynArray<u64>, rounds: usize) -> Result<u64, ArrayError> {
    let mut sum = 0u64;
    for i in 0..rounds as u64 {
        arr.insert(0, i)?;
        sum = sum.wrapping_add(arr.remove(0)?);
    }
    Ok(sum)
}

/// Mixed workload: every third step inserts in the middle, every fifth
/// removes from the middle, everything else pushes.
pub fn interleaved_profile(
    alloc: &TrackedAllocator,
    steps: usize,
) -> Result<DynArray<u64>, ArrayError> {
    let mut arr = DynArray::new_in(alloc.clone())?;
    for step in 0..steps {
        let value = step as u64;
        if step % 5 == 4 && !arr.is_empty() {
            let mid = arr.len() / 2;
            arr.remove(mid)?;
        } else if step % 3 == 2 {
            let mid = arr.len() / 2;
            arr.insert(mid, value)?;
        } else {
            arr.push(value)?;
        }
    }
    Ok(arr)
}
