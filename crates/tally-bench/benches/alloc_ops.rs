//! Criterion micro-benchmarks for the tracked allocator's bookkeeping
//! overhead against the untracked system allocator.

use std::alloc::{GlobalAlloc, Layout, System};
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use tally_alloc::TrackedAllocator;

fn bench_alloc_free_pair(c: &mut Criterion) {
    let alloc = TrackedAllocator::new();
    c.bench_function("tracked_alloc_free_64", |b| {
        b.iter(|| {
            let block = alloc.allocate_array::<u64>(8).unwrap();
            // SAFETY: `block` came from `alloc` and is freed once.
            unsafe { alloc.deallocate(Some(block.cast())).unwrap() };
            black_box(alloc.live_bytes())
        });
    });

    let layout = Layout::array::<u64>(8).unwrap();
    c.bench_function("system_alloc_free_64", |b| {
        b.iter(|| {
            // SAFETY: non-zero layout; the block is freed with the same layout.
            unsafe {
                let p = System.alloc(layout);
                black_box(p);
                System.dealloc(p, layout);
            }
        });
    });
}

fn bench_many_live_blocks(c: &mut Criterion) {
    c.bench_function("tracked_1k_live_blocks", |b| {
        b.iter(|| {
            let alloc = TrackedAllocator::new();
            let blocks: Vec<_> = (0..1_000)
                .map(|_| alloc.allocate_array::<u32>(4).unwrap())
                .collect();
            for block in blocks.into_iter().rev() {
                // SAFETY: each block came from `alloc` and is freed once.
                unsafe { alloc.deallocate(Some(block.cast())).unwrap() };
            }
            black_box(alloc.stats())
        });
    });
}

criterion_group!(benches, bench_alloc_free_pair, bench_many_live_blocks);
criterion_main!(benches);
