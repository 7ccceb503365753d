//! Allocation accounting: byte counters and the live-block table.
//!
//! A `Ledger` is the accounting context owned by one
//! [`TrackedAllocator`](crate::TrackedAllocator). It records every
//! outstanding block keyed by address, so the size of a block is
//! recovered at free time without the caller repeating it.

use std::alloc::Layout;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic::Location;

use indexmap::IndexMap;

/// One outstanding allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRecord {
    /// Start address of the block.
    pub addr: usize,
    /// Layout the block was allocated with.
    pub layout: Layout,
    /// Call site that requested the block.
    pub location: &'static Location<'static>,
}

impl BlockRecord {
    /// Size of the block in bytes.
    pub fn size(&self) -> usize {
        self.layout.size()
    }
}

impl fmt::Display for BlockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x} [{} bytes, align {}] at {}:{}",
            self.addr,
            self.layout.size(),
            self.layout.align(),
            self.location.file(),
            self.location.line()
        )
    }
}

/// Point-in-time copy of a ledger's counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Total bytes ever allocated.
    pub allocated: u64,
    /// Total bytes ever freed.
    pub freed: u64,
    /// Number of successful allocations.
    pub allocations: u64,
    /// Number of successful frees.
    pub frees: u64,
    /// Number of blocks currently outstanding.
    pub live_blocks: usize,
}

impl AllocStats {
    /// Bytes currently outstanding.
    pub fn live_bytes(&self) -> u64 {
        self.allocated.saturating_sub(self.freed)
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated {} B in {} blocks, freed {} B in {} blocks, live {} B in {} blocks",
            self.allocated,
            self.allocations,
            self.freed,
            self.frees,
            self.live_bytes(),
            self.live_blocks
        )
    }
}

/// Accounting context for one allocator.
///
/// Counters only ever increase. `allocated - freed` always equals the
/// summed size of the blocks in the live table.
#[derive(Debug, Default)]
pub(crate) struct Ledger {
    allocated: Cell<u64>,
    freed: Cell<u64>,
    allocations: Cell<u64>,
    frees: Cell<u64>,
    /// Outstanding blocks in allocation order.
    live: RefCell<IndexMap<usize, BlockRecord>>,
}

impl Ledger {
    /// Create an empty ledger.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a newly allocated block.
    pub(crate) fn record_alloc(&self, record: BlockRecord) {
        let bytes = record.size() as u64;
        self.allocated.set(self.allocated.get() + bytes);
        self.allocations.set(self.allocations.get() + 1);
        let previous = self.live.borrow_mut().insert(record.addr, record);
        debug_assert!(
            previous.is_none(),
            "backend returned address {:#x} twice",
            record.addr
        );
    }

    /// Remove the block at `addr` and count its bytes as freed.
    ///
    /// Returns `None` without touching the counters if `addr` is not an
    /// outstanding block.
    pub(crate) fn record_free(&self, addr: usize) -> Option<BlockRecord> {
        let record = self.live.borrow_mut().shift_remove(&addr)?;
        self.freed.set(self.freed.get() + record.size() as u64);
        self.frees.set(self.frees.get() + 1);
        Some(record)
    }

    /// Total bytes ever allocated.
    pub fn allocated(&self) -> u64 {
        self.allocated.get()
    }

    /// Total bytes ever freed.
    pub fn freed(&self) -> u64 {
        self.freed.get()
    }

    /// Bytes currently outstanding. Zero is a valid answer, including
    /// before the first allocation.
    pub fn live_bytes(&self) -> u64 {
        let (allocated, freed) = (self.allocated.get(), self.freed.get());
        debug_assert!(
            allocated >= freed,
            "freed {freed} bytes but only allocated {allocated}"
        );
        allocated.saturating_sub(freed)
    }

    /// Whether `addr` is the start of an outstanding block.
    pub fn is_live(&self, addr: usize) -> bool {
        self.live.borrow().contains_key(&addr)
    }

    /// Outstanding blocks, oldest first.
    pub fn live_blocks(&self) -> Vec<BlockRecord> {
        self.live.borrow().values().copied().collect()
    }

    /// Snapshot of all counters.
    pub fn stats(&self) -> AllocStats {
        AllocStats {
            allocated: self.allocated.get(),
            freed: self.freed.get(),
            allocations: self.allocations.get(),
            frees: self.frees.get(),
            live_blocks: self.live.borrow().len(),
        }
    }
}
