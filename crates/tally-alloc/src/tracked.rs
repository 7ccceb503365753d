//! The tracked allocator.
//!
//! [`TrackedAllocator`] forwards raw block requests to a backend
//! [`GlobalAlloc`] and books every allocation and free in its
//! ledger. Handles are cheap to clone; clones share one ledger.

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::panic::Location;
use std::ptr::NonNull;
use std::rc::Rc;

use tally_core::AllocError;
use tracing::{debug, error, warn};

use crate::ledger::{AllocStats, BlockRecord, Ledger};

struct Inner {
    backend: Box<dyn GlobalAlloc>,
    ledger: Ledger,
}

impl Drop for Inner {
    fn drop(&mut self) {
        let leaked = self.ledger.live_blocks();
        if leaked.is_empty() {
            return;
        }
        warn!(
            target: "tally::alloc",
            blocks = leaked.len(),
            bytes = self.ledger.live_bytes(),
            "allocator dropped with outstanding blocks"
        );
        for block in &leaked {
            warn!(target: "tally::alloc", "leaked {block}");
        }
    }
}

/// Byte-accounting allocator handle.
///
/// Single-threaded by construction: the ledger lives behind an `Rc`, so
/// handles are neither `Send` nor `Sync`.
#[derive(Clone)]
pub struct TrackedAllocator {
    inner: Rc<Inner>,
}

impl TrackedAllocator {
    /// Create an allocator backed by [`System`] with a fresh ledger.
    pub fn new() -> Self {
        Self::with_backend(System)
    }

    /// Create an allocator over an arbitrary backend with a fresh ledger.
    pub fn with_backend(backend: impl GlobalAlloc + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                backend: Box::new(backend),
                ledger: Ledger::new(),
            }),
        }
    }

    /// Allocate a block for `count` values of `T`.
    ///
    /// The block is uninitialized. Fails with
    /// [`AllocError::CapacityOverflow`] if the byte size overflows,
    /// [`AllocError::ZeroSized`] if it is zero, and
    /// [`AllocError::OutOfMemory`] if the backend refuses.
    #[track_caller]
    pub fn allocate_array<T>(&self, count: usize) -> Result<NonNull<T>, AllocError> {
        let layout = Layout::array::<T>(count).map_err(|_| AllocError::CapacityOverflow {
            elem_size: std::mem::size_of::<T>(),
            count,
        })?;
        self.allocate(layout).map(NonNull::cast)
    }

    /// Allocate a block with the given layout.
    #[track_caller]
    pub fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        let location = Location::caller();
        if layout.size() == 0 {
            error!(
                target: "tally::alloc",
                file = location.file(),
                line = location.line(),
                "zero-sized allocation requested"
            );
            return Err(AllocError::ZeroSized);
        }

        // SAFETY: layout has non-zero size, checked above.
        let raw = unsafe { self.inner.backend.alloc(layout) };
        let Some(ptr) = NonNull::new(raw) else {
            error!(
                target: "tally::alloc",
                bytes = layout.size(),
                file = location.file(),
                line = location.line(),
                "backend refused allocation"
            );
            return Err(AllocError::OutOfMemory {
                bytes: layout.size(),
            });
        };

        let ledger = &self.inner.ledger;
        ledger.record_alloc(BlockRecord {
            addr: ptr.as_ptr() as usize,
            layout,
            location,
        });
        debug!(
            target: "tally::alloc",
            addr = ?ptr,
            bytes = layout.size(),
            file = location.file(),
            line = location.line(),
            live = ledger.live_bytes(),
            "alloc"
        );
        Ok(ptr)
    }

    /// Release a block previously returned by this allocator.
    ///
    /// `None` is a no-op. The block's size is recovered from the ledger.
    /// An address that is not an outstanding block of this allocator is
    /// reported as [`AllocError::UnknownBlock`] and never reaches the
    /// backend.
    ///
    /// # Safety
    ///
    /// No live reference or pointer into the block may be used after
    /// this call. Any values stored in the block must already have been
    /// dropped or moved out.
    #[track_caller]
    pub unsafe fn deallocate(&self, ptr: Option<NonNull<u8>>) -> Result<(), AllocError> {
        let Some(ptr) = ptr else {
            return Ok(());
        };
        let location = Location::caller();
        let addr = ptr.as_ptr() as usize;
        let ledger = &self.inner.ledger;

        let Some(record) = ledger.record_free(addr) else {
            error!(
                target: "tally::alloc",
                addr = ?ptr,
                file = location.file(),
                line = location.line(),
                "free of unknown or already freed block"
            );
            return Err(AllocError::UnknownBlock { addr });
        };

        // SAFETY: the ledger only holds blocks this backend returned, with
        // the layout they were allocated with, and the record was removed
        // above so the block cannot be released twice.
        unsafe { self.inner.backend.dealloc(ptr.as_ptr(), record.layout) };

        debug!(
            target: "tally::alloc",
            addr = ?ptr,
            bytes = record.size(),
            file = location.file(),
            line = location.line(),
            live = ledger.live_bytes(),
            "free"
        );
        Ok(())
    }

    /// Bytes currently outstanding (`allocated - freed`).
    pub fn live_bytes(&self) -> u64 {
        self.inner.ledger.live_bytes()
    }

    /// Total bytes ever allocated.
    pub fn allocated_bytes(&self) -> u64 {
        self.inner.ledger.allocated()
    }

    /// Total bytes ever freed.
    pub fn freed_bytes(&self) -> u64 {
        self.inner.ledger.freed()
    }

    /// Snapshot of the ledger counters.
    pub fn stats(&self) -> AllocStats {
        self.inner.ledger.stats()
    }

    /// Outstanding blocks, oldest first.
    pub fn live_blocks(&self) -> Vec<BlockRecord> {
        self.inner.ledger.live_blocks()
    }

    /// Whether `ptr` is the start of an outstanding block.
    pub fn is_live<T>(&self, ptr: *const T) -> bool {
        self.inner.ledger.is_live(ptr as usize)
    }

    /// Whether two handles share one ledger.
    pub fn same_ledger(&self, other: &TrackedAllocator) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for TrackedAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrackedAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedAllocator")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_test_utils::FailingBackend;

    #[test]
    fn allocate_array_books_exact_bytes() {
        let alloc = TrackedAllocator::new();
        let ptr = alloc.allocate_array::<u32>(3).unwrap();
        assert_eq!(alloc.allocated_bytes(), 12);
        assert_eq!(alloc.live_bytes(), 12);
        assert!(alloc.is_live(ptr.as_ptr()));

        unsafe { alloc.deallocate(Some(ptr.cast())).unwrap() };
        assert_eq!(alloc.freed_bytes(), 12);
        assert_eq!(alloc.live_bytes(), 0);
        assert!(!alloc.is_live(ptr.as_ptr()));
    }

    #[test]
    fn returned_pointer_is_writable_and_aligned() {
        let alloc = TrackedAllocator::new();
        let ptr = alloc.allocate_array::<u64>(4).unwrap();
        assert_eq!(ptr.as_ptr() as usize % std::mem::align_of::<u64>(), 0);
        unsafe {
            for i in 0..4 {
                ptr.as_ptr().add(i).write(i as u64 * 10);
            }
            assert_eq!(*ptr.as_ptr().add(3), 30);
            alloc.deallocate(Some(ptr.cast())).unwrap();
        }
    }

    #[test]
    fn free_of_none_is_noop() {
        let alloc = TrackedAllocator::new();
        unsafe { alloc.deallocate(None).unwrap() };
        assert_eq!(alloc.stats(), AllocStats::default());
    }

    #[test]
    fn double_free_is_reported_not_forwarded() {
        let alloc = TrackedAllocator::new();
        let ptr = alloc.allocate_array::<u8>(16).unwrap();
        unsafe {
            alloc.deallocate(Some(ptr)).unwrap();
            let err = alloc.deallocate(Some(ptr)).unwrap_err();
            assert_eq!(
                err,
                AllocError::UnknownBlock {
                    addr: ptr.as_ptr() as usize
                }
            );
        }
        assert_eq!(alloc.freed_bytes(), 16);
        assert_eq!(alloc.stats().frees, 1);
    }

    #[test]
    fn foreign_pointer_is_rejected() {
        let alloc = TrackedAllocator::new();
        let mut local = 0u8;
        let err = unsafe { alloc.deallocate(NonNull::new(&mut local as *mut u8)) };
        assert!(matches!(err, Err(AllocError::UnknownBlock { .. })));
    }

    #[test]
    fn zero_sized_request_is_rejected() {
        let alloc = TrackedAllocator::new();
        assert_eq!(alloc.allocate_array::<u32>(0), Err(AllocError::ZeroSized));
        assert_eq!(alloc.allocate_array::<()>(10), Err(AllocError::ZeroSized));
        assert_eq!(alloc.stats().allocations, 0);
    }

    #[test]
    fn overflowing_request_is_rejected() {
        let alloc = TrackedAllocator::new();
        let err = alloc.allocate_array::<u64>(usize::MAX / 4).unwrap_err();
        assert_eq!(
            err,
            AllocError::CapacityOverflow {
                elem_size: 8,
                count: usize::MAX / 4
            }
        );
    }

    #[test]
    fn backend_failure_surfaces_out_of_memory() {
        let (backend, switch) = FailingBackend::new();
        let alloc = TrackedAllocator::with_backend(backend);
        switch.fail_now();
        assert_eq!(
            alloc.allocate_array::<u32>(2),
            Err(AllocError::OutOfMemory { bytes: 8 })
        );
        assert_eq!(alloc.allocated_bytes(), 0);

        switch.heal();
        let ptr = alloc.allocate_array::<u32>(2).unwrap();
        unsafe { alloc.deallocate(Some(ptr.cast())).unwrap() };
    }

    #[test]
    fn clones_share_one_ledger() {
        let a = TrackedAllocator::new();
        let b = a.clone();
        let c = TrackedAllocator::new();
        assert!(a.same_ledger(&b));
        assert!(!a.same_ledger(&c));

        let ptr = a.allocate_array::<u16>(5).unwrap();
        assert_eq!(b.live_bytes(), 10);
        unsafe { b.deallocate(Some(ptr.cast())).unwrap() };
        assert_eq!(a.live_bytes(), 0);
        assert_eq!(c.allocated_bytes(), 0);
    }

    #[test]
    fn live_block_records_caller_location() {
        let alloc = TrackedAllocator::new();
        let line = line!() + 1;
        let ptr = alloc.allocate_array::<u8>(7).unwrap();
        let blocks = alloc.live_blocks();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].size(), 7);
        assert_eq!(blocks[0].location.line(), line);
        assert!(blocks[0].location.file().ends_with("tracked.rs"));
        unsafe { alloc.deallocate(Some(ptr)).unwrap() };
    }
}
