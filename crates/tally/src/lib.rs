//! Tally: tracked allocation with per-call-site accounting, and a growable
//! array built on it.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Tally sub-crates. For most users, adding `tally` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use tally::prelude::*;
//!
//! let alloc = TrackedAllocator::new();
//!
//! // Raw blocks are booked against the allocator's ledger.
//! let block = alloc.allocate_array::<i32>(3).unwrap();
//! assert_eq!(alloc.live_bytes(), 12);
//! // SAFETY: `block` came from `alloc` and is freed once.
//! unsafe { alloc.deallocate(Some(block.cast())).unwrap() };
//! assert_eq!(alloc.live_bytes(), 0);
//!
//! // Arrays draw their buffers from the same ledger.
//! let mut arr = DynArray::new_in(alloc.clone()).unwrap();
//! arr.extend_from_slice(&[10, 20, 30]).unwrap();
//! arr.insert(1, 99).unwrap();
//! assert_eq!(arr.remove(0), Ok(10));
//! assert_eq!(arr, [99, 20, 30]);
//!
//! arr.resize(5).unwrap();
//! assert_eq!(arr, [99, 20, 30, 0, 0]);
//!
//! drop(arr);
//! assert_eq!(alloc.live_bytes(), 0);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `tally-core` | Error types and [`types::GrowthPolicy`] |
//! | [`alloc`] | `tally-alloc` | [`alloc::TrackedAllocator`] and its ledger |
//! | [`array`] | `tally-array` | [`array::DynArray`] and its owning iterator |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Error types and growth configuration (`tally-core`).
pub use tally_core as types;

/// Tracked allocator and allocation ledger (`tally-alloc`).
///
/// Every block is recorded with its size, alignment and the source
/// location of the call that requested it; see
/// [`alloc::TrackedAllocator::live_blocks`] for leak reports.
pub use tally_alloc as alloc;

/// Growable array over a tracked allocator (`tally-array`).
pub use tally_array as array;

/// Common imports for typical Tally usage.
///
/// ```rust
/// use tally::prelude::*;
/// ```
pub mod prelude {
    // Allocation
    pub use tally_alloc::{AllocStats, BlockRecord, TrackedAllocator};

    // Containers
    pub use tally_array::DynArray;

    // Configuration and errors
    pub use tally_core::{AllocError, ArrayError, ConfigError, GrowthPolicy};
}
