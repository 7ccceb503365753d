//! Byte-accounting allocation for Tally containers.
//!
//! Every block handed out by a [`TrackedAllocator`] is booked in the
//! allocator's own ledger: total bytes allocated, total bytes freed,
//! and a table of outstanding blocks keyed by address. The table is how
//! a free recovers the size of a block, and doubles as a leak report
//! naming the call site of each outstanding allocation.
//!
//! # Architecture
//!
//! ```text
//! TrackedAllocator (Rc handle, cheap to clone)
//! ├── backend: Box<dyn GlobalAlloc>  (System by default)
//! └── Ledger
//!     ├── allocated / freed / allocations / frees counters
//!     └── IndexMap<addr, BlockRecord> (allocation order)
//! ```
//!
//! There is no process-wide state: each allocator owns its ledger, so
//! tests can observe accounting in isolation. A ledger only exists
//! inside an allocator:
//!
//! ```compile_fail
//! let ledger = tally_alloc::ledger::Ledger::new();
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod ledger;
pub mod tracked;

pub use ledger::{AllocStats, BlockRecord};
pub use tracked::TrackedAllocator;
