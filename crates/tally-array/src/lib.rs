//! Growable contiguous array built on the Tally tracked allocator.
//!
//! [`DynArray`] is an owning, type-generic sequence whose buffer is a
//! single block from a [`TrackedAllocator`](tally_alloc::TrackedAllocator),
//! so every byte it holds shows up in that allocator's ledger.
//!
//! # Architecture
//!
//! ```text
//! DynArray<T>
//! ├── RawBuf<T>      one allocator block; construct / read / drop per slot
//! ├── len            slots [0, len) are live
//! └── GrowthPolicy   initial capacity 8, factor 3/2, rounded up
//! ```
//!
//! This crate contains `unsafe` code, confined to `raw.rs` and the slot
//! bookkeeping in `array.rs` and `iter.rs`. Each block carries a
//! `// SAFETY:` comment.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod array;
pub mod iter;
mod raw;

pub use array::DynArray;
pub use iter::IntoIter;
