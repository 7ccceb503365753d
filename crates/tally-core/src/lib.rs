//! Core types for the Tally workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the error taxonomy shared by the allocator and the containers, and
//! the [`GrowthPolicy`] that decides how buffers grow.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;

pub use config::GrowthPolicy;
pub use error::{AllocError, ArrayError, ConfigError};
