//! Error types for the Tally workspace.
//!
//! Organized by subsystem: allocation ([`AllocError`]), container
//! operations ([`ArrayError`]) and configuration ([`ConfigError`]).

use std::error::Error;
use std::fmt;

/// Errors from the tracked allocator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AllocError {
    /// The requested byte count overflowed `usize` or exceeds `isize::MAX`.
    CapacityOverflow {
        /// Size of one element in bytes.
        elem_size: usize,
        /// Number of elements requested.
        count: usize,
    },
    /// A zero-byte block was requested. Zero-sized buffers never reach
    /// the allocator.
    ZeroSized,
    /// The backend allocator returned null.
    OutOfMemory {
        /// Number of bytes requested.
        bytes: usize,
    },
    /// The address is not an outstanding block of this allocator
    /// (never allocated here, or already freed).
    UnknownBlock {
        /// The offending address.
        addr: usize,
    },
}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityOverflow { elem_size, count } => {
                write!(
                    f,
                    "capacity overflow: {count} elements of {elem_size} bytes"
                )
            }
            Self::ZeroSized => write!(f, "zero-sized allocation requested"),
            Self::OutOfMemory { bytes } => {
                write!(f, "out of memory: backend refused {bytes} bytes")
            }
            Self::UnknownBlock { addr } => {
                write!(f, "block {addr:#x} is not owned by this allocator")
            }
        }
    }
}

impl Error for AllocError {}

/// Errors from dynamic array operations.
///
/// Every failing operation leaves the array exactly as it was before
/// the call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArrayError {
    /// Growing the buffer failed.
    Alloc(AllocError),
    /// An index was outside the valid range for the operation
    /// (`index <= len` for insertion, `index < len` for removal).
    IndexOutOfRange {
        /// The rejected index.
        index: usize,
        /// Length of the array at the time of the call.
        len: usize,
    },
    /// `reserve` was asked for a capacity that does not exceed the
    /// current one. Reserving never shrinks.
    ReserveNotGrowing {
        /// The requested capacity.
        requested: usize,
        /// The capacity at the time of the call.
        capacity: usize,
    },
    /// The operation exists in the API but is not supported.
    Unsupported {
        /// Name of the unsupported operation.
        operation: &'static str,
    },
}

impl fmt::Display for ArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alloc(e) => write!(f, "allocation failed: {e}"),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::ReserveNotGrowing {
                requested,
                capacity,
            } => {
                write!(
                    f,
                    "cannot reserve {requested} slots: capacity is already {capacity}"
                )
            }
            Self::Unsupported { operation } => {
                write!(f, "operation '{operation}' is not supported")
            }
        }
    }
}

impl Error for ArrayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Alloc(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllocError> for ArrayError {
    fn from(e: AllocError) -> Self {
        Self::Alloc(e)
    }
}

/// Errors detected when validating a [`GrowthPolicy`](crate::GrowthPolicy).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// The initial capacity is zero.
    ZeroInitialCapacity,
    /// The growth factor does not exceed one, or its denominator is zero.
    InvalidGrowthFactor {
        /// Numerator of the rejected factor.
        numerator: usize,
        /// Denominator of the rejected factor.
        denominator: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroInitialCapacity => write!(f, "initial capacity must be at least 1"),
            Self::InvalidGrowthFactor {
                numerator,
                denominator,
            } => {
                write!(
                    f,
                    "growth factor {numerator}/{denominator} must be greater than 1"
                )
            }
        }
    }
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_error_chains_alloc_source() {
        let err = ArrayError::from(AllocError::OutOfMemory { bytes: 64 });
        let source = err.source().expect("alloc errors carry a source");
        assert_eq!(source.to_string(), "out of memory: backend refused 64 bytes");
    }

    #[test]
    fn index_error_has_no_source() {
        let err = ArrayError::IndexOutOfRange { index: 4, len: 3 };
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "index 4 out of range for length 3");
    }

    #[test]
    fn unknown_block_formats_hex_address() {
        let err = AllocError::UnknownBlock { addr: 0x1000 };
        assert_eq!(err.to_string(), "block 0x1000 is not owned by this allocator");
    }
}
