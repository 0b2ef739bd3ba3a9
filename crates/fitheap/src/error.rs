//! Error types for the `fitheap` crate.
//!
//! Recoverable allocation failures are reported through [`Error`]; conditions
//! the heap cannot recover from (a corrupt allocation header, a foreign
//! pointer handed to `free`) abort with a panic instead and never appear
//! here.

use std::fmt;

/// Errors that can occur when constructing or allocating from a
/// [`FixedHeap`](crate::FixedHeap).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The backing reservation for the heap could not be obtained from the
    /// host.
    ReservationFailed {
        /// The capacity that was requested, in bytes.
        capacity: usize,
    },

    /// The heap was constructed with a zero-byte capacity.
    ZeroCapacity,

    /// A zero-byte allocation was requested. Defined as a no-op; the heap
    /// state is unchanged.
    ZeroSizeRequest,

    /// No free block can hold the padded request. Raised both on plain
    /// exhaustion and when fragmentation leaves enough aggregate capacity
    /// but no single block large enough.
    HeapExhausted {
        /// The requested payload size in bytes.
        requested: usize,
        /// Free capacity remaining in the heap at the time of the request.
        available: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ReservationFailed { capacity } => {
                write!(f, "unable to reserve {capacity} bytes of backing storage")
            }
            Error::ZeroCapacity => {
                write!(f, "heap capacity must be nonzero")
            }
            Error::ZeroSizeRequest => {
                write!(f, "zero-byte allocation request")
            }
            Error::HeapExhausted {
                requested,
                available,
            } => {
                write!(
                    f,
                    "heap exhausted: requested {requested} bytes, {available} bytes free"
                )
            }
        }
    }
}

impl std::error::Error for Error {}

/// Result type for heap operations.
pub type Result<T> = std::result::Result<T, Error>;
