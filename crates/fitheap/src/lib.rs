//! `fitheap`: a fixed-capacity arena heap with best-fit placement.
//!
//! This crate serves allocation and release requests from a single
//! pre-reserved block of raw storage. It targets callers who want
//! deterministic, externally-bounded memory use instead of delegating to a
//! general-purpose allocator: embedded contexts, custom containers, or
//! studying allocator internals.
//!
//! # Architecture
//!
//! - [`FreeBlock`]: one contiguous run of unused bytes, with a pure merge
//!   operation and length-based ordering
//! - [`FixedHeap`]: owns the backing buffer, tracks free blocks, and
//!   implements allocate/release/query on top of them
//!
//! A `usize` header precedes every payload, recording the requested size so
//! release needs nothing but the pointer. [`padded_size`] is the true
//! footprint of an allocation and drives all capacity accounting.
//!
//! # Example
//!
//! ```
//! use fitheap::FixedHeap;
//!
//! let mut heap = FixedHeap::new(1024);
//!
//! let ptr = heap.alloc(128).unwrap();
//! unsafe {
//!     assert_eq!(heap.size_of(ptr), 128);
//!     heap.free(ptr);
//! }
//!
//! assert_eq!(heap.free_capacity(), heap.max_capacity());
//! ```

pub mod error;
pub mod free_block;
pub mod heap;

pub use error::{Error, Result};
pub use free_block::FreeBlock;
pub use heap::{FixedHeap, HeapStats, HEADER_SIZE, padded_size};
