//! Fixed-capacity best-fit heap engine.
//!
//! [`FixedHeap`] serves allocation and release requests from a single
//! pre-reserved block of raw storage. The engine provides:
//!
//! - **Deterministic footprint**: one bulk reservation at construction, no
//!   growth afterwards
//! - **Best-fit placement**: the smallest free block able to satisfy a
//!   request is always chosen
//! - **Free-block coalescing**: adjacent free spans are rejoined on release
//!   to counter fragmentation
//! - **Self-describing allocations**: a size header precedes every payload,
//!   so release needs nothing but the pointer
//!
//! # Lifecycle
//!
//! A heap is either *live* or *destroyed*. [`FixedHeap::destroy`] returns
//! the backing storage to the host and is idempotent; dropping the heap
//! destroys it as well, so the reservation is never leaked on any exit
//! path. After destruction, allocation fails through the capacity check and
//! handing old pointers back to the heap panics.
//!
//! # Ownership
//!
//! The heap exclusively owns its backing buffer. There is deliberately no
//! way to clone or copy a [`FixedHeap`]: duplicating the owning handle would
//! produce two owners of the same memory. Pointers returned by
//! [`FixedHeap::alloc`] are non-owning views whose lifetime is bounded by
//! the heap's own; dereferencing one after [`FixedHeap::destroy`] is
//! undefined behavior.
//!
//! # Example
//!
//! ```
//! use fitheap::FixedHeap;
//!
//! let mut heap = FixedHeap::new(4096);
//! let ptr = heap.alloc(64).unwrap();
//!
//! unsafe {
//!     ptr.as_ptr().write(0xAB);
//!     assert_eq!(heap.size_of(ptr), 64);
//!     heap.free(ptr);
//! }
//! assert_eq!(heap.free_capacity(), heap.max_capacity());
//! ```

use std::alloc::{self, Layout};
use std::mem;
use std::ptr::NonNull;

use fitheap_log::{debug, error, trace};

use crate::error::{Error, Result};
use crate::free_block::FreeBlock;

/// Size of the allocation header in bytes.
///
/// Every payload is preceded by a `usize` recording the originally
/// requested payload size. This header is the only metadata that survives
/// between allocation and release.
pub const HEADER_SIZE: usize = mem::size_of::<usize>();

/// Alignment of the backing reservation.
const BUFFER_ALIGNMENT: usize = 8;

/// Free-list slots reserved up front. Re-allocation of the list only
/// happens past this many disjoint free spans, which takes heavy
/// fragmentation.
const DEFAULT_FREE_LIST_CAPACITY: usize = 128;

/// True footprint of an allocation of `payload_size` requested bytes:
/// header plus payload. Every capacity accounting step uses this padded
/// size, never the raw request.
#[inline]
#[must_use]
pub const fn padded_size(payload_size: usize) -> usize {
    HEADER_SIZE + payload_size
}

/// Point-in-time heap statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    /// Bytes not currently consumed by padded allocations.
    pub free_capacity: usize,
    /// Total reservation size in bytes.
    pub max_capacity: usize,
    /// Number of disjoint free spans being tracked.
    pub free_blocks: usize,
    /// Size of the largest tracked free span in bytes.
    pub largest_free_block: usize,
}

/// A fixed-capacity arena heap with best-fit placement.
///
/// All operations run to completion on the caller's thread; there is no
/// internal locking, and mutation goes through `&mut self`. The heap may be
/// moved to another thread, but concurrent access requires external
/// synchronization.
#[derive(Debug)]
pub struct FixedHeap {
    /// Base of the backing reservation; `None` once destroyed.
    base: Option<NonNull<u8>>,
    /// Layout of the reservation, kept for the matching release.
    layout: Layout,
    /// Unsorted collection of free spans. Searched linearly by the
    /// best-fit scan.
    free_list: Vec<FreeBlock>,
    /// Bytes not consumed by padded allocations. Mirrors the free list but
    /// is tracked independently for O(1) queries.
    free_capacity: usize,
    /// Total reservation size, fixed at construction.
    max_capacity: usize,
}

// SAFETY: the heap exclusively owns its reservation and every pointer into
// it; moving the heap to another thread moves the only handle.
unsafe impl Send for FixedHeap {}

impl FixedHeap {
    /// Creates a heap backed by a fresh reservation of `max_capacity`
    /// bytes.
    ///
    /// The reservation is obtained eagerly; a heap is never constructed in
    /// a partial state. The free list starts as one block spanning the
    /// whole buffer.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroCapacity`] if `max_capacity` is zero
    /// - [`Error::ReservationFailed`] if the host cannot provide the
    ///   requested bytes
    pub fn try_new(max_capacity: usize) -> Result<Self> {
        if max_capacity == 0 {
            return Err(Error::ZeroCapacity);
        }

        let layout = Layout::from_size_align(max_capacity, BUFFER_ALIGNMENT)
            .map_err(|_| Error::ReservationFailed {
                capacity: max_capacity,
            })?;

        // SAFETY: `layout` has nonzero size, checked above.
        let base = unsafe { alloc::alloc(layout) };
        let base = NonNull::new(base).ok_or(Error::ReservationFailed {
            capacity: max_capacity,
        })?;

        let mut free_list = Vec::with_capacity(DEFAULT_FREE_LIST_CAPACITY);
        free_list.push(FreeBlock::new(base, max_capacity));

        debug!("reserved {max_capacity} byte heap at {:p}", base.as_ptr());

        Ok(Self {
            base: Some(base),
            layout,
            free_list,
            free_capacity: max_capacity,
            max_capacity,
        })
    }

    /// Creates a heap backed by a fresh reservation of `max_capacity`
    /// bytes, treating reservation failure as fatal.
    ///
    /// A caller requesting more memory than the host can provide cannot be
    /// serviced and no partial heap is meaningful, so this constructor
    /// aborts instead of reporting. Use [`FixedHeap::try_new`] to handle
    /// the failure.
    ///
    /// # Panics
    ///
    /// Panics if the backing reservation cannot be obtained or
    /// `max_capacity` is zero.
    #[must_use]
    pub fn new(max_capacity: usize) -> Self {
        Self::try_new(max_capacity).expect("Failed to reserve heap backing storage")
    }

    /// Allocates `payload_size` bytes using best-fit placement.
    ///
    /// Scans every free block and carves the request out of the smallest
    /// one that can hold the header plus the payload, ties broken by
    /// first encountered. The returned pointer addresses the payload; the
    /// header before it is opaque to the caller.
    ///
    /// # Errors
    ///
    /// - [`Error::ZeroSizeRequest`] for a zero-byte request; no state
    ///   changes
    /// - [`Error::HeapExhausted`] when the padded request exceeds free
    ///   capacity, or when fragmentation leaves no single block large
    ///   enough even though aggregate capacity would suffice
    pub fn alloc(&mut self, payload_size: usize) -> Result<NonNull<u8>> {
        if payload_size == 0 {
            return Err(Error::ZeroSizeRequest);
        }

        let padded = match payload_size.checked_add(HEADER_SIZE) {
            Some(padded) if padded <= self.free_capacity => padded,
            _ => {
                trace!(
                    "request for {payload_size} bytes exceeds {} free",
                    self.free_capacity
                );
                return Err(Error::HeapExhausted {
                    requested: payload_size,
                    available: self.free_capacity,
                });
            }
        };

        // Best-fit: smallest block that still fits. The strict comparison
        // leaves the first-encountered block as the winner on ties.
        let mut best_index = None;
        let mut best_len = usize::MAX;
        for (index, block) in self.free_list.iter().enumerate() {
            if block.fits(payload_size) && block.len() < best_len {
                best_index = Some(index);
                best_len = block.len();
            }
        }

        let Some(index) = best_index else {
            trace!("no single free block holds {payload_size} bytes");
            return Err(Error::HeapExhausted {
                requested: payload_size,
                available: self.free_capacity,
            });
        };

        let block = self.free_list[index];
        let header = block.start();

        // SAFETY: `block` spans at least `padded` bytes inside the live
        // reservation, so the header write and the payload pointer both
        // stay in bounds. The header can land on any byte offset, hence
        // the unaligned write.
        let payload = unsafe {
            header.as_ptr().cast::<usize>().write_unaligned(payload_size);
            NonNull::new_unchecked(header.as_ptr().add(HEADER_SIZE))
        };

        let remaining = block.len() - padded;
        if remaining == 0 {
            // Fully consumed blocks leave the collection immediately.
            self.free_list.remove(index);
        } else {
            // SAFETY: `padded < block.len()`, so the shrunken start is
            // still inside the block's span.
            let rest = unsafe { NonNull::new_unchecked(header.as_ptr().add(padded)) };
            self.free_list[index] = FreeBlock::new(rest, remaining);
        }

        self.free_capacity -= padded;
        Ok(payload)
    }

    /// Releases an allocation, recovering its size from the header before
    /// `ptr` and rejoining the freed span with any adjacent free blocks.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`FixedHeap::alloc`] on this heap
    /// and must not have been freed already.
    ///
    /// # Panics
    ///
    /// Panics when the heap is destroyed, when `ptr` does not point into
    /// the reservation, or when the recovered size is zero or exceeds the
    /// bytes currently allocated. The header is the only source of truth,
    /// so these conditions indicate corruption or a foreign pointer and
    /// have no recovery path.
    pub unsafe fn free(&mut self, ptr: NonNull<u8>) {
        let Some(base) = self.base else {
            error!("free called on a destroyed heap");
            panic!("heap already destroyed");
        };

        let base_addr = base.addr().get();
        let end_addr = base_addr + self.max_capacity;
        let addr = ptr.addr().get();
        if addr < base_addr + HEADER_SIZE || addr > end_addr {
            error!("pointer {:p} does not belong to this heap", ptr.as_ptr());
            panic!("pointer released to a heap that does not own it");
        }

        // SAFETY: the header sits immediately before the payload, fully
        // inside the reservation per the bounds check above.
        let payload_size =
            unsafe { ptr.as_ptr().sub(HEADER_SIZE).cast::<usize>().read_unaligned() };

        let allocated = self.max_capacity - self.free_capacity;
        let span_valid = payload_size != 0
            && payload_size
                .checked_add(HEADER_SIZE)
                .is_some_and(|padded| padded <= allocated && addr - HEADER_SIZE + padded <= end_addr);
        if !span_valid {
            error!(
                "corrupt allocation header at {:p}: recorded size {payload_size}",
                ptr.as_ptr()
            );
            panic!("corrupt allocation header: recorded size {payload_size}");
        }

        let padded = padded_size(payload_size);
        self.free_capacity += padded;

        // The released span starts at the header, not the payload.
        // SAFETY: `addr - HEADER_SIZE >= base_addr` per the bounds check.
        let span_start = unsafe { NonNull::new_unchecked(ptr.as_ptr().sub(HEADER_SIZE)) };
        self.insert_free_span(FreeBlock::new(span_start, padded));

        trace!("released {payload_size} byte block at {:p}", ptr.as_ptr());
    }

    /// Rejoins a released span with its free neighbors and stores the
    /// result.
    ///
    /// A release can close the gap between two existing neighbors at once,
    /// and each merge combines exactly two blocks, so up to two merges are
    /// needed. The first scan stops at the first block whose size actually
    /// changes under [`FreeBlock::try_merge`]; that entry is replaced by
    /// the combined span, and a second scan gives the combined span one
    /// more chance to absorb a neighbor on its other side.
    fn insert_free_span(&mut self, released: FreeBlock) {
        let first = self
            .free_list
            .iter()
            .position(|block| block.try_merge(&released).len() != block.len());

        let Some(index) = first else {
            // Disjoint from every tracked span.
            self.free_list.push(released);
            return;
        };

        let merged = self.free_list.remove(index).try_merge(&released);

        let second = self
            .free_list
            .iter()
            .position(|block| block.try_merge(&merged).len() != block.len());

        match second {
            Some(index) => {
                let combined = self.free_list.remove(index).try_merge(&merged);
                self.free_list.push(combined);
            }
            None => self.free_list.push(merged),
        }
    }

    /// Reads the recorded payload size of an allocation without mutating
    /// any state.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by [`FixedHeap::alloc`] on this heap
    /// and must not have been freed.
    ///
    /// # Panics
    ///
    /// Panics when the heap is destroyed or `ptr` does not point into the
    /// reservation.
    #[must_use]
    pub unsafe fn size_of(&self, ptr: NonNull<u8>) -> usize {
        let Some(base) = self.base else {
            error!("size_of called on a destroyed heap");
            panic!("heap already destroyed");
        };

        let base_addr = base.addr().get();
        let addr = ptr.addr().get();
        if addr < base_addr + HEADER_SIZE || addr > base_addr + self.max_capacity {
            error!("pointer {:p} does not belong to this heap", ptr.as_ptr());
            panic!("pointer queried on a heap that does not own it");
        }

        // SAFETY: the header sits immediately before the payload, fully
        // inside the reservation per the bounds check above.
        unsafe { ptr.as_ptr().sub(HEADER_SIZE).cast::<usize>().read_unaligned() }
    }

    /// Bytes not currently consumed by padded allocations. O(1).
    #[must_use]
    pub fn free_capacity(&self) -> usize {
        self.free_capacity
    }

    /// Total reservation size in bytes. O(1).
    #[must_use]
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Returns point-in-time statistics for this heap.
    #[must_use]
    pub fn stats(&self) -> HeapStats {
        HeapStats {
            free_capacity: self.free_capacity,
            max_capacity: self.max_capacity,
            free_blocks: self.free_list.len(),
            largest_free_block: self
                .free_list
                .iter()
                .map(FreeBlock::len)
                .max()
                .unwrap_or(0),
        }
    }

    /// Returns the backing storage to the host and disables the heap.
    ///
    /// Both capacities drop to zero and the free list is cleared, so every
    /// later allocation fails through the capacity check. Idempotent:
    /// calling it again is a safe no-op. Dropping the heap destroys it as
    /// well.
    ///
    /// Pointers obtained from [`FixedHeap::alloc`] must not be
    /// dereferenced after this call.
    pub fn destroy(&mut self) {
        let Some(base) = self.base.take() else {
            return;
        };

        debug!("destroying heap at {:p}", base.as_ptr());

        // SAFETY: `base` came from `alloc::alloc` with `self.layout`, and
        // `take()` above guarantees it is released exactly once.
        unsafe { alloc::dealloc(base.as_ptr(), self.layout) };

        self.free_capacity = 0;
        self.max_capacity = 0;
        self.free_list.clear();
    }
}

impl Drop for FixedHeap {
    fn drop(&mut self) {
        self.destroy();
    }
}
