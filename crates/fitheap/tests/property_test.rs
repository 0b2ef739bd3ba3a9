//! Property-based tests for the heap engine.
//!
//! These tests drive the heap through long, deterministic alloc/free
//! sequences and check the conservation invariant after every single
//! operation: free capacity plus the padded sizes of all live allocations
//! must always equal max capacity.

use fitheap::{FixedHeap, HEADER_SIZE, padded_size};
use std::ptr::NonNull;

mod common;
use common::Rng;

/// Tracks every live allocation alongside the heap so the invariant can be
/// recomputed from the outside.
struct Model {
    heap: FixedHeap,
    live: Vec<(NonNull<u8>, usize)>,
}

impl Model {
    fn new(capacity: usize) -> Self {
        Model {
            heap: FixedHeap::new(capacity),
            live: Vec::new(),
        }
    }

    fn alloc(&mut self, size: usize) -> bool {
        match self.heap.alloc(size) {
            Ok(ptr) => {
                self.live.push((ptr, size));
                true
            }
            Err(_) => false,
        }
    }

    fn free_at(&mut self, index: usize) {
        let (ptr, _) = self.live.swap_remove(index);
        unsafe { self.heap.free(ptr) };
    }

    fn check(&self) {
        let allocated: usize = self.live.iter().map(|&(_, size)| padded_size(size)).sum();
        assert_eq!(
            self.heap.free_capacity() + allocated,
            self.heap.max_capacity(),
            "conservation violated with {} live allocations",
            self.live.len()
        );

        let stats = self.heap.stats();
        assert!(stats.largest_free_block <= stats.free_capacity);
        assert_eq!(stats.free_capacity, self.heap.free_capacity());
    }
}

// ============================================================================
// Conservation
// ============================================================================

#[test]
fn conservation_holds_under_random_churn() {
    let mut model = Model::new(64 * 1024);
    let mut rng = Rng::new(0x5eed);

    for _ in 0..5_000 {
        if model.live.is_empty() || rng.chance(60) {
            model.alloc(rng.size(512));
        } else {
            let index = rng.next() as usize % model.live.len();
            model.free_at(index);
        }
        model.check();
    }

    // Drain everything; the heap must return to a single spanning block.
    while !model.live.is_empty() {
        model.free_at(model.live.len() - 1);
        model.check();
    }

    let stats = model.heap.stats();
    assert_eq!(stats.free_capacity, stats.max_capacity);
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.largest_free_block, stats.max_capacity);
}

#[test]
fn conservation_holds_when_requests_fail() {
    let mut model = Model::new(256);
    let mut rng = Rng::new(42);

    // Capacity is tiny, so many of these requests must fail; failures must
    // leave the heap untouched.
    for _ in 0..1_000 {
        if rng.chance(70) {
            model.alloc(rng.size(128));
        } else if !model.live.is_empty() {
            let index = rng.next() as usize % model.live.len();
            model.free_at(index);
        }
        model.check();
    }
}

// ============================================================================
// Free-list structure
// ============================================================================

#[test]
fn interleaved_frees_never_leave_adjacent_blocks() {
    // Free every allocation in a scattered order; at each step the free
    // list length can only tell us so much, but at the end full coalescing
    // must leave exactly one block.
    let payload = 24;
    let count = 32;
    let mut heap = FixedHeap::new(count * padded_size(payload));

    let ptrs: Vec<_> = (0..count).map(|_| heap.alloc(payload).unwrap()).collect();

    // Even indices first, then odd: the odd frees each close a gap.
    for (index, &ptr) in ptrs.iter().enumerate() {
        if index % 2 == 0 {
            unsafe { heap.free(ptr) };
        }
    }
    for (index, &ptr) in ptrs.iter().enumerate() {
        if index % 2 == 1 {
            unsafe { heap.free(ptr) };
        }
    }

    let stats = heap.stats();
    assert_eq!(stats.free_blocks, 1);
    assert_eq!(stats.largest_free_block, heap.max_capacity());
}

#[test]
fn exact_fit_reuse_lands_inside_the_freed_span() {
    let mut heap = FixedHeap::new(1024);

    let victim = heap.alloc(96).unwrap();
    let _pin = heap.alloc(16).unwrap();

    let span_start = victim.as_ptr() as usize - HEADER_SIZE;
    let span_end = span_start + padded_size(96);

    unsafe { heap.free(victim) };

    let reused = heap.alloc(96).unwrap();
    let addr = reused.as_ptr() as usize;
    assert!(addr >= span_start && addr < span_end);
}
