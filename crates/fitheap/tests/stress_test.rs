//! Stress tests for the heap engine.
//!
//! Heavy alloc/free churn with verification that payload bytes survive
//! neighboring operations, plus worst-case fragmentation patterns.

use fitheap::{Error, FixedHeap, padded_size};
use std::ptr::NonNull;

mod common;
use common::Rng;

fn fill(ptr: NonNull<u8>, size: usize, tag: u8) {
    for offset in 0..size {
        // SAFETY: the heap handed out `size` writable bytes at `ptr`.
        unsafe { ptr.as_ptr().add(offset).write(tag ^ (offset as u8)) };
    }
}

fn verify(ptr: NonNull<u8>, size: usize, tag: u8) {
    for offset in 0..size {
        // SAFETY: the allocation is still live and unchanged.
        let byte = unsafe { ptr.as_ptr().add(offset).read() };
        assert_eq!(byte, tag ^ (offset as u8), "payload corrupted at offset {offset}");
    }
}

#[test]
fn payloads_survive_heavy_churn() {
    let mut heap = FixedHeap::new(128 * 1024);
    let mut rng = Rng::new(0xdead_beef);
    let mut live: Vec<(NonNull<u8>, usize, u8)> = Vec::new();

    for round in 0..20_000u32 {
        if live.is_empty() || rng.chance(55) {
            let size = rng.size(768);
            if let Ok(ptr) = heap.alloc(size) {
                let tag = round as u8;
                fill(ptr, size, tag);
                live.push((ptr, size, tag));
            }
        } else {
            let index = rng.next() as usize % live.len();
            let (ptr, size, tag) = live.swap_remove(index);
            verify(ptr, size, tag);
            unsafe { heap.free(ptr) };
        }
    }

    for (ptr, size, tag) in live.drain(..) {
        verify(ptr, size, tag);
        unsafe { heap.free(ptr) };
    }

    let stats = heap.stats();
    assert_eq!(stats.free_capacity, stats.max_capacity);
    assert_eq!(stats.free_blocks, 1);
}

#[test]
fn sawtooth_fragmentation_recovers() {
    // Allocate a dense run, free every other block, then satisfy as many
    // small requests as the fragmented list allows.
    let payload = 56;
    let count = 128;
    let mut heap = FixedHeap::new(count * padded_size(payload));

    let ptrs: Vec<_> = (0..count).map(|_| heap.alloc(payload).unwrap()).collect();
    for &ptr in ptrs.iter().step_by(2) {
        unsafe { heap.free(ptr) };
    }

    // Each freed span fits a payload of exactly `payload` bytes again.
    let holes = count / 2;
    let refilled: Vec<_> = (0..holes).map(|_| heap.alloc(payload).unwrap()).collect();
    assert_eq!(heap.alloc(payload).unwrap_err(), Error::HeapExhausted {
        requested: payload,
        available: 0,
    });

    for &ptr in refilled.iter().chain(ptrs.iter().skip(1).step_by(2)) {
        unsafe { heap.free(ptr) };
    }
    assert_eq!(heap.stats().free_blocks, 1);
}

#[test]
fn repeated_full_cycles_do_not_leak_capacity() {
    let mut heap = FixedHeap::new(8 * 1024);

    for _ in 0..500 {
        let a = heap.alloc(1024).unwrap();
        let b = heap.alloc(2048).unwrap();
        let c = heap.alloc(512).unwrap();

        unsafe {
            heap.free(b);
            heap.free(a);
            heap.free(c);
        }

        assert_eq!(heap.free_capacity(), heap.max_capacity());
        assert_eq!(heap.stats().free_blocks, 1);
    }
}
