//! Demonstration driver: build a heap, fill an allocation with a times
//! table, read it back, and print heap status along the way.
//!
//! Run with `cargo run --example timestable`. Set `FITHEAP_LOG=debug` to
//! watch the heap's lifecycle logging.

use fitheap::{FixedHeap, HEADER_SIZE};
use std::mem;
use std::process;

fn print_status(heap: &FixedHeap) {
    let stats = heap.stats();
    println!("Remaining capacity: {} bytes", stats.free_capacity);
    println!("Max capacity: {} bytes", stats.max_capacity);
    println!("Free blocks: {}\n", stats.free_blocks);
}

fn main() {
    let entries = 4000usize;

    // Room for one i32 table plus its allocation header, nothing more.
    let mut heap = FixedHeap::new(entries * mem::size_of::<i32>() + HEADER_SIZE);
    print_status(&heap);

    let Ok(ptr) = heap.alloc(entries * mem::size_of::<i32>()) else {
        eprintln!("memory allocation unsuccessful");
        process::exit(1);
    };
    let table = ptr.cast::<i32>();

    // SAFETY: the heap handed out `entries * size_of::<i32>()` writable
    // bytes, and the payload is 8-byte aligned by construction.
    unsafe {
        for index in 0..entries {
            table.as_ptr().add(index).write(2 * index as i32);
        }

        for index in 0..entries {
            println!("2x{index} = {}", table.as_ptr().add(index).read());
        }
    }

    print_status(&heap);

    unsafe { heap.free(ptr) };
    print_status(&heap);
}
