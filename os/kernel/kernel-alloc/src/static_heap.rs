//! `.bss`-backed storage for the kernel's allocation domains.

use crate::{HeapError, KernelHeap, StaticArena};
use core::sync::atomic::{AtomicBool, Ordering};
use kernel_info::memory::{BOOT_ARENA_SIZE, KERNEL_HEAP_SIZE};

#[repr(C, align(16))]
struct HeapMem([u8; KERNEL_HEAP_SIZE]);

#[unsafe(link_section = ".bss.heap")]
static mut HEAP_MEM: HeapMem = HeapMem([0; KERNEL_HEAP_SIZE]);

/// Pre-heap domain for boot-time copies.
pub static BOOT_ARENA: StaticArena<BOOT_ARENA_SIZE> = StaticArena::new();

static HANDED_OUT: AtomicBool = AtomicBool::new(false);

/// Hand the static heap region to `heap`.
///
/// # Errors
/// See [`KernelHeap::activate`].
pub fn activate_static_heap(heap: &KernelHeap) -> Result<(), HeapError> {
    if HANDED_OUT.swap(true, Ordering::AcqRel) {
        return Err(HeapError::AlreadyActive);
    }

    // SAFETY: HEAP_MEM is referenced nowhere else and handed out only once.
    unsafe {
        let start = (&raw mut HEAP_MEM).cast::<u8>();
        heap.activate(start, KERNEL_HEAP_SIZE)
    }
}
