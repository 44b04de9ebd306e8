//! # Memory Layout

/// One mebibyte.
pub const MIB: usize = 1024 * 1024;

/// Direct map of all physical memory: `HHDM_BASE + pa`.
pub const HHDM_BASE: u64 = 0xffff_8880_0000_0000;

/// Where the kernel executes (VMA); consumed by `build.rs`.
pub const KERNEL_BASE: u64 = 0xffff_ffff_8000_0000;

/// Where the kernel image sits in physical memory (LMA); consumed by `build.rs`.
pub const PHYS_LOAD: u64 = 0x0010_0000;

/// Boot stack; the script interpreter recurses on it.
pub const KERNEL_STACK_SIZE: usize = 2 * MIB;

/// Largest boot image the locator accepts.
pub const MAX_BOOT_IMAGE_LEN: u64 = 128 * MIB as u64;

/// Bytes available to the pre-heap static arena.
pub const BOOT_ARENA_SIZE: usize = 16 * 1024;

/// Bytes backing the kernel heap once the allocator is activated.
pub const KERNEL_HEAP_SIZE: usize = 64 * MIB;

/// Physical base of the local APIC register window (xAPIC mode).
pub const LAPIC_MMIO_BASE: u64 = 0xFEE0_0000;

/// Offset of the local APIC ID register.
pub const LAPIC_ID_OFFSET: u64 = 0x20;

/// Offset of the local APIC end-of-interrupt register.
pub const LAPIC_EOI_OFFSET: u64 = 0xB0;

/// Capacity of the interrupt event buffer.
pub const EVENT_CAPACITY: usize = 256;

/// Cores the per-core bootstrap state has room for.
pub const MAX_CORES: usize = 16;

/// Translate a physical address into the direct map.
#[must_use]
pub const fn phys_to_virt(pa: u64) -> u64 {
    HHDM_BASE + pa
}

const _: () = {
    assert!(KERNEL_STACK_SIZE.is_multiple_of(4096));
    assert!(KERNEL_BASE > HHDM_BASE);
    assert!(KERNEL_BASE & ((1 << 21) - 1) == 0);
    assert!(KERNEL_HEAP_SIZE.is_multiple_of(16));
    assert!(EVENT_CAPACITY.is_power_of_two());
    assert!(MAX_CORES <= 64);
};
