//! Local APIC in xAPIC mode, through its MMIO window in the direct map.

use crate::interrupts::SPURIOUS_VECTOR;
use kernel_info::memory::{LAPIC_EOI_OFFSET, LAPIC_ID_OFFSET, LAPIC_MMIO_BASE, phys_to_virt};

const IA32_APIC_BASE: u32 = 0x1B;
const APIC_EN: u64 = 1 << 11;

const SVR_OFFSET: u64 = 0xF0;
const LVT_TIMER_OFFSET: u64 = 0x320;
const TIMER_INITIAL_OFFSET: u64 = 0x380;
const TIMER_DIVIDE_OFFSET: u64 = 0x3E0;

const SVR_ENABLE: u32 = 1 << 8;
const LVT_PERIODIC: u32 = 1 << 17;
const DIVIDE_BY_16: u32 = 0b0011;

/// Initial count of the periodic timer; at divide-by-16 this is a few
/// hundred ticks per second on QEMU. Ticks are a coarse time source only.
const TIMER_INITIAL_COUNT: u32 = 100_000;

#[inline]
unsafe fn rdmsr(msr: u32) -> u64 {
    let lo: u32;
    let hi: u32;
    unsafe {
        core::arch::asm!(
            "rdmsr",
            in("ecx") msr,
            out("eax") lo,
            out("edx") hi,
            options(nomem, nostack)
        );
    }
    (u64::from(hi) << 32) | u64::from(lo)
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
unsafe fn wrmsr(msr: u32, val: u64) {
    let lo = (val & 0xFFFF_FFFF) as u32;
    let hi = (val >> 32) as u32;
    unsafe {
        core::arch::asm!(
            "wrmsr",
            in("ecx") msr,
            in("eax") lo,
            in("edx") hi,
            options(nostack)
        );
    }
}

#[inline]
fn register(offset: u64) -> *mut u32 {
    #[allow(clippy::cast_possible_truncation)]
    core::ptr::with_exposed_provenance_mut(phys_to_virt(LAPIC_MMIO_BASE + offset) as usize)
}

#[inline]
fn read(offset: u64) -> u32 {
    // SAFETY: the direct map covers the LAPIC window.
    unsafe { register(offset).read_volatile() }
}

#[inline]
fn write(offset: u64, value: u32) {
    // SAFETY: as for `read`.
    unsafe { register(offset).write_volatile(value) }
}

/// Hardware-enables the APIC and software-enables it with the spurious
/// vector.
///
/// # Safety
/// CPL0, once per core.
pub unsafe fn enable() {
    unsafe {
        let base = rdmsr(IA32_APIC_BASE);
        wrmsr(IA32_APIC_BASE, base | APIC_EN);
    }
    write(SVR_OFFSET, SVR_ENABLE | u32::from(SPURIOUS_VECTOR));
}

pub fn id() -> u32 {
    read(LAPIC_ID_OFFSET) >> 24
}

/// Periodic timer on `vector`.
pub fn start_timer(vector: u8) {
    write(TIMER_DIVIDE_OFFSET, DIVIDE_BY_16);
    write(LVT_TIMER_OFFSET, LVT_PERIODIC | u32::from(vector));
    write(TIMER_INITIAL_OFFSET, TIMER_INITIAL_COUNT);
    log::info!("lapic timer on vector {vector:#x}, initial count {TIMER_INITIAL_COUNT}");
}

pub fn end_of_interrupt() {
    write(LAPIC_EOI_OFFSET, 0);
}
