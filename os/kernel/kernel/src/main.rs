//! # Kernel entry point
//!
//! The loader jumps to [`_start_kernel`] with a [`KernelBootInfo`] pointer,
//! paging enabled, the direct map at `HHDM_BASE` and interrupts masked. From
//! there:
//!
//! ```text
//! _start_kernel ─► kernel_entry ─► Bootstrap::boot ─► run_mode ─► idle / halt
//! ```
//!
//! Secondary cores, once started by whatever brings them up, enter at
//! [`_start_secondary`] on their own stack.

#![no_std]
#![no_main]
#![allow(unsafe_code)]

extern crate alloc;

mod apic;
mod idt;
mod interrupts;
mod pic;
mod platform;

use crate::platform::{BRIDGE, X86Platform};
use kernel_alloc::KernelHeap;
use kernel_alloc::static_heap::BOOT_ARENA;
use kernel_bootstrap::{BootSlots, Bootstrap, ModeOutcome, run_mode};
use kernel_info::boot::KernelBootInfo;
use kernel_info::memory::KERNEL_STACK_SIZE;
use kernel_qemu::qemu_trace;
use log::LevelFilter;

#[global_allocator]
static HEAP: KernelHeap = KernelHeap::new();

static SLOTS: BootSlots = BootSlots::new();
static PLATFORM: X86Platform = X86Platform;
static BOOTSTRAP: Bootstrap<X86Platform> =
    Bootstrap::new(&PLATFORM, &SLOTS, &HEAP, &BOOT_ARENA, &BRIDGE);

/// 16-byte aligned stack
#[repr(align(16))]
struct Aligned<const N: usize>([u8; N]);

#[unsafe(link_section = ".bss.boot")]
#[unsafe(no_mangle)]
static mut BOOT_STACK: Aligned<KERNEL_STACK_SIZE> = Aligned([0; KERNEL_STACK_SIZE]);

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    qemu_trace!("kernel panic: {info}\n");
    halt()
}

/// Masks interrupts and stops this core for good.
pub fn halt() -> ! {
    loop {
        // SAFETY: CPL0.
        unsafe { core::arch::asm!("cli", "hlt", options(nomem, nostack)) };
    }
}

/// Sleeps between interrupts forever.
fn idle() -> ! {
    loop {
        // SAFETY: CPL0.
        unsafe { core::arch::asm!("hlt", options(nomem, nostack, preserves_flags)) };
    }
}

/// The kernel entry point.
///
/// # ABI
/// `sysv64`: the boot info pointer arrives in `RDI`.
///
/// # Naked function & Stack
/// Naked so the switch to [`BOOT_STACK`] happens before any Rust code
/// touches the stack; the loader's stack is not trusted beyond this point.
#[unsafe(no_mangle)]
#[unsafe(naked)]
pub extern "sysv64" fn _start_kernel(_boot_info: *const KernelBootInfo) -> ! {
    core::arch::naked_asm!(
        "cli",
        "lea rax, [rip + {stack_sym}]",
        "add rax, {stack_size}",
        "and rax, -16",
        "mov rsp, rax",
        // Fake return address so RSP % 16 == 8 at entry.
        "push 0",
        "xor rbp, rbp",
        "jmp {entry}",
        stack_sym = sym BOOT_STACK,
        stack_size = const KERNEL_STACK_SIZE,
        entry = sym kernel_entry,
    );
}

extern "sysv64" fn kernel_entry(info: *const KernelBootInfo) -> ! {
    #[cfg(feature = "qemu")]
    if kernel_qemu::QemuLogger::new(LevelFilter::Trace).init().is_err() {
        qemu_trace!("logger already installed\n");
    }
    log::set_max_level(LevelFilter::Info);

    // SAFETY: the loader hands over a valid block and keeps the image mapped.
    let ctx = match unsafe { BOOTSTRAP.boot(info) } {
        Ok(ctx) => ctx,
        Err(e) => {
            log::error!("boot failed: {e}");
            halt();
        }
    };

    let mode = ctx.config().mode;
    match run_mode(&ctx) {
        Ok(ModeOutcome::Entry(realm)) => {
            log::info!("entry realm {} finished: {:?}", realm.name(), realm.state());
        }
        Ok(ModeOutcome::SelfTest(report)) => {
            log::info!("selftest: {} passed, {} failed", report.passed, report.failed.len());
            for name in &report.failed {
                log::error!("selftest failed: {name}");
            }
        }
        Ok(ModeOutcome::Snapshot(entries)) => {
            for entry in &entries {
                match &entry.result {
                    Ok(statements) => {
                        log::info!("snapshot {}: {} bytes, {statements} statements", entry.path, entry.bytes);
                    }
                    Err(e) => log::warn!("snapshot {}: {e}", entry.path),
                }
            }
        }
        Err(e) => log::error!("{e}"),
    }

    if mode.is_terminal() {
        log::info!("{mode:?} done; halting");
        halt();
    }
    log::info!("entry returned; idling");
    idle()
}

/// Entry point for secondary core `core`. The caller provides the stack.
#[unsafe(no_mangle)]
pub extern "sysv64" fn _start_secondary(core: u32) -> ! {
    match BOOTSTRAP.boot_secondary(core) {
        Ok(ctx) => log::info!("core {} parked (apic {})", ctx.cpu.core, ctx.cpu.apic_id),
        Err(e) => log::error!("core {core}: {e}"),
    }
    halt()
}
