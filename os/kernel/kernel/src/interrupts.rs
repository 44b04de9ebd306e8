//! Interrupt entry stubs and the Rust bodies behind them.
//!
//! Device vectors `0x20..=0x2F` (the remapped legacy PIC lines) and the
//! local APIC timer feed the interrupt bridge. CPU exceptions are fatal.

use crate::idt::Idt;
use crate::platform::{BRIDGE, Controller};
use crate::{apic, halt};
use kernel_events::ports::X86Ports;
use kernel_events::InterruptContext;

pub const DEVICE_VECTOR_BASE: u8 = 0x20;
pub const DEVICE_VECTOR_LAST: u8 = DEVICE_VECTOR_BASE + 15;
pub const KEYBOARD_VECTOR: u8 = DEVICE_VECTOR_BASE + 1;
pub const TIMER_VECTOR: u8 = 0xE0;
pub const SPURIOUS_VECTOR: u8 = 0xFF;

/// Saves the caller-saved registers, aligns the stack and calls
/// `extern "C" fn $handler(vector: u8)`.
macro_rules! stub {
    ($name:ident => $handler:path, $vector:literal) => {
        #[unsafe(naked)]
        extern "C" fn $name() {
            core::arch::naked_asm!(
                "cld",
                "push rax", "push rcx", "push rdx", "push rsi", "push rdi",
                "push r8", "push r9", "push r10", "push r11",
                "push rbp",
                "mov rbp, rsp",
                "and rsp, -16",
                "mov edi, {vector}",
                "call {handler}",
                "mov rsp, rbp",
                "pop rbp",
                "pop r11", "pop r10", "pop r9", "pop r8",
                "pop rdi", "pop rsi", "pop rdx", "pop rcx", "pop rax",
                "iretq",
                vector = const $vector,
                handler = sym $handler,
            );
        }
    };
}

macro_rules! stubs {
    ($table:ident => $handler:path: [$($name:ident = $vector:literal),* $(,)?]) => {
        $( stub!($name => $handler, $vector); )*
        const $table: &[(u8, extern "C" fn())] = &[$(($vector, $name)),*];
    };
}

stubs!(EXCEPTIONS => exception: [
    exception_00 = 0, exception_01 = 1, exception_02 = 2, exception_03 = 3,
    exception_04 = 4, exception_05 = 5, exception_06 = 6, exception_07 = 7,
    exception_08 = 8, exception_09 = 9, exception_10 = 10, exception_11 = 11,
    exception_12 = 12, exception_13 = 13, exception_14 = 14, exception_15 = 15,
    exception_16 = 16, exception_17 = 17, exception_18 = 18, exception_19 = 19,
    exception_20 = 20, exception_21 = 21, exception_22 = 22, exception_23 = 23,
    exception_24 = 24, exception_25 = 25, exception_26 = 26, exception_27 = 27,
    exception_28 = 28, exception_29 = 29, exception_30 = 30, exception_31 = 31,
]);

stubs!(DEVICES => device_interrupt: [
    device_20 = 0x20, device_21 = 0x21, device_22 = 0x22, device_23 = 0x23,
    device_24 = 0x24, device_25 = 0x25, device_26 = 0x26, device_27 = 0x27,
    device_28 = 0x28, device_29 = 0x29, device_2a = 0x2A, device_2b = 0x2B,
    device_2c = 0x2C, device_2d = 0x2D, device_2e = 0x2E, device_2f = 0x2F,
]);

stub!(timer_stub => timer_interrupt, 0xE0);
stub!(spurious_stub => spurious_interrupt, 0xFF);

const _: () = {
    assert!(DEVICES.len() == (DEVICE_VECTOR_LAST - DEVICE_VECTOR_BASE + 1) as usize);
    assert!(DEVICES[0].0 == DEVICE_VECTOR_BASE);
};

/// Fills in every gate the kernel uses.
pub fn register(idt: &mut Idt) {
    for &(vector, stub) in EXCEPTIONS.iter().chain(DEVICES) {
        idt[vector].set_handler(stub).present(true);
    }
    idt[TIMER_VECTOR].set_handler(timer_stub).present(true);
    idt[SPURIOUS_VECTOR].set_handler(spurious_stub).present(true);
}

extern "C" fn device_interrupt(vector: u8) {
    // SAFETY: reached only through an interrupt gate.
    let ctx = unsafe { InterruptContext::enter() };
    BRIDGE.handle_device_interrupt(&ctx, vector, &X86Ports, &Controller);
}

extern "C" fn timer_interrupt(_vector: u8) {
    // SAFETY: reached only through an interrupt gate.
    let ctx = unsafe { InterruptContext::enter() };
    BRIDGE.handle_timer_interrupt(&ctx, &Controller);
}

extern "C" fn spurious_interrupt(_vector: u8) {}

extern "C" fn exception(vector: u8) -> ! {
    log::error!(
        "CPU exception {vector} on apic {}; halting",
        apic::id()
    );
    halt()
}
