//! The real machine behind [`Platform`]: legacy PIC for devices, local APIC
//! timer for ticks, the static heap region.

use crate::interrupts::{DEVICE_VECTOR_BASE, DEVICE_VECTOR_LAST, KEYBOARD_VECTOR, TIMER_VECTOR};
use crate::{apic, idt, interrupts, pic};
use alloc::boxed::Box;
use kernel_alloc::static_heap::activate_static_heap;
use kernel_alloc::{HeapError, KernelHeap};
use kernel_bootstrap::{BootServices, CpuDescriptor, InterruptSetup, Platform};
use kernel_events::ports::X86Ports;
use kernel_events::{InterruptBridge, InterruptController, PortIo};
use kernel_sync::irq;

/// PS/2 controller data port; the keyboard's scan code sits here on IRQ 1.
const KEYBOARD_DATA_PORT: u16 = 0x60;

pub static BRIDGE: InterruptBridge = InterruptBridge::new();

/// PIC for device vectors, local APIC for the timer.
pub struct Controller;

impl InterruptController for Controller {
    fn acknowledge(&self, vector: u8) {
        if (DEVICE_VECTOR_BASE..=DEVICE_VECTOR_LAST).contains(&vector) {
            pic::end_of_interrupt(vector - DEVICE_VECTOR_BASE);
        }
    }

    fn end_of_interrupt(&self) {
        apic::end_of_interrupt();
    }
}

fn ticks() -> u64 {
    BRIDGE.ticks().read()
}

pub struct X86Platform;

impl Platform for X86Platform {
    fn boot_services(&self) -> BootServices {
        BootServices {
            console: "qemu debugcon 0x402",
        }
    }

    fn mask_interrupts(&self) {
        // SAFETY: CPL0.
        unsafe { irq::mask() }
    }

    fn init_interrupts(&self, bridge: &'static InterruptBridge) -> InterruptSetup {
        // SAFETY: the boot stage masks interrupts before this runs.
        unsafe {
            idt::install(interrupts::register);
            pic::remap(DEVICE_VECTOR_BASE, 1 << (KEYBOARD_VECTOR - DEVICE_VECTOR_BASE));
        }
        bridge.set_payload_port(KEYBOARD_VECTOR, Some(KEYBOARD_DATA_PORT));

        #[cfg(feature = "qemu")]
        kernel_qemu::QemuLogger::set_clock(ticks);

        InterruptSetup {
            timer_vector: TIMER_VECTOR,
            device_vectors: (DEVICE_VECTOR_BASE, DEVICE_VECTOR_LAST),
        }
    }

    fn activate_heap(&self, heap: &KernelHeap) -> Result<(), HeapError> {
        activate_static_heap(heap)
    }

    fn init_cpu(&self, core: u32) -> CpuDescriptor {
        // SAFETY: CPL0, interrupts masked, once per core.
        unsafe {
            if core != 0 && !idt::load_installed() {
                log::warn!("core {core}: no interrupt table yet");
            }
            apic::enable();
        }
        if core == 0 {
            apic::start_timer(TIMER_VECTOR);
        }
        CpuDescriptor {
            core,
            apic_id: apic::id(),
        }
    }

    fn ports(&self) -> Box<dyn PortIo> {
        Box::new(X86Ports)
    }

    fn enable_interrupts(&self) {
        log::debug!("interrupts on at tick {}", ticks());
        // SAFETY: the interrupt table is loaded.
        unsafe { irq::unmask() }
    }
}
