#![allow(dead_code)]

use kernel_alloc::{HeapError, KernelHeap, StaticArena};
use kernel_bootstrap::{
    BootError, BootServices, BootSlots, Bootstrap, CpuDescriptor, InterruptSetup, KernelContext,
    Platform,
};
use kernel_events::{InterruptBridge, PortIo};
use kernel_info::boot::{BOOT_INFO_MAGIC, KernelBootInfo, ModuleEntry};
use kernel_info::memory::BOOT_ARENA_SIZE;
use packer_abi::bundle::BundleBuilder;
use std::sync::Mutex;

pub const KEYBOARD_VECTOR: u8 = 0x21;
pub const KEYBOARD_PORT: u16 = 0x60;

fn leak<T>(value: T) -> &'static T {
    Box::leak(Box::new(value))
}

/// Records every hardware hook in call order.
#[derive(Default)]
pub struct FakePlatform {
    pub calls: Mutex<Vec<String>>,
    /// Claim success without handing the heap any memory.
    pub skip_heap: bool,
}

impl FakePlatform {
    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

struct NoPorts;

impl PortIo for NoPorts {
    unsafe fn inb(&self, _port: u16) -> u8 {
        0xFF
    }

    unsafe fn outb(&self, _port: u16, _value: u8) {}
}

impl Platform for FakePlatform {
    fn phys_offset(&self) -> u64 {
        0
    }

    fn boot_services(&self) -> BootServices {
        self.record("boot services");
        BootServices { console: "test" }
    }

    fn mask_interrupts(&self) {
        self.record("mask");
    }

    fn init_interrupts(&self, bridge: &'static InterruptBridge) -> InterruptSetup {
        self.record("interrupts");
        bridge.set_payload_port(KEYBOARD_VECTOR, Some(KEYBOARD_PORT));
        InterruptSetup {
            timer_vector: 0xE0,
            device_vectors: (0x20, 0x2F),
        }
    }

    fn activate_heap(&self, heap: &KernelHeap) -> Result<(), HeapError> {
        self.record("heap");
        if self.skip_heap {
            return Ok(());
        }
        let region: &'static mut [u8] = Vec::leak(vec![0; 64 * 1024]);
        unsafe { heap.activate(region.as_mut_ptr(), region.len()) }
    }

    fn init_cpu(&self, core: u32) -> CpuDescriptor {
        self.record(format!("cpu {core}"));
        CpuDescriptor {
            core,
            apic_id: core + 10,
        }
    }

    fn ports(&self) -> Box<dyn PortIo> {
        self.record("ports");
        Box::new(NoPorts)
    }

    fn enable_interrupts(&self) {
        self.record("enable");
    }
}

/// Parameter block and module table, at host addresses.
pub struct BootBlock {
    pub info: KernelBootInfo,
    modules: [ModuleEntry; 1],
}

fn addr<T: ?Sized>(p: *const T) -> u64 {
    p.cast::<u8>().expose_provenance() as u64
}

pub fn boot_block(image: &'static [u8], cmdline: &'static str) -> &'static BootBlock {
    let block: &'static mut BootBlock = Box::leak(Box::new(BootBlock {
        info: KernelBootInfo {
            magic: BOOT_INFO_MAGIC,
            module_count: 1,
            module_table: 0,
            cmdline_ptr: addr(cmdline.as_ptr()),
            cmdline_len: cmdline.len() as u64,
        },
        modules: [ModuleEntry {
            start: addr(image.as_ptr()),
            end: addr(image.as_ptr()) + image.len() as u64,
        }],
    }));
    block.info.module_table = addr(block.modules.as_ptr());
    block
}

pub fn image(files: &[(&str, &str)]) -> &'static [u8] {
    let mut builder = BundleBuilder::new();
    for (path, contents) in files {
        builder.add(path, contents.as_bytes().to_vec());
    }
    Vec::leak(builder.finish())
}

/// A fresh set of kernel statics around a fake platform.
pub struct Machine {
    pub platform: &'static FakePlatform,
    pub slots: &'static BootSlots,
    pub heap: &'static KernelHeap,
    pub bridge: &'static InterruptBridge,
    pub bootstrap: Bootstrap<FakePlatform>,
}

impl Machine {
    pub fn new(platform: FakePlatform) -> Self {
        let platform = leak(platform);
        let slots = leak(BootSlots::new());
        let heap = leak(KernelHeap::new());
        let arena = leak(StaticArena::<BOOT_ARENA_SIZE>::new());
        let bridge = leak(InterruptBridge::new());
        Self {
            platform,
            slots,
            heap,
            bridge,
            bootstrap: Bootstrap::new(platform, slots, heap, arena, bridge),
        }
    }

    pub fn boot(&self, files: &[(&str, &str)], cmdline: &'static str) -> Result<KernelContext, BootError> {
        let block = boot_block(image(files), cmdline);
        unsafe { self.bootstrap.boot(&raw const block.info) }
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(FakePlatform::default())
    }
}
