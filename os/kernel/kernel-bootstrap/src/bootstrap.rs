//! Bringing a core from its entry point to a usable [`KernelContext`].

use crate::components::{
    AllocatorState, BootImageReader, BootParams, BootServices, CpuDescriptor, InterruptSetup,
    KeyStore, MemoryManager, SCRIPT_TARGET, TraceSink,
};
use crate::error::BootError;
use crate::locator::Locator;
use crate::slots::BootSlots;
use crate::stage::Sequencer;
use alloc::boxed::Box;
use alloc::rc::Rc;
use kernel_alloc::{HeapError, KernelHeap, StaticArena};
use kernel_events::{InterruptBridge, PortIo};
use kernel_info::boot::KernelBootInfo;
use kernel_info::cmdline::KernelConfig;
use kernel_info::memory::{BOOT_ARENA_SIZE, HHDM_BASE};
use kernel_realm::{RealmConfig, RealmManager, Services};

/// The hardware-facing half of boot.
///
/// The kernel binary implements this for the real machine; tests use fakes.
pub trait Platform {
    /// Where physical memory is mapped while the boot parameters are read.
    fn phys_offset(&self) -> u64 {
        HHDM_BASE
    }

    fn boot_services(&self) -> BootServices;

    /// Sets up the kernel address space.
    fn init_address_space(&self) -> MemoryManager {
        MemoryManager::new(self.phys_offset())
    }

    /// Masks maskable interrupts on the current core.
    fn mask_interrupts(&self);

    /// Installs the interrupt tables so device and timer interrupts reach
    /// `bridge`, then programs the interrupt controller.
    fn init_interrupts(&self, bridge: &'static InterruptBridge) -> InterruptSetup;

    /// Gives `heap` its backing memory. Called once, on the boot core.
    ///
    /// # Errors
    /// Whatever [`KernelHeap::activate`] reports.
    fn activate_heap(&self, heap: &KernelHeap) -> Result<(), HeapError>;

    /// Per-core CPU setup.
    fn init_cpu(&self, core: u32) -> CpuDescriptor;

    /// Port I/O handed to the realms' `inb`/`outb`.
    fn ports(&self) -> Box<dyn PortIo>;

    /// Unmasks interrupts once the core is ready for them.
    fn enable_interrupts(&self);
}

/// Everything the boot core constructed, in construction order.
#[derive(Debug, Copy, Clone)]
pub struct KernelContext {
    pub boot_services: &'static BootServices,
    pub params: &'static BootParams,
    pub memory: &'static MemoryManager,
    pub interrupts: &'static InterruptSetup,
    pub allocator: &'static AllocatorState,
    pub keys: &'static KeyStore,
    pub image: &'static BootImageReader,
    pub trace: &'static TraceSink,
    pub cpu: &'static CpuDescriptor,
    pub realms: &'static RealmManager,
}

impl KernelContext {
    #[must_use]
    pub const fn config(&self) -> &KernelConfig<'static> {
        &self.params.config
    }
}

/// What a secondary core constructed.
#[derive(Debug, Copy, Clone)]
pub struct SecondaryContext {
    pub allocator: &'static AllocatorState,
    pub cpu: &'static CpuDescriptor,
}

/// Runs the boot stages against a [`Platform`], storing each singleton in
/// its [`BootSlots`] entry.
pub struct Bootstrap<P: 'static> {
    platform: &'static P,
    slots: &'static BootSlots,
    heap: &'static KernelHeap,
    arena: &'static StaticArena<BOOT_ARENA_SIZE>,
    bridge: &'static InterruptBridge,
}

impl<P: Platform> Bootstrap<P> {
    #[must_use]
    pub const fn new(
        platform: &'static P,
        slots: &'static BootSlots,
        heap: &'static KernelHeap,
        arena: &'static StaticArena<BOOT_ARENA_SIZE>,
        bridge: &'static InterruptBridge,
    ) -> Self {
        Self {
            platform,
            slots,
            heap,
            arena,
            bridge,
        }
    }

    /// Boots the boot core.
    ///
    /// # Errors
    /// The first stage that fails; everything before it stays constructed.
    ///
    /// # Safety
    /// See [`Locator::locate`]; in addition, the boot image must stay mapped
    /// and unmodified for the rest of the kernel's life.
    pub unsafe fn boot(&self, info: *const KernelBootInfo) -> Result<KernelContext, BootError> {
        let slots = self.slots;
        let platform = self.platform;
        let mut seq = Sequencer::boot();

        let boot_services = slots
            .boot_services
            .construct(&mut seq, || Ok(platform.boot_services()))?;
        log::info!("boot services up on {}", boot_services.console);

        let params = slots.params.construct(&mut seq, || {
            let locator = Locator::new(platform.phys_offset());
            // SAFETY: forwarded to the caller.
            let image = unsafe { locator.locate(info) }?;
            let cmdline = self
                .arena
                .copy_str(image.cmdline)
                .ok_or(BootError::ArenaExhausted)?;
            // SAFETY: `locate` succeeded, so `info` is readable.
            let info = unsafe { info.read() };
            Ok(BootParams::new(info, image.with_cmdline(cmdline)))
        })?;

        let memory = slots
            .memory
            .construct(&mut seq, || Ok(platform.init_address_space()))?;

        let interrupts = slots.interrupts.construct(&mut seq, || {
            platform.mask_interrupts();
            Ok(platform.init_interrupts(self.bridge))
        })?;

        let core = slots.core(0)?;
        let allocator = core.allocator.construct(&mut seq, || {
            platform.activate_heap(self.heap)?;
            self.heap.activate_core(0)?;
            Ok(AllocatorState {
                core: 0,
                stats: self.heap.stats(),
            })
        })?;
        if self.heap.is_core_active(0) {
            seq.mark_heap_active();
        }

        let keys = slots
            .keys
            .construct(&mut seq, || Ok(KeyStore::from_cmdline(params.cmdline())))?;

        // SAFETY: the caller keeps the image mapped.
        let image = slots
            .image
            .construct(&mut seq, || Ok(unsafe { BootImageReader::open(params.image) }?))?;

        let trace = slots.trace.construct(&mut seq, || {
            Ok(TraceSink::install(params.config.log_level, SCRIPT_TARGET))
        })?;

        let cpu = core.cpu.construct(&mut seq, || Ok(platform.init_cpu(0)))?;

        let realms = slots.realms.construct(&mut seq, || {
            let events = self.bridge.take_consumer().ok_or(BootError::EventsTaken)?;
            let services = Services {
                resources: Box::new(image.bundle()),
                ports: platform.ports(),
                memory: Box::new(memory.direct_map()),
                events: Box::new(events),
                ticks: Box::new(self.bridge.ticks()),
                diagnostics: Rc::new(trace.diagnostics()),
            };
            Ok(RealmManager::new(services, RealmConfig::from_kernel(&params.config)))
        })?;

        debug_assert!(seq.is_complete());
        platform.enable_interrupts();
        log::info!("boot core ready");

        Ok(KernelContext {
            boot_services,
            params,
            memory,
            interrupts,
            allocator,
            keys,
            image,
            trace,
            cpu,
            realms,
        })
    }

    /// Brings up `core` once the boot core finished: only its per-core
    /// stages run.
    ///
    /// # Errors
    /// `core` must be a secondary core in range, and the heap must be active.
    pub fn boot_secondary(&self, core: u32) -> Result<SecondaryContext, BootError> {
        if core == 0 {
            return Err(BootError::CoreOutOfRange(core));
        }
        let slots = self.slots.core(core)?;
        let mut seq = Sequencer::secondary(core);

        let allocator = slots.allocator.construct(&mut seq, || {
            self.heap.activate_core(core)?;
            Ok(AllocatorState {
                core,
                stats: self.heap.stats(),
            })
        })?;

        let cpu = slots.cpu.construct(&mut seq, || Ok(self.platform.init_cpu(core)))?;
        log::info!("core {core} ready (apic {})", cpu.apic_id);

        Ok(SecondaryContext { allocator, cpu })
    }
}
