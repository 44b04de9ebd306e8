//! Static storage for every boot singleton.

use crate::components::{
    AllocatorState, BootImageReader, BootParams, BootServices, CpuDescriptor, InterruptSetup,
    KeyStore, MemoryManager, TraceSink,
};
use crate::error::BootError;
use crate::stage::{Placement, Sequencer, Stage};
use kernel_info::memory::MAX_CORES;
use kernel_realm::RealmManager;
use kernel_sync::OnceSlot;

/// Write-once storage for the singleton of one [`Stage`].
pub struct Singleton<T> {
    stage: Stage,
    slot: OnceSlot<T>,
}

impl<T> Singleton<T> {
    #[must_use]
    pub const fn new(stage: Stage) -> Self {
        Self {
            stage,
            slot: OnceSlot::new(),
        }
    }

    #[must_use]
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    #[must_use]
    pub fn get(&self) -> Option<&T> {
        self.slot.get()
    }

    /// Runs `init` as the sequencer's next stage and stores the result in
    /// place.
    ///
    /// # Errors
    /// Ordering errors from the sequencer, a second construction, or
    /// whatever `init` fails with.
    pub fn construct(
        &self,
        seq: &mut Sequencer,
        init: impl FnOnce() -> Result<T, BootError>,
    ) -> Result<&T, BootError> {
        if self.slot.is_set() {
            return Err(BootError::AlreadyConstructed(self.stage));
        }
        seq.begin(self.stage)?;
        let stored = self
            .slot
            .set(init()?)
            .map_err(|_| BootError::AlreadyConstructed(self.stage))?;
        seq.complete(self.stage, Placement::of(self.slot.as_ptr(), stored))?;
        Ok(stored)
    }
}

/// Singletons every core owns one of.
pub struct CoreSlots {
    pub(crate) allocator: Singleton<AllocatorState>,
    pub(crate) cpu: Singleton<CpuDescriptor>,
}

impl CoreSlots {
    const fn new() -> Self {
        Self {
            allocator: Singleton::new(Stage::AllocatorActivation),
            cpu: Singleton::new(Stage::Platform),
        }
    }

    #[must_use]
    pub fn cpu(&self) -> Option<&CpuDescriptor> {
        self.cpu.get()
    }

    #[must_use]
    pub fn allocator(&self) -> Option<&AllocatorState> {
        self.allocator.get()
    }
}

/// Storage for all kernel singletons; lives in a `static`.
pub struct BootSlots {
    pub(crate) boot_services: Singleton<BootServices>,
    pub(crate) params: Singleton<BootParams>,
    pub(crate) memory: Singleton<MemoryManager>,
    pub(crate) interrupts: Singleton<InterruptSetup>,
    pub(crate) keys: Singleton<KeyStore>,
    pub(crate) image: Singleton<BootImageReader>,
    pub(crate) trace: Singleton<TraceSink>,
    pub(crate) realms: Singleton<RealmManager>,
    cores: [CoreSlots; MAX_CORES],
}

// SAFETY: the realm manager is neither `Send` nor `Sync`. Its slot is only
// filled and read on the boot core, which is the only core that runs
// scripts. Every other core touches only its own `CoreSlots`.
unsafe impl Sync for BootSlots {}

impl Default for BootSlots {
    fn default() -> Self {
        Self::new()
    }
}

impl BootSlots {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            boot_services: Singleton::new(Stage::BootServices),
            params: Singleton::new(Stage::BootParams),
            memory: Singleton::new(Stage::MemoryManager),
            interrupts: Singleton::new(Stage::InterruptController),
            keys: Singleton::new(Stage::KeyStore),
            image: Singleton::new(Stage::BootImageReader),
            trace: Singleton::new(Stage::TraceSink),
            realms: Singleton::new(Stage::RealmManager),
            cores: [const { CoreSlots::new() }; MAX_CORES],
        }
    }

    /// # Errors
    /// `core` must be below [`MAX_CORES`].
    pub fn core(&self, core: u32) -> Result<&CoreSlots, BootError> {
        usize::try_from(core)
            .ok()
            .and_then(|i| self.cores.get(i))
            .ok_or(BootError::CoreOutOfRange(core))
    }

    /// Whether the boot core got through every stage.
    #[must_use]
    pub fn is_booted(&self) -> bool {
        self.realms.get().is_some()
    }
}
