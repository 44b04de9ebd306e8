//! Boot stages and the order they are constructed in.

use crate::error::BootError;
use core::fmt;
use kernel_alloc::AllocDomain;

/// A kernel subsystem with exactly one instance (per core, for the per-core
/// stages), constructed during boot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Stage {
    /// Early console.
    BootServices,
    /// Parameter block capture and boot image location.
    BootParams,
    /// Address space setup.
    MemoryManager,
    /// Interrupts masked, tables installed, controller programmed.
    InterruptController,
    AllocatorActivation,
    KeyStore,
    BootImageReader,
    TraceSink,
    /// Per-core CPU state.
    Platform,
    RealmManager,
}

impl Stage {
    /// Construction order on the boot core.
    pub const BOOT_ORDER: [Self; 10] = [
        Self::BootServices,
        Self::BootParams,
        Self::MemoryManager,
        Self::InterruptController,
        Self::AllocatorActivation,
        Self::KeyStore,
        Self::BootImageReader,
        Self::TraceSink,
        Self::Platform,
        Self::RealmManager,
    ];

    /// Construction order on every other core.
    pub const SECONDARY_ORDER: [Self; 2] = [Self::AllocatorActivation, Self::Platform];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BootServices => "boot services",
            Self::BootParams => "boot parameters",
            Self::MemoryManager => "memory manager",
            Self::InterruptController => "interrupt controller",
            Self::AllocatorActivation => "allocator activation",
            Self::KeyStore => "key store",
            Self::BootImageReader => "boot image reader",
            Self::TraceSink => "trace sink",
            Self::Platform => "platform",
            Self::RealmManager => "realm manager",
        }
    }

    /// Where the stage's own data lives.
    #[must_use]
    pub const fn domain(self) -> AllocDomain {
        match self {
            Self::KeyStore | Self::BootImageReader | Self::RealmManager => AllocDomain::Heap,
            _ => AllocDomain::Static,
        }
    }

    #[must_use]
    pub const fn per_core(self) -> bool {
        matches!(self, Self::AllocatorActivation | Self::Platform)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CoreRole {
    Boot,
    Secondary(u32),
}

impl CoreRole {
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Boot => 0,
            Self::Secondary(core) => core,
        }
    }
}

/// Where a singleton's storage is and where its accessor points.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Placement {
    storage: usize,
    accessor: usize,
}

impl Placement {
    pub fn of<T>(storage: *const T, accessor: &T) -> Self {
        Self {
            storage: storage.addr(),
            accessor: core::ptr::from_ref(accessor).addr(),
        }
    }

    fn verify(self, stage: Stage) -> Result<(), BootError> {
        if self.storage == self.accessor {
            Ok(())
        } else {
            Err(BootError::PlacementMismatch {
                stage,
                storage: self.storage,
                accessor: self.accessor,
            })
        }
    }
}

/// Tracks one core's progress through its stage plan and refuses anything
/// out of order.
#[derive(Debug)]
pub struct Sequencer {
    role: CoreRole,
    plan: &'static [Stage],
    next: usize,
    current: Option<Stage>,
    heap_active: bool,
}

impl Sequencer {
    #[must_use]
    pub const fn boot() -> Self {
        Self {
            role: CoreRole::Boot,
            plan: &Stage::BOOT_ORDER,
            next: 0,
            current: None,
            heap_active: false,
        }
    }

    #[must_use]
    pub const fn secondary(core: u32) -> Self {
        Self {
            role: CoreRole::Secondary(core),
            plan: &Stage::SECONDARY_ORDER,
            next: 0,
            current: None,
            heap_active: false,
        }
    }

    #[must_use]
    pub const fn role(&self) -> CoreRole {
        self.role
    }

    /// The stage [`begin`](Self::begin) accepts next.
    #[must_use]
    pub fn expected(&self) -> Option<Stage> {
        self.plan.get(self.next).copied()
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.next == self.plan.len()
    }

    #[must_use]
    pub const fn heap_active(&self) -> bool {
        self.heap_active
    }

    /// Record that the heap accepts allocations from this core.
    pub fn mark_heap_active(&mut self) {
        self.heap_active = true;
    }

    /// Start constructing `stage`.
    ///
    /// # Errors
    /// `stage` must be the next one in the plan, not part of another core's
    /// plan only, and find the heap active if it lives there.
    pub fn begin(&mut self, stage: Stage) -> Result<(), BootError> {
        if !self.plan.contains(&stage) {
            return Err(BootError::BootCoreOnly(stage));
        }
        let expected = self.expected();
        if self.current.is_some() || expected != Some(stage) {
            return Err(BootError::OutOfOrder { stage, expected });
        }
        if stage.domain().needs_heap() && !self.heap_active {
            return Err(BootError::HeapBeforeActivation(stage));
        }
        log::trace!("core {}: constructing {stage}", self.role.index());
        self.current = Some(stage);
        Ok(())
    }

    /// Finish `stage`, checking that its accessor resolves to its storage.
    ///
    /// # Errors
    /// `stage` must be the one in progress.
    pub fn complete(&mut self, stage: Stage, placement: Placement) -> Result<(), BootError> {
        if self.current != Some(stage) {
            return Err(BootError::OutOfOrder {
                stage,
                expected: self.expected(),
            });
        }
        placement.verify(stage)?;
        self.current = None;
        self.next += 1;
        log::debug!("core {}: {stage} ready", self.role.index());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn here<T>(value: &T) -> Placement {
        Placement::of(core::ptr::from_ref(value), value)
    }

    fn step(seq: &mut Sequencer, stage: Stage) -> Result<(), BootError> {
        seq.begin(stage)?;
        seq.complete(stage, here(&stage))
    }

    #[test]
    fn boot_order_runs_to_completion() {
        let mut seq = Sequencer::boot();
        for stage in Stage::BOOT_ORDER {
            step(&mut seq, stage).unwrap();
            if stage == Stage::AllocatorActivation {
                seq.mark_heap_active();
            }
        }
        assert!(seq.is_complete());
        assert_eq!(seq.expected(), None);
    }

    #[test]
    fn activation_precedes_every_heap_stage() {
        let position = |s| Stage::BOOT_ORDER.iter().position(|&x| x == s).unwrap();
        let activation = position(Stage::AllocatorActivation);
        for stage in Stage::BOOT_ORDER {
            if stage.domain().needs_heap() {
                assert!(position(stage) > activation, "{stage}");
            }
        }
        assert!(position(Stage::InterruptController) < activation);
    }

    #[test]
    fn skipping_ahead_is_detected() {
        let mut seq = Sequencer::boot();
        for stage in &Stage::BOOT_ORDER[..4] {
            step(&mut seq, *stage).unwrap();
        }
        let err = seq.begin(Stage::KeyStore).unwrap_err();
        assert!(matches!(
            err,
            BootError::OutOfOrder {
                stage: Stage::KeyStore,
                expected: Some(Stage::AllocatorActivation)
            }
        ));
    }

    #[test]
    fn heap_stage_without_activation_is_detected() {
        let mut seq = Sequencer::boot();
        for stage in &Stage::BOOT_ORDER[..5] {
            step(&mut seq, *stage).unwrap();
        }
        let err = seq.begin(Stage::KeyStore).unwrap_err();
        assert!(matches!(err, BootError::HeapBeforeActivation(Stage::KeyStore)));
    }

    #[test]
    fn stages_run_once() {
        let mut seq = Sequencer::boot();
        step(&mut seq, Stage::BootServices).unwrap();
        assert!(matches!(
            seq.begin(Stage::BootServices),
            Err(BootError::OutOfOrder { .. })
        ));
    }

    #[test]
    fn misplaced_singleton_is_detected() {
        let mut seq = Sequencer::boot();
        seq.begin(Stage::BootServices).unwrap();
        let (a, b) = (1_u32, 2_u32);
        let err = seq
            .complete(Stage::BootServices, Placement::of(&raw const a, &b))
            .unwrap_err();
        assert!(matches!(
            err,
            BootError::PlacementMismatch {
                stage: Stage::BootServices,
                ..
            }
        ));
    }

    #[test]
    fn secondary_cores_only_run_per_core_stages() {
        let mut seq = Sequencer::secondary(3);
        assert_eq!(seq.role().index(), 3);
        assert!(matches!(
            seq.begin(Stage::RealmManager),
            Err(BootError::BootCoreOnly(Stage::RealmManager))
        ));
        for stage in Stage::SECONDARY_ORDER {
            assert!(stage.per_core());
            step(&mut seq, stage).unwrap();
        }
        assert!(seq.is_complete());
    }
}
