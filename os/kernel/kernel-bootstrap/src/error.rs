use crate::locator::LocateError;
use crate::stage::Stage;
use kernel_alloc::HeapError;
use kernel_realm::RealmError;
use packer_abi::unbundle::BundleError;

#[derive(Debug, thiserror::Error)]
pub enum BootError {
    #[error("{stage} constructed out of order (expected {expected:?})")]
    OutOfOrder { stage: Stage, expected: Option<Stage> },
    #[error("{0} was already constructed")]
    AlreadyConstructed(Stage),
    #[error("{0} needs the heap before the allocator was activated")]
    HeapBeforeActivation(Stage),
    #[error("{0} is only constructed on the boot core")]
    BootCoreOnly(Stage),
    #[error("{stage} resolves to {accessor:#x} but lives at {storage:#x}")]
    PlacementMismatch {
        stage: Stage,
        storage: usize,
        accessor: usize,
    },
    #[error("core {0} is out of range")]
    CoreOutOfRange(u32),
    #[error("the boot arena cannot hold the command line")]
    ArenaExhausted,
    #[error("the interrupt event consumer was already taken")]
    EventsTaken,
    #[error("cannot locate the boot image: {0}")]
    Locate(#[from] LocateError),
    #[error("cannot read the boot image: {0}")]
    Image(#[from] BundleError),
    #[error(transparent)]
    Heap(#[from] HeapError),
    #[error(transparent)]
    Realm(#[from] RealmError),
}
