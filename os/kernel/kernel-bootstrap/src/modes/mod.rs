//! What the kernel does once booted, picked by `mode=` on the command line.

mod selftest;
mod snapshot;

pub use selftest::{Expect, SELF_TESTS, SelfTest, SelfTestReport};
pub use snapshot::SnapshotEntry;

use crate::bootstrap::KernelContext;
use crate::error::BootError;
use alloc::vec::Vec;
use kernel_info::cmdline::BootMode;
use kernel_realm::RealmHandle;

#[derive(Debug)]
pub enum ModeOutcome {
    /// The entry script ran in this (now disposed) realm.
    Entry(RealmHandle),
    SelfTest(SelfTestReport),
    Snapshot(Vec<SnapshotEntry>),
}

/// Runs the configured mode to completion.
///
/// # Errors
/// [`RealmError::MissingEntry`](kernel_realm::RealmError::MissingEntry) in
/// run mode when the entry script is not in the boot image. Script failures
/// go to the diagnostic sink instead.
pub fn run_mode(ctx: &KernelContext) -> Result<ModeOutcome, BootError> {
    let config = ctx.config();
    log::info!("mode {:?}", config.mode);
    match config.mode {
        BootMode::Run => Ok(ModeOutcome::Entry(ctx.realms.run_entry(config.entry)?)),
        BootMode::SelfTest => Ok(ModeOutcome::SelfTest(selftest::run(ctx, SELF_TESTS))),
        BootMode::Snapshot => Ok(ModeOutcome::Snapshot(snapshot::run(ctx))),
    }
}
