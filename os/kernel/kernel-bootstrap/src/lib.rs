//! # Kernel bootstrap
//!
//! Takes a core from its entry point to a running kernel. On the boot core
//! the stages run in a fixed order:
//!
//! ```text
//! boot services → boot parameters → memory manager → interrupt controller
//!   → allocator activation → key store → boot image reader → trace sink
//!   → platform → realm manager
//! ```
//!
//! Every other core runs only allocator activation and platform.
//!
//! Each stage leaves exactly one value behind, stored in place in a
//! [`BootSlots`] entry that lives in a `static`. The [`Sequencer`] refuses a
//! stage that comes out of order, any stage that lives on the heap before
//! the allocator is active, and a singleton whose accessor resolves anywhere
//! but its own storage. Stages before allocator activation only use static
//! storage and the boot arena.
//!
//! [`Bootstrap::boot`] returns a [`KernelContext`] with a reference to each
//! singleton; [`run_mode`] then does what the command line asked for.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod bootstrap;
mod components;
mod error;
mod locator;
mod modes;
mod slots;
mod stage;

pub use bootstrap::{Bootstrap, KernelContext, Platform, SecondaryContext};
pub use components::{
    AllocatorState, BootImageReader, BootParams, BootServices, CpuDescriptor, InterruptSetup,
    KeyStore, MemoryManager, SCRIPT_TARGET, TraceSink,
};
pub use error::BootError;
pub use locator::{BootImageDescriptor, LocateError, Locator};
pub use modes::{
    Expect, ModeOutcome, SELF_TESTS, SelfTest, SelfTestReport, SnapshotEntry, run_mode,
};
pub use slots::{BootSlots, CoreSlots, Singleton};
pub use stage::{CoreRole, Placement, Sequencer, Stage};
