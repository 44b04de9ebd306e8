//! # Kernel synchronization primitives
//!
//! The primitives in this crate are used on both sides of the interrupt
//! boundary:
//!
//! * [`SpinLock`] guards short critical sections such as a realm's interrupt
//!   inbox or the kernel heap's free list.
//! * [`OnceSlot`] is write-once static storage. The bootstrap sequencer places
//!   its pre-heap singletons into these slots and checks their addresses.
//! * [`irq`] masks and unmasks maskable interrupts on the local core.
//!
//! Everything except [`irq`] is architecture neutral and runs on the host
//! under `cargo test`.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

pub mod irq;
mod once_slot;
mod spin_lock;

pub use irq::IrqGuard;
pub use once_slot::{OnceSlot, SlotOccupied};
pub use spin_lock::{SpinLock, SpinLockGuard};
