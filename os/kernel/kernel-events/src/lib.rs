//! # Interrupt event bridge
//!
//! Connects hardware interrupt handlers to script code that polls for events.
//!
//! ```text
//!  device IRQ ──► handle_device_interrupt ──► Producer::push ─┐
//!                   (reads payload port, acks controller)     │  EventStack
//!                                                             ▼  (LIFO)
//!  script poll() ◄──────────────────────────────── Consumer::pop
//!
//!  timer IRQ ──► handle_timer_interrupt ──► TickCounter + EOI
//! ```
//!
//! ## Masking discipline
//!
//! The event stack has exactly one producer and one consumer per core, and no
//! lock. That is sound because the producer only ever runs inside an
//! interrupt handler with interrupts masked, so on a given core it can
//! interrupt the consumer but never the other way around. The discipline is
//! enforced by construction:
//!
//! * a [`Producer`] can only be obtained from an [`InterruptContext`], and
//!   creating one of those is `unsafe` with the contract "I am an interrupt
//!   handler running masked";
//! * the single [`Consumer`] is handed out once by
//!   [`InterruptBridge::take_consumer`].
//!
//! ## Drain order
//!
//! Events come back most-recent-first. A burst `v1, v2, v3` polls as
//! `v3, v2, v1`. Consumers that need arrival order have to reverse a drained
//! batch themselves.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod bridge;
mod event;
pub mod ports;
mod stack;
mod ticks;

pub use bridge::{BridgeConsumer, InterruptBridge, InterruptController, InterruptContext};
pub use event::InterruptEvent;
pub use ports::PortIo;
pub use stack::{Consumer, EventStack, Producer};
pub use ticks::TickCounter;
