//! # Kernel allocation domains
//!
//! Memory in this kernel comes from one of two domains, and every subsystem
//! states which one it needs:
//!
//! ```text
//!  boot ──► [ static arena ] ──► allocator activation ──► [ kernel heap ]
//!           bump-only, never freed                          first-fit, coalescing
//! ```
//!
//! * [`StaticArena`] is a fixed block of `.bss` handed out front to back. It
//!   exists from the first instruction, so boot-time copies (the command line,
//!   for example) can be taken before any allocator is running.
//! * [`KernelHeap`] is the `#[global_allocator]`. It refuses every request
//!   until [`KernelHeap::activate`] has been called; an allocation attempt
//!   before that point returns null, which surfaces as an allocation error
//!   instead of silently handing out garbage.
//!
//! Which domain a subsystem uses is tracked by [`AllocDomain`].

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod arena;
mod free_list;
mod heap;
pub mod static_heap;

pub use arena::StaticArena;
pub use heap::{HeapError, HeapStats, KernelHeap};

/// Where a subsystem's storage comes from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AllocDomain {
    /// Static storage or the [`StaticArena`]; legal before allocator activation.
    Static,
    /// The kernel heap; legal only after allocator activation.
    Heap,
}

impl AllocDomain {
    #[must_use]
    pub const fn needs_heap(self) -> bool {
        matches!(self, Self::Heap)
    }
}
