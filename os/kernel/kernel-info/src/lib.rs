//! # Kernel Configuration and Boot Interface
//!
//! Shared vocabulary between the bootloader, the kernel binary and the kernel
//! library crates.
//!
//! ## Modules
//!
//! ### Boot handoff ([`boot`])
//! The `#[repr(C)]` parameter block the bootloader passes to the kernel entry
//! point: where the boot image module lives and where the command line is.
//!
//! ### Memory layout ([`memory`])
//! Compile-time constants: where the kernel is linked, the direct map of
//! physical memory, the local APIC register window, the size of the static
//! arena and the heap, and limits such as the largest accepted boot image.
//!
//! ### Command line ([`cmdline`])
//! Parses the boot command line into a [`KernelConfig`](cmdline::KernelConfig).
//! The command line selects the boot mode (normal realm execution, self-test,
//! snapshot), the entry script, the log level and the capability profile of
//! the initial realm.
//!
//! ## Address space
//!
//! ```text
//! HHDM_BASE    ┌──────────────────────────────────┐ 0xffff_8880_0000_0000
//!              │ direct map of physical memory    │  buff(), LAPIC, boot image
//! KERNEL_BASE  ├──────────────────────────────────┤ 0xffff_ffff_8000_0000
//!              │ kernel text, data, bss           │  static arena, heap region
//!              └──────────────────────────────────┘
//! ```
//!
//! The kernel runs in a single address space. Script realms share it, and the
//! `buff` primitive reaches physical memory through the direct map.
//!
//! ## Build integration
//! ```rust
//! use kernel_info::memory::{KERNEL_BASE, PHYS_LOAD};
//!
//! println!("cargo:rustc-link-arg=--defsym=KERNEL_BASE={:#x}", KERNEL_BASE);
//! println!("cargo:rustc-link-arg=--defsym=PHYS_LOAD={:#x}", PHYS_LOAD);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod boot;
pub mod cmdline;
pub mod memory;
