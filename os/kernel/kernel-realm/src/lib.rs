//! # Script realms
//!
//! A realm is one isolated script environment: its own isolate and heap, one
//! context, and the host primitives its [`Capabilities`] allow. The
//! [`RealmManager`] creates realms, runs their entry scripts and disposes
//! them; scripts themselves spawn nested realms with `iso` and layered
//! contexts with `exec`.
//!
//! ```text
//!  RealmManager ──create_realm──► Realm ─ Isolate ─ Context ─ primitives
//!                                   │                            │
//!                                   │              iso(code) ────┘
//!                                   │                 ▼
//!                                   │          nested Realm (caller suspended)
//!                                   ▼
//!                              RealmHandle ──kill / schedule──► any realm
//! ```
//!
//! ## Isolation
//!
//! Realms never share objects. Values passed into `iso` and returned from it
//! are [`Transferable`]: primitives and realm handles only. A handle grants
//! the right to signal its realm, not ownership of it.
//!
//! ## Failures
//!
//! Compile errors and uncaught exceptions are handed to the
//! [`DiagnosticSink`] with location, source excerpt and stack. They end the
//! failing realm; the host and the calling realm carry on.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod capabilities;
mod error;
mod handle;
mod manager;
mod primitives;
mod realm;
pub mod services;
mod transfer;

pub use capabilities::Capabilities;
pub use error::RealmError;
pub use handle::RealmHandle;
pub use kernel_script::IsolateState as RealmState;
pub use manager::{NESTED_REALM_NAME, RealmConfig, RealmManager};
pub use realm::Realm;
pub use services::{DiagnosticSink, LogDiagnostics, Services};
pub use transfer::{REALM_TAG, Transferable, realm_handle};
