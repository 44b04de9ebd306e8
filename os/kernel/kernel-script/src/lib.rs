//! # Kernel script engine
//!
//! A small interpreter for the JavaScript subset the kernel runs its
//! initial programs in. It provides just enough of an embedding API for
//! isolated script realms:
//!
//! * an [`Isolate`] owns a heap and any number of [`Context`]s (global
//!   scopes);
//! * [`Isolate::new_proxy_context`] layers a context over a delegate object,
//!   so names the context does not define itself fall through to it;
//! * an [`IsolateHandle`] may be used from anywhere to
//!   [terminate](IsolateHandle::terminate_execution) the isolate or to
//!   [queue work](IsolateHandle::request_interrupt) for it;
//! * uncaught exceptions become a [`Failure`] carrying file, line, the
//!   offending source line and a stack trace.
//!
//! ## Safe points
//!
//! Termination and interrupts are only observed at safe points: before each
//! statement and at the top of each loop iteration. Native functions that
//! loop for a long time should call [`Isolate::poll_interrupts`] themselves.
//!
//! ## Language
//!
//! `var`/`let`/`const` (all function-scoped), functions and closures, `if`,
//! `while`, `for`, `break`, `continue`, `return`, `throw`, object and array
//! literals, the usual operators, and a handful of array and string
//! methods. There is no `try`/`catch`, no prototypes and no `this`.
//!
//! ```
//! use kernel_script::{Isolate, IsolateConfig, Value};
//!
//! let mut isolate = Isolate::new(IsolateConfig::default());
//! let context = isolate.new_context();
//! let value = isolate
//!     .execute(&context, "var f = function (x) { return x * 2; }; f(21)", "doc.js")
//!     .unwrap();
//! assert!(matches!(value, Value::Number(n) if n == 42.0));
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

extern crate alloc;

mod ast;
mod builtins;
mod env;
mod error;
mod heap;
mod interp;
mod isolate;
mod lexer;
mod parser;
mod source;
mod value;

pub use env::Resolution;
pub use error::{ErrorKind, Exception, Failure, ScriptError, StackFrame, Thrown};
pub use heap::{ElementWidth, MemoryView, NativeFn};
pub use isolate::{
    Context, HostInterrupt, Interrupt, Isolate, IsolateConfig, IsolateHandle, IsolateState, Script,
};
pub use source::Location;
pub use value::{ObjectId, Value, number_to_string};
