use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;
use kernel_script::{Interrupt, IsolateHandle, IsolateState};

/// Right to signal a realm from anywhere: other realms, host code, other
/// threads.
///
/// A handle never keeps the realm's memory alive. Once the realm is disposed
/// every request through it is refused.
#[derive(Clone)]
pub struct RealmHandle {
    isolate: IsolateHandle,
    name: Arc<str>,
    depth: u32,
}

impl RealmHandle {
    pub(crate) fn new(isolate: IsolateHandle, name: &str, depth: u32) -> Self {
        Self {
            isolate,
            name: Arc::from(name),
            depth,
        }
    }

    #[must_use]
    pub fn id(&self) -> u64 {
        self.isolate.id()
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// How many `iso` calls deep the realm was spawned; `0` for top-level
    /// realms.
    #[must_use]
    pub const fn depth(&self) -> u32 {
        self.depth
    }

    #[must_use]
    pub fn state(&self) -> IsolateState {
        self.isolate.state()
    }

    /// Stops the realm's script at its next safe point.
    ///
    /// Returns `false` if nothing is executing in the realm.
    pub fn terminate(&self) -> bool {
        let accepted = self.isolate.terminate_execution();
        log::debug!("terminate {self}: {}", if accepted { "requested" } else { "not running" });
        accepted
    }

    /// Queues `interrupt` for the realm's next safe point.
    ///
    /// Returns `false` once the realm has finished or been disposed.
    pub fn request_interrupt(&self, interrupt: Interrupt) -> bool {
        self.isolate.request_interrupt(interrupt)
    }

    /// Queues `source` to be evaluated in the realm's current context.
    pub fn schedule(&self, name: impl Into<String>, source: impl Into<String>) -> bool {
        self.request_interrupt(Interrupt::Script {
            name: name.into(),
            source: source.into(),
        })
    }
}

impl PartialEq for RealmHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for RealmHandle {}

impl fmt::Display for RealmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "realm#{} ({})", self.id(), self.name)
    }
}

impl fmt::Debug for RealmHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealmHandle")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("depth", &self.depth)
            .field("state", &self.state())
            .finish()
    }
}
