use crate::capabilities::Capabilities;
use crate::error::RealmError;
use crate::manager::Runtime;
use crate::primitives::{self, Binding};
use crate::{RealmHandle, Transferable};
use alloc::rc::Rc;
use kernel_script::{Context, Isolate, IsolateState};

/// One isolated execution environment: an isolate, its single context and
/// the primitives bound into that context.
///
/// ```text
/// Created ─run─► Running ─► (Interrupted ─► Running)* ─► Completed | Terminated
///                                                             │
///                                              dispose ──► Disposed
/// ```
///
/// A realm runs exactly one entry script.
pub struct Realm {
    isolate: Isolate,
    context: Context,
    handle: RealmHandle,
    capabilities: Capabilities,
    ran: bool,
}

impl Realm {
    pub(crate) fn new(
        runtime: &Rc<Runtime>,
        name: &str,
        depth: u32,
        capabilities: Capabilities,
    ) -> Result<Self, RealmError> {
        let mut isolate = Isolate::new(runtime.config().isolate);
        let context = isolate.new_context();
        let handle = RealmHandle::new(isolate.handle(), name, depth);
        let binding = Rc::new(Binding {
            runtime: Rc::clone(runtime),
            handle: handle.clone(),
            capabilities,
        });
        if let Err(exception) = primitives::install(&mut isolate, &context, &binding) {
            return Err(isolate.report(exception).into());
        }
        log::debug!("created {handle} at depth {depth}");
        Ok(Self {
            isolate,
            context,
            handle,
            capabilities,
            ran: false,
        })
    }

    #[must_use]
    pub const fn handle(&self) -> &RealmHandle {
        &self.handle
    }

    #[must_use]
    pub fn state(&self) -> IsolateState {
        self.isolate.state()
    }

    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Objects currently on the realm's heap.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.isolate.object_count()
    }

    /// Defines a global before the entry script runs.
    pub fn bind(&mut self, name: &str, value: Transferable) -> Result<(), RealmError> {
        let value = value
            .into_value(&mut self.isolate)
            .map_err(|e| self.isolate.report(e))?;
        self.isolate.set_global(&self.context, name, value);
        Ok(())
    }

    /// Reads a global, if it holds something transferable.
    #[must_use]
    pub fn global(&self, name: &str) -> Option<Transferable> {
        let value = self.isolate.get_global(&self.context, name)?;
        Transferable::from_value(&self.isolate, &value)
    }

    /// Compiles and runs the entry script; yields its completion value.
    ///
    /// An object completion cannot leave the realm and comes back as
    /// [`Transferable::Undefined`].
    pub fn run(&mut self, source: &str, name: &str) -> Result<Transferable, RealmError> {
        if self.ran {
            return Err(RealmError::AlreadyRan {
                id: self.handle.id(),
                state: self.state(),
            });
        }
        self.ran = true;

        let value = self.isolate.execute(&self.context, source, name)?;
        Ok(Transferable::from_value(&self.isolate, &value).unwrap_or_else(|| {
            log::debug!("{}: completion value is not transferable", self.handle);
            Transferable::Undefined
        }))
    }

    /// Releases the isolate and its whole heap.
    ///
    /// Call only once nothing executes in the realm any more.
    pub fn dispose(self) {
        log::debug!("disposing {} ({} objects)", self.handle, self.isolate.object_count());
    }
}

impl core::fmt::Debug for Realm {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Realm")
            .field("handle", &self.handle)
            .field("capabilities", &self.capabilities)
            .field("ran", &self.ran)
            .finish_non_exhaustive()
    }
}
