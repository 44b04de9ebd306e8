use crate::capabilities::Capabilities;
use crate::error::RealmError;
use crate::realm::Realm;
use crate::services::Services;
use crate::{RealmHandle, Transferable};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use kernel_info::cmdline::KernelConfig;
use kernel_script::{IsolateConfig, ScriptError};

/// Script name used for realms spawned by `iso`.
pub const NESTED_REALM_NAME: &str = "iso";

/// Limits and capabilities applied to new realms.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RealmConfig {
    /// Primitives of top-level realms.
    pub capabilities: Capabilities,
    pub isolate: IsolateConfig,
    /// Deepest allowed `iso` nesting.
    pub nest_limit: u32,
}

impl RealmConfig {
    #[must_use]
    pub fn from_kernel(config: &KernelConfig<'_>) -> Self {
        Self {
            capabilities: config.capabilities.into(),
            isolate: IsolateConfig {
                max_objects: usize::try_from(config.heap_objects).unwrap_or(usize::MAX),
                ..IsolateConfig::DEFAULT
            },
            nest_limit: config.nest_limit,
        }
    }
}

impl Default for RealmConfig {
    fn default() -> Self {
        Self::from_kernel(&KernelConfig::default())
    }
}

/// State shared by the manager and every primitive it binds.
pub(crate) struct Runtime {
    services: Services,
    config: RealmConfig,
}

impl Runtime {
    pub(crate) const fn services(&self) -> &Services {
        &self.services
    }

    pub(crate) const fn config(&self) -> &RealmConfig {
        &self.config
    }

    /// Sends a failed run to the diagnostic sink.
    pub(crate) fn report(&self, realm: &RealmHandle, error: &RealmError) {
        match error {
            RealmError::Script(ScriptError::Terminated) => log::info!("{realm} terminated"),
            RealmError::Script(script) => {
                if let Some(failure) = script.failure() {
                    self.services.diagnostics.report(realm, failure);
                }
            }
            other => log::warn!("{realm}: {other}"),
        }
    }

    /// Creates a realm one level below `parent_depth`, runs `source` in it
    /// and disposes it. The caller is suspended throughout.
    pub(crate) fn run_nested(
        self: &Rc<Self>,
        parent_depth: u32,
        capabilities: Capabilities,
        source: &str,
        bindings: Vec<(String, Transferable)>,
    ) -> Result<Transferable, RealmError> {
        let depth = parent_depth.saturating_add(1);
        if depth > self.config.nest_limit {
            return Err(RealmError::NestingTooDeep {
                limit: self.config.nest_limit,
            });
        }

        let mut realm = Realm::new(self, NESTED_REALM_NAME, depth, capabilities)?;
        let result = bindings
            .into_iter()
            .try_for_each(|(name, value)| realm.bind(&name, value))
            .and_then(|()| realm.run(source, NESTED_REALM_NAME));
        if let Err(error) = &result {
            self.report(realm.handle(), error);
        }
        realm.dispose();
        result
    }
}

/// Creates, runs and disposes script realms.
pub struct RealmManager {
    runtime: Rc<Runtime>,
}

impl RealmManager {
    #[must_use]
    pub fn new(services: Services, config: RealmConfig) -> Self {
        Self {
            runtime: Rc::new(Runtime { services, config }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RealmConfig {
        self.runtime.config()
    }

    #[must_use]
    pub fn services(&self) -> &Services {
        self.runtime.services()
    }

    /// A fresh top-level realm with the configured capabilities.
    pub fn spawn(&self, name: &str) -> Result<Realm, RealmError> {
        self.spawn_with(name, self.runtime.config.capabilities)
    }

    /// A fresh top-level realm with an explicit capability set.
    pub fn spawn_with(&self, name: &str, capabilities: Capabilities) -> Result<Realm, RealmError> {
        Realm::new(&self.runtime, name, 0, capabilities)
    }

    /// Runs `source` as `name` in a new realm, then disposes the realm.
    ///
    /// Compile errors and uncaught exceptions go to the diagnostic sink; they
    /// do not fail the call. The returned handle reports
    /// [`Disposed`](kernel_script::IsolateState::Disposed).
    pub fn create_realm(&self, source: &str, name: &str) -> Result<RealmHandle, RealmError> {
        let mut realm = self.spawn(name)?;
        let handle = realm.handle().clone();
        match realm.run(source, name) {
            Ok(value) => log::debug!("{handle} completed with {value:?}"),
            Err(error) => self.runtime.report(&handle, &error),
        }
        realm.dispose();
        Ok(handle)
    }

    /// Loads `path` from the boot image and runs it through
    /// [`create_realm`](Self::create_realm).
    pub fn run_entry(&self, path: &str) -> Result<RealmHandle, RealmError> {
        let Some(bytes) = self.runtime.services.resources.get(path) else {
            return Err(RealmError::MissingEntry {
                path: path.to_string(),
            });
        };
        let source = String::from_utf8_lossy(bytes).into_owned();
        log::info!("running {path} ({} bytes)", source.len());
        self.create_realm(&source, packer_abi::normalize(path))
    }

    /// Runs `source` in a realm nested below the host, with `bindings`
    /// defined as globals.
    pub fn run_nested(
        &self,
        source: &str,
        bindings: Vec<(String, Transferable)>,
    ) -> Result<Transferable, RealmError> {
        self.runtime
            .run_nested(0, self.runtime.config.capabilities, source, bindings)
    }

    /// Releases `realm`; equivalent to [`Realm::dispose`].
    pub fn dispose(&self, realm: Realm) {
        realm.dispose();
    }
}

impl core::fmt::Debug for RealmManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RealmManager")
            .field("config", &self.runtime.config)
            .finish_non_exhaustive()
    }
}
