use alloc::string::String;
use kernel_script::{IsolateState, ScriptError};

/// Realm lifecycle misuse and script failures seen by the embedder.
#[derive(Debug, thiserror::Error)]
pub enum RealmError {
    #[error("realm {id} is {state:?} and cannot run again")]
    AlreadyRan { id: u64, state: IsolateState },
    #[error("realm nesting limit of {limit} reached")]
    NestingTooDeep { limit: u32 },
    #[error("entry script {path:?} is not in the boot image")]
    MissingEntry { path: String },
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl RealmError {
    /// Whether the script was stopped by a terminate request.
    #[must_use]
    pub const fn is_termination(&self) -> bool {
        matches!(self, Self::Script(ScriptError::Terminated))
    }
}
