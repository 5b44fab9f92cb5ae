//! Error types for lifecycle registration and execution.

use crate::hooks::types::HookKind;

/// Errors surfaced by the hook registry and the execution engine.
///
/// Aborts are not errors: a hook that stops a lifecycle returns
/// [`HookSignal::Abort`](crate::hooks::HookSignal::Abort) and `run` reports
/// [`RunOutcome::Aborted`](crate::hooks::RunOutcome::Aborted).
#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("Lifecycle '{name}' is already defined")]
    DuplicateLifecycle { name: String },

    #[error("Lifecycle '{name}' is not defined")]
    UnknownLifecycle { name: String },

    #[error("Hook target does not fit a {kind} slot of lifecycle '{lifecycle}'")]
    TargetKindMismatch { lifecycle: String, kind: HookKind },

    #[error("No {kind} callback named '{name}' for lifecycle '{lifecycle}'")]
    UnresolvedCallback {
        lifecycle: String,
        kind: HookKind,
        name: String,
    },

    #[error("{kind} hook '{hook}' of lifecycle '{lifecycle}' failed: {source}")]
    HookFailed {
        lifecycle: String,
        hook: String,
        kind: HookKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("Body of lifecycle '{lifecycle}' failed: {source}")]
    BodyFailed {
        lifecycle: String,
        #[source]
        source: anyhow::Error,
    },
}

impl LifecycleError {
    /// Whether this error comes from the configuration phase rather than
    /// from running a lifecycle.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            LifecycleError::DuplicateLifecycle { .. }
                | LifecycleError::UnknownLifecycle { .. }
                | LifecycleError::TargetKindMismatch { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, LifecycleError>;
