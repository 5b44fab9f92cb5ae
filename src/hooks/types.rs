//! Hook Types
//!
//! Core types for the hooks system: hook kinds, abort policies, signals,
//! the per-invocation execution context and run outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Slot of a lifecycle a hook is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookKind {
    /// Runs before the body; may abort the lifecycle
    Before,
    /// Runs after the body
    After,
    /// Wraps the body and decides whether to continue the pipeline
    Around,
}

impl HookKind {
    /// Get all hook kinds, in phase order
    pub fn all() -> &'static [HookKind] {
        &[HookKind::Before, HookKind::Around, HookKind::After]
    }

    /// Get display name for this hook kind
    pub fn display_name(&self) -> &'static str {
        match self {
            HookKind::Before => "Before",
            HookKind::After => "After",
            HookKind::Around => "Around",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// What happens to `after` hooks once a lifecycle has been aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortPolicy {
    /// `after` hooks run even when the lifecycle was aborted
    #[default]
    None,
    /// An aborted lifecycle skips its `after` hooks
    SkipAfterOnAbort,
}

/// A named lifecycle and the policy it was defined with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSet {
    pub name: String,
    pub abort_policy: AbortPolicy,
}

/// Result of a `before` or `after` hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookSignal {
    /// Carry on with the pipeline
    Continue,
    /// Stop the `before` phase and skip the body
    Abort(String),
}

impl HookSignal {
    /// Shorthand for `Abort(reason)`.
    pub fn abort(reason: impl Into<String>) -> Self {
        HookSignal::Abort(reason.into())
    }

    pub fn is_abort(&self) -> bool {
        matches!(self, HookSignal::Abort(_))
    }
}

/// Which hook aborted a lifecycle and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbortInfo {
    pub hook: String,
    pub kind: HookKind,
    pub reason: String,
}

/// Value returned by a lifecycle run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome<T> {
    /// The body ran and produced this value
    Completed(T),
    /// The body never ran
    Aborted(AbortInfo),
}

impl<T> RunOutcome<T> {
    pub fn is_aborted(&self) -> bool {
        matches!(self, RunOutcome::Aborted(_))
    }

    /// The body's value, if the body ran
    pub fn value(&self) -> Option<&T> {
        match self {
            RunOutcome::Completed(value) => Some(value),
            RunOutcome::Aborted(_) => None,
        }
    }

    pub fn into_value(self) -> Option<T> {
        match self {
            RunOutcome::Completed(value) => Some(value),
            RunOutcome::Aborted(_) => None,
        }
    }

    pub fn abort_info(&self) -> Option<&AbortInfo> {
        match self {
            RunOutcome::Completed(_) => None,
            RunOutcome::Aborted(info) => Some(info),
        }
    }
}

/// Context passed to hooks during a single lifecycle run
///
/// Every call to `run` builds its own context; nothing in it is shared with
/// other invocations.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The lifecycle being run
    pub lifecycle: String,
    /// Unique id of this invocation, used in log fields
    pub invocation_id: Uuid,
    /// When the invocation started
    pub started_at: DateTime<Utc>,
    /// Set once a `before` or `around` hook stops the pipeline
    pub aborted: bool,
    /// The abort that stopped the pipeline
    pub abort: Option<AbortInfo>,
    /// Abort signals raised by `after` hooks; recorded, never acted on
    pub after_aborts: Vec<AbortInfo>,
    /// Caller supplied metadata
    pub metadata: HashMap<String, String>,
}

impl ExecutionContext {
    /// Create a fresh context for a lifecycle run
    pub fn new(lifecycle: &str) -> Self {
        Self {
            lifecycle: lifecycle.to_string(),
            invocation_id: Uuid::new_v4(),
            started_at: Utc::now(),
            aborted: false,
            abort: None,
            after_aborts: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    pub(crate) fn mark_aborted(&mut self, info: AbortInfo) {
        self.aborted = true;
        if self.abort.is_none() {
            self.abort = Some(info);
        }
    }
}
