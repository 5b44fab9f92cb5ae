//! Hook targets
//!
//! A registered hook points either at a concrete object captured when the
//! hook was added (early binding) or at a symbolic name that is resolved
//! against the caller's [`Callbacks`] every time the lifecycle runs (late
//! binding). Late binding lets each variant of a shared base configuration
//! supply its own behavior under the same name without re-registering hooks.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use super::engine::Next;
use super::types::{ExecutionContext, HookKind, HookSignal};

/// Trait for implementing `before` and `after` hooks
#[async_trait]
pub trait Hook: Send + Sync {
    /// Get the name of this hook
    fn name(&self) -> &str;

    /// Execute the hook
    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<HookSignal>;

    /// Get a description of what this hook does
    fn description(&self) -> &str {
        "No description available"
    }
}

/// Trait for implementing `around` hooks
///
/// The hook receives the rest of the pipeline as a [`Next`] and decides
/// whether and when to run it. Returning without calling [`Next::run`] halts
/// the lifecycle: the body does not run.
#[async_trait]
pub trait AroundHook: Send + Sync {
    fn name(&self) -> &str;

    async fn around(&self, next: Next<'_>) -> anyhow::Result<()>;

    fn description(&self) -> &str {
        "No description available"
    }
}

/// Capability table a variant supplies for late-bound hooks
///
/// Implementations map symbolic names to their own behavior and answer
/// anything they do not know with [`unknown_callback`], which the engine
/// reports as [`LifecycleError::UnresolvedCallback`](crate::LifecycleError::UnresolvedCallback).
#[async_trait]
pub trait Callbacks: Send + Sync {
    /// Resolve and run a `before`/`after` callback
    async fn call(&self, name: &str, ctx: &ExecutionContext) -> anyhow::Result<HookSignal>;

    /// Resolve and run an `around` callback
    async fn call_around(&self, name: &str, next: Next<'_>) -> anyhow::Result<()> {
        let _ = next;
        Err(unknown_callback(name))
    }

    /// Resolve and evaluate a named condition
    async fn check(&self, name: &str, ctx: &ExecutionContext) -> anyhow::Result<bool> {
        let _ = ctx;
        Err(unknown_callback(name))
    }
}

/// Raised by a [`Callbacks`] implementation for a name it cannot resolve
#[derive(Debug, thiserror::Error)]
#[error("unknown callback '{name}'")]
pub struct UnknownCallback {
    pub name: String,
}

/// Build the error a [`Callbacks`] implementation returns for an unknown name
pub fn unknown_callback(name: &str) -> anyhow::Error {
    anyhow::Error::new(UnknownCallback {
        name: name.to_string(),
    })
}

/// Callbacks for callers that only use early-bound hooks
pub struct NoCallbacks;

#[async_trait]
impl Callbacks for NoCallbacks {
    async fn call(&self, name: &str, _ctx: &ExecutionContext) -> anyhow::Result<HookSignal> {
        Err(unknown_callback(name))
    }
}

/// What a registered hook invokes
#[derive(Clone)]
pub enum HookTarget {
    /// Early-bound `before`/`after` hook
    Hook(Arc<dyn Hook>),
    /// Early-bound `around` hook
    Around(Arc<dyn AroundHook>),
    /// Late-bound symbol resolved through [`Callbacks`] at run time
    Named(String),
}

impl HookTarget {
    pub fn hook(hook: impl Hook + 'static) -> Self {
        HookTarget::Hook(Arc::new(hook))
    }

    pub fn around(hook: impl AroundHook + 'static) -> Self {
        HookTarget::Around(Arc::new(hook))
    }

    pub fn named(name: impl Into<String>) -> Self {
        HookTarget::Named(name.into())
    }

    /// Early-bind a synchronous closure as a `before`/`after` hook
    pub fn from_fn<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&ExecutionContext) -> anyhow::Result<HookSignal> + Send + Sync + 'static,
    {
        HookTarget::Hook(Arc::new(FnHook {
            name: name.into(),
            f,
        }))
    }

    /// Name the hook is logged and listed under
    pub fn name(&self) -> &str {
        match self {
            HookTarget::Hook(hook) => hook.name(),
            HookTarget::Around(hook) => hook.name(),
            HookTarget::Named(name) => name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            HookTarget::Hook(hook) => hook.description(),
            HookTarget::Around(hook) => hook.description(),
            HookTarget::Named(_) => "Resolved by the running variant",
        }
    }

    pub fn is_late_bound(&self) -> bool {
        matches!(self, HookTarget::Named(_))
    }

    /// Whether this target can occupy a slot of the given kind
    pub fn fits(&self, kind: HookKind) -> bool {
        match self {
            HookTarget::Named(_) => true,
            HookTarget::Hook(_) => kind != HookKind::Around,
            HookTarget::Around(_) => kind == HookKind::Around,
        }
    }
}

impl fmt::Debug for HookTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookTarget::Hook(hook) => f.debug_tuple("Hook").field(&hook.name()).finish(),
            HookTarget::Around(hook) => f.debug_tuple("Around").field(&hook.name()).finish(),
            HookTarget::Named(name) => f.debug_tuple("Named").field(name).finish(),
        }
    }
}

/// Closure-backed hook created by [`HookTarget::from_fn`]
struct FnHook<F> {
    name: String,
    f: F,
}

#[async_trait]
impl<F> Hook for FnHook<F>
where
    F: Fn(&ExecutionContext) -> anyhow::Result<HookSignal> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<HookSignal> {
        (self.f)(ctx)
    }
}

/// Condition deciding whether a hook runs for a given invocation
#[derive(Clone)]
pub enum HookCondition {
    /// Early-bound predicate over the context
    If(Arc<dyn Fn(&ExecutionContext) -> bool + Send + Sync>),
    /// Run only if the named check holds
    IfNamed(String),
    /// Run only if the named check does not hold
    UnlessNamed(String),
}

impl HookCondition {
    pub fn when<F>(predicate: F) -> Self
    where
        F: Fn(&ExecutionContext) -> bool + Send + Sync + 'static,
    {
        HookCondition::If(Arc::new(predicate))
    }

    pub fn if_named(name: impl Into<String>) -> Self {
        HookCondition::IfNamed(name.into())
    }

    pub fn unless_named(name: impl Into<String>) -> Self {
        HookCondition::UnlessNamed(name.into())
    }
}

impl fmt::Debug for HookCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookCondition::If(_) => f.write_str("If(<predicate>)"),
            HookCondition::IfNamed(name) => f.debug_tuple("IfNamed").field(name).finish(),
            HookCondition::UnlessNamed(name) => f.debug_tuple("UnlessNamed").field(name).finish(),
        }
    }
}
