//! Built-in Hooks
//!
//! Pre-built hooks that provide common functionality:
//! - GuardHook: Aborts the lifecycle when a predicate returns false
//! - TracingHook: Logs each time a phase is reached
//! - TimingHook: Measures how long the wrapped pipeline takes

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use super::engine::Next;
use super::target::{AroundHook, Hook};
use super::types::{ExecutionContext, HookSignal};

/// Hook that turns a boolean check into an abort signal
///
/// Lets validation written as "return false to stop" run through the
/// signal-based engine.
pub struct GuardHook<F> {
    name: String,
    reason: String,
    check: F,
}

impl<F> GuardHook<F>
where
    F: Fn(&ExecutionContext) -> bool + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        let name = name.into();
        Self {
            reason: format!("guard '{}' returned false", name),
            name,
            check,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

#[async_trait]
impl<F> Hook for GuardHook<F>
where
    F: Fn(&ExecutionContext) -> bool + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<HookSignal> {
        if (self.check)(ctx) {
            Ok(HookSignal::Continue)
        } else {
            Ok(HookSignal::abort(self.reason.clone()))
        }
    }

    fn description(&self) -> &str {
        "Aborts the lifecycle when its check returns false"
    }
}

/// Hook that logs the phase it is attached to and counts its calls
pub struct TracingHook {
    name: String,
    calls: AtomicUsize,
}

impl TracingHook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many times this hook has run
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Hook for TracingHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(&self, ctx: &ExecutionContext) -> anyhow::Result<HookSignal> {
        let count = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            lifecycle = %ctx.lifecycle,
            invocation = %ctx.invocation_id,
            hook = %self.name,
            count,
            "Reached hook"
        );
        Ok(HookSignal::Continue)
    }

    fn description(&self) -> &str {
        "Logs each time the lifecycle reaches this hook"
    }
}

/// Around hook that logs how long the rest of the pipeline took
pub struct TimingHook {
    name: String,
}

impl TimingHook {
    pub fn new() -> Self {
        Self {
            name: "timing".to_string(),
        }
    }
}

impl Default for TimingHook {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AroundHook for TimingHook {
    fn name(&self) -> &str {
        &self.name
    }

    async fn around(&self, next: Next<'_>) -> anyhow::Result<()> {
        let lifecycle = next.context().lifecycle.clone();
        let invocation = next.context().invocation_id;
        let started = Instant::now();

        let result = next.run().await;

        tracing::info!(
            lifecycle = %lifecycle,
            invocation = %invocation,
            elapsed_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "Lifecycle body finished"
        );
        result?;
        Ok(())
    }

    fn description(&self) -> &str {
        "Logs how long the wrapped pipeline takes"
    }
}
