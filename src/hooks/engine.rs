//! Execution Engine
//!
//! Runs a lifecycle: `before` hooks in registration order, then the body
//! wrapped by the `around` chain, then `after` hooks. A `before` hook that
//! signals abort stops the phase and skips the body; whether `after` hooks
//! still run is decided by the lifecycle's [`AbortPolicy`].

use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::registry::{HookDescriptor, HookRegistry};
use super::target::{Callbacks, HookCondition, HookTarget, NoCallbacks, UnknownCallback};
use super::types::{AbortInfo, AbortPolicy, ExecutionContext, HookKind, HookSignal, RunOutcome};
use crate::error::{LifecycleError, Result};

type BodyFn<'a> = Box<dyn FnOnce() -> BoxFuture<'a, Result<()>> + Send + 'a>;

/// Bookkeeping shared by the layers of one around chain
#[derive(Default)]
struct ChainState {
    body_ran: AtomicBool,
    body_failed: AtomicBool,
    /// Innermost around hook that returned without continuing, or outermost
    /// around hook that returned `Ok` over a failed body
    stopped_by: Mutex<Option<String>>,
}

impl ChainState {
    fn record_stop(&self, hook: &str) {
        let body_ran = self.body_ran.load(Ordering::SeqCst);
        let body_failed = self.body_failed.load(Ordering::SeqCst);
        if body_ran && !body_failed {
            return;
        }

        let mut stopped_by = self
            .stopped_by
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Layers return innermost first; a swallowed failure is blamed on the
        // last layer to return
        if stopped_by.is_none() || body_failed {
            *stopped_by = Some(hook.to_string());
        }
    }

    /// Why the chain finished without a body value
    fn into_abort(self) -> AbortInfo {
        let body_ran = self.body_ran.into_inner();
        let hook = self
            .stopped_by
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .unwrap_or_default();
        let reason = if body_ran {
            format!("around hook '{}' discarded the body's error", hook)
        } else {
            format!("around hook '{}' did not continue", hook)
        };
        AbortInfo {
            hook,
            kind: HookKind::Around,
            reason,
        }
    }
}

/// The rest of a lifecycle pipeline, handed to `around` hooks
///
/// Consumed by [`Next::run`]; an around hook that drops it instead halts the
/// lifecycle.
pub struct Next<'a> {
    chain: &'a [HookDescriptor],
    callbacks: &'a dyn Callbacks,
    ctx: &'a ExecutionContext,
    body: BodyFn<'a>,
    state: &'a ChainState,
}

impl<'a> Next<'a> {
    /// Context of the invocation being wrapped
    pub fn context(&self) -> &ExecutionContext {
        self.ctx
    }

    /// Run the remaining around hooks and then the body
    pub async fn run(self) -> Result<()> {
        self.proceed().await
    }

    fn proceed(self) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let Next {
                chain,
                callbacks,
                ctx,
                body,
                state,
            } = self;

            let Some((descriptor, rest)) = chain.split_first() else {
                state.body_ran.store(true, Ordering::SeqCst);
                let result = body().await;
                if result.is_err() {
                    state.body_failed.store(true, Ordering::SeqCst);
                }
                return result;
            };

            let next = Next {
                chain: rest,
                callbacks,
                ctx,
                body,
                state,
            };

            if !condition_holds(descriptor, callbacks, ctx).await? {
                tracing::debug!(
                    lifecycle = %ctx.lifecycle,
                    hook = descriptor.name(),
                    "Skipping around hook, condition not met"
                );
                return next.proceed().await;
            }

            tracing::debug!(
                lifecycle = %ctx.lifecycle,
                invocation = %ctx.invocation_id,
                hook = descriptor.name(),
                ordinal = descriptor.ordinal,
                "Running around hook"
            );

            let result = match &descriptor.target {
                HookTarget::Around(hook) => hook.around(next).await,
                HookTarget::Named(name) => callbacks.call_around(name, next).await,
                // HookRegistry::insert rejects targets that do not fit the slot
                HookTarget::Hook(_) => unreachable!("plain hook in an around slot"),
            };

            match result {
                Ok(()) => {
                    state.record_stop(descriptor.name());
                    Ok(())
                }
                Err(err) => Err(hook_error(err, descriptor, ctx)),
            }
        })
    }
}

/// Runs lifecycles against a frozen [`HookRegistry`]
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct LifecycleEngine {
    registry: Arc<HookRegistry>,
}

impl HookRegistry {
    /// Freeze the registry and start executing lifecycles
    pub fn into_engine(self) -> LifecycleEngine {
        LifecycleEngine::new(self)
    }
}

impl LifecycleEngine {
    pub fn new(registry: HookRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The registry this engine runs, read-only
    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }

    /// Run a lifecycle whose hooks are all early-bound
    pub async fn run<T, F, Fut>(&self, name: &str, body: F) -> Result<RunOutcome<T>>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<T>> + Send,
    {
        self.run_with(name, &NoCallbacks, body).await
    }

    /// Run a lifecycle, resolving late-bound hooks against `callbacks`
    pub async fn run_with<T, F, Fut>(
        &self,
        name: &str,
        callbacks: &dyn Callbacks,
        body: F,
    ) -> Result<RunOutcome<T>>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<T>> + Send,
    {
        self.run_with_metadata(name, callbacks, HashMap::new(), body)
            .await
    }

    /// Run a lifecycle with caller metadata visible to every hook
    pub async fn run_with_metadata<T, F, Fut>(
        &self,
        name: &str,
        callbacks: &dyn Callbacks,
        metadata: HashMap<String, String>,
        body: F,
    ) -> Result<RunOutcome<T>>
    where
        T: Send,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = anyhow::Result<T>> + Send,
    {
        let phase_set = self
            .registry
            .phase_set(name)
            .ok_or_else(|| LifecycleError::UnknownLifecycle {
                name: name.to_string(),
            })?;

        let mut ctx = ExecutionContext::new(name);
        ctx.metadata = metadata;

        tracing::debug!(
            lifecycle = name,
            invocation = %ctx.invocation_id,
            "Running lifecycle"
        );

        // Before phase: stop at the first abort
        for descriptor in self.registry.hooks_for(name, HookKind::Before) {
            if !condition_holds(descriptor, callbacks, &ctx).await? {
                continue;
            }
            if let HookSignal::Abort(reason) = call_hook(descriptor, callbacks, &ctx).await? {
                tracing::info!(
                    lifecycle = name,
                    invocation = %ctx.invocation_id,
                    hook = descriptor.name(),
                    "Lifecycle aborted: {}",
                    reason
                );
                ctx.mark_aborted(AbortInfo {
                    hook: descriptor.name().to_string(),
                    kind: HookKind::Before,
                    reason,
                });
                break;
            }
        }

        // Body, wrapped by the around chain
        let outcome = match ctx.abort.clone() {
            Some(info) => RunOutcome::Aborted(info),
            None => {
                let mut value: Option<T> = None;
                let state = ChainState::default();
                {
                    let slot = &mut value;
                    let lifecycle = name.to_string();
                    let wrapped: BodyFn<'_> = Box::new(move || {
                        async move {
                            tracing::debug!(lifecycle = %lifecycle, "Running body");
                            let result = body().await.map_err(|source| {
                                LifecycleError::BodyFailed {
                                    lifecycle: lifecycle.clone(),
                                    source,
                                }
                            })?;
                            *slot = Some(result);
                            Ok::<(), LifecycleError>(())
                        }
                        .boxed()
                    });
                    let next = Next {
                        chain: self.registry.hooks_for(name, HookKind::Around),
                        callbacks,
                        ctx: &ctx,
                        body: wrapped,
                        state: &state,
                    };
                    next.run().await?;
                }

                match value {
                    Some(value) => RunOutcome::Completed(value),
                    None => {
                        let info = state.into_abort();
                        tracing::info!(
                            lifecycle = name,
                            invocation = %ctx.invocation_id,
                            hook = %info.hook,
                            "Around hook stopped lifecycle: {}",
                            info.reason
                        );
                        ctx.mark_aborted(info.clone());
                        RunOutcome::Aborted(info)
                    }
                }
            }
        };

        // After phase
        let skip_after = ctx.aborted && phase_set.abort_policy == AbortPolicy::SkipAfterOnAbort;
        if skip_after {
            tracing::debug!(
                lifecycle = name,
                invocation = %ctx.invocation_id,
                "Skipping after hooks of aborted lifecycle"
            );
        } else {
            for descriptor in self.registry.hooks_for(name, HookKind::After) {
                if !condition_holds(descriptor, callbacks, &ctx).await? {
                    continue;
                }
                if let HookSignal::Abort(reason) = call_hook(descriptor, callbacks, &ctx).await? {
                    tracing::warn!(
                        lifecycle = name,
                        invocation = %ctx.invocation_id,
                        hook = descriptor.name(),
                        "Ignoring abort from after hook: {}",
                        reason
                    );
                    ctx.after_aborts.push(AbortInfo {
                        hook: descriptor.name().to_string(),
                        kind: HookKind::After,
                        reason,
                    });
                }
            }
        }

        Ok(outcome)
    }
}

/// Invoke a `before`/`after` hook target
async fn call_hook(
    descriptor: &HookDescriptor,
    callbacks: &dyn Callbacks,
    ctx: &ExecutionContext,
) -> Result<HookSignal> {
    tracing::debug!(
        lifecycle = %ctx.lifecycle,
        invocation = %ctx.invocation_id,
        hook = descriptor.name(),
        kind = %descriptor.kind,
        ordinal = descriptor.ordinal,
        "Running hook"
    );

    let result = match &descriptor.target {
        HookTarget::Hook(hook) => hook.execute(ctx).await,
        HookTarget::Named(name) => callbacks.call(name, ctx).await,
        // HookRegistry::insert rejects targets that do not fit the slot
        HookTarget::Around(_) => unreachable!("around hook in a {} slot", descriptor.kind),
    };

    result.map_err(|err| hook_error(err, descriptor, ctx))
}

async fn condition_holds(
    descriptor: &HookDescriptor,
    callbacks: &dyn Callbacks,
    ctx: &ExecutionContext,
) -> Result<bool> {
    let (name, expected) = match &descriptor.condition {
        None => return Ok(true),
        Some(HookCondition::If(predicate)) => return Ok(predicate(ctx)),
        Some(HookCondition::IfNamed(name)) => (name, true),
        Some(HookCondition::UnlessNamed(name)) => (name, false),
    };

    match callbacks.check(name, ctx).await {
        Ok(holds) => Ok(holds == expected),
        Err(err) => Err(match err.downcast::<UnknownCallback>() {
            Ok(unknown) => LifecycleError::UnresolvedCallback {
                lifecycle: ctx.lifecycle.clone(),
                kind: descriptor.kind,
                name: unknown.name,
            },
            Err(source) => LifecycleError::HookFailed {
                lifecycle: ctx.lifecycle.clone(),
                hook: name.clone(),
                kind: descriptor.kind,
                source,
            },
        }),
    }
}

/// Map a hook's error onto the engine's taxonomy
///
/// Errors that already are [`LifecycleError`]s (an around hook forwarding the
/// failure of the pipeline it wraps) pass through unchanged.
fn hook_error(
    err: anyhow::Error,
    descriptor: &HookDescriptor,
    ctx: &ExecutionContext,
) -> LifecycleError {
    let err = match err.downcast::<LifecycleError>() {
        Ok(inner) => return inner,
        Err(err) => err,
    };

    match err.downcast::<UnknownCallback>() {
        Ok(unknown) => LifecycleError::UnresolvedCallback {
            lifecycle: ctx.lifecycle.clone(),
            kind: descriptor.kind,
            name: unknown.name,
        },
        Err(source) => LifecycleError::HookFailed {
            lifecycle: ctx.lifecycle.clone(),
            hook: descriptor.name().to_string(),
            kind: descriptor.kind,
            source,
        },
    }
}
