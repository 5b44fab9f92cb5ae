//! Hooks System
//!
//! Declarative before / after / around hooks attached to named lifecycles.
//! Lifecycles and hooks are registered on a [`HookRegistry`] during
//! configuration; the registry is then frozen into a [`LifecycleEngine`]
//! which runs the pipeline for each invocation.

pub mod builtin;
pub mod engine;
pub mod registry;
pub mod target;
pub mod types;

pub use builtin::{GuardHook, TimingHook, TracingHook};
pub use engine::{LifecycleEngine, Next};
pub use registry::{HookDescriptor, HookRegistry};
pub use target::{
    unknown_callback, AroundHook, Callbacks, Hook, HookCondition, HookTarget, NoCallbacks,
    UnknownCallback,
};
pub use types::{
    AbortInfo, AbortPolicy, ExecutionContext, HookKind, HookSignal, PhaseSet, RunOutcome,
};
