// Library exports for lifecycle-hooks
// This allows the modules to be imported in tests and external code

pub mod config;
pub mod demo;
pub mod error;
pub mod hooks;

pub use error::{LifecycleError, Result};
pub use hooks::{
    AbortPolicy, Callbacks, HookKind, HookRegistry, HookSignal, HookTarget, LifecycleEngine,
    RunOutcome,
};
