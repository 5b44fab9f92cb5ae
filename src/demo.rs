//! Task variants for the `execute` lifecycle
//!
//! The `execute` lifecycle is configured once with late-bound hooks named
//! `valid?` and `sync_method`. Each [`Task`] implementation supplies its own
//! behavior for those names; [`TaskRunner`] resolves them when the lifecycle
//! runs.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::Result;
use crate::hooks::{
    unknown_callback, Callbacks, ExecutionContext, HookSignal, LifecycleEngine, RunOutcome,
};

pub const EXECUTE: &str = "execute";
pub const VALIDATE_CALLBACK: &str = "valid?";
pub const SYNC_CALLBACK: &str = "sync_method";

/// A unit of work run through the `execute` lifecycle
///
/// `validate` and `sync` have no default body: every variant must provide
/// them.
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// Decide whether the task may run
    fn validate(&self, log: &mut Vec<String>) -> anyhow::Result<HookSignal>;

    /// Work done after the body completed
    fn sync(&self, log: &mut Vec<String>) -> anyhow::Result<()>;

    /// The task body
    fn perform(&self, log: &mut Vec<String>) -> anyhow::Result<String> {
        log.push("in execute body".to_string());
        Ok(format!("{} executed", self.name()))
    }
}

/// Validates and syncs unconditionally
pub struct ChildTask;

impl Task for ChildTask {
    fn name(&self) -> &str {
        "child"
    }

    fn validate(&self, log: &mut Vec<String>) -> anyhow::Result<HookSignal> {
        log.push("in validation".to_string());
        Ok(HookSignal::Continue)
    }

    fn sync(&self, log: &mut Vec<String>) -> anyhow::Result<()> {
        log.push("in sync method".to_string());
        Ok(())
    }
}

/// Always fails validation
pub struct StrictTask;

impl Task for StrictTask {
    fn name(&self) -> &str {
        "strict"
    }

    fn validate(&self, log: &mut Vec<String>) -> anyhow::Result<HookSignal> {
        log.push("in strict validation".to_string());
        Ok(HookSignal::abort("strict task refuses to run"))
    }

    fn sync(&self, log: &mut Vec<String>) -> anyhow::Result<()> {
        log.push("in strict sync".to_string());
        Ok(())
    }
}

/// Validates like [`ChildTask`] but syncs differently
pub struct LenientTask;

impl Task for LenientTask {
    fn name(&self) -> &str {
        "lenient"
    }

    fn validate(&self, log: &mut Vec<String>) -> anyhow::Result<HookSignal> {
        ChildTask.validate(log)
    }

    fn sync(&self, log: &mut Vec<String>) -> anyhow::Result<()> {
        log.push("in lenient sync, nothing to push".to_string());
        Ok(())
    }
}

/// Selectable task variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Variant {
    Child,
    Strict,
    Lenient,
}

impl Variant {
    pub fn task(self) -> Box<dyn Task> {
        match self {
            Variant::Child => Box::new(ChildTask),
            Variant::Strict => Box::new(StrictTask),
            Variant::Lenient => Box::new(LenientTask),
        }
    }
}

/// Result of executing a task: what happened, in order, and the outcome
#[derive(Debug)]
pub struct Execution {
    pub log: Vec<String>,
    pub outcome: RunOutcome<String>,
}

/// Binds a [`Task`] to the late-bound names of the `execute` lifecycle
pub struct TaskRunner<T: Task + ?Sized> {
    task: Box<T>,
    log: Mutex<Vec<String>>,
}

impl<T: Task + ?Sized> TaskRunner<T> {
    pub fn new(task: Box<T>) -> Self {
        Self {
            task,
            log: Mutex::new(Vec::new()),
        }
    }

    fn with_log<R>(&self, f: impl FnOnce(&mut Vec<String>) -> R) -> R {
        let mut log = self.log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut log)
    }

    /// Run the task through the `execute` lifecycle
    pub async fn execute(&self, engine: &LifecycleEngine) -> Result<Execution> {
        self.with_log(Vec::clear);

        let outcome = engine
            .run_with(EXECUTE, self, || async { self.with_log(|log| self.task.perform(log)) })
            .await?;

        Ok(Execution {
            log: self.with_log(std::mem::take),
            outcome,
        })
    }
}

#[async_trait]
impl<T: Task + ?Sized> Callbacks for TaskRunner<T> {
    async fn call(&self, name: &str, _ctx: &ExecutionContext) -> anyhow::Result<HookSignal> {
        match name {
            VALIDATE_CALLBACK => self.with_log(|log| self.task.validate(log)),
            SYNC_CALLBACK => {
                self.with_log(|log| self.task.sync(log))?;
                Ok(HookSignal::Continue)
            }
            _ => Err(unknown_callback(name)),
        }
    }
}
