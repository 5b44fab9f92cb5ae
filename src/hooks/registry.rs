//! Hook Registry
//!
//! Stores lifecycles and the hooks attached to them. The registry is mutable
//! only while it is being configured; freezing it into a
//! [`LifecycleEngine`](super::LifecycleEngine) moves it behind an `Arc`, after
//! which it is read-only and can be shared by concurrent runs.

use std::collections::HashMap;

use super::target::{HookCondition, HookTarget};
use super::types::{AbortPolicy, HookKind, PhaseSet};
use crate::error::{LifecycleError, Result};

/// One registered hook
#[derive(Debug, Clone)]
pub struct HookDescriptor {
    /// Lifecycle this hook belongs to
    pub lifecycle: String,
    pub kind: HookKind,
    /// Registration order within the lifecycle
    pub ordinal: u64,
    pub target: HookTarget,
    pub condition: Option<HookCondition>,
}

impl HookDescriptor {
    pub fn name(&self) -> &str {
        self.target.name()
    }
}

/// A lifecycle and its hooks, split by kind
#[derive(Debug)]
struct LifecycleEntry {
    phase_set: PhaseSet,
    before: Vec<HookDescriptor>,
    around: Vec<HookDescriptor>,
    after: Vec<HookDescriptor>,
    next_ordinal: u64,
}

impl LifecycleEntry {
    fn slot(&self, kind: HookKind) -> &[HookDescriptor] {
        match kind {
            HookKind::Before => &self.before,
            HookKind::Around => &self.around,
            HookKind::After => &self.after,
        }
    }

    fn slot_mut(&mut self, kind: HookKind) -> &mut Vec<HookDescriptor> {
        match kind {
            HookKind::Before => &mut self.before,
            HookKind::Around => &mut self.around,
            HookKind::After => &mut self.after,
        }
    }
}

/// Registry of lifecycles and their hooks
#[derive(Debug, Default)]
pub struct HookRegistry {
    lifecycles: HashMap<String, LifecycleEntry>,
    /// Definition order, for listing
    order: Vec<String>,
}

impl HookRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a new lifecycle
    pub fn define_lifecycle(&mut self, name: &str, abort_policy: AbortPolicy) -> Result<()> {
        if self.lifecycles.contains_key(name) {
            return Err(LifecycleError::DuplicateLifecycle {
                name: name.to_string(),
            });
        }

        self.lifecycles.insert(
            name.to_string(),
            LifecycleEntry {
                phase_set: PhaseSet {
                    name: name.to_string(),
                    abort_policy,
                },
                before: Vec::new(),
                around: Vec::new(),
                after: Vec::new(),
                next_ordinal: 0,
            },
        );
        self.order.push(name.to_string());
        tracing::debug!(lifecycle = name, ?abort_policy, "Defined lifecycle");
        Ok(())
    }

    /// Append a hook to a lifecycle
    pub fn add_hook(&mut self, name: &str, kind: HookKind, target: HookTarget) -> Result<()> {
        self.insert(name, kind, target, None)
    }

    /// Append a hook that only runs when `condition` holds
    pub fn add_hook_if(
        &mut self,
        name: &str,
        kind: HookKind,
        target: HookTarget,
        condition: HookCondition,
    ) -> Result<()> {
        self.insert(name, kind, target, Some(condition))
    }

    fn insert(
        &mut self,
        name: &str,
        kind: HookKind,
        target: HookTarget,
        condition: Option<HookCondition>,
    ) -> Result<()> {
        let entry = self
            .lifecycles
            .get_mut(name)
            .ok_or_else(|| LifecycleError::UnknownLifecycle {
                name: name.to_string(),
            })?;

        if !target.fits(kind) {
            return Err(LifecycleError::TargetKindMismatch {
                lifecycle: name.to_string(),
                kind,
            });
        }

        let ordinal = entry.next_ordinal;
        entry.next_ordinal += 1;
        tracing::debug!(
            lifecycle = name,
            hook = target.name(),
            %kind,
            ordinal,
            "Registered hook"
        );
        entry.slot_mut(kind).push(HookDescriptor {
            lifecycle: name.to_string(),
            kind,
            ordinal,
            target,
            condition,
        });
        Ok(())
    }

    /// Hooks of one kind for a lifecycle, in execution order
    ///
    /// Empty when nothing is registered, including for undefined lifecycles.
    pub fn hooks_for(&self, name: &str, kind: HookKind) -> &[HookDescriptor] {
        self.lifecycles
            .get(name)
            .map(|entry| entry.slot(kind))
            .unwrap_or(&[])
    }

    /// Look up a lifecycle definition
    pub fn phase_set(&self, name: &str) -> Option<&PhaseSet> {
        self.lifecycles.get(name).map(|entry| &entry.phase_set)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lifecycles.contains_key(name)
    }

    /// All lifecycles, in definition order
    pub fn lifecycles(&self) -> Vec<&PhaseSet> {
        self.order
            .iter()
            .filter_map(|name| self.phase_set(name))
            .collect()
    }

    /// List hooks of a lifecycle as `(name, kind, ordinal)`, phase by phase
    pub fn list_hooks(&self, name: &str) -> Vec<(String, HookKind, u64)> {
        HookKind::all()
            .iter()
            .flat_map(|kind| self.hooks_for(name, *kind))
            .map(|d| (d.name().to_string(), d.kind, d.ordinal))
            .collect()
    }

    /// Get description of a hook by name
    pub fn hook_description(&self, lifecycle: &str, hook: &str) -> Option<String> {
        HookKind::all()
            .iter()
            .flat_map(|kind| self.hooks_for(lifecycle, *kind))
            .find(|d| d.name() == hook)
            .map(|d| d.target.description().to_string())
    }
}
