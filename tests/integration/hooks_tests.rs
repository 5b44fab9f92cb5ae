//! Integration tests for the Hooks registry
//!
//! Tests lifecycle definition, hook registration and the built-in hooks.

use anyhow::Result;
use lifecycle_hooks::hooks::{
    AbortPolicy, ExecutionContext, GuardHook, HookCondition, HookKind, HookRegistry,
    HookTarget, RunOutcome, TimingHook,
};
use lifecycle_hooks::LifecycleError;

use crate::common::*;

#[test]
fn test_registry_creation() {
    let registry = HookRegistry::new();

    // New registry should have no lifecycles
    assert!(registry.lifecycles().is_empty());
    assert!(registry.list_hooks("execute").is_empty());
}

#[test]
fn test_configuration_errors() -> Result<()> {
    let mut registry = execute_registry(AbortPolicy::None);

    let duplicate = registry
        .define_lifecycle("execute", AbortPolicy::None)
        .unwrap_err();
    assert!(duplicate.is_configuration_error());
    assert_eq!(duplicate.to_string(), "Lifecycle 'execute' is already defined");

    let unknown = registry
        .add_hook("save", HookKind::After, HookTarget::named("sync_method"))
        .unwrap_err();
    assert!(matches!(unknown, LifecycleError::UnknownLifecycle { ref name } if name == "save"));

    let mismatch = registry
        .add_hook("execute", HookKind::Before, HookTarget::around(TimingHook::new()))
        .unwrap_err();
    assert!(matches!(mismatch, LifecycleError::TargetKindMismatch { .. }));

    Ok(())
}

#[test]
fn test_hooks_for_preserves_order_per_kind() {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    for name in ["b1", "b2", "b3"] {
        add(&mut registry, HookKind::Before, trail.pass(name));
    }
    add(&mut registry, HookKind::Around, HookTarget::around(TimingHook::new()));

    let before: Vec<_> = registry
        .hooks_for("execute", HookKind::Before)
        .iter()
        .map(|d| d.name().to_string())
        .collect();
    assert_eq!(before, vec!["b1", "b2", "b3"]);

    let around = registry.hooks_for("execute", HookKind::Around);
    assert_eq!(around.len(), 1);
    assert_eq!(around[0].ordinal, 3);
    assert_eq!(around[0].lifecycle, "execute");
    assert!(registry.hooks_for("execute", HookKind::After).is_empty());

    // Reading hooks has no side effects
    assert!(trail.calls().is_empty());
}

#[test]
fn test_hook_descriptions() {
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Around, HookTarget::around(TimingHook::new()));

    assert_eq!(
        registry.hook_description("execute", "timing").as_deref(),
        Some("Logs how long the wrapped pipeline takes")
    );
    assert!(registry.hook_description("execute", "missing").is_none());
}

#[tokio::test]
async fn test_guard_hook_halts_lifecycle() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::SkipAfterOnAbort);
    add(
        &mut registry,
        HookKind::Before,
        HookTarget::hook(GuardHook::new("valid?", |ctx: &ExecutionContext| {
            ctx.metadata("ready") == Some("true")
        })),
    );
    add(&mut registry, HookKind::After, trail.pass("sync"));
    let engine = registry.into_engine();

    let outcome = engine.run("execute", || async { Ok("ran") }).await?;
    match outcome {
        RunOutcome::Aborted(info) => {
            assert_eq!(info.hook, "valid?");
            assert_eq!(info.reason, "guard 'valid?' returned false");
        }
        other => panic!("Expected aborted outcome, got: {:?}", other),
    }
    assert!(trail.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_conditional_after_hook() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    registry.add_hook_if(
        "execute",
        HookKind::After,
        trail.pass("notify"),
        HookCondition::when(|ctx| !ctx.aborted),
    )?;
    add(&mut registry, HookKind::Before, trail.abort("valid?"));
    let engine = registry.into_engine();

    let outcome = engine.run("execute", || async { Ok(()) }).await?;

    // The after phase ran, but the condition saw the abort
    assert!(outcome.is_aborted());
    assert_eq!(trail.calls(), vec!["valid?"]);

    Ok(())
}
