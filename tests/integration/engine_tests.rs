//! Integration tests for the execution engine
//!
//! Covers ordering, abort semantics under both policies, failure propagation
//! and independence of repeated and concurrent runs.

use anyhow::Result;
use lifecycle_hooks::hooks::{AbortPolicy, HookKind, HookSignal, RunOutcome};
use lifecycle_hooks::LifecycleError;

use crate::common::*;

#[tokio::test]
async fn test_before_body_after_order() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Before, trail.pass("H1"));
    add(&mut registry, HookKind::After, trail.pass("H2"));
    let engine = registry.into_engine();

    let body_trail = trail.clone();
    let outcome = engine
        .run("execute", || async move {
            body_trail.push("body");
            Ok(42)
        })
        .await?;

    assert_eq!(trail.calls(), vec!["H1", "body", "H2"]);
    assert_eq!(outcome, RunOutcome::Completed(42));

    Ok(())
}

#[tokio::test]
async fn test_abort_skips_body_and_after_hooks() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::SkipAfterOnAbort);
    add(&mut registry, HookKind::Before, trail.abort("H1"));
    add(&mut registry, HookKind::After, trail.pass("H2"));
    let engine = registry.into_engine();

    let body_trail = trail.clone();
    let outcome = engine
        .run("execute", || async move {
            body_trail.push("body");
            Ok(42)
        })
        .await?;

    assert_eq!(trail.calls(), vec!["H1"]);
    match outcome {
        RunOutcome::Aborted(info) => {
            assert_eq!(info.hook, "H1");
            assert_eq!(info.kind, HookKind::Before);
            assert_eq!(info.reason, "H1 aborted");
        }
        other => panic!("Expected aborted outcome, got: {:?}", other),
    }

    Ok(())
}

#[tokio::test]
async fn test_abort_stops_remaining_before_hooks() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Before, trail.abort("H1"));
    add(&mut registry, HookKind::Before, trail.pass("H2"));
    let engine = registry.into_engine();

    let outcome = engine.run("execute", || async { Ok(()) }).await?;

    assert!(outcome.is_aborted());
    assert!(!trail.calls().contains(&"H2".to_string()));

    Ok(())
}

#[tokio::test]
async fn test_after_hooks_run_on_abort_with_policy_none() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Before, trail.abort("guard"));
    add(&mut registry, HookKind::After, trail.pass("cleanup"));
    let engine = registry.into_engine();

    let outcome = engine.run("execute", || async { Ok(1) }).await?;

    assert!(outcome.is_aborted());
    assert_eq!(trail.calls(), vec!["guard", "cleanup"]);

    Ok(())
}

#[tokio::test]
async fn test_after_hooks_always_run_without_abort() -> Result<()> {
    for policy in [AbortPolicy::None, AbortPolicy::SkipAfterOnAbort] {
        let trail = Trail::new();
        let mut registry = execute_registry(policy);
        add(&mut registry, HookKind::Before, trail.pass("check"));
        add(&mut registry, HookKind::After, trail.pass("a1"));
        add(&mut registry, HookKind::After, trail.pass("a2"));
        let engine = registry.into_engine();

        let outcome = engine.run("execute", || async { Ok("done") }).await?;

        assert_eq!(outcome.value(), Some(&"done"));
        assert_eq!(trail.calls(), vec!["check", "a1", "a2"]);
    }

    Ok(())
}

#[tokio::test]
async fn test_registration_order_is_execution_order() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    // Interleave kinds to make sure ordering is per kind
    for i in 1..=4 {
        add(&mut registry, HookKind::After, trail.pass(&format!("after-{}", i)));
        add(&mut registry, HookKind::Before, trail.pass(&format!("before-{}", i)));
    }
    let engine = registry.into_engine();

    engine.run("execute", || async { Ok(()) }).await?;

    assert_eq!(
        trail.calls(),
        vec![
            "before-1", "before-2", "before-3", "before-4", "after-1", "after-2", "after-3",
            "after-4",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_after_abort_is_recorded_not_enforced() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::SkipAfterOnAbort);
    add(&mut registry, HookKind::After, trail.abort("a1"));
    add(&mut registry, HookKind::After, trail.pass("a2"));
    let engine = registry.into_engine();

    let outcome = engine.run("execute", || async { Ok(5) }).await?;

    assert_eq!(outcome, RunOutcome::Completed(5));
    assert_eq!(trail.calls(), vec!["a1", "a2"]);

    Ok(())
}

#[tokio::test]
async fn test_unknown_lifecycle_calls_nothing() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Before, trail.pass("H1"));
    let engine = registry.into_engine();

    let body_trail = trail.clone();
    let result = engine
        .run("missing", || async move {
            body_trail.push("body");
            Ok(())
        })
        .await;

    assert!(matches!(
        result,
        Err(LifecycleError::UnknownLifecycle { ref name }) if name == "missing"
    ));
    assert!(trail.calls().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_hook_failure_unwinds_pipeline() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Before, trail.pass("H1"));
    add(
        &mut registry,
        HookKind::Before,
        lifecycle_hooks::HookTarget::from_fn("not_implemented", |_| {
            Err(anyhow::anyhow!("not implemented"))
        }),
    );
    add(&mut registry, HookKind::Before, trail.pass("H3"));
    add(&mut registry, HookKind::After, trail.pass("H4"));
    let engine = registry.into_engine();

    let err = engine.run("execute", || async { Ok(()) }).await.unwrap_err();

    match err {
        LifecycleError::HookFailed {
            hook, kind, source, ..
        } => {
            assert_eq!(hook, "not_implemented");
            assert_eq!(kind, HookKind::Before);
            assert_eq!(source.to_string(), "not implemented");
        }
        other => panic!("Expected HookFailed, got: {:?}", other),
    }
    assert_eq!(trail.calls(), vec!["H1"]);

    // The engine is still usable after a failed invocation
    assert!(engine.registry().contains("execute"));

    Ok(())
}

#[tokio::test]
async fn test_sequential_runs_are_independent() -> Result<()> {
    let trail = Trail::new();
    let mut registry = execute_registry(AbortPolicy::None);
    add(&mut registry, HookKind::Before, trail.pass("H1"));
    add(&mut registry, HookKind::After, trail.pass("H2"));
    let engine = registry.into_engine();

    let first = engine.run("execute", || async { Ok(1) }).await?;
    let first_calls = trail.calls();
    trail.clear();
    let second = engine.run("execute", || async { Ok(1) }).await?;

    assert_eq!(first, second);
    assert_eq!(first_calls, trail.calls());
    assert_eq!(first_calls, vec!["H1", "H2"]);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_runs_do_not_share_abort_state() -> Result<()> {
    let mut registry = execute_registry(AbortPolicy::SkipAfterOnAbort);
    add(
        &mut registry,
        HookKind::Before,
        lifecycle_hooks::HookTarget::from_fn("only_even", |ctx| {
            let n: u32 = ctx.metadata("n").unwrap_or("0").parse()?;
            if n % 2 == 0 {
                Ok(HookSignal::Continue)
            } else {
                Ok(HookSignal::abort("odd"))
            }
        }),
    );
    let engine = registry.into_engine();

    let mut handles = Vec::new();
    for n in 0..8u32 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let metadata = [("n".to_string(), n.to_string())].into_iter().collect();
            engine
                .run_with_metadata(
                    "execute",
                    &lifecycle_hooks::hooks::NoCallbacks,
                    metadata,
                    || async move { Ok(n) },
                )
                .await
        }));
    }

    for (n, handle) in handles.into_iter().enumerate() {
        let outcome = handle.await??;
        if n % 2 == 0 {
            assert_eq!(outcome, RunOutcome::Completed(n as u32));
        } else {
            assert!(outcome.is_aborted());
        }
    }

    Ok(())
}
