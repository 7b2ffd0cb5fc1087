// crates/wayforge-core/src/runner/sequential.rs
// ============================================================================
// Module: Sequential Runner
// Description: Executes a BuildPlan one target at a time, layer by layer.
// Purpose: The default execution mode, and the reference semantics the
// parallel coordinator must reproduce for any given plan.
// Dependencies: crate::graph, crate::runner::driver
// ============================================================================

//! ## Overview
//! [`run_sequential`] walks a [`BuildPlan`]'s layers in order and each
//! layer's targets in canonical-name order, which is immaterial for
//! correctness (no two targets in a layer depend on each other) but keeps
//! output deterministic. Before a target runs, the context's global
//! [`TargetContext::has_error`] flag is consulted: once any target anywhere
//! in the run has failed, every target not yet started is skipped, not just
//! its dependents. This is a blunter rule than "skip on a failed hard
//! dependency" and supersedes it outright.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::context::CancellationToken;
use crate::context::TargetContext;
use crate::context::TargetOutcome;
use crate::graph::BuildPlan;
use crate::registry::Registry;
use crate::runner::driver::execute_target;
use crate::runner::driver::skip_target;
use crate::trace::BuildState;
use crate::trace::Tracer;

// ============================================================================
// SECTION: Sequential Execution
// ============================================================================

/// Runs every target in `plan` sequentially against `registry`, returning
/// the accumulated [`TargetContext`] and the run's overall [`BuildState`].
pub fn run_sequential(
    registry: &Registry,
    plan: &BuildPlan,
    cancellation: &CancellationToken,
    tracer: &dyn Tracer,
    arguments: Vec<String>,
) -> (TargetContext, BuildState) {
    let mut context = TargetContext::with_arguments(arguments);
    let mut any_failure = false;

    for layer in plan.layers() {
        for canonical_name in layer {
            let target = registry.get_canonical(canonical_name).expect("plan only names known targets");

            let outcome = if cancellation.is_cancelled() {
                Some(TargetOutcome::Cancelled)
            } else if context.has_error() {
                Some(TargetOutcome::Skipped)
            } else {
                None
            };

            let result = match outcome {
                Some(outcome) => skip_target(target, outcome),
                None => execute_target(target, &context, cancellation, tracer),
            };
            if result.outcome().is_failure() {
                any_failure = true;
            }
            context.record(canonical_name.clone(), result);
        }
    }

    let state = if cancellation.is_cancelled() {
        BuildState::Cancelled
    } else if any_failure {
        BuildState::Failure
    } else {
        BuildState::Ok
    };

    (context, state)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::compute_plan;
    use crate::trace::NullTracer;

    #[test]
    fn diamond_build_runs_all_targets_in_order() {
        let mut registry = Registry::new();
        for name in ["Compile", "Test", "Lint", "Deploy"] {
            registry.create(name, |_| Ok(())).unwrap();
        }
        registry.add_dependency("Test", "Compile").unwrap();
        registry.add_dependency("Lint", "Compile").unwrap();
        registry.add_dependency("Deploy", "Test").unwrap();
        registry.add_dependency("Deploy", "Lint").unwrap();

        let plan = compute_plan(&registry, "Deploy").unwrap();
        let cancellation = CancellationToken::new();
        let (context, state) = run_sequential(&registry, &plan, &cancellation, &NullTracer, Vec::new());

        assert!(matches!(state, BuildState::Ok));
        assert_eq!(context.len(), 4);
        assert!(context.succeeded("deploy"));
    }

    #[test]
    fn failure_skips_dependents() {
        let mut registry = Registry::new();
        registry.create("Compile", |_| Err("boom".into())).unwrap();
        registry.create("Test", |_| Ok(())).unwrap();
        registry.add_dependency("Test", "Compile").unwrap();

        let plan = compute_plan(&registry, "Test").unwrap();
        let cancellation = CancellationToken::new();
        let (context, state) = run_sequential(&registry, &plan, &cancellation, &NullTracer, Vec::new());

        assert!(matches!(state, BuildState::Failure));
        assert!(context.result("compile").unwrap().outcome().is_failure());
        assert!(matches!(context.result("test").unwrap().outcome(), TargetOutcome::Skipped));
    }

    #[test]
    fn failure_skips_every_unstarted_target_even_without_a_dependency_relationship() {
        // Compile and Unrelated share no dependency edge at all; both are
        // merely pulled in by Root. Compile runs first within the layer
        // (canonical-name order puts "compile" before "unrelated") and
        // fails, so Unrelated is skipped too, purely because the context is
        // now in error, not because of anything Unrelated depends on.
        let mut registry = Registry::new();
        registry.create("Compile", |_| Err("boom".into())).unwrap();
        registry.create("Unrelated", |_| Ok(())).unwrap();
        registry.create("Root", |_| Ok(())).unwrap();
        registry.add_dependency("Root", "Compile").unwrap();
        registry.add_dependency("Root", "Unrelated").unwrap();

        let plan = compute_plan(&registry, "Root").unwrap();
        let cancellation = CancellationToken::new();
        let (context, state) = run_sequential(&registry, &plan, &cancellation, &NullTracer, Vec::new());

        assert!(matches!(state, BuildState::Failure));
        assert!(context.result("compile").unwrap().outcome().is_failure());
        assert!(matches!(context.result("unrelated").unwrap().outcome(), TargetOutcome::Skipped));
        assert!(matches!(context.result("root").unwrap().outcome(), TargetOutcome::Skipped));
    }

    #[test]
    fn pre_cancelled_token_skips_every_target() {
        let mut registry = Registry::new();
        registry.create("Build", |_| Ok(())).unwrap();
        let plan = compute_plan(&registry, "Build").unwrap();
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let (context, state) = run_sequential(&registry, &plan, &cancellation, &NullTracer, Vec::new());
        assert!(matches!(state, BuildState::Cancelled));
        assert!(matches!(context.result("build").unwrap().outcome(), TargetOutcome::Cancelled));
    }

    #[test]
    fn arguments_are_visible_to_target_bodies() {
        let mut registry = Registry::new();
        registry
            .create("Build", |parameter| {
                if parameter.context().arguments() == ["--release"] {
                    Ok(())
                } else {
                    Err("expected --release".into())
                }
            })
            .unwrap();
        let plan = compute_plan(&registry, "Build").unwrap();
        let cancellation = CancellationToken::new();
        let (context, state) =
            run_sequential(&registry, &plan, &cancellation, &NullTracer, vec!["--release".to_string()]);

        assert!(matches!(state, BuildState::Ok));
        assert!(context.succeeded("build"));
    }
}
