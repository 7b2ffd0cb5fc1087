// crates/wayforge-core/src/lifecycle.rs
// ============================================================================
// Module: Lifecycle Targets
// Description: Runs activated final and build-failure targets after the main
// build completes.
// Purpose: Give build scripts a place to always run cleanup, and a separate
// place to run only when something went wrong.
// Dependencies: crate::registry, crate::context, crate::runner::driver
// ============================================================================

//! ## Overview
//! Final and build-failure targets sit outside the main dependency graph:
//! they are not reached by [`crate::graph::compute_plan`] and are instead
//! run directly by [`run_lifecycle_targets`] once the main run has settled
//! into a [`crate::trace::BuildState`]. Build-failure targets run only when
//! that state is [`crate::trace::BuildState::Failure`]; final targets always
//! run, even after cancellation, so that cleanup still happens. Both groups
//! run in alphabetical name order, which is arbitrary but deterministic.
//!
//! A lifecycle target's own outcome is recorded into the run's
//! [`TargetContext`] for reporting, but never revises the already-decided
//! overall [`crate::trace::BuildState`] — that value describes the main
//! build, not the cleanup pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use crate::context::CancellationToken;
use crate::context::TargetContext;
use crate::registry::Registry;
use crate::runner::driver::execute_target;
use crate::trace::BuildState;
use crate::trace::Tracer;

// ============================================================================
// SECTION: Lifecycle Execution
// ============================================================================

/// Runs every activated build-failure target (only if `state` is
/// [`BuildState::Failure`]) followed by every activated final target
/// (always), recording their outcomes into `context`.
pub fn run_lifecycle_targets(
    registry: &Registry,
    context: &mut TargetContext,
    state: BuildState,
    cancellation: &CancellationToken,
    tracer: &dyn Tracer,
) {
    if matches!(state, BuildState::Failure) {
        run_activated(registry, context, registry.active_build_failure_targets(), cancellation, tracer);
    }
    run_activated(registry, context, registry.active_final_targets(), cancellation, tracer);
}

/// Runs each canonical name in `names`, sorted, skipping any that already
/// have a recorded result (a lifecycle target also reachable from the main
/// plan, which should not run twice).
fn run_activated(
    registry: &Registry,
    context: &mut TargetContext,
    mut names: Vec<String>,
    cancellation: &CancellationToken,
    tracer: &dyn Tracer,
) {
    names.sort();
    for canonical_name in names {
        if context.is_complete(&canonical_name) {
            continue;
        }
        let target = registry.get_canonical(&canonical_name).expect("activation only names known targets");
        let result = execute_target(target, context, cancellation, tracer);
        context.record(canonical_name, result);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
