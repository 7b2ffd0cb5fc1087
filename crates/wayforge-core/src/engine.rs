// crates/wayforge-core/src/engine.rs
// ============================================================================
// Module: Engine
// Description: The top-level facade tying declaration, planning, execution,
// and lifecycle targets together into one run.
// Purpose: Give the CLI (and any other embedder) a single entry point
// instead of wiring the registry, graph, runner, and lifecycle modules by
// hand.
// Dependencies: crate::{registry, graph, runner, lifecycle, context, trace,
// error}
// ============================================================================

//! ## Overview
//! [`Engine`] owns the [`Registry`] for the lifetime of a build script: a
//! caller declares every target through [`Engine::registry_mut`], then calls
//! [`Engine::run`] once with the chosen root target. `run` ensures no
//! description was left pending, computes (or bypasses, for `single-target`
//! mode) the build plan, executes it sequentially or in parallel, and
//! finally runs any activated lifecycle targets before returning a
//! [`RunOutcome`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use crate::context::CancellationToken;
use crate::context::TargetContext;
use crate::error::EngineError;
use crate::graph::compute_plan;
use crate::graph::BuildPlan;
use crate::lifecycle::run_lifecycle_targets;
use crate::registry::Registry;
use crate::runner::coordinator::run_parallel;
use crate::runner::sequential::run_sequential;
use crate::trace::BuildState;
use crate::trace::Tracer;

// ============================================================================
// SECTION: Run Outcome
// ============================================================================

/// Everything produced by one [`Engine::run`] call.
#[derive(Debug)]
pub struct RunOutcome {
    /// The plan that was executed. `None` for `single-target` runs, which
    /// bypass planning entirely.
    pub plan: Option<BuildPlan>,
    /// Every target's terminal result, including any lifecycle targets.
    pub context: TargetContext,
    /// The main build's overall state (lifecycle target outcomes do not
    /// revise this).
    pub state: BuildState,
}

// ============================================================================
// SECTION: Engine
// ============================================================================

/// Owns target declarations and drives runs against them.
pub struct Engine {
    /// Declared targets, dependencies, and lifecycle activations.
    registry: Registry,
    /// Trace channel every run reports through.
    tracer: Arc<dyn Tracer>,
}

impl Engine {
    /// Creates an engine with an empty registry.
    #[must_use]
    pub fn new(tracer: Arc<dyn Tracer>) -> Self {
        Self { registry: Registry::new(), tracer }
    }

    /// Borrows the registry for declaring targets.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Borrows the registry read-only, for introspection (`--list`, report
    /// rendering).
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Runs `target` to completion.
    ///
    /// `parallelism` selects the execution strategy: `None` runs the plan
    /// sequentially; `Some(workers)` runs it through the parallel
    /// coordinator with that many concurrent workers. Ignored when
    /// `single_target` is set, since a lone target has nothing to
    /// parallelize against. `arguments` is the CLI's trailing
    /// `-- <scriptargs>...` tail, forwarded verbatim to every target body via
    /// [`crate::context::TargetParameter::context`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PendingDescriptionAtRunStart`] if a
    /// description was armed but never consumed, any error
    /// [`compute_plan`] can return, or [`EngineError::BuildFailed`] if the
    /// run was not cancelled but at least one target failed.
    pub async fn run(
        &self,
        target: &str,
        parallelism: Option<usize>,
        single_target: bool,
        cancellation: CancellationToken,
        arguments: Vec<String>,
    ) -> Result<RunOutcome, EngineError> {
        self.registry.ensure_no_pending_description()?;

        let plan = if single_target {
            self.registry.get(target)?;
            None
        } else {
            Some(compute_plan(&self.registry, target)?)
        };

        let (mut context, state) = match (&plan, parallelism) {
            (Some(_), Some(workers)) => {
                let registry = Arc::new(self.registry.clone());
                run_parallel(registry, target, workers, cancellation.clone(), Arc::clone(&self.tracer), arguments)
                    .await?
            }
            (Some(plan), None) => run_sequential(&self.registry, plan, &cancellation, self.tracer.as_ref(), arguments),
            (None, _) => {
                let single_plan = BuildPlan::single(target.to_ascii_lowercase());
                run_sequential(&self.registry, &single_plan, &cancellation, self.tracer.as_ref(), arguments)
            }
        };

        run_lifecycle_targets(&self.registry, &mut context, state, &cancellation, self.tracer.as_ref());

        let failed = failed_target_names(&context);
        self.tracer.build_state(state, build_state_message(state, &failed).as_deref());

        if matches!(state, BuildState::Failure) {
            return Err(EngineError::BuildFailed { failed });
        }

        Ok(RunOutcome { plan, context, state })
    }
}

/// Names (original casing) of every target recorded as failed, sorted.
fn failed_target_names(context: &TargetContext) -> Vec<String> {
    let mut names: Vec<String> = context
        .results()
        .filter(|result| result.outcome().is_failure())
        .map(|result| result.name().to_string())
        .collect();
    names.sort();
    names
}

/// Builds the optional message passed to [`Tracer::build_state`].
fn build_state_message(state: BuildState, failed: &[String]) -> Option<String> {
    match state {
        BuildState::Failure if !failed.is_empty() => Some(format!("failed: {}", failed.join(", "))),
        _ => None,
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
