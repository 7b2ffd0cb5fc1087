// crates/wayforge-core/src/runner/driver.rs
// ============================================================================
// Module: Target Driver
// Description: Single-target execution primitive shared by the sequential
// runner, the parallel coordinator's workers, and the lifecycle targets.
// Purpose: Keep the "how do we run one target body" logic in exactly one
// place.
// Dependencies: crate::context, crate::registry, crate::trace
// ============================================================================

//! ## Overview
//! [`execute_target`] and [`skip_target`] are the two ways a target can
//! reach a terminal [`TargetResult`]: actually invoked, or bypassed because
//! a hard dependency already failed, was skipped itself, or cancellation
//! was observed before it could start. Both paths go through the same
//! [`crate::trace::Tracer`] scope so the trace log reads uniformly
//! regardless of which runner drove it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Instant;

use crate::context::CancellationToken;
use crate::context::RunError;
use crate::context::TargetContext;
use crate::context::TargetOutcome;
use crate::context::TargetParameter;
use crate::context::TargetResult;
use crate::registry::Target;
use crate::trace::Tracer;

// ============================================================================
// SECTION: Dependency String
// ============================================================================

/// Renders a target's effective predecessors as a short, printable summary
/// for trace scopes, e.g. `"compile, lint (soft: notify)"`.
#[must_use]
pub fn dependency_string(target: &Target) -> String {
    let mut parts = Vec::new();
    if !target.dependencies().is_empty() {
        parts.push(target.dependencies().join(", "));
    }
    if !target.soft_dependencies().is_empty() {
        parts.push(format!("(soft: {})", target.soft_dependencies().join(", ")));
    }
    if parts.is_empty() {
        "(none)".to_string()
    } else {
        parts.join(" ")
    }
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// Runs one target's body to completion, producing its [`TargetResult`].
///
/// `context` must reflect every target this one may legally depend on,
/// already completed; the target's body borrows it via [`TargetParameter`].
pub fn execute_target(
    target: &Target,
    context: &TargetContext,
    cancellation: &CancellationToken,
    tracer: &dyn Tracer,
) -> TargetResult {
    let deps = dependency_string(target);
    let scope = tracer.task_start(target.name(), target.description(), &deps);
    let parameter = TargetParameter::new(target.name(), context, cancellation.clone());

    let started = Instant::now();
    let outcome = match (target.function())(&parameter) {
        Ok(()) => {
            scope.mark_success();
            TargetOutcome::Success
        }
        Err(error) => {
            let run_error = RunError::new(error);
            scope.mark_failed(&run_error.to_string());
            TargetOutcome::Failed(run_error)
        }
    };
    let duration = started.elapsed();

    TargetResult::new(target.name(), outcome, duration)
}

/// Produces a terminal result for a target that was never invoked, either
/// because a hard dependency failed or was itself skipped, or because
/// cancellation was observed before the target could start.
#[must_use]
pub fn skip_target(target: &Target, outcome: TargetOutcome) -> TargetResult {
    TargetResult::new(target.name(), outcome, std::time::Duration::ZERO)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;
    use crate::trace::NullTracer;

    #[test]
    fn dependency_string_reports_none_for_plain_target() {
        let mut registry = Registry::new();
        registry.create("Build", |_| Ok(())).unwrap();
        let target = registry.get("Build").unwrap();
        assert_eq!(dependency_string(target), "(none)");
    }

    #[test]
    fn dependency_string_lists_hard_and_soft() {
        let mut registry = Registry::new();
        registry.create("Compile", |_| Ok(())).unwrap();
        registry.create("Notify", |_| Ok(())).unwrap();
        registry.create("Build", |_| Ok(())).unwrap();
        registry.add_dependency("Build", "Compile").unwrap();
        registry.add_soft_dependency("Build", "Notify").unwrap();
        let target = registry.get("Build").unwrap();
        let rendered = dependency_string(target);
        assert!(rendered.contains("Compile"));
        assert!(rendered.contains("soft: Notify"));
    }

    #[test]
    fn execute_target_reports_success() {
        let mut registry = Registry::new();
        registry.create("Build", |_| Ok(())).unwrap();
        let target = registry.get("Build").unwrap();
        let context = TargetContext::new();
        let cancellation = CancellationToken::new();
        let result = execute_target(target, &context, &cancellation, &NullTracer);
        assert!(result.outcome().is_success());
    }

    #[test]
    fn execute_target_reports_failure() {
        let mut registry = Registry::new();
        registry.create("Build", |_| Err("boom".into())).unwrap();
        let target = registry.get("Build").unwrap();
        let context = TargetContext::new();
        let cancellation = CancellationToken::new();
        let result = execute_target(target, &context, &cancellation, &NullTracer);
        assert!(result.outcome().is_failure());
    }

    #[test]
    fn skip_target_records_zero_duration() {
        let mut registry = Registry::new();
        registry.create("Build", |_| Ok(())).unwrap();
        let target = registry.get("Build").unwrap();
        let result = skip_target(target, TargetOutcome::Skipped);
        assert_eq!(result.duration(), std::time::Duration::ZERO);
        assert!(matches!(result.outcome(), TargetOutcome::Skipped));
    }
}
