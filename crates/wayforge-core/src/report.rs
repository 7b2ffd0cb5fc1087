// crates/wayforge-core/src/report.rs
// ============================================================================
// Module: Report Writer
// Description: Pure, allocation-only rendering of a build plan and a
// finished run's summary.
// Purpose: Keep string formatting testable and free of I/O; the CLI writes
// whatever these functions return to stdout/stderr.
// Dependencies: crate::graph, crate::context, crate::registry, crate::trace
// ============================================================================

//! ## Overview
//! [`render_plan`] formats a [`BuildPlan`] the way `--list`'s verbose mode
//! and `--what-if` describe an upcoming run: one line per layer, targets
//! within a layer comma-joined, since nothing orders them relative to each
//! other. [`render_summary`] formats the table printed after a run: one row
//! per target, its outcome, and how long its body took.
//!
//! Neither function performs I/O. This mirrors the teacher's separation
//! between building a string and writing it — the CLI crate is the only
//! place that touches `stdout`/`stderr` directly, so the `print_stdout` /
//! `print_stderr` lints stay meaningful.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;

use crate::context::TargetContext;
use crate::context::TargetOutcome;
use crate::graph::BuildPlan;
use crate::registry::Registry;
use crate::trace::BuildState;

// ============================================================================
// SECTION: Plan Rendering
// ============================================================================

/// Renders a build plan as one line per layer, in execution order.
///
/// # Panics
///
/// Panics if `plan` names a target `registry` does not know about, which
/// only happens if `plan` was computed against a different registry.
#[must_use]
pub fn render_plan(plan: &BuildPlan, registry: &Registry) -> String {
    let mut out = String::new();
    for (index, layer) in plan.layers().iter().enumerate() {
        let mut names: Vec<&str> = layer
            .iter()
            .map(|key| registry.get_canonical(key).expect("plan target must be registered").name())
            .collect();
        names.sort_unstable();
        let _ = writeln!(out, "layer {index}: {}", names.join(", "));
    }
    out
}

// ============================================================================
// SECTION: Summary Rendering
// ============================================================================

/// Renders a run's per-target outcomes and overall state as a plain-text
/// table, one row per recorded target, in completion order — the same
/// order [`crate::context::TargetContext::results`] exposes to target
/// bodies as `PreviousTargets`.
#[must_use]
pub fn render_summary(context: &TargetContext, state: BuildState) -> String {
    let mut out = String::new();
    for result in context.results() {
        let label = match result.outcome() {
            TargetOutcome::Success => "Ok",
            TargetOutcome::Failed(_) => "Failed",
            TargetOutcome::Skipped => "Skipped",
            TargetOutcome::Cancelled => "Cancelled",
        };
        let _ = write!(out, "{:<24} {:<10} {:>8.3}s", result.name(), label, result.duration().as_secs_f64());
        if let TargetOutcome::Failed(error) = result.outcome() {
            let _ = write!(out, "  {error}");
        }
        out.push('\n');
    }
    let _ = writeln!(out, "\nBuild {state}");
    out
}

// ============================================================================
// SECTION: Tests
// ============================================================================
