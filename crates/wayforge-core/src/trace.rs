// crates/wayforge-core/src/trace.rs
// ============================================================================
// Module: Trace Channel
// Description: Abstract tracing/reporting capability used by the runner.
// Purpose: Let the engine emit start/success/failure events and log lines
// without depending on any particular logging backend.
// Dependencies: tracing (for the default implementation only)
// ============================================================================

//! ## Overview
//! The specification treats tracing as an abstract collaborator: the engine
//! calls [`Tracer::task_start`] around each target body, [`Tracer::log`] for
//! free-form diagnostics, and [`Tracer::build_state`] once at the end of a
//! run. [`TracingTracer`] is the default implementation, backed by the
//! `tracing` crate; [`NullTracer`] is provided for library consumers and
//! tests that don't want subscriber side effects.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

// ============================================================================
// SECTION: Severity
// ============================================================================

/// Severity tag for [`Tracer::log`] calls.
///
/// # Invariants
/// - Variants are ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Fine-grained diagnostic detail.
    Debug,
    /// Routine progress information.
    Info,
    /// An unexpected but non-fatal condition.
    Warn,
    /// A fatal condition for the current operation.
    Error,
}

// ============================================================================
// SECTION: Build State
// ============================================================================

/// Overall outcome of a run, reported once via [`Tracer::build_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// The run completed with no target errors.
    Ok,
    /// The run completed with at least one target error.
    Failure,
    /// The run was cancelled before completion.
    Cancelled,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Ok => "Ok",
            Self::Failure => "Failure",
            Self::Cancelled => "Cancelled",
        };
        f.write_str(label)
    }
}

// ============================================================================
// SECTION: Task Scope
// ============================================================================

/// Handle returned by [`Tracer::task_start`], closed by marking the task's
/// outcome.
///
/// # Invariants
/// - Exactly one of [`TaskScope::mark_success`] or [`TaskScope::mark_failed`]
///   is called per scope.
pub trait TaskScope {
    /// Marks the task as having completed successfully.
    fn mark_success(self: Box<Self>);

    /// Marks the task as having failed, with a human-readable reason.
    fn mark_failed(self: Box<Self>, reason: &str);
}

/// A [`TaskScope`] that does nothing on close.
struct NullScope;

impl TaskScope for NullScope {
    fn mark_success(self: Box<Self>) {}
    fn mark_failed(self: Box<Self>, _reason: &str) {}
}

// ============================================================================
// SECTION: Tracer
// ============================================================================

/// Abstract trace channel the runner drives around each target body.
///
/// # Invariants
/// - Implementations must be cheap to call on every target boundary; this
///   is not a buffered or batched interface.
pub trait Tracer: Send + Sync {
    /// Opens a trace scope for a target about to run.
    ///
    /// `dependency_string` is a printable summary of the target's effective
    /// predecessors, for diagnostic output.
    fn task_start(
        &self,
        name: &str,
        description: Option<&str>,
        dependency_string: &str,
    ) -> Box<dyn TaskScope>;

    /// Emits a severity-tagged log line.
    fn log(&self, severity: Severity, message: &str);

    /// Reports the overall outcome of a run, with an optional summary
    /// message (populated on failure).
    fn build_state(&self, state: BuildState, message: Option<&str>);
}

// ============================================================================
// SECTION: Null Tracer
// ============================================================================

/// A [`Tracer`] that discards every event.
///
/// Used by library consumers that don't want subscriber side effects, and
/// by tests that only care about the resulting [`crate::context::TargetContext`].
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTracer;

impl Tracer for NullTracer {
    fn task_start(&self, _name: &str, _description: Option<&str>, _dependency_string: &str) -> Box<dyn TaskScope> {
        Box::new(NullScope)
    }

    fn log(&self, _severity: Severity, _message: &str) {}

    fn build_state(&self, _state: BuildState, _message: Option<&str>) {}
}

// ============================================================================
// SECTION: Tracing-backed Tracer
// ============================================================================

/// A [`TaskScope`] that closes a `tracing` span on drop.
struct TracingScope {
    /// Target name, retained for the closing event.
    name: String,
    /// Entered span guard, held for the scope's lifetime.
    _span: tracing::span::EnteredSpan,
}

impl TaskScope for TracingScope {
    fn mark_success(self: Box<Self>) {
        tracing::info!(target: "wayforge", target_name = %self.name, "target succeeded");
    }

    fn mark_failed(self: Box<Self>, reason: &str) {
        tracing::error!(target: "wayforge", target_name = %self.name, reason, "target failed");
    }
}

/// [`Tracer`] implementation backed by the `tracing` crate.
///
/// Build scripts and the CLI pair this with a `tracing-subscriber`
/// registry; the engine itself never installs a subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracer;

impl Tracer for TracingTracer {
    fn task_start(&self, name: &str, description: Option<&str>, dependency_string: &str) -> Box<dyn TaskScope> {
        let span = tracing::info_span!(
            "target",
            name = %name,
            description = description.unwrap_or(""),
            dependencies = %dependency_string,
        );
        let entered = span.entered();
        tracing::info!(target: "wayforge", "target starting");
        Box::new(TracingScope { name: name.to_string(), _span: entered })
    }

    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: "wayforge", "{message}"),
            Severity::Info => tracing::info!(target: "wayforge", "{message}"),
            Severity::Warn => tracing::warn!(target: "wayforge", "{message}"),
            Severity::Error => tracing::error!(target: "wayforge", "{message}"),
        }
    }

    fn build_state(&self, state: BuildState, message: Option<&str>) {
        match message {
            Some(message) => tracing::info!(target: "wayforge", %state, message, "build finished"),
            None => tracing::info!(target: "wayforge", %state, "build finished"),
        }
    }
}
