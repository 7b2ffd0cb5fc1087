// crates/wayforge-core/src/context.rs
// ============================================================================
// Module: Target Context
// Description: The read-only view of prior results and cancellation state
// passed into a running target body, plus the accumulating result set the
// runner builds as targets complete.
// Purpose: Give target bodies a narrow, race-free window onto the state of
// the build without exposing the registry or scheduler internals.
// Dependencies: crate::registry::TargetError, std::sync::atomic
// ============================================================================

//! ## Overview
//! [`TargetContext`] accumulates one [`TargetResult`] per completed target.
//! The runner hands each target body a [`TargetParameter`] borrowing the
//! context as it stood immediately before that target started, plus a
//! [`CancellationToken`] the body may poll at a convenient boundary.
//!
//! `TargetContext` is intentionally append-only and cheap to snapshot:
//! the parallel coordinator clones the accumulated results (not the whole
//! context) into each worker request.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::registry::TargetError;

// ============================================================================
// SECTION: Run Error
// ============================================================================

/// The error a target body returned, retained alongside the target's name
/// for reporting.
#[derive(Debug)]
pub struct RunError(TargetError);

impl RunError {
    /// Wraps a target body's error.
    #[must_use]
    pub fn new(source: TargetError) -> Self {
        Self(source)
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl StdError for RunError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.0.as_ref())
    }
}

// ============================================================================
// SECTION: Target Outcome
// ============================================================================

/// The terminal state of one target after a run attempt.
#[derive(Debug)]
pub enum TargetOutcome {
    /// The target's body returned `Ok(())`.
    Success,
    /// The target's body returned an error.
    Failed(RunError),
    /// The target was never attempted because a hard dependency failed.
    Skipped,
    /// The target was never attempted because cancellation was observed
    /// before it could start.
    Cancelled,
}

impl TargetOutcome {
    /// Returns `true` for [`TargetOutcome::Success`].
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns `true` for [`TargetOutcome::Failed`].
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

// ============================================================================
// SECTION: Target Result
// ============================================================================

/// One completed target's outcome, retained for reporting and for later
/// targets' dependency checks.
#[derive(Debug)]
pub struct TargetResult {
    /// Declared name, original casing.
    name: String,
    /// Terminal state reached by this target.
    outcome: TargetOutcome,
    /// Wall-clock time spent inside the target's body. Zero for skipped or
    /// cancelled targets.
    duration: Duration,
}

impl TargetResult {
    /// Builds a result record.
    #[must_use]
    pub fn new(name: impl Into<String>, outcome: TargetOutcome, duration: Duration) -> Self {
        Self { name: name.into(), outcome, duration }
    }

    /// Returns the target's declared name, original casing.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target's terminal state.
    #[must_use]
    pub fn outcome(&self) -> &TargetOutcome {
        &self.outcome
    }

    /// Returns the time spent inside the target's body.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

// ============================================================================
// SECTION: Cancellation Token
// ============================================================================

/// A cheaply cloneable, thread-safe flag target bodies may poll to learn
/// that cancellation has been requested.
///
/// # Invariants
/// - Once set, a token never clears; a run is cancelled for its remaining
///   lifetime.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Creates a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Requests cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// SECTION: Target Context
// ============================================================================

/// Accumulated results for a run, in completion order.
///
/// # Invariants
/// - A name is inserted at most once: a target runs to a terminal state
///   exactly once per run. Recording the same canonical name twice updates
///   the existing entry in place rather than appending a second one, so
///   completion order is never disturbed by a re-record.
#[derive(Debug, Default)]
pub struct TargetContext {
    /// Completed results, in the order they were recorded.
    order: Vec<TargetResult>,
    /// Canonical (lowercased) target name to its position in `order`.
    index: HashMap<String, usize>,
    /// The tail of the CLI invocation, forwarded verbatim to target bodies.
    arguments: Vec<String>,
}

impl TargetContext {
    /// Creates an empty context with no script arguments.
    #[must_use]
    pub fn new() -> Self {
        Self::with_arguments(Vec::new())
    }

    /// Creates an empty context carrying the given script arguments, the
    /// CLI's trailing `-- <scriptargs>...` tail.
    #[must_use]
    pub fn with_arguments(arguments: Vec<String>) -> Self {
        Self { order: Vec::new(), index: HashMap::new(), arguments }
    }

    /// Returns the script arguments this run was invoked with.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Records a completed target's result under its canonical name.
    pub fn record(&mut self, canonical_name: impl Into<String>, result: TargetResult) {
        let canonical_name = canonical_name.into();
        if let Some(&position) = self.index.get(&canonical_name) {
            self.order[position] = result;
        } else {
            self.index.insert(canonical_name, self.order.len());
            self.order.push(result);
        }
    }

    /// Looks up a target's result by canonical name.
    #[must_use]
    pub fn result(&self, canonical_name: &str) -> Option<&TargetResult> {
        self.index.get(canonical_name).map(|&position| &self.order[position])
    }

    /// Returns whether the named target completed successfully.
    #[must_use]
    pub fn succeeded(&self, canonical_name: &str) -> bool {
        self.result(canonical_name).is_some_and(|result| result.outcome().is_success())
    }

    /// Returns whether the named target has completed (in any terminal
    /// state), i.e. is no longer pending.
    #[must_use]
    pub fn is_complete(&self, canonical_name: &str) -> bool {
        self.index.contains_key(canonical_name)
    }

    /// Returns whether any target recorded so far failed. Once true for a
    /// context, it stays true: this is the "global fail-fast" flag the
    /// driver consults to decide whether a not-yet-started target should be
    /// skipped outright.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.order.iter().any(|result| result.outcome().is_failure())
    }

    /// Returns the number of targets recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether no targets have been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns every recorded result, in completion order.
    pub fn results(&self) -> impl Iterator<Item = &TargetResult> {
        self.order.iter()
    }

    /// Extends this context with another's results, preserving the other
    /// context's internal completion order by appending it after this
    /// context's own. Used by tests exercising context accumulation
    /// directly; the parallel coordinator instead shares one
    /// `Arc<RwLock<TargetContext>>` across workers rather than merging
    /// separate snapshots.
    pub fn merge(&mut self, other: Self) {
        let mut names_by_position: HashMap<usize, String> =
            other.index.into_iter().map(|(name, position)| (position, name)).collect();
        for (position, result) in other.order.into_iter().enumerate() {
            if let Some(name) = names_by_position.remove(&position) {
                self.record(name, result);
            }
        }
    }
}

// ============================================================================
// SECTION: Target Parameter
// ============================================================================

/// The view a running target body receives: its own name, the results of
/// every target that has already completed, and a cancellation token to
/// poll at a natural boundary.
pub struct TargetParameter<'a> {
    /// The target's declared name, original casing.
    name: &'a str,
    /// Results recorded so far, immutable for the duration of the call.
    context: &'a TargetContext,
    /// Shared cancellation flag.
    cancellation: CancellationToken,
}

impl<'a> TargetParameter<'a> {
    /// Builds a parameter view for one target invocation.
    #[must_use]
    pub fn new(name: &'a str, context: &'a TargetContext, cancellation: CancellationToken) -> Self {
        Self { name, context, cancellation }
    }

    /// Returns the target's own declared name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Returns the context of already-completed targets.
    #[must_use]
    pub fn context(&self) -> &TargetContext {
        self.context
    }

    /// Returns the run's script arguments, the CLI's trailing
    /// `-- <scriptargs>...` tail. Shorthand for `self.context().arguments()`.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        self.context.arguments()
    }

    /// Returns whether cancellation has been requested. Long-running target
    /// bodies should poll this between units of work.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_reports_success_only_for_recorded_success() {
        let mut context = TargetContext::new();
        context.record("a", TargetResult::new("A", TargetOutcome::Success, Duration::ZERO));
        context.record("b", TargetResult::new("B", TargetOutcome::Skipped, Duration::ZERO));
        assert!(context.succeeded("a"));
        assert!(!context.succeeded("b"));
        assert!(!context.succeeded("missing"));
        assert!(context.is_complete("b"));
        assert!(!context.is_complete("missing"));
    }

    #[test]
    fn merge_combines_two_contexts() {
        let mut left = TargetContext::new();
        left.record("a", TargetResult::new("A", TargetOutcome::Success, Duration::ZERO));
        let mut right = TargetContext::new();
        right.record("b", TargetResult::new("B", TargetOutcome::Success, Duration::ZERO));
        left.merge(right);
        assert_eq!(left.len(), 2);
    }

    #[test]
    fn results_are_returned_in_completion_order_not_insertion_key_order() {
        let mut context = TargetContext::new();
        context.record("zeta", TargetResult::new("Zeta", TargetOutcome::Success, Duration::ZERO));
        context.record("alpha", TargetResult::new("Alpha", TargetOutcome::Success, Duration::ZERO));
        let names: Vec<&str> = context.results().map(TargetResult::name).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn re_recording_a_name_updates_in_place_without_disturbing_order() {
        let mut context = TargetContext::new();
        context.record("a", TargetResult::new("A", TargetOutcome::Success, Duration::ZERO));
        context.record("b", TargetResult::new("B", TargetOutcome::Success, Duration::ZERO));
        context.record("a", TargetResult::new("A", TargetOutcome::Skipped, Duration::ZERO));
        let names: Vec<&str> = context.results().map(TargetResult::name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert!(matches!(context.result("a").unwrap().outcome(), TargetOutcome::Skipped));
    }

    #[test]
    fn has_error_reflects_any_recorded_failure() {
        let mut context = TargetContext::new();
        assert!(!context.has_error());
        context.record("a", TargetResult::new("A", TargetOutcome::Success, Duration::ZERO));
        assert!(!context.has_error());
        let error = RunError::new(TargetError::from("boom"));
        context.record("b", TargetResult::new("B", TargetOutcome::Failed(error), Duration::ZERO));
        assert!(context.has_error());
    }

    #[test]
    fn arguments_default_to_empty_and_round_trip_through_with_arguments() {
        assert!(TargetContext::new().arguments().is_empty());
        let context = TargetContext::with_arguments(vec!["--release".to_string()]);
        assert_eq!(context.arguments(), ["--release"]);
    }

    #[test]
    fn cancellation_token_is_shared_across_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn parameter_exposes_name_context_and_cancellation() {
        let context = TargetContext::new();
        let token = CancellationToken::new();
        let parameter = TargetParameter::new("Build", &context, token.clone());
        assert_eq!(parameter.name(), "Build");
        assert!(!parameter.is_cancelled());
        token.cancel();
        assert!(parameter.is_cancelled());
    }
}
