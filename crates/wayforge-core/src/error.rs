// crates/wayforge-core/src/error.rs
// ============================================================================
// Module: Engine Errors
// Description: Typed error surface for declaration, scheduling, and run
// failures in the target engine.
// Purpose: Give callers a stable, matchable error taxonomy instead of
// stringly-typed failures.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`EngineError`] covers every fatal condition the engine can raise:
//! declaration-time mistakes (duplicate targets, cycles, unknown names),
//! the one runtime invariant violation that indicates a scheduler bug, and
//! the aggregate failure raised by the top-level `run` entry points when one
//! or more targets failed.
//!
//! Per-target body failures are *not* represented here — they are captured
//! as [`crate::context::RunError`] on the target's own
//! [`crate::context::TargetResult`] and never unwind out of the driver.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// SECTION: Engine Error
// ============================================================================

/// Fatal engine errors: declaration mistakes, scheduler bugs, and the
/// aggregate failure raised by the top-level run functions.
///
/// # Invariants
/// - Variants are stable for programmatic matching by callers.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A target with this name was already registered.
    #[error("target '{0}' is already defined")]
    DuplicateTarget(String),

    /// A dependency, soft dependency, or run target name does not exist.
    ///
    /// `known` lists every currently registered target name, for the
    /// diagnostic message a developer sees when a name is mistyped.
    #[error("target '{name}' is not defined (known targets: {})", known.join(", "))]
    UnknownTarget {
        /// The name that failed lookup.
        name: String,
        /// All currently registered target names, original casing.
        known: Vec<String>,
    },

    /// Adding this dependency would close a cycle in the hard- or
    /// soft-dependency subgraph.
    #[error("Cyclic dependency between {dependent} and {dependency}")]
    CyclicDependency {
        /// The target the dependency was being added to.
        dependent: String,
        /// The target that would have been depended on.
        dependency: String,
    },

    /// [`crate::registry::Registry::description`] was called twice without
    /// an intervening `create`.
    #[error("a description is already pending for the next target")]
    DescriptionAlreadyPending,

    /// A description was armed but never consumed by a `create` call before
    /// the run started.
    #[error("description '{0}' was set but no target was created to receive it")]
    PendingDescriptionAtRunStart(String),

    /// The layering algorithm could not make progress although targets
    /// remained unscheduled. Only reachable on a scheduler logic bug.
    #[error("could not progress build order: {remaining} target(s) left unlayered")]
    LayeringStalled {
        /// Number of targets that could not be placed in any layer.
        remaining: usize,
    },

    /// The parallel coordinator detected a stall: no target is running and
    /// none is runnable, yet the schedule is incomplete. Only reachable on a
    /// scheduler logic bug.
    #[error("scheduler deadlock: resolved {resolved} of {known} known targets")]
    SchedulerDeadlock {
        /// Number of targets that completed before the stall.
        resolved: usize,
        /// Total number of targets scheduled for this run.
        known: usize,
    },

    /// One or more targets failed during the run and cancellation was not
    /// requested, so the failure is promoted to a top-level error.
    #[error("Target(s) failed: {}", .failed.join(", "))]
    BuildFailed {
        /// Canonical-cased names of every target that recorded an error.
        failed: Vec<String>,
    },

    /// `parallel-jobs` (env var or `-p/--parallel`) did not parse as a
    /// positive integer.
    #[error("invalid parallelism value '{0}': must be a positive integer")]
    InvalidParallelism(String),

    /// The coordinator's request channel closed unexpectedly, indicating a
    /// worker or the coordinator task panicked.
    #[error("parallel runner communication channel closed unexpectedly")]
    CoordinatorChannelClosed,
}
