// crates/wayforge-core/src/lib.rs
// ============================================================================
// Crate: wayforge-core
// Description: A cross-platform, dependency-aware build target engine —
// declare named targets, wire hard and soft dependencies between them, and
// run the resulting graph sequentially or with a bounded worker pool.
// ============================================================================

//! # wayforge-core
//!
//! The engine behind `wayforge`: a [`registry::Registry`] of named targets
//! and their dependencies, a [`graph`] module that turns a registry into a
//! layered [`graph::BuildPlan`], a [`runner`] that can execute that plan
//! either one target at a time or with a fixed pool of concurrent workers,
//! and [`lifecycle`] targets that run after the main build settles.
//!
//! [`engine::Engine`] is the facade most callers want: declare targets
//! through [`engine::Engine::registry_mut`], then call
//! [`engine::Engine::run`] once.

/// Engine-wide environment variable configuration.
pub mod config;
/// The context a running target body sees, and the accumulating result set.
pub mod context;
/// The top-level run facade.
pub mod engine;
/// Fatal engine error types.
pub mod error;
/// Build order computation from a registry's declarations.
pub mod graph;
/// OS interrupt wiring for cooperative cancellation.
pub mod interrupt;
/// Final and build-failure target execution.
pub mod lifecycle;
/// Plain-text rendering of plans and run summaries.
pub mod report;
/// Target declaration, dependency recording, and lifecycle activation.
pub mod registry;
/// Execution strategies for a computed build plan.
pub mod runner;
/// The abstract trace channel and its default implementation.
pub mod trace;

pub use context::CancellationToken;
pub use context::TargetContext;
pub use context::TargetParameter;
pub use engine::Engine;
pub use engine::RunOutcome;
pub use error::EngineError;
pub use graph::BuildPlan;
pub use registry::Registry;
pub use registry::TargetError;
pub use trace::BuildState;
pub use trace::NullTracer;
pub use trace::Tracer;
pub use trace::TracingTracer;
