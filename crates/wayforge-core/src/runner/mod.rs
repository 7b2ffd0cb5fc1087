// crates/wayforge-core/src/runner/mod.rs
// ============================================================================
// Module: Runner
// Description: Everything involved in actually executing a BuildPlan.
// Purpose: Group the shared single-target driver with the two execution
// strategies (sequential, parallel) that both use it.
// ============================================================================

//! ## Overview
//! [`driver`] holds the one-target execution primitive; [`sequential`] and
//! [`coordinator`] are the two ways a [`crate::graph::BuildPlan`] can be
//! driven to completion, chosen by the caller based on
//! [`crate::config::EngineEnv::parallel_jobs`] / `-p`.

/// Parallel, worker-pool execution strategy.
pub mod coordinator;
/// Single-target execution primitive shared by both strategies.
pub mod driver;
/// Single-threaded, layer-by-layer execution strategy.
pub mod sequential;
