// crates/wayforge-cli/src/demo.rs
// ============================================================================
// Module: Demo Build Graph
// Description: The sample target graph wayforge runs out of the box.
// Purpose: Give the binary something real to build against without
// requiring a user-authored build script, and exercise every dependency
// shape the engine supports.
// Dependencies: wayforge_core
// ============================================================================

//! ## Overview
//! A real `wayforge` embedder writes their own build script against
//! [`wayforge_core::Engine`]; this module stands in for that script so the
//! binary is runnable on its own. The graph below exercises a hard-dependency
//! diamond (`Compile` → `{Test, Lint}` → `Package`), a soft dependency that
//! only orders when its target is otherwise reachable (`Notify` ?=> `Deploy`),
//! a final target that always runs (`Clean`), a build-failure target that
//! only runs when something breaks (`Alert`), a wide fan-in for parallelism
//! (`Fanout` ← eight independent `Leaf*` targets), and a long-running target
//! that polls cancellation (`Watch`).
//!
//! `Compile` fails when the `WAYFORGE_DEMO_FAIL` environment variable is set
//! to anything non-empty, which is how the CLI's failure/skip behavior is
//! exercised end to end without a second build script.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::thread;
use std::time::Duration;

use wayforge_core::EngineError;
use wayforge_core::Registry;

// ============================================================================
// SECTION: Declaration
// ============================================================================

/// Declares the demo graph against `registry`.
///
/// # Errors
///
/// Returns [`EngineError`] if declaration somehow collides with an
/// already-populated registry; never fails against a fresh one.
pub fn declare(registry: &mut Registry) -> Result<(), EngineError> {
    registry.description("Compiles the demo sources.")?;
    registry.create("Compile", |_| {
        if std::env::var("WAYFORGE_DEMO_FAIL").is_ok_and(|value| !value.is_empty()) {
            return Err("simulated compile failure".into());
        }
        tracing::info!("compiling");
        Ok(())
    })?;

    registry.description("Runs the demo test suite.")?;
    registry.create("Test", |_| {
        tracing::info!("testing");
        Ok(())
    })?;
    registry.add_dependency("Test", "Compile")?;

    registry.description("Lints the demo sources.")?;
    registry.create("Lint", |_| {
        tracing::info!("linting");
        Ok(())
    })?;
    registry.add_dependency("Lint", "Compile")?;

    registry.description("Packages build artifacts.")?;
    registry.create("Package", |_| {
        tracing::info!("packaging");
        Ok(())
    })?;
    registry.add_dependency("Package", "Test")?;
    registry.add_dependency("Package", "Lint")?;

    registry.description("Deploys the package.")?;
    registry.create("Deploy", |_| {
        tracing::info!("deploying");
        Ok(())
    })?;
    registry.add_dependency("Deploy", "Package")?;

    registry.description("Sends a deployment notification, if a deployment actually ran.")?;
    registry.create("Notify", |_| {
        tracing::info!("notifying");
        Ok(())
    })?;
    registry.add_soft_dependency("Notify", "Deploy")?;

    registry.description("Removes build output. Always runs, even after a failure.")?;
    registry.create_final("Clean", |_| {
        tracing::info!("cleaning");
        Ok(())
    })?;
    registry.activate_final("Clean")?;

    registry.description("Pages on-call after a failed build.")?;
    registry.create_build_failure("Alert", |_| {
        tracing::warn!("paging on-call");
        Ok(())
    })?;
    registry.activate_build_failure("Alert")?;

    for index in 0..8 {
        let name = format!("Leaf{index}");
        registry.create(name, move |_| {
            tracing::info!(leaf = index, "leaf work");
            Ok(())
        })?;
    }
    registry.description("Fans in eight independent leaves, for parallel scheduling.")?;
    registry.create("Fanout", |_| {
        tracing::info!("fanout complete");
        Ok(())
    })?;
    for index in 0..8 {
        registry.add_dependency("Fanout", &format!("Leaf{index}"))?;
    }

    registry.description("Runs until cancelled, polling cooperatively every 10ms.")?;
    registry.create("Watch", |parameter| {
        while !parameter.is_cancelled() {
            thread::sleep(Duration::from_millis(10));
        }
        tracing::info!("watch observed cancellation");
        Ok(())
    })?;

    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wayforge_core::graph::compute_plan;

    #[test]
    fn declares_without_error() {
        let mut registry = Registry::new();
        declare(&mut registry).unwrap();
        assert!(registry.get("Compile").is_ok());
        assert!(registry.get("Watch").is_ok());
    }

    #[test]
    fn deploy_plan_is_a_diamond() {
        let mut registry = Registry::new();
        declare(&mut registry).unwrap();
        let plan = compute_plan(&registry, "Deploy").unwrap();
        assert_eq!(plan.layers().len(), 4);
        assert_eq!(plan.target_count(), 4);
    }

    #[test]
    fn notify_alone_excludes_deploy() {
        let mut registry = Registry::new();
        declare(&mut registry).unwrap();
        let plan = compute_plan(&registry, "Notify").unwrap();
        assert_eq!(plan.target_count(), 1);
    }

    #[test]
    fn fanout_pulls_in_all_eight_leaves() {
        let mut registry = Registry::new();
        declare(&mut registry).unwrap();
        let plan = compute_plan(&registry, "Fanout").unwrap();
        assert_eq!(plan.target_count(), 9);
        assert_eq!(plan.layers().len(), 2);
        assert_eq!(plan.layers()[0].len(), 8);
    }
}
