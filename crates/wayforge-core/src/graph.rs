// crates/wayforge-core/src/graph.rs
// ============================================================================
// Module: Build Order Graph
// Description: Computes the hard-reachable target set for a run root and
// arranges it into dependency-respecting layers.
// Purpose: Turn a Registry's declarations into a concrete, orderable plan
// the sequential and parallel runners can both execute.
// Dependencies: crate::registry, crate::error
// ============================================================================

//! ## Overview
//! [`compute_plan`] implements the two-phase algorithm described by the
//! specification: first a depth-first walk over hard dependencies only,
//! collecting every target the run root transitively requires; then a
//! Kahn-style layering pass over that subgraph, where a soft dependency
//! contributes an ordering edge only when its source target is itself
//! hard-reachable. Targets in the same layer have no ordering relationship
//! and may run in any order, including concurrently.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::EngineError;
use crate::registry::Registry;

// ============================================================================
// SECTION: Build Plan
// ============================================================================

/// A layered build order: outer vector is execution order, inner vectors are
/// targets with no ordering relationship to each other.
///
/// # Invariants
/// - Every canonical name appears in exactly one layer.
/// - A name in layer `i` has every effective predecessor in some layer `< i`.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Canonical (lowercased) target names, grouped by layer, each layer
    /// sorted for deterministic iteration.
    layers: Vec<Vec<String>>,
}

impl BuildPlan {
    /// Returns the plan's layers, in execution order.
    #[must_use]
    pub fn layers(&self) -> &[Vec<String>] {
        &self.layers
    }

    /// Returns the total number of targets covered by this plan.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.layers.iter().map(Vec::len).sum()
    }

    /// Flattens the plan into one sequential order, layer by layer.
    #[must_use]
    pub fn sequential_order(&self) -> Vec<String> {
        self.layers.iter().flatten().cloned().collect()
    }

    /// Returns whether a canonical name is covered by this plan.
    #[must_use]
    pub fn contains(&self, canonical_name: &str) -> bool {
        self.layers.iter().any(|layer| layer.iter().any(|name| name == canonical_name))
    }

    /// Builds a single-target plan that bypasses dependency resolution
    /// entirely, for `single-target` runs.
    #[must_use]
    pub(crate) fn single(canonical_name: String) -> Self {
        Self { layers: vec![vec![canonical_name]] }
    }
}

// ============================================================================
// SECTION: Plan Computation
// ============================================================================

/// Computes the build plan rooted at `root` (case-insensitive).
///
/// # Errors
///
/// Returns [`EngineError::UnknownTarget`] if `root`, or any target
/// transitively hard-required by it, is not registered. Returns
/// [`EngineError::LayeringStalled`] if the effective edge set (hard edges
/// plus soft edges between two hard-reachable targets) contains a cycle;
/// same-kind cycles are already rejected at declaration time by
/// [`crate::registry::Registry::add_dependency`] and
/// [`crate::registry::Registry::add_soft_dependency`], so this can only
/// happen when a hard edge and a soft edge close a cycle together.
pub fn compute_plan(registry: &Registry, root: &str) -> Result<BuildPlan, EngineError> {
    let mut remaining = effective_predecessors(registry, root)?;

    let mut layers = Vec::new();
    while !remaining.is_empty() {
        let mut ready: Vec<String> =
            remaining.iter().filter(|(_, preds)| preds.is_empty()).map(|(key, _)| key.clone()).collect();
        if ready.is_empty() {
            return Err(EngineError::LayeringStalled { remaining: remaining.len() });
        }
        ready.sort();
        for key in &ready {
            remaining.remove(key);
        }
        for preds in remaining.values_mut() {
            for key in &ready {
                preds.remove(key);
            }
        }
        layers.push(ready);
    }

    Ok(BuildPlan { layers })
}

/// Computes, for every target hard-reachable from `root`, the set of
/// canonical names it must wait on: every hard dependency, plus every soft
/// dependency that is itself hard-reachable.
///
/// Shared by [`compute_plan`] and the parallel coordinator, which schedules
/// against these edges directly rather than materializing whole layers.
///
/// # Errors
///
/// Returns [`EngineError::UnknownTarget`] if `root`, or any target
/// transitively hard-required by it, is not registered.
pub(crate) fn effective_predecessors(
    registry: &Registry,
    root: &str,
) -> Result<HashMap<String, HashSet<String>>, EngineError> {
    let root_key = root.to_ascii_lowercase();
    registry.get(root)?;

    let reachable = collect_hard_reachable(registry, &root_key)?;
    let preds = reachable
        .iter()
        .map(|key| {
            let target = registry.get_canonical(key).expect("member of reachable set");
            let mut preds: HashSet<String> =
                target.dependencies().iter().map(|name| name.to_ascii_lowercase()).collect();
            for soft in target.soft_dependencies() {
                let soft_key = soft.to_ascii_lowercase();
                if reachable.contains(&soft_key) {
                    preds.insert(soft_key);
                }
            }
            preds.remove(key);
            (key.clone(), preds)
        })
        .collect();
    Ok(preds)
}

/// Depth-first walk over hard dependencies only, starting at `root_key`.
fn collect_hard_reachable(registry: &Registry, root_key: &str) -> Result<HashSet<String>, EngineError> {
    let mut seen = HashSet::new();
    let mut stack = vec![root_key.to_string()];
    while let Some(key) = stack.pop() {
        if !seen.insert(key.clone()) {
            continue;
        }
        let target = registry.get(&key)?;
        for dep in target.dependencies() {
            stack.push(dep.to_ascii_lowercase());
        }
    }
    Ok(seen)
}

// ============================================================================
// SECTION: Dependency Graph Printing
// ============================================================================

/// Renders the effective-edge dependency graph rooted at `root`: one line
/// per edge, hard dependencies marked `<==` and soft dependencies marked
/// `<=?`, indented by depth. A soft dependency is only printed (and only
/// walked further) when it is itself hard-reachable from `root`, matching
/// the same "effective edge" rule [`compute_plan`] schedules against.
///
/// # Errors
///
/// Returns [`EngineError::UnknownTarget`] if `root` is not registered.
pub fn render_dependency_graph(registry: &Registry, root: &str) -> Result<String, EngineError> {
    let root_key = root.to_ascii_lowercase();
    let target = registry.get(root)?;
    let reachable = collect_hard_reachable(registry, &root_key)?;

    let mut out = String::new();
    let _ = writeln!(out, "{}", target.name());
    print_predecessors(registry, &root_key, &reachable, 1, &mut out);
    Ok(out)
}

/// Recursive helper for [`render_dependency_graph`].
fn print_predecessors(registry: &Registry, key: &str, reachable: &HashSet<String>, depth: usize, out: &mut String) {
    let Some(target) = registry.get_canonical(key) else { return };
    print_edges(registry, target.dependencies(), "<==", reachable, false, depth, out);
    print_edges(registry, target.soft_dependencies(), "<=?", reachable, true, depth, out);
}

/// Prints one kind of edge (hard or soft) out of a target's declared
/// dependencies, recursing into each printed edge.
fn print_edges(
    registry: &Registry,
    deps: &[String],
    marker: &str,
    reachable: &HashSet<String>,
    only_if_reachable: bool,
    depth: usize,
    out: &mut String,
) {
    let indent = "  ".repeat(depth);
    for dep in deps {
        let dep_key = dep.to_ascii_lowercase();
        if only_if_reachable && !reachable.contains(&dep_key) {
            continue;
        }
        let _ = writeln!(out, "{indent}{marker} {dep}");
        print_predecessors(registry, &dep_key, reachable, depth + 1, out);
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================


// ============================================================================
// SECTION: Property Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use proptest::collection::vec;
    use proptest::prelude::*;

    use super::*;

    /// Produces a node count and a set of acyclic-by-construction edges
    /// `(dependent_index, dependency_index)` with `dependent_index >
    /// dependency_index`, so no edge can ever close a cycle.
    fn acyclic_edges() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
        (3usize..8).prop_flat_map(|node_count| {
            vec((0..node_count, 0..node_count), 0..(node_count * 2))
                .prop_map(move |pairs| (node_count, pairs.into_iter().filter(|(a, b)| a > b).collect()))
        })
    }

    proptest! {
        /// For every edge the layering algorithm is handed, the dependency's
        /// layer index must be strictly less than the dependent's: a target
        /// never lands in the same or an earlier layer than something it
        /// waits on.
        #[test]
        fn layering_respects_every_hard_edge((node_count, edges) in acyclic_edges()) {
            let mut registry = Registry::new();
            for index in 0..node_count {
                registry.create(format!("T{index}"), |_| Ok(())).unwrap();
            }
            // Root depends on every other node directly, guaranteeing the
            // whole generated edge set is hard-reachable regardless of what
            // the random edges above connect.
            let root = node_count - 1;
            for index in 0..root {
                let _ = registry.add_dependency(&format!("T{root}"), &format!("T{index}"));
            }
            for (dependent, dependency) in &edges {
                let _ = registry.add_dependency(&format!("T{dependent}"), &format!("T{dependency}"));
            }

            let plan = compute_plan(&registry, &format!("T{root}")).expect("acyclic by construction");
            prop_assert_eq!(plan.target_count(), node_count);

            let layer_of = |name: &str| {
                plan.layers().iter().position(|layer| layer.iter().any(|member| member == name))
                    .expect("every target must be layered")
            };

            for (dependent, dependency) in &edges {
                let dependent_layer = layer_of(&format!("t{dependent}"));
                let dependency_layer = layer_of(&format!("t{dependency}"));
                prop_assert!(dependency_layer < dependent_layer);
            }
        }
    }
}
