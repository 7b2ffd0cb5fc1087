// crates/wayforge-core/src/registry.rs
// ============================================================================
// Module: Target Registry
// Description: Process-wide target declarations, dependency recording, and
// cycle checking.
// Purpose: Own every Target for the lifetime of a build script and enforce
// the naming and acyclicity invariants on every mutation.
// Dependencies: crate::error
// ============================================================================

//! ## Overview
//! [`Registry`] is the declaration-time half of the engine: it owns every
//! [`Target`], the final/build-failure activation dictionaries, and the
//! single-slot pending description used by [`Registry::description`]. All
//! name comparisons are case-insensitive; the canonical form is the
//! lowercased name, used as the map key, while the originally declared
//! casing is retained for display.
//!
//! Declaration is assumed single-threaded: nothing here synchronizes across
//! threads, matching the specification's stated assumption that all
//! `create`/`add_dependency` calls happen before any run begins.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::context::TargetParameter;
use crate::error::EngineError;

// ============================================================================
// SECTION: Target Function
// ============================================================================

/// Error type returned by a target body.
pub type TargetError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The user-supplied action bound to a target.
pub type TargetFn = Arc<dyn Fn(&TargetParameter<'_>) -> Result<(), TargetError> + Send + Sync>;

// ============================================================================
// SECTION: Edge Kind
// ============================================================================

/// Distinguishes hard (must-run-before, always honored) from soft
/// (must-run-before only if also hard-reachable from the root) edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// A hard dependency: always participates in ordering.
    Hard,
    /// A soft dependency: participates only when also hard-reachable.
    Soft,
}

// ============================================================================
// SECTION: Target
// ============================================================================

/// A named unit of work bound to a user function.
///
/// # Invariants
/// - `name` is non-empty.
/// - A name never appears in both `dependencies` and `soft_dependencies`;
///   promoting a name to hard removes it from soft.
#[derive(Clone)]
pub struct Target {
    /// Declared name, original casing.
    name: String,
    /// Optional one-line description, set at most once via
    /// [`Registry::description`].
    description: Option<String>,
    /// Hard dependency names, original casing, insertion order preserved.
    dependencies: Vec<String>,
    /// Soft dependency names, original casing, insertion order preserved.
    soft_dependencies: Vec<String>,
    /// The user-supplied action.
    function: TargetFn,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("dependencies", &self.dependencies)
            .field("soft_dependencies", &self.soft_dependencies)
            .finish_non_exhaustive()
    }
}

impl Target {
    /// Returns the target's declared name, original casing.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the target's description, if one was set.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the target's hard dependency names, original casing.
    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Returns the target's soft dependency names, original casing.
    #[must_use]
    pub fn soft_dependencies(&self) -> &[String] {
        &self.soft_dependencies
    }

    /// Returns the target's bound action.
    #[must_use]
    pub fn function(&self) -> &TargetFn {
        &self.function
    }
}

/// Lowercases a name into its canonical registry key.
fn canonical(name: &str) -> String {
    name.to_ascii_lowercase()
}

/// Selects which lifecycle activation map [`Registry::set_activation`]
/// mutates.
enum LifecycleKind {
    /// The `final_targets` map.
    Final,
    /// The `build_failure_targets` map.
    BuildFailure,
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Process-wide (per-`Engine`) mutable map from case-insensitive target name
/// to target record, plus the final/build-failure activation dictionaries.
///
/// # Invariants
/// - The hard-dependency subgraph is acyclic at all times.
/// - Keys are canonical (lowercased) names.
#[derive(Clone)]
pub struct Registry {
    /// All declared targets, keyed by canonical name.
    targets: HashMap<String, Target>,
    /// Final-target activation, keyed by canonical name.
    final_targets: HashMap<String, bool>,
    /// Build-failure-target activation, keyed by canonical name.
    build_failure_targets: HashMap<String, bool>,
    /// Single-slot pending description, consumed by the next `create`.
    pending_description: Option<String>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            targets: HashMap::new(),
            final_targets: HashMap::new(),
            build_failure_targets: HashMap::new(),
            pending_description: None,
        }
    }

    /// Clears all declarations. Primarily for test harnesses.
    pub fn reset(&mut self) {
        self.targets.clear();
        self.final_targets.clear();
        self.build_failure_targets.clear();
        self.pending_description = None;
    }

    // ------------------------------------------------------------------
    // Declaration
    // ------------------------------------------------------------------

    /// Arms the pending description slot for the next `create` call.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DescriptionAlreadyPending`] if a description
    /// is already armed.
    pub fn description(&mut self, text: impl Into<String>) -> Result<(), EngineError> {
        if self.pending_description.is_some() {
            return Err(EngineError::DescriptionAlreadyPending);
        }
        self.pending_description = Some(text.into());
        Ok(())
    }

    /// Fails if a description was armed but never consumed. Called once at
    /// the start of a run.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PendingDescriptionAtRunStart`] if the slot is
    /// still occupied.
    pub fn ensure_no_pending_description(&self) -> Result<(), EngineError> {
        match &self.pending_description {
            Some(text) => Err(EngineError::PendingDescriptionAtRunStart(text.clone())),
            None => Ok(()),
        }
    }

    /// Registers a plain target with no dependencies.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateTarget`] if `name` is already
    /// registered (case-insensitively).
    pub fn create(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&TargetParameter<'_>) -> Result<(), TargetError> + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        self.insert_target(name, body)
    }

    /// Registers a build-failure target, inactive until
    /// [`Registry::activate_build_failure`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateTarget`] if `name` is already
    /// registered.
    pub fn create_build_failure(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&TargetParameter<'_>) -> Result<(), TargetError> + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        let name = name.into();
        self.insert_target(name.clone(), body)?;
        self.build_failure_targets.insert(canonical(&name), false);
        Ok(())
    }

    /// Registers a final target, inactive until
    /// [`Registry::activate_final`] is called.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateTarget`] if `name` is already
    /// registered.
    pub fn create_final(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&TargetParameter<'_>) -> Result<(), TargetError> + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        let name = name.into();
        self.insert_target(name.clone(), body)?;
        self.final_targets.insert(canonical(&name), false);
        Ok(())
    }

    /// Shared insertion path for `create`/`create_final`/`create_build_failure`.
    fn insert_target(
        &mut self,
        name: impl Into<String>,
        body: impl Fn(&TargetParameter<'_>) -> Result<(), TargetError> + Send + Sync + 'static,
    ) -> Result<(), EngineError> {
        let name = name.into();
        let key = canonical(&name);
        if self.targets.contains_key(&key) {
            return Err(EngineError::DuplicateTarget(name));
        }
        let description = self.pending_description.take();
        self.targets.insert(
            key,
            Target {
                name,
                description,
                dependencies: Vec::new(),
                soft_dependencies: Vec::new(),
                function: Arc::new(body),
            },
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Activation
    // ------------------------------------------------------------------

    /// Activates a final target.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] if `name` was not created via
    /// [`Registry::create_final`].
    pub fn activate_final(&mut self, name: &str) -> Result<(), EngineError> {
        self.set_activation(LifecycleKind::Final, name, true)
    }

    /// Deactivates a final target.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] if `name` was not created via
    /// [`Registry::create_final`].
    pub fn deactivate_final(&mut self, name: &str) -> Result<(), EngineError> {
        self.set_activation(LifecycleKind::Final, name, false)
    }

    /// Activates a build-failure target.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] if `name` was not created via
    /// [`Registry::create_build_failure`].
    pub fn activate_build_failure(&mut self, name: &str) -> Result<(), EngineError> {
        self.set_activation(LifecycleKind::BuildFailure, name, true)
    }

    /// Deactivates a build-failure target.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] if `name` was not created via
    /// [`Registry::create_build_failure`].
    pub fn deactivate_build_failure(&mut self, name: &str) -> Result<(), EngineError> {
        self.set_activation(LifecycleKind::BuildFailure, name, false)
    }

    /// Shared toggle path for the four `activate_*`/`deactivate_*` methods.
    fn set_activation(&mut self, kind: LifecycleKind, name: &str, value: bool) -> Result<(), EngineError> {
        let key = canonical(name);
        let map = match kind {
            LifecycleKind::Final => &mut self.final_targets,
            LifecycleKind::BuildFailure => &mut self.build_failure_targets,
        };
        if let Some(flag) = map.get_mut(&key) {
            *flag = value;
            Ok(())
        } else {
            Err(self.unknown_target(name))
        }
    }

    /// Returns the canonical names of every target activated as a final
    /// target, in declaration order.
    #[must_use]
    pub fn active_final_targets(&self) -> Vec<String> {
        self.final_targets.iter().filter(|(_, active)| **active).map(|(name, _)| name.clone()).collect()
    }

    /// Returns the canonical names of every target activated as a
    /// build-failure target, in declaration order.
    #[must_use]
    pub fn active_build_failure_targets(&self) -> Vec<String> {
        self.build_failure_targets.iter().filter(|(_, active)| **active).map(|(name, _)| name.clone()).collect()
    }

    // ------------------------------------------------------------------
    // Dependencies
    // ------------------------------------------------------------------

    /// Adds a hard dependency: `target` must run after `dep`.
    ///
    /// If `dep` was previously recorded as a soft dependency of `target`,
    /// it is promoted (removed from the soft list).
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] if either name is unknown, or
    /// [`EngineError::CyclicDependency`] if the edge would close a cycle in
    /// the hard-dependency subgraph.
    pub fn add_dependency(&mut self, target: &str, dep: &str) -> Result<(), EngineError> {
        self.add_edge(target, dep, EdgeKind::Hard)
    }

    /// Adds a soft dependency: `target` must run after `dep` only if `dep`
    /// is also hard-reachable from the chosen run root.
    ///
    /// Unlike [`Registry::add_dependency`], `dep` need not already be a
    /// known target name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] if `target` is unknown, or
    /// [`EngineError::CyclicDependency`] if the edge would close a cycle in
    /// the soft-dependency subgraph.
    pub fn add_soft_dependency(&mut self, target: &str, dep: &str) -> Result<(), EngineError> {
        self.add_edge(target, dep, EdgeKind::Soft)
    }

    /// Shared edge-insertion path for hard and soft dependencies.
    fn add_edge(&mut self, target: &str, dep: &str, kind: EdgeKind) -> Result<(), EngineError> {
        let target_key = canonical(target);
        let dep_key = canonical(dep);

        if !self.targets.contains_key(&target_key) {
            return Err(self.unknown_target(target));
        }
        if kind == EdgeKind::Hard && !self.targets.contains_key(&dep_key) {
            return Err(self.unknown_target(dep));
        }

        if self.reaches(&dep_key, &target_key, kind) {
            let dependent_name = self.display_name(&target_key, target);
            let dependency_name = self.display_name(&dep_key, dep);
            return Err(EngineError::CyclicDependency { dependent: dependent_name, dependency: dependency_name });
        }

        let entry = self.targets.get_mut(&target_key).expect("checked above");
        let list = match kind {
            EdgeKind::Hard => {
                entry.soft_dependencies.retain(|existing| canonical(existing) != dep_key);
                &mut entry.dependencies
            }
            EdgeKind::Soft => &mut entry.soft_dependencies,
        };
        if !list.iter().any(|existing| canonical(existing) == dep_key) {
            list.insert(0, dep.to_string());
        }
        Ok(())
    }

    /// Depth-first search over the same-kind dependency subgraph starting
    /// at `start`, returning whether `goal` is reachable.
    ///
    /// Used to reject an edge `dependent -> dependency` before it is
    /// inserted: the edge would close a cycle iff `dependency` can already
    /// reach `dependent`.
    fn reaches(&self, start: &str, goal: &str, kind: EdgeKind) -> bool {
        if start == goal {
            return true;
        }
        let mut visited = HashSet::new();
        let mut stack = vec![start.to_string()];
        while let Some(current) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }
            if current == goal {
                return true;
            }
            if let Some(target) = self.targets.get(&current) {
                let edges = match kind {
                    EdgeKind::Hard => &target.dependencies,
                    EdgeKind::Soft => &target.soft_dependencies,
                };
                for next in edges {
                    stack.push(canonical(next));
                }
            }
        }
        false
    }

    /// Resolves a canonical key back to its originally declared casing, for
    /// a known target, falling back to the supplied literal otherwise (the
    /// soft-dependency case, where the name need not be declared).
    fn display_name(&self, key: &str, fallback: &str) -> String {
        self.targets.get(key).map_or_else(|| fallback.to_string(), |target| target.name.clone())
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Looks up a target by case-insensitive name.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownTarget`] on a miss, listing every
    /// currently known target name.
    pub fn get(&self, name: &str) -> Result<&Target, EngineError> {
        self.targets.get(&canonical(name)).ok_or_else(|| self.unknown_target(name))
    }

    /// Returns every declared target, in no particular order.
    #[must_use]
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Looks up a target by canonical key directly, without re-lowercasing.
    #[must_use]
    pub(crate) fn get_canonical(&self, key: &str) -> Option<&Target> {
        self.targets.get(key)
    }

    /// Builds an [`EngineError::UnknownTarget`] listing all known names.
    fn unknown_target(&self, name: &str) -> EngineError {
        let mut known: Vec<String> = self.targets.values().map(|target| target.name.clone()).collect();
        known.sort_by_key(|name| name.to_ascii_lowercase());
        EngineError::UnknownTarget { name: name.to_string(), known }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================


#[cfg(test)]
mod proptests {
    use proptest::prelude::*;

    use super::*;

    fn noop(_: &TargetParameter<'_>) -> Result<(), TargetError> {
        Ok(())
    }

    proptest! {
        /// A chain A -> B -> ... is built up hard-dependency by hard-
        /// dependency; closing it into a cycle must always be rejected, and
        /// rejection must leave the chain's existing edges untouched.
        #[test]
        fn rejecting_a_cycle_never_mutates_the_registry(chain_len in 2usize..8) {
            let mut registry = Registry::new();
            for index in 0..chain_len {
                registry.create(format!("T{index}"), noop).unwrap();
            }
            for index in 1..chain_len {
                registry.add_dependency(&format!("T{index}"), &format!("T{}", index - 1)).unwrap();
            }

            let before: Vec<String> = registry.get("T0").unwrap().dependencies().to_vec();
            let closing_edge = registry.add_dependency("T0", &format!("T{}", chain_len - 1));
            prop_assert!(closing_edge.is_err());

            let after: Vec<String> = registry.get("T0").unwrap().dependencies().to_vec();
            prop_assert_eq!(before, after);
            for index in 1..chain_len {
                prop_assert_eq!(
                    registry.get(&format!("T{index}")).unwrap().dependencies().to_vec(),
                    vec![format!("T{}", index - 1)]
                );
            }
        }
    }
}
