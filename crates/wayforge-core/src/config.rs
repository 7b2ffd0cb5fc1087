// crates/wayforge-core/src/config.rs
// ============================================================================
// Module: Engine Environment Configuration
// Description: Typed reader for the three environment variables the engine
// recognizes.
// Purpose: Centralize environment-variable parsing instead of scattering
// std::env::var calls through the runner and CLI.
// Dependencies: std::env
// ============================================================================

//! ## Overview
//! The engine recognizes exactly three environment variables (see the
//! external-interfaces section of the specification): `target`,
//! `parallel-jobs`, and `single-target`. [`EngineEnv::from_env`] reads all
//! three up front so the rest of the engine never touches `std::env`
//! directly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;

use crate::error::EngineError;

// ============================================================================
// SECTION: Engine Environment
// ============================================================================

/// Snapshot of the engine's recognized environment variables.
///
/// # Invariants
/// - Read once, at CLI startup, after `-e/--environment-variable`
///   overrides have been applied to the process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineEnv {
    /// Target name override, from the `target` environment variable.
    pub target: Option<String>,
    /// Default worker count, from the `parallel-jobs` environment variable.
    pub parallel_jobs: Option<usize>,
    /// Whether `single-target` mode is enabled by environment presence.
    pub single_target: bool,
}

impl EngineEnv {
    /// Reads the engine's environment variables from the current process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidParallelism`] when `parallel-jobs` is
    /// set but does not parse as a positive integer.
    pub fn from_env() -> Result<Self, EngineError> {
        let target = env::var("target").ok().filter(|value| !value.is_empty());

        let parallel_jobs = match env::var("parallel-jobs") {
            Ok(value) => {
                let parsed: usize = value
                    .trim()
                    .parse()
                    .map_err(|_| EngineError::InvalidParallelism(value.clone()))?;
                if parsed == 0 {
                    return Err(EngineError::InvalidParallelism(value));
                }
                Some(parsed)
            }
            Err(_) => None,
        };

        let single_target = env::var("single-target").is_ok();

        Ok(Self { target, parallel_jobs, single_target })
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
#[allow(unsafe_code, reason = "Tests mutate process env for configuration, guarded by env_lock().")]
mod tests {
    use std::sync::Mutex;
    use std::sync::OnceLock;

    use super::*;

    /// Environment variable tests must not run concurrently with each other
    /// since they mutate process-global state.
    fn env_lock() -> &'static Mutex<()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
    }

    #[test]
    fn defaults_to_empty_when_unset() {
        let _guard = env_lock().lock().unwrap_or_else(|poison| poison.into_inner());
        // SAFETY: env_lock() serializes every test touching process env.
        unsafe {
            env::remove_var("target");
            env::remove_var("parallel-jobs");
            env::remove_var("single-target");
        }
        let cfg = EngineEnv::from_env().expect("no env vars set");
        assert_eq!(cfg, EngineEnv::default());
    }

    #[test]
    fn parses_parallel_jobs() {
        let _guard = env_lock().lock().unwrap_or_else(|poison| poison.into_inner());
        unsafe {
            env::set_var("parallel-jobs", "4");
            env::remove_var("target");
            env::remove_var("single-target");
        }
        let cfg = EngineEnv::from_env().expect("valid parallel-jobs");
        assert_eq!(cfg.parallel_jobs, Some(4));
        unsafe {
            env::remove_var("parallel-jobs");
        }
    }

    #[test]
    fn rejects_non_numeric_parallel_jobs() {
        let _guard = env_lock().lock().unwrap_or_else(|poison| poison.into_inner());
        unsafe {
            env::set_var("parallel-jobs", "banana");
        }
        let err = EngineEnv::from_env().expect_err("non-numeric value must fail");
        assert!(matches!(err, EngineError::InvalidParallelism(value) if value == "banana"));
        unsafe {
            env::remove_var("parallel-jobs");
        }
    }

    #[test]
    fn rejects_zero_parallel_jobs() {
        let _guard = env_lock().lock().unwrap_or_else(|poison| poison.into_inner());
        unsafe {
            env::set_var("parallel-jobs", "0");
        }
        let err = EngineEnv::from_env().expect_err("zero is not a valid worker count");
        assert!(matches!(err, EngineError::InvalidParallelism(_)));
        unsafe {
            env::remove_var("parallel-jobs");
        }
    }

    #[test]
    fn single_target_is_presence_based() {
        let _guard = env_lock().lock().unwrap_or_else(|poison| poison.into_inner());
        unsafe {
            env::set_var("single-target", "");
            env::remove_var("target");
            env::remove_var("parallel-jobs");
        }
        let cfg = EngineEnv::from_env().expect("presence only");
        assert!(cfg.single_target);
        unsafe {
            env::remove_var("single-target");
        }
    }
}
