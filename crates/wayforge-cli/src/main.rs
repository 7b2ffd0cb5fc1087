// crates/wayforge-cli/src/main.rs
// ============================================================================
// Module: wayforge CLI Entry Point
// Description: Parses arguments, resolves configuration precedence, declares
// the demo build graph, and drives one Engine run to completion.
// Purpose: The executable front-end for wayforge-core.
// Dependencies: clap, tokio, tracing, tracing-subscriber, wayforge-core
// ============================================================================

//! ## Overview
//! Precedence for the run target and worker count, highest first: an
//! explicit CLI flag, then the corresponding environment variable, then the
//! demo graph's default target (`Deploy`) or sequential execution. `-e/--
//! environment-variable KEY=VALUE` is applied to the process environment
//! before [`wayforge_core::config::EngineEnv::from_env`] runs, so it can
//! supply any of the three recognized variables without a dedicated flag.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod args;
mod demo;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write as _;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use wayforge_core::config::EngineEnv;
use wayforge_core::graph::compute_plan;
use wayforge_core::graph::render_dependency_graph;
use wayforge_core::interrupt::spawn_ctrl_c_listener;
use wayforge_core::report::render_plan;
use wayforge_core::report::render_summary;
use wayforge_core::CancellationToken;
use wayforge_core::Engine;
use wayforge_core::EngineError;
use wayforge_core::TracingTracer;

use crate::args::normalize_args;
use crate::args::Cli;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Top-level CLI error, wrapping every failure `run` can produce.
#[derive(Debug, Error)]
enum CliError {
    /// The engine itself reported a fatal condition.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Writing to stdout or stderr failed.
    #[error("failed to write {stream}: {source}")]
    Output {
        /// Which stream failed.
        stream: &'static str,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// An `-e/--environment-variable` value was not `KEY=VALUE`.
    #[error("invalid -e/--environment-variable value '{0}': expected KEY=VALUE")]
    InvalidEnvironmentOverride(String),
}

type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point, returning a process exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    match run().await {
        Ok(code) => code,
        Err(error) => emit_error(&error.to_string()),
    }
}

/// Runs the CLI to completion.
async fn run() -> CliResult<ExitCode> {
    let (normalized_args, positional_conflict) = normalize_args(std::env::args().collect());
    let cli = Cli::parse_from(normalized_args);
    if positional_conflict {
        write_stderr_line("warning: positional 'target <name>' overrides -t/--target").ok();
    }

    for assignment in &cli.environment_variable {
        apply_environment_override(assignment)?;
    }

    let mut engine = Engine::new(Arc::new(TracingTracer));
    demo::declare(engine.registry_mut())?;

    if cli.list {
        return list_targets(&engine);
    }

    let env = EngineEnv::from_env()?;
    let (target, parallelism, single_target) = resolve_config(&cli, &env);

    if cli.what_if {
        print_plan(&engine, &target)?;
    }

    let cancellation = CancellationToken::new();
    let _ctrl_c = spawn_ctrl_c_listener(cancellation.clone());

    match engine.run(&target, parallelism, single_target, cancellation, cli.script_args.clone()).await {
        Ok(outcome) => {
            write_stdout_line(&render_summary(&outcome.context, outcome.state))?;
            Ok(ExitCode::SUCCESS)
        }
        Err(EngineError::BuildFailed { .. }) => Ok(ExitCode::FAILURE),
        Err(other) => Err(CliError::Engine(other)),
    }
}

// ============================================================================
// SECTION: Configuration Precedence
// ============================================================================

/// Resolves the target name, worker count, and single-target flag from, in
/// priority order, CLI flags then environment variables then the demo
/// graph's default target.
fn resolve_config(cli: &Cli, env: &EngineEnv) -> (String, Option<usize>, bool) {
    let target = cli.target.clone().or_else(|| env.target.clone()).unwrap_or_else(|| "Deploy".to_string());
    let parallelism = cli.parallel.or(env.parallel_jobs);
    let single_target = cli.single_target || env.single_target;
    (target, parallelism, single_target)
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Implements `--list`: prints every declared target's name and description,
/// then exits without running anything.
fn list_targets(engine: &Engine) -> CliResult<ExitCode> {
    let mut rows: Vec<(&str, Option<&str>)> =
        engine.registry().targets().map(|target| (target.name(), target.description())).collect();
    rows.sort_unstable_by_key(|(name, _)| name.to_ascii_lowercase());
    for (name, description) in rows {
        match description {
            Some(description) => write_stdout_line(&format!("{name} - {description}"))?,
            None => write_stdout_line(name)?,
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Implements `--what-if`: prints the computed plan, then the verbose
/// effective-edge dependency graph, before running anything.
fn print_plan(engine: &Engine, target: &str) -> CliResult<()> {
    let plan = compute_plan(engine.registry(), target)?;
    write_stdout_line(render_plan(&plan, engine.registry()).trim_end())?;
    write_stdout_line(render_dependency_graph(engine.registry(), target)?.trim_end())
}

// ============================================================================
// SECTION: Environment Overrides
// ============================================================================

/// Applies one `-e/--environment-variable KEY=VALUE` assignment to the
/// process environment.
///
/// # Safety
///
/// Mutating the process environment is inherently racy with other threads
/// reading it; this is only sound because it runs once, synchronously, at
/// startup, before any other task is spawned.
#[allow(unsafe_code, reason = "std::env::set_var requires it; see the safety note above.")]
fn apply_environment_override(assignment: &str) -> CliResult<()> {
    let (key, value) =
        assignment.split_once('=').ok_or_else(|| CliError::InvalidEnvironmentOverride(assignment.to_string()))?;
    if key.is_empty() {
        return Err(CliError::InvalidEnvironmentOverride(assignment.to_string()));
    }
    // SAFETY: called only from `run`, before any other task is spawned.
    unsafe {
        std::env::set_var(key, value);
    }
    Ok(())
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|source| CliError::Output { stream: "stdout", source })
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
