// crates/wayforge-core/src/interrupt.rs
// ============================================================================
// Module: Interrupt Handling
// Description: Wires OS interrupt signals to a CancellationToken.
// Purpose: Let a running build notice Ctrl-C and wind down cooperatively
// instead of being killed mid-target.
// Dependencies: tokio::signal, crate::context::CancellationToken
// ============================================================================

//! ## Overview
//! Cancellation in this engine is always cooperative: a target body is
//! never interrupted mid-execution, it is expected to poll
//! [`crate::context::TargetParameter::is_cancelled`] at its own boundaries.
//! [`spawn_ctrl_c_listener`] bridges the OS signal to that polling model by
//! flipping a [`CancellationToken`] the moment SIGINT arrives; everything
//! downstream of that point — skipping not-yet-started targets, reporting
//! [`crate::trace::BuildState::Cancelled`] — falls out of the runner's
//! existing handling of an already-cancelled token.
//!
//! A second SIGINT means the cooperative wind-down is taking too long to
//! wait for: it force-quits the process immediately, bypassing the engine
//! entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use tokio::task::JoinHandle;

use crate::context::CancellationToken;

// ============================================================================
// SECTION: Signal Wiring
// ============================================================================

/// Spawns a task that cancels `token` the first time the process receives
/// SIGINT (Ctrl-C), prints the two-stage shutdown banner, then force-quits
/// the process with exit code 1 if a second SIGINT arrives before the run
/// has wound down on its own.
///
/// The returned handle resolves once the first signal has been observed and
/// the token cancelled, or the listener task is dropped/aborted; it is not
/// necessary to await it for cancellation to take effect, callers may simply
/// let it run for the life of the process.
#[allow(
    clippy::print_stderr,
    reason = "The shutdown banner is the one message the engine itself must print: it fires from a signal \
              handler with no Tracer scope in progress to route it through."
)]
pub fn spawn_ctrl_c_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        token.cancel();
        eprintln!("Gracefully shutting down…");
        eprintln!("Press Ctrl-C again to force quit.");
        if tokio::signal::ctrl_c().await.is_ok() {
            force_quit();
        }
    })
}

/// Terminates the process immediately, for a second interrupt received while
/// a cooperative shutdown is already in progress.
#[allow(
    clippy::exit,
    reason = "A second interrupt is the one documented way to force-terminate a build that won't wind down."
)]
fn force_quit() -> ! {
    std::process::exit(1);
}

// ============================================================================
// SECTION: Tests
// ============================================================================
