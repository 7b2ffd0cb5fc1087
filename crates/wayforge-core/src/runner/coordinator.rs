// crates/wayforge-core/src/runner/coordinator.rs
// ============================================================================
// Module: Parallel Coordinator
// Description: A single coordinator task plus a fixed pool of worker tasks,
// executing a build against the raw dependency edges rather than whole
// layers.
// Purpose: Let independent targets within (and across) layers run
// concurrently, bounded by a worker count, while keeping all scheduling
// decisions in one place.
// Dependencies: tokio::sync::{mpsc, oneshot, RwLock}, crate::graph,
// crate::runner::driver, crate::runner::sequential
// ============================================================================

//! ## Overview
//! The coordinator is the single writer of scheduling state: which targets
//! are waiting on predecessors, which are runnable, which are in flight, and
//! which have resolved. Workers are dumb by design — each one asks the
//! coordinator for work over an `mpsc` request channel carrying a `oneshot`
//! reply, runs whatever it is handed, and reports the result back over a
//! second `mpsc` channel. This mirrors the request/reply shape used by the
//! teacher's channel-backed sink: a bounded number of concurrent askers, one
//! actor serializing the answers.
//!
//! Scheduling is edge-level, not layer-level: a target becomes runnable the
//! moment its own predecessors resolve, without waiting for the rest of its
//! [`crate::graph::BuildPlan`] layer. Once the shared context's global
//! `HasError` flag trips, every ready-but-not-yet-dispatched target is
//! resolved as skipped inline by the coordinator, cascading through the rest
//! of the pending set; none of them ever occupy a worker.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::HashSet;
use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::sync::RwLock;

use crate::context::CancellationToken;
use crate::context::TargetContext;
use crate::context::TargetOutcome;
use crate::context::TargetResult;
use crate::error::EngineError;
use crate::graph::effective_predecessors;
use crate::registry::Registry;
use crate::runner::driver::execute_target;
use crate::runner::driver::skip_target;
use crate::trace::BuildState;
use crate::trace::Tracer;

// ============================================================================
// SECTION: Messages
// ============================================================================

/// Instruction sent from the coordinator to a parked worker.
enum Command {
    /// Run the named target.
    Run(String),
    /// No more work will ever arrive; stop asking.
    Shutdown,
}

/// A worker's request for its next assignment.
type Request = oneshot::Sender<Command>;

/// A worker's report that a target finished.
type Completion = (String, TargetResult);

// ============================================================================
// SECTION: Parallel Execution
// ============================================================================

/// Runs every target reachable from `root` with up to `workers` concurrent
/// target bodies in flight at once.
///
/// # Errors
///
/// Returns [`EngineError::InvalidParallelism`] if `workers` is zero, any
/// error [`crate::graph::effective_predecessors`] can return, or
/// [`EngineError::SchedulerDeadlock`] if the coordinator finds itself with
/// nothing running and nothing runnable while targets remain unresolved —
/// reachable only on a scheduler logic bug, since the plan's edges are
/// acyclic by construction.
pub async fn run_parallel(
    registry: Arc<Registry>,
    root: &str,
    workers: usize,
    cancellation: CancellationToken,
    tracer: Arc<dyn Tracer>,
    arguments: Vec<String>,
) -> Result<(TargetContext, BuildState), EngineError> {
    if workers == 0 {
        return Err(EngineError::InvalidParallelism("0".to_string()));
    }

    let mut pending = effective_predecessors(&registry, root)?;
    let total = pending.len();
    let context = Arc::new(RwLock::new(TargetContext::with_arguments(arguments)));

    let mut ready: VecDeque<String> = VecDeque::new();
    collect_newly_ready(&mut pending, &mut ready);

    let (request_tx, mut request_rx) = mpsc::channel::<Request>(workers);
    let (completion_tx, mut completion_rx) = mpsc::channel::<Completion>(workers);

    for _ in 0..workers {
        let registry = Arc::clone(&registry);
        let context = Arc::clone(&context);
        let cancellation = cancellation.clone();
        let tracer = Arc::clone(&tracer);
        let request_tx = request_tx.clone();
        let completion_tx = completion_tx.clone();
        tokio::spawn(async move {
            worker_loop(registry, context, cancellation, tracer, request_tx, completion_tx).await;
        });
    }
    drop(request_tx);
    drop(completion_tx);

    let mut running: HashSet<String> = HashSet::new();
    let mut parked: Vec<Request> = Vec::new();
    let mut resolved = 0usize;
    let mut any_failure = false;
    let mut shutting_down = false;

    let outcome: Result<(), EngineError> = 'main: loop {
        if cancellation.is_cancelled() && !shutting_down {
            shutting_down = true;
            resolved += drain_as_cancelled(&mut pending, &mut ready, Arc::clone(&context)).await;
            for reply in parked.drain(..) {
                let _ = reply.send(Command::Shutdown);
            }
        }

        assign_skippable(&registry, &mut ready, &mut pending, Arc::clone(&context), &mut resolved).await;

        while !shutting_down {
            let (Some(name), Some(reply)) = (ready.pop_front(), parked.pop()) else {
                break;
            };
            running.insert(name.clone());
            let _ = reply.send(Command::Run(name));
        }

        if resolved >= total {
            break 'main Ok(());
        }

        if !shutting_down && ready.is_empty() && running.is_empty() {
            break 'main Err(EngineError::SchedulerDeadlock { resolved, known: total });
        }

        tokio::select! {
            maybe_request = request_rx.recv() => {
                match maybe_request {
                    Some(reply) => {
                        if shutting_down {
                            let _ = reply.send(Command::Shutdown);
                        } else {
                            parked.push(reply);
                        }
                    }
                    None => break 'main Ok(()),
                }
            }
            maybe_completion = completion_rx.recv() => {
                match maybe_completion {
                    Some((name, result)) => {
                        running.remove(&name);
                        if result.outcome().is_failure() {
                            any_failure = true;
                        }
                        context.write().await.record(name.clone(), result);
                        resolved += 1;
                        resolve_dependents(&name, &mut pending, &mut ready);
                    }
                    None => break 'main Ok(()),
                }
            }
        }
    };

    // Every worker must observe a Shutdown command before this task reclaims
    // sole ownership of `context`; otherwise a parked worker holding a clone
    // of the Arc would block `try_unwrap` forever.
    for reply in parked.drain(..) {
        let _ = reply.send(Command::Shutdown);
    }
    while let Some(reply) = request_rx.recv().await {
        let _ = reply.send(Command::Shutdown);
    }
    outcome?;

    let final_context = Arc::try_unwrap(context)
        .unwrap_or_else(|shared| panic!("{} outstanding references to run context", Arc::strong_count(&shared)))
        .into_inner();

    let state = if cancellation.is_cancelled() {
        BuildState::Cancelled
    } else if any_failure {
        BuildState::Failure
    } else {
        BuildState::Ok
    };

    Ok((final_context, state))
}

// ============================================================================
// SECTION: Worker
// ============================================================================

/// A single worker's request/run/report loop.
async fn worker_loop(
    registry: Arc<Registry>,
    context: Arc<RwLock<TargetContext>>,
    cancellation: CancellationToken,
    tracer: Arc<dyn Tracer>,
    request_tx: mpsc::Sender<Request>,
    completion_tx: mpsc::Sender<Completion>,
) {
    loop {
        let (reply_tx, reply_rx) = oneshot::channel();
        if request_tx.send(reply_tx).await.is_err() {
            return;
        }
        let command = match reply_rx.await {
            Ok(command) => command,
            Err(_) => return,
        };
        let name = match command {
            Command::Run(name) => name,
            Command::Shutdown => return,
        };

        let guard = context.read().await;
        let target = registry.get_canonical(&name).expect("coordinator only assigns known targets");
        let result = execute_target(target, &guard, &cancellation, tracer.as_ref());
        drop(guard);

        if completion_tx.send((name, result)).await.is_err() {
            return;
        }
    }
}

// ============================================================================
// SECTION: Scheduling Helpers
// ============================================================================

/// Moves every name whose predecessor set is already empty from `pending`
/// into `ready`.
fn collect_newly_ready(pending: &mut HashMap<String, HashSet<String>>, ready: &mut VecDeque<String>) {
    let mut newly_ready: Vec<String> =
        pending.iter().filter(|(_, preds)| preds.is_empty()).map(|(name, _)| name.clone()).collect();
    newly_ready.sort();
    for name in newly_ready {
        pending.remove(&name);
        ready.push_back(name);
    }
}

/// Removes `resolved_name` from every remaining predecessor set and
/// promotes any node this unblocks into `ready`.
fn resolve_dependents(resolved_name: &str, pending: &mut HashMap<String, HashSet<String>>, ready: &mut VecDeque<String>) {
    for preds in pending.values_mut() {
        preds.remove(resolved_name);
    }
    collect_newly_ready(pending, ready);
}

/// Once the shared context is in error, resolves every ready target as
/// skipped inline, without handing it to a worker, cascading the resulting
/// skips through the rest of the pending set. A no-op while the context is
/// still error-free.
async fn assign_skippable(
    registry: &Registry,
    ready: &mut VecDeque<String>,
    pending: &mut HashMap<String, HashSet<String>>,
    context: Arc<RwLock<TargetContext>>,
    resolved: &mut usize,
) {
    if !context.read().await.has_error() {
        return;
    }
    loop {
        let mut still_ready = VecDeque::new();
        let mut skipped_any = false;
        while let Some(name) = ready.pop_front() {
            let target = registry.get_canonical(&name).expect("pending set only names known targets");
            let result = skip_target(target, TargetOutcome::Skipped);
            context.write().await.record(name.clone(), result);
            *resolved += 1;
            resolve_dependents(&name, pending, &mut still_ready);
            skipped_any = true;
        }
        *ready = still_ready;
        if !skipped_any {
            break;
        }
    }
}

/// Marks every not-yet-running, not-yet-resolved target as cancelled,
/// returning how many were resolved this way.
async fn drain_as_cancelled(
    pending: &mut HashMap<String, HashSet<String>>,
    ready: &mut VecDeque<String>,
    context: Arc<RwLock<TargetContext>>,
) -> usize {
    let mut count = 0;
    let mut guard = context.write().await;
    for name in ready.drain(..).chain(pending.drain().map(|(name, _)| name)) {
        let result = TargetResult::new(name.clone(), TargetOutcome::Cancelled, std::time::Duration::ZERO);
        guard.record(name, result);
        count += 1;
    }
    count
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::NullTracer;

    fn registry_with_diamond() -> Registry {
        let mut registry = Registry::new();
        for name in ["Compile", "Test", "Lint", "Deploy"] {
            registry.create(name, |_| Ok(())).unwrap();
        }
        registry.add_dependency("Test", "Compile").unwrap();
        registry.add_dependency("Lint", "Compile").unwrap();
        registry.add_dependency("Deploy", "Test").unwrap();
        registry.add_dependency("Deploy", "Lint").unwrap();
        registry
    }

    #[tokio::test]
    async fn parallel_diamond_resolves_all_targets() {
        let registry = Arc::new(registry_with_diamond());
        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (context, state) = run_parallel(registry, "Deploy", 2, cancellation, tracer, Vec::new()).await.unwrap();
        assert!(matches!(state, BuildState::Ok));
        assert_eq!(context.len(), 4);
        assert!(context.succeeded("deploy"));
    }

    #[tokio::test]
    async fn parallel_failure_skips_dependents() {
        let mut registry = Registry::new();
        registry.create("Compile", |_| Err("boom".into())).unwrap();
        registry.create("Test", |_| Ok(())).unwrap();
        registry.add_dependency("Test", "Compile").unwrap();
        let registry = Arc::new(registry);

        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (context, state) = run_parallel(registry, "Test", 3, cancellation, tracer, Vec::new()).await.unwrap();
        assert!(matches!(state, BuildState::Failure));
        assert!(matches!(context.result("test").unwrap().outcome(), TargetOutcome::Skipped));
    }

    #[tokio::test]
    async fn parallel_failure_skips_unrelated_ready_targets_too() {
        // Compile (fails) and Unrelated share no dependency edge; both are
        // only pulled in by Root. A per-dependency skip check would let
        // Unrelated run to success; the global HasError check must not.
        let mut registry = Registry::new();
        registry.create("Compile", |_| Err("boom".into())).unwrap();
        registry.create("Unrelated", |_| Ok(())).unwrap();
        registry.create("Root", |_| Ok(())).unwrap();
        registry.add_dependency("Root", "Compile").unwrap();
        registry.add_dependency("Root", "Unrelated").unwrap();
        let registry = Arc::new(registry);

        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (context, state) = run_parallel(registry, "Root", 1, cancellation, tracer, Vec::new()).await.unwrap();
        assert!(matches!(state, BuildState::Failure));
        assert!(matches!(context.result("root").unwrap().outcome(), TargetOutcome::Skipped));
    }

    #[tokio::test]
    async fn single_worker_matches_sequential_result_set() {
        let registry = registry_with_diamond();
        let plan = crate::graph::compute_plan(&registry, "Deploy").unwrap();
        let cancellation = CancellationToken::new();
        let (sequential_context, sequential_state) =
            crate::runner::sequential::run_sequential(&registry, &plan, &cancellation, &NullTracer, Vec::new());

        let registry = Arc::new(registry);
        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (parallel_context, parallel_state) =
            run_parallel(registry, "Deploy", 1, cancellation, tracer, Vec::new()).await.unwrap();

        assert_eq!(sequential_context.len(), parallel_context.len());
        assert_eq!(format!("{sequential_state}"), format!("{parallel_state}"));
    }

    #[tokio::test]
    async fn pre_cancelled_token_resolves_everything_as_cancelled() {
        let registry = Arc::new(registry_with_diamond());
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (context, state) = run_parallel(registry, "Deploy", 2, cancellation, tracer, Vec::new()).await.unwrap();
        assert!(matches!(state, BuildState::Cancelled));
        assert_eq!(context.len(), 4);
    }

    #[tokio::test]
    async fn zero_workers_is_rejected() {
        let registry = Arc::new(registry_with_diamond());
        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let err = run_parallel(registry, "Deploy", 0, cancellation, tracer, Vec::new()).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidParallelism(_)));
    }

    #[tokio::test]
    async fn bounded_workers_still_resolve_a_wide_layer() {
        let mut registry = Registry::new();
        registry.create("Root", |_| Ok(())).unwrap();
        for index in 0..8 {
            let name = format!("Leaf{index}");
            registry.create(name.clone(), |_| Ok(())).unwrap();
            registry.add_dependency("Root", &name).unwrap();
        }
        let registry = Arc::new(registry);
        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (context, state) = run_parallel(registry, "Root", 4, cancellation, tracer, Vec::new()).await.unwrap();
        assert!(matches!(state, BuildState::Ok));
        assert_eq!(context.len(), 9);
    }

    #[tokio::test]
    async fn arguments_are_visible_to_target_bodies() {
        let mut registry = Registry::new();
        registry
            .create("Build", |parameter| {
                if parameter.context().arguments() == ["--release"] {
                    Ok(())
                } else {
                    Err("expected --release".into())
                }
            })
            .unwrap();
        let registry = Arc::new(registry);
        let cancellation = CancellationToken::new();
        let tracer: Arc<dyn Tracer> = Arc::new(NullTracer);
        let (context, state) =
            run_parallel(registry, "Build", 1, cancellation, tracer, vec!["--release".to_string()]).await.unwrap();
        assert!(matches!(state, BuildState::Ok));
        assert!(context.succeeded("build"));
    }
}
