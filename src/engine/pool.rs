// src/engine/pool.rs

//! Fixed-size worker pool and the initial dispatch pass.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::dag::{Task, TaskResult};
use crate::exec::{execute_with_retry, CommandBackend};

use super::store::{lock_store, SharedStore};

/// Receiving end of the ready-queue, shared by every worker.
pub type ReadyReceiver = Arc<Mutex<mpsc::Receiver<Task>>>;

/// Everything a worker needs; cloned once per worker.
#[derive(Clone)]
pub struct WorkerContext {
    pub backend: Arc<dyn CommandBackend>,
    pub store: SharedStore,
    pub ready_rx: ReadyReceiver,
    pub results_tx: mpsc::Sender<TaskResult>,
    pub cancel: CancellationToken,
}

/// Spawn `count` anonymous workers pulling from the shared ready-queue.
pub fn spawn_workers(count: usize, ctx: WorkerContext) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|id| {
            let ctx = ctx.clone();
            tokio::spawn(worker_loop(id, ctx))
        })
        .collect()
}

async fn worker_loop(id: usize, ctx: WorkerContext) {
    debug!(worker = id, "worker started");

    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            task = next_task(&ctx.ready_rx) => task,
        };

        let Some(task) = next else {
            break;
        };

        lock_store(&ctx.store).running.insert(task.id.clone());
        info!(worker = id, task = %task.id, name = %task.name, "worker picked up task");

        let result = execute_with_retry(ctx.backend.as_ref(), &task, &ctx.cancel, id).await;

        if ctx.results_tx.send(result).await.is_err() {
            error!(worker = id, task = %task.id, "results channel closed; dropping result");
            break;
        }
    }

    debug!(worker = id, "worker exiting");
}

async fn next_task(ready_rx: &ReadyReceiver) -> Option<Task> {
    ready_rx.lock().await.recv().await
}

/// Push every root task onto the ready-queue, then signal `done`.
///
/// Uses blocking sends: roots wait for queue capacity rather than being
/// dropped. Shutdown abandons whatever has not been sent yet.
pub async fn dispatch_roots(
    roots: Vec<Task>,
    ready_tx: mpsc::Sender<Task>,
    cancel: CancellationToken,
    done: oneshot::Sender<()>,
) {
    let count = roots.len();

    for task in roots {
        let id = task.id.clone();
        tokio::select! {
            sent = ready_tx.send(task) => {
                if sent.is_err() {
                    warn!(task = %id, "ready queue closed during initial dispatch");
                    return;
                }
                debug!(task = %id, "dispatched root task");
            }
            _ = cancel.cancelled() => {
                info!("shutdown requested during initial dispatch");
                return;
            }
        }
    }

    info!(count, "initial dispatch complete");
    let _ = done.send(());
}
