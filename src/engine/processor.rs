// src/engine/processor.rs

//! Single consumer of the results channel.
//!
//! The processor is the only owner of the [`DependencyResolver`], so the
//! completion bookkeeping itself needs no lock; it still writes results into
//! the shared store under the store mutex.

use std::collections::VecDeque;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::{DependencyResolver, Task, TaskResult};

use super::store::{lock_store, SharedStore};

pub struct ResultProcessor {
    resolver: DependencyResolver,
    store: SharedStore,
    ready_tx: mpsc::Sender<Task>,
    results_rx: mpsc::Receiver<TaskResult>,
    roots_dispatched: oneshot::Receiver<()>,
    /// Released dependents waiting for ready-queue capacity, FIFO.
    backlog: VecDeque<Task>,
    saturated: bool,
    cancel: CancellationToken,
    /// Number of recorded results, observed by `wait_for_completion`.
    progress: watch::Sender<usize>,
}

impl ResultProcessor {
    pub fn new(
        resolver: DependencyResolver,
        store: SharedStore,
        ready_tx: mpsc::Sender<Task>,
        results_rx: mpsc::Receiver<TaskResult>,
        roots_dispatched: oneshot::Receiver<()>,
        cancel: CancellationToken,
        progress: watch::Sender<usize>,
    ) -> Self {
        Self {
            resolver,
            store,
            ready_tx,
            results_rx,
            roots_dispatched,
            backlog: VecDeque::new(),
            saturated: false,
            cancel,
            progress,
        }
    }

    /// Main loop.
    ///
    /// Runs until every results sender is gone, i.e. until all workers have
    /// exited. Dependents are held back until the initial dispatch pass has
    /// finished so that roots always enter the ready-queue first.
    pub async fn run(mut self) {
        info!("result processor started");
        let mut roots_done = false;

        loop {
            let dispatching = roots_done && !self.cancel.is_cancelled();
            if dispatching {
                self.flush_backlog();
            }
            let want_capacity = dispatching && !self.backlog.is_empty();
            let ready_tx = self.ready_tx.clone();

            tokio::select! {
                result = self.results_rx.recv() => match result {
                    Some(result) => self.handle_result(result),
                    None => break,
                },
                dispatched = &mut self.roots_dispatched, if !roots_done => {
                    roots_done = true;
                    if dispatched.is_err() {
                        debug!("initial dispatch ended early");
                    }
                }
                permit = ready_tx.reserve(), if want_capacity => match permit {
                    Ok(permit) => {
                        if let Some(task) = self.backlog.pop_front() {
                            debug!(task = %task.id, backlog = self.backlog.len(), "dispatching task from backlog");
                            permit.send(task);
                        }
                    }
                    Err(_) => {
                        warn!(abandoned = self.backlog.len(), "ready queue closed; abandoning backlog");
                        self.backlog.clear();
                    }
                },
                _ = self.cancel.cancelled(), if !self.backlog.is_empty() => {
                    info!(abandoned = self.backlog.len(), "shutdown requested; abandoning backlog");
                    self.backlog.clear();
                }
            }
        }

        info!("result processor finished (results channel closed)");
    }

    /// Record a result, mark it completed and queue newly-ready dependents.
    fn handle_result(&mut self, result: TaskResult) {
        let id = result.task_id.clone();
        debug!(task = %id, status = %result.status, "recording task result");

        let recorded = {
            let mut store = lock_store(&self.store);
            store.running.remove(&id);
            store.results.insert(id.clone(), result);
            store.results.len()
        };
        self.progress.send_replace(recorded);

        let released = self.resolver.record_completion(&id);

        if self.cancel.is_cancelled() {
            if !released.is_empty() {
                debug!(count = released.len(), "shutting down; not dispatching released dependents");
            }
            return;
        }

        for task in released {
            info!(task = %task.id, after = %id, "dependencies completed; queueing task");
            self.backlog.push_back(task);
        }

        if self.resolver.all_completed() {
            info!(results = recorded, "all tasks completed");
        }
    }

    /// Move backlog entries into the ready-queue without blocking.
    fn flush_backlog(&mut self) {
        while let Some(task) = self.backlog.pop_front() {
            match self.ready_tx.try_send(task) {
                Ok(()) => {
                    self.saturated = false;
                }
                Err(TrySendError::Full(task)) => {
                    if !self.saturated {
                        warn!(
                            task = %task.id,
                            backlog = self.backlog.len() + 1,
                            "ready queue full; holding released tasks in backlog"
                        );
                        self.saturated = true;
                    }
                    self.backlog.push_front(task);
                    return;
                }
                Err(TrySendError::Closed(task)) => {
                    warn!(task = %task.id, "ready queue closed; abandoning backlog");
                    self.backlog.clear();
                    return;
                }
            }
        }
    }
}
