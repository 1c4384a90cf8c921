// src/engine/scheduler.rs

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::{validate_tasks, DependencyResolver, Task, TaskId, TaskResult, TaskSpec};
use crate::errors::{Result, SchedulerError};
use crate::exec::{CommandBackend, ProcessBackend};
use crate::types::TaskStatus;

use super::pool::{dispatch_roots, spawn_workers, WorkerContext};
use super::processor::ResultProcessor;
use super::report::Summary;
use super::store::{lock_store, SharedStore};

pub const DEFAULT_MAX_WORKERS: usize = 3;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
const RESULT_QUEUE_CAPACITY: usize = 100;

/// Pool and queue sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Number of concurrent workers (>= 1).
    pub max_workers: usize,
    /// Capacity of the ready-queue (>= 1).
    pub queue_capacity: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_MAX_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Handles for one started run.
struct RunHandles {
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
    dispatcher: JoinHandle<()>,
    processor: JoinHandle<()>,
}

/// Dependency-aware command scheduler.
///
/// Owns the task registry and the results map, and the lifecycle of the
/// worker pool, the result processor and the initial dispatcher.
///
/// ```no_run
/// # async fn demo() -> shellsched::errors::Result<()> {
/// use shellsched::dag::TaskSpec;
/// use shellsched::engine::{Scheduler, SchedulerOptions};
///
/// let mut scheduler = Scheduler::new(SchedulerOptions::default());
/// scheduler.add_task(TaskSpec::new("echo build").id("build"))?;
/// scheduler.add_task(TaskSpec::new("echo test").id("test").after("build"))?;
///
/// scheduler.start()?;
/// scheduler.wait_for_completion().await;
/// scheduler.stop().await;
///
/// println!("{:?}", scheduler.summary());
/// # Ok(())
/// # }
/// ```
pub struct Scheduler {
    options: SchedulerOptions,
    store: SharedStore,
    backend: Arc<dyn CommandBackend>,
    progress_rx: watch::Receiver<usize>,
    run: Option<RunHandles>,
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("options", &self.options)
            .field("running", &self.run.is_some())
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Scheduler backed by real OS processes.
    pub fn new(options: SchedulerOptions) -> Self {
        Self::with_backend(options, Arc::new(ProcessBackend))
    }

    /// Scheduler with a custom [`CommandBackend`] (e.g. a fake in tests).
    pub fn with_backend(options: SchedulerOptions, backend: Arc<dyn CommandBackend>) -> Self {
        // No sender yet: waiting before `start` returns immediately.
        let (_, progress_rx) = watch::channel(0);
        Self {
            options,
            store: SharedStore::default(),
            backend,
            progress_rx,
            run: None,
        }
    }

    pub fn options(&self) -> SchedulerOptions {
        self.options
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    /// Register a task, filling in defaults, and return its id.
    ///
    /// Dependencies are not checked here; that happens in [`start`](Self::start).
    /// Registering an id twice replaces the earlier task.
    pub fn add_task(&mut self, spec: TaskSpec) -> Result<TaskId> {
        if self.run.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let mut store = lock_store(&self.store);
        let next = store.tasks.len() + 1;
        let task = spec.resolve(|| format!("task-{next}"));
        let id = task.id.clone();

        debug!(task = %id, name = %task.name, cmd = %task.command_line(), "registering task");
        if store.tasks.insert(id.clone(), task).is_some() {
            warn!(task = %id, "task id registered twice; replacing earlier task");
        }

        Ok(id)
    }

    /// Register several tasks in order.
    pub fn add_tasks(&mut self, specs: impl IntoIterator<Item = TaskSpec>) -> Result<Vec<TaskId>> {
        specs.into_iter().map(|spec| self.add_task(spec)).collect()
    }

    /// Validate the registered tasks and launch the workers, the result
    /// processor and the initial dispatch of dependency-free tasks.
    ///
    /// Fails without running anything if a dependency is unknown or the
    /// tasks form a cycle. Results of a previous run are discarded.
    /// Must be called from within a Tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.run.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if self.options.max_workers == 0 {
            return Err(SchedulerError::ConfigError(
                "max_workers must be >= 1 (got 0)".to_string(),
            ));
        }
        if self.options.queue_capacity == 0 {
            return Err(SchedulerError::ConfigError(
                "queue_capacity must be >= 1 (got 0)".to_string(),
            ));
        }

        let tasks = {
            let mut store = lock_store(&self.store);
            validate_tasks(&store.tasks)?;
            store.results.clear();
            store.running.clear();
            store.shut_down = false;
            store.tasks.clone()
        };
        let task_count = tasks.len();

        let mut resolver = DependencyResolver::new(tasks);
        let roots = resolver.release_roots();
        let root_ids: Vec<&str> = roots.iter().map(|t| t.id.as_str()).collect();
        info!(
            max_workers = self.options.max_workers,
            queue_capacity = self.options.queue_capacity,
            tasks = task_count,
            roots = ?root_ids,
            "starting scheduler"
        );

        let cancel = CancellationToken::new();
        let (ready_tx, ready_rx) = mpsc::channel::<Task>(self.options.queue_capacity);
        let (results_tx, results_rx) = mpsc::channel::<TaskResult>(RESULT_QUEUE_CAPACITY);
        let (roots_tx, roots_rx) = oneshot::channel::<()>();
        let (progress_tx, progress_rx) = watch::channel(0usize);

        let workers = spawn_workers(
            self.options.max_workers,
            WorkerContext {
                backend: Arc::clone(&self.backend),
                store: Arc::clone(&self.store),
                ready_rx: Arc::new(AsyncMutex::new(ready_rx)),
                results_tx,
                cancel: cancel.clone(),
            },
        );

        let processor = ResultProcessor::new(
            resolver,
            Arc::clone(&self.store),
            ready_tx.clone(),
            results_rx,
            roots_rx,
            cancel.clone(),
            progress_tx,
        );
        let processor = tokio::spawn(processor.run());

        let dispatcher = tokio::spawn(dispatch_roots(roots, ready_tx, cancel.clone(), roots_tx));

        self.progress_rx = progress_rx;
        self.run = Some(RunHandles {
            cancel,
            workers,
            dispatcher,
            processor,
        });

        Ok(())
    }

    /// Cancel everything and wait for the workers and the processor to exit.
    ///
    /// In-flight commands are killed and recorded as `Failed` with a
    /// cancellation error. Tasks still queued or blocked on dependencies get
    /// no result; [`task_status`](Self::task_status) reports them as
    /// `Cancelled`.
    pub async fn stop(&mut self) {
        let Some(run) = self.run.take() else {
            debug!("stop called on a scheduler that is not running");
            return;
        };

        info!("stopping scheduler");
        run.cancel.cancel();

        for worker in run.workers {
            if let Err(e) = worker.await {
                warn!(error = %e, "worker task ended abnormally");
            }
        }
        if let Err(e) = run.dispatcher.await {
            warn!(error = %e, "dispatcher task ended abnormally");
        }
        // Workers held the last results senders; the processor drains and exits.
        if let Err(e) = run.processor.await {
            warn!(error = %e, "result processor ended abnormally");
        }

        let unrun = {
            let mut store = lock_store(&self.store);
            store.shut_down = true;
            store.tasks.len().saturating_sub(store.results.len())
        };
        if unrun > 0 {
            info!(cancelled = unrun, "tasks abandoned before they could run");
        }

        info!("scheduler stopped");
    }

    /// Resolve once every registered task has a result, or once the current
    /// run has been torn down. Returns immediately if never started.
    pub async fn wait_for_completion(&self) {
        let total = self.task_count();
        let mut progress = self.progress_rx.clone();
        if progress.wait_for(|&recorded| recorded >= total).await.is_err() {
            debug!("result processor gone while waiting for completion");
        }
    }

    /// Snapshot of all results recorded so far.
    pub fn results(&self) -> HashMap<TaskId, TaskResult> {
        lock_store(&self.store).results.clone()
    }

    pub fn result_of(&self, id: &str) -> Option<TaskResult> {
        lock_store(&self.store).results.get(id).cloned()
    }

    /// Current status of a registered task, `None` for unknown ids.
    ///
    /// After [`stop`](Self::stop), tasks that never ran are `Cancelled`.
    pub fn task_status(&self, id: &str) -> Option<TaskStatus> {
        let store = lock_store(&self.store);
        if !store.tasks.contains_key(id) {
            return None;
        }
        if let Some(result) = store.results.get(id) {
            return Some(result.status);
        }
        if store.running.contains(id) {
            Some(TaskStatus::Running)
        } else if store.shut_down {
            Some(TaskStatus::Cancelled)
        } else {
            Some(TaskStatus::Pending)
        }
    }

    /// Registered tasks, in id order.
    pub fn tasks(&self) -> Vec<Task> {
        lock_store(&self.store).tasks.values().cloned().collect()
    }

    pub fn task_count(&self) -> usize {
        lock_store(&self.store).tasks.len()
    }

    /// Aggregate counts and durations over the recorded results.
    pub fn summary(&self) -> Summary {
        let store = lock_store(&self.store);
        Summary::from_results(store.results.values())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if let Some(run) = &self.run {
            run.cancel.cancel();
        }
    }
}
