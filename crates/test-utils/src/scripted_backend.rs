use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use shellsched::dag::Task;
use shellsched::exec::{Attempt, AttemptError, CommandBackend};
use tokio_util::sync::CancellationToken;

/// One scripted attempt: wait `delay`, then report `attempt`.
#[derive(Debug, Clone)]
pub struct Scripted {
    pub delay: Duration,
    pub attempt: Attempt,
}

impl Scripted {
    pub fn ok() -> Self {
        Self {
            delay: Duration::ZERO,
            attempt: Attempt::success(""),
        }
    }

    pub fn ok_with_output(output: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            attempt: Attempt::success(output),
        }
    }

    pub fn fail(code: i32) -> Self {
        Self {
            delay: Duration::ZERO,
            attempt: Attempt::failure(code, "", AttemptError::Exit(code)),
        }
    }

    pub fn timeout(limit: Duration) -> Self {
        Self {
            delay: Duration::ZERO,
            attempt: Attempt::failure(-1, "", AttemptError::Timeout { limit }),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A recorded call to `run_attempt`.
#[derive(Debug, Clone)]
pub struct Launch {
    pub task: String,
    pub at: Instant,
}

/// A fake backend that:
/// - records every launch with its timestamp
/// - answers with per-task scripted attempts (in order), falling back to a
///   default once a task's script is exhausted
/// - reports `Cancelled` if the scheduler shuts down during a delay.
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    fallback: Scripted,
    launches: Mutex<Vec<Launch>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self {
            scripts: Mutex::new(HashMap::new()),
            fallback: Scripted::ok(),
            launches: Mutex::new(Vec::new()),
        }
    }

    /// Attempt used for tasks without a (remaining) script.
    pub fn with_fallback(mut self, fallback: Scripted) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn script(self, task: &str, attempts: Vec<Scripted>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(task.to_string(), attempts.into());
        self
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }

    /// Task ids in launch order.
    pub fn launch_order(&self) -> Vec<String> {
        self.launches().into_iter().map(|l| l.task).collect()
    }

    pub fn launch_count(&self, task: &str) -> usize {
        self.launches().iter().filter(|l| l.task == task).count()
    }

    pub fn first_launch_of(&self, task: &str) -> Option<Instant> {
        self.launches().into_iter().find(|l| l.task == task).map(|l| l.at)
    }

    fn next_attempt(&self, task: &str) -> Scripted {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(task)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBackend for ScriptedBackend {
    fn run_attempt<'a>(
        &'a self,
        task: &'a Task,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Attempt> + Send + 'a>> {
        self.launches.lock().unwrap().push(Launch {
            task: task.id.clone(),
            at: Instant::now(),
        });
        let scripted = self.next_attempt(&task.id);

        Box::pin(async move {
            tokio::select! {
                _ = tokio::time::sleep(scripted.delay) => scripted.attempt,
                _ = cancel.cancelled() => Attempt::failure(-1, "", AttemptError::Cancelled),
            }
        })
    }
}
