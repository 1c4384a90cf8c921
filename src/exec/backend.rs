// src/exec/backend.rs

//! Pluggable command backend abstraction.
//!
//! Workers talk to a `CommandBackend` instead of spawning processes
//! directly. Production code uses [`ProcessBackend`]; tests can provide an
//! implementation that returns scripted attempts and counts launches.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::dag::Task;

use super::task_runner::run_command;

/// Why a single attempt did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptError {
    /// The process could not be started.
    #[error("failed to launch process: {0}")]
    Launch(String),

    /// The process ran and exited unsuccessfully.
    #[error("process exited with code {0}")]
    Exit(i32),

    #[error("I/O error while waiting for process: {0}")]
    Io(String),

    #[error("task timed out (limit: {limit:?})")]
    Timeout { limit: Duration },

    #[error("cancelled by scheduler shutdown")]
    Cancelled,
}

impl AttemptError {
    /// Everything except shutdown is worth another attempt.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, AttemptError::Cancelled)
    }
}

/// Outcome of one process launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempt {
    pub exit_code: i32,
    /// Merged stdout/stderr, one `\n`-terminated line per captured line.
    pub output: String,
    pub error: Option<AttemptError>,
}

impl Attempt {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: output.into(),
            error: None,
        }
    }

    pub fn failure(exit_code: i32, output: impl Into<String>, error: AttemptError) -> Self {
        Self {
            exit_code,
            output: output.into(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Trait abstracting how one attempt of a task is executed.
pub trait CommandBackend: Send + Sync {
    /// Run `task` once, honouring its timeout and the global `cancel` token.
    ///
    /// Failures are reported inside the returned [`Attempt`], never as a
    /// panic or a separate error channel.
    fn run_attempt<'a>(
        &'a self,
        task: &'a Task,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Attempt> + Send + 'a>>;
}

/// Real backend used in production: spawns OS processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessBackend;

impl CommandBackend for ProcessBackend {
    fn run_attempt<'a>(
        &'a self,
        task: &'a Task,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Attempt> + Send + 'a>> {
        Box::pin(run_command(task, cancel))
    }
}
