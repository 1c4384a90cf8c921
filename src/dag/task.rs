// src/dag/task.rs

//! Task specification, resolved task and execution result types.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::exec::AttemptError;
use crate::types::TaskStatus;

/// Canonical task id type used throughout the scheduler.
pub type TaskId = String;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_OUTPUT_LINES: usize = 5000;

/// What a caller submits to [`Scheduler::add_task`](crate::engine::Scheduler::add_task).
///
/// Every policy field is optional; defaults are filled in at registration.
#[derive(Debug, Clone, Default)]
pub struct TaskSpec {
    /// Unique id. Auto-generated as `task-N` when absent.
    pub id: Option<TaskId>,
    /// Display name. Defaults to the id.
    pub name: Option<String>,
    /// Program to run, or a full shell line when `args` is empty.
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Option<Duration>,
    /// Number of retries after the first attempt (0 = no retry).
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub max_output_lines: Option<usize>,
    /// `KEY=VALUE` entries added on top of the inherited environment.
    pub env: Vec<String>,
    pub work_dir: Option<PathBuf>,
    /// Ids of tasks that must reach a terminal status first.
    pub dependencies: Vec<TaskId>,
}

impl TaskSpec {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn retry(mut self, count: u32, delay: Duration) -> Self {
        self.retry_count = count;
        self.retry_delay = delay;
        self
    }

    pub fn max_output_lines(mut self, lines: usize) -> Self {
        self.max_output_lines = Some(lines);
        self
    }

    pub fn env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(dir.into());
        self
    }

    pub fn after(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Resolve defaults. `auto_id` is used when no id was given.
    pub fn resolve(self, auto_id: impl FnOnce() -> TaskId) -> Task {
        let id = match self.id {
            Some(id) if !id.is_empty() => id,
            _ => auto_id(),
        };
        let name = match self.name {
            Some(name) if !name.is_empty() => name,
            _ => id.clone(),
        };

        Task {
            name,
            command: self.command,
            args: self.args,
            timeout: self
                .timeout
                .filter(|t| !t.is_zero())
                .unwrap_or(DEFAULT_TIMEOUT),
            retry_count: self.retry_count,
            retry_delay: self.retry_delay,
            max_output_lines: self
                .max_output_lines
                .filter(|&n| n > 0)
                .unwrap_or(DEFAULT_MAX_OUTPUT_LINES),
            env: self.env,
            work_dir: self.work_dir,
            dependencies: self.dependencies.into_iter().collect(),
            id,
        }
    }
}

/// A registered task with every default applied. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub command: String,
    pub args: Vec<String>,
    pub timeout: Duration,
    pub retry_count: u32,
    pub retry_delay: Duration,
    pub max_output_lines: usize,
    pub env: Vec<String>,
    pub work_dir: Option<PathBuf>,
    pub dependencies: BTreeSet<TaskId>,
}

impl Task {
    pub fn has_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }

    /// Human-readable command line for logs and dry-run output.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.command.clone()
        } else {
            format!("{} {}", self.command, self.args.join(" "))
        }
    }
}

/// Final outcome of a task's attempt sequence. Published once, never revised.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_id: TaskId,
    pub task_name: String,
    pub status: TaskStatus,
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    pub duration: Duration,
    pub exit_code: i32,
    /// Output of the kept attempt, truncated to `max_output_lines`.
    pub output: String,
    /// Present iff `status` is `Failed` or `Timeout`.
    pub error: Option<AttemptError>,
    /// Retries actually performed (0 on first-attempt success).
    pub retry_count: u32,
}

impl TaskResult {
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}
