// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::dag::TaskSpec;
use crate::engine::scheduler::{DEFAULT_MAX_WORKERS, DEFAULT_QUEUE_CAPACITY};
use crate::engine::SchedulerOptions;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// workers = 3
/// queue_capacity = 100
///
/// [default]
/// timeout = "5m"
/// retry_count = 1
/// retry_delay = "2s"
///
/// [task.fetch]
/// cmd = "git fetch"
///
/// [task.build]
/// cmd = "make"
/// args = ["all"]
/// after = ["fetch"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Pool sizing from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Per-task policy fallbacks from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All tasks from `[task.<id>]`. Keys are the task ids.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration. Obtain it with `ConfigFile::try_from(raw)` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    tasks: Vec<TaskSpec>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, tasks: Vec<TaskSpec>) -> Self {
        Self { config, tasks }
    }

    pub fn scheduler_options(&self) -> SchedulerOptions {
        SchedulerOptions {
            max_workers: self.config.workers,
            queue_capacity: self.config.queue_capacity,
        }
    }

    /// Task specs with `[default]` values already applied, in id order.
    pub fn task_specs(&self) -> &[TaskSpec] {
        &self.tasks
    }

    pub fn into_task_specs(self) -> Vec<TaskSpec> {
        self.tasks
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of concurrent workers.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Capacity of the ready-queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

fn default_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// `[default]` section: fallbacks for tasks that leave a field unset.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Duration string, e.g. `"5m"`.
    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub retry_count: Option<u32>,

    /// Duration string, e.g. `"3s"`.
    #[serde(default)]
    pub retry_delay: Option<String>,

    #[serde(default)]
    pub max_output_lines: Option<usize>,
}

/// `[task.<id>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Display name; defaults to the id.
    #[serde(default)]
    pub name: Option<String>,

    /// Program to run, or a shell line when `args` is empty.
    pub cmd: String,

    #[serde(default)]
    pub args: Vec<String>,

    /// `KEY=VALUE` entries layered on top of the inherited environment.
    #[serde(default)]
    pub env: Vec<String>,

    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Dependency list: this task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    #[serde(default)]
    pub timeout: Option<String>,

    #[serde(default)]
    pub retry_count: Option<u32>,

    #[serde(default)]
    pub retry_delay: Option<String>,

    #[serde(default)]
    pub max_output_lines: Option<usize>,
}
