// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::model::{ConfigFile, DefaultSection, RawConfigFile, TaskConfig};
use crate::dag::{validate_tasks, Task, TaskId, TaskSpec};
use crate::errors::{Result, SchedulerError};
use crate::types::parse_duration;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = SchedulerError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_tasks(&raw)?;
        validate_global_config(&raw)?;
        let specs = build_task_specs(&raw)?;
        validate_task_graph(&specs)?;
        Ok(ConfigFile::new_unchecked(raw.config, specs))
    }
}

/// Validate a raw config without keeping the result.
pub fn validate_config(raw: &RawConfigFile) -> Result<()> {
    ConfigFile::try_from(raw.clone()).map(|_| ())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SchedulerError::ConfigError(
            "config must contain at least one [task.<id>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.workers == 0 {
        return Err(SchedulerError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.config.queue_capacity == 0 {
        return Err(SchedulerError::ConfigError(
            "[config].queue_capacity must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn build_task_specs(cfg: &RawConfigFile) -> Result<Vec<TaskSpec>> {
    cfg.task
        .iter()
        .map(|(id, task)| build_task_spec(id, task, &cfg.default))
        .collect()
}

fn build_task_spec(id: &str, task: &TaskConfig, defaults: &DefaultSection) -> Result<TaskSpec> {
    if task.cmd.trim().is_empty() {
        return Err(SchedulerError::ConfigError(format!(
            "task '{}' has an empty `cmd`",
            id
        )));
    }

    let timeout = task
        .timeout
        .as_deref()
        .or(defaults.timeout.as_deref())
        .map(|s| parse_field(id, "timeout", s))
        .transpose()?;

    let retry_delay = task
        .retry_delay
        .as_deref()
        .or(defaults.retry_delay.as_deref())
        .map(|s| parse_field(id, "retry_delay", s))
        .transpose()?
        .unwrap_or(Duration::ZERO);

    Ok(TaskSpec {
        id: Some(id.to_string()),
        name: task.name.clone(),
        command: task.cmd.clone(),
        args: task.args.clone(),
        timeout,
        retry_count: task.retry_count.or(defaults.retry_count).unwrap_or(0),
        retry_delay,
        max_output_lines: task.max_output_lines.or(defaults.max_output_lines),
        env: task.env.clone(),
        work_dir: task.work_dir.clone(),
        dependencies: task.after.clone(),
    })
}

fn parse_field(id: &str, field: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| {
        SchedulerError::ConfigError(format!("task '{}': invalid `{}`: {}", id, field, e))
    })
}

/// Same checks the scheduler runs at start: known dependencies, no
/// self-dependency, no cycles.
fn validate_task_graph(specs: &[TaskSpec]) -> Result<()> {
    let tasks: BTreeMap<TaskId, Task> = specs
        .iter()
        .cloned()
        .map(|spec| {
            let task = spec.resolve(String::new);
            (task.id.clone(), task)
        })
        .collect();

    validate_tasks(&tasks)
}
