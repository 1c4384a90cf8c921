#![allow(dead_code)]

use std::collections::BTreeMap;
use shellsched::config::{ConfigFile, ConfigSection, DefaultSection, RawConfigFile, TaskConfig};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                default: DefaultSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, id: &str, task: TaskConfig) -> Self {
        self.config.task.insert(id.to_string(), task);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.config.workers = workers;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.config.queue_capacity = capacity;
        self
    }

    pub fn with_default_timeout(mut self, timeout: &str) -> Self {
        self.config.default.timeout = Some(timeout.to_string());
        self
    }

    pub fn with_default_retry(mut self, count: u32, delay: &str) -> Self {
        self.config.default.retry_count = Some(count);
        self.config.default.retry_delay = Some(delay.to_string());
        self
    }

    pub fn with_default_max_output_lines(mut self, lines: usize) -> Self {
        self.config.default.max_output_lines = Some(lines);
        self
    }

    /// The unvalidated config, for tests that expect validation to fail.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                name: None,
                cmd: cmd.to_string(),
                args: vec![],
                env: vec![],
                work_dir: None,
                after: vec![],
                timeout: None,
                retry_count: None,
                retry_delay: None,
                max_output_lines: None,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = Some(name.to_string());
        self
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.task.args.push(arg.to_string());
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.task.env.push(entry.to_string());
        self
    }

    pub fn work_dir(mut self, dir: &str) -> Self {
        self.task.work_dir = Some(dir.into());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn timeout(mut self, timeout: &str) -> Self {
        self.task.timeout = Some(timeout.to_string());
        self
    }

    pub fn retry(mut self, count: u32, delay: &str) -> Self {
        self.task.retry_count = Some(count);
        self.task.retry_delay = Some(delay.to_string());
        self
    }

    pub fn max_output_lines(mut self, lines: usize) -> Self {
        self.task.max_output_lines = Some(lines);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
