#![allow(dead_code)]

use std::collections::BTreeMap;
use std::error::Error;

use shellsched::dag::{Task, TaskId, TaskSpec};

pub use shellsched_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn Error>>;

/// Resolve specs into the id-keyed registry the resolver and validator take.
pub fn registry(specs: Vec<TaskSpec>) -> BTreeMap<TaskId, Task> {
    specs
        .into_iter()
        .map(|spec| {
            let task = spec.resolve(String::new);
            (task.id.clone(), task)
        })
        .collect()
}

pub fn ids(tasks: &[Task]) -> Vec<&str> {
    tasks.iter().map(|t| t.id.as_str()).collect()
}
