// src/dag/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::{Task, TaskId};
use crate::errors::{Result, SchedulerError};

/// Check that the registered task set forms a runnable DAG.
///
/// - every dependency id refers to a registered task,
/// - no task depends on itself,
/// - there are no dependency cycles.
pub fn validate_tasks(tasks: &BTreeMap<TaskId, Task>) -> Result<()> {
    validate_dependencies(tasks)?;
    validate_acyclic(tasks)?;
    Ok(())
}

fn validate_dependencies(tasks: &BTreeMap<TaskId, Task>) -> Result<()> {
    for (id, task) in tasks {
        for dep in &task.dependencies {
            if dep == id {
                return Err(SchedulerError::ConfigError(format!(
                    "task '{}' cannot depend on itself",
                    id
                )));
            }
            if !tasks.contains_key(dep) {
                return Err(SchedulerError::MissingDependency {
                    task: id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
    }
    Ok(())
}

fn validate_acyclic(tasks: &BTreeMap<TaskId, Task>) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for id in tasks.keys() {
        graph.add_node(id.as_str());
    }

    for (id, task) in tasks {
        for dep in &task.dependencies {
            graph.add_edge(dep.as_str(), id.as_str(), ());
        }
    }

    // A topological sort will fail if there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(SchedulerError::DagCycle(format!(
            "cycle detected in task DAG involving task '{}'",
            cycle.node_id()
        ))),
    }
}
