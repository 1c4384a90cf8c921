// src/dag/graph.rs

use std::collections::{BTreeMap, HashMap};

use crate::dag::task::{Task, TaskId};

/// Internal node structure: stores immediate deps and dependents.
#[derive(Debug, Clone)]
struct DagNode {
    /// Direct dependencies: tasks that must complete before this one can run.
    deps: Vec<TaskId>,
    /// Direct dependents: tasks that depend on this one.
    dependents: Vec<TaskId>,
}

/// Simple in-memory DAG representation keyed by task id.
///
/// Acyclicity and dependency existence are checked in
/// [`validate`](crate::dag::validate); here we only keep adjacency
/// information for scheduling and diagnostics.
#[derive(Debug, Clone)]
pub struct DagGraph {
    nodes: HashMap<TaskId, DagNode>,
}

impl DagGraph {
    /// Build a DAG from a task registry.
    ///
    /// Dependencies on unknown ids are kept in `deps` but produce no
    /// reverse edge.
    pub fn from_tasks(tasks: &BTreeMap<TaskId, Task>) -> Self {
        let mut nodes: HashMap<TaskId, DagNode> = tasks
            .iter()
            .map(|(id, task)| {
                (
                    id.clone(),
                    DagNode {
                        deps: task.dependencies.iter().cloned().collect(),
                        dependents: Vec::new(),
                    },
                )
            })
            .collect();

        // BTreeMap iteration keeps dependents in id order.
        for (id, task) in tasks {
            for dep in &task.dependencies {
                if let Some(dep_node) = nodes.get_mut(dep) {
                    dep_node.dependents.push(id.clone());
                }
            }
        }

        Self { nodes }
    }

    /// Return all task ids.
    pub fn tasks(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|s| s.as_str())
    }

    /// Immediate dependencies of a task.
    pub fn dependencies_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.deps.as_slice())
            .unwrap_or(&[])
    }

    /// Immediate dependents of a task (tasks that list this one as a dependency).
    pub fn dependents_of(&self, id: &str) -> &[TaskId] {
        self.nodes
            .get(id)
            .map(|n| n.dependents.as_slice())
            .unwrap_or(&[])
    }
}
