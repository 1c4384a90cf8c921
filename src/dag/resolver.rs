// src/dag/resolver.rs

//! Completion bookkeeping and readiness decisions.
//!
//! The resolver is synchronous and owns no channels: the result processor
//! feeds it completions and dispatches whatever it releases. This keeps the
//! dependency semantics unit-testable without Tokio or processes.

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::dag::graph::DagGraph;
use crate::dag::task::{Task, TaskId};

#[derive(Debug)]
pub struct DependencyResolver {
    tasks: BTreeMap<TaskId, Task>,
    graph: DagGraph,
    /// Tasks that reached a terminal status (success or not).
    completed: HashSet<TaskId>,
    /// Tasks already released for dispatch. A released task is never
    /// released again, even before it has actually run.
    scheduled: HashSet<TaskId>,
}

impl DependencyResolver {
    /// Build a resolver over a validated task snapshot.
    pub fn new(tasks: BTreeMap<TaskId, Task>) -> Self {
        let graph = DagGraph::from_tasks(&tasks);
        Self {
            tasks,
            graph,
            completed: HashSet::new(),
            scheduled: HashSet::new(),
        }
    }

    /// Release every task without dependencies, in id order.
    ///
    /// Calling this twice returns nothing the second time.
    pub fn release_roots(&mut self) -> Vec<Task> {
        let roots: Vec<Task> = self
            .tasks
            .values()
            .filter(|t| !t.has_dependencies() && !self.scheduled.contains(&t.id))
            .cloned()
            .collect();

        for task in &roots {
            self.scheduled.insert(task.id.clone());
        }
        roots
    }

    /// Mark `task` completed and return the dependents that became ready.
    ///
    /// Completion, not success, satisfies a dependency.
    pub fn record_completion(&mut self, task: &str) -> Vec<Task> {
        if !self.tasks.contains_key(task) {
            warn!(task = %task, "completion for unknown task; ignoring");
            return Vec::new();
        }

        if !self.completed.insert(task.to_string()) {
            warn!(task = %task, "duplicate completion; ignoring");
            return Vec::new();
        }

        self.collect_newly_ready()
    }

    /// Re-scan every not-yet-released task with dependencies.
    fn collect_newly_ready(&mut self) -> Vec<Task> {
        let mut ready = Vec::new();

        for task in self.tasks.values() {
            if self.scheduled.contains(&task.id) || self.completed.contains(&task.id) {
                continue;
            }
            if !task.has_dependencies() {
                continue;
            }

            let all_done = self
                .graph
                .dependencies_of(&task.id)
                .iter()
                .all(|dep| self.completed.contains(dep));

            if all_done {
                debug!(task = %task.id, "all dependencies completed; releasing");
                ready.push(task.clone());
            }
        }

        for task in &ready {
            self.scheduled.insert(task.id.clone());
        }
        ready
    }

    pub fn is_completed(&self, task: &str) -> bool {
        self.completed.contains(task)
    }

    pub fn is_released(&self, task: &str) -> bool {
        self.scheduled.contains(task)
    }

    /// Number of tasks that have not been released yet.
    pub fn unreleased_count(&self) -> usize {
        self.tasks
            .keys()
            .filter(|id| !self.scheduled.contains(*id))
            .count()
    }

    pub fn all_completed(&self) -> bool {
        self.completed.len() == self.tasks.len()
    }
}
