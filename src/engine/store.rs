// src/engine/store.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::dag::{Task, TaskId, TaskResult};

/// Task registry and results map.
///
/// Shared between the façade, the workers and the result processor behind
/// a single mutex. The lock is only held while copying or recording
/// in-memory values, never across an `.await`.
#[derive(Debug, Default)]
pub struct TaskStore {
    pub tasks: BTreeMap<TaskId, Task>,
    pub results: HashMap<TaskId, TaskResult>,
    /// Tasks a worker has dequeued whose result is not recorded yet.
    pub running: HashSet<TaskId>,
    /// Set by `stop`: tasks still without a result never got to run.
    pub shut_down: bool,
}

pub type SharedStore = Arc<Mutex<TaskStore>>;

pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, TaskStore> {
    // Every critical section leaves the maps consistent, so a poisoned
    // lock still guards usable data.
    match store.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
