// tests/dependency_resolver.rs

mod common;
use crate::common::{ids, registry};

use std::collections::HashSet;

use proptest::prelude::*;

use shellsched::dag::{validate_tasks, DependencyResolver, TaskSpec};
use shellsched::errors::SchedulerError;

/// A, B roots; C after A; D after A and B.
fn diamond() -> Vec<TaskSpec> {
    vec![
        TaskSpec::new("echo A").id("A"),
        TaskSpec::new("echo B").id("B"),
        TaskSpec::new("echo C").id("C").after("A"),
        TaskSpec::new("echo D").id("D").after("A").after("B"),
    ]
}

#[test]
fn roots_are_released_in_id_order_once() {
    let mut resolver = DependencyResolver::new(registry(diamond()));

    let roots = resolver.release_roots();
    assert_eq!(ids(&roots), vec!["A", "B"]);
    assert!(resolver.is_released("A"));
    assert!(!resolver.is_released("C"));
    assert_eq!(resolver.unreleased_count(), 2);

    assert!(resolver.release_roots().is_empty());
}

#[test]
fn dependent_waits_for_all_dependencies() {
    let mut resolver = DependencyResolver::new(registry(diamond()));
    resolver.release_roots();

    // A done: C is ready, D still waits for B.
    let ready = resolver.record_completion("A");
    assert_eq!(ids(&ready), vec!["C"]);

    let ready = resolver.record_completion("B");
    assert_eq!(ids(&ready), vec!["D"]);

    assert!(resolver.record_completion("C").is_empty());
    assert!(!resolver.all_completed());
    assert!(resolver.record_completion("D").is_empty());
    assert!(resolver.all_completed());
}

#[test]
fn duplicate_and_unknown_completions_are_ignored() {
    let mut resolver = DependencyResolver::new(registry(diamond()));
    resolver.release_roots();

    assert_eq!(ids(&resolver.record_completion("A")), vec!["C"]);
    assert!(resolver.record_completion("A").is_empty());
    assert!(resolver.record_completion("nope").is_empty());
    assert!(!resolver.is_completed("nope"));

    // C was released once and is not released again by later completions.
    assert_eq!(ids(&resolver.record_completion("B")), vec!["D"]);
}

#[test]
fn completion_not_success_satisfies_dependencies() {
    // The resolver never sees statuses; a failed A still unblocks C.
    let mut resolver = DependencyResolver::new(registry(vec![
        TaskSpec::new("exit 1").id("A"),
        TaskSpec::new("echo C").id("C").after("A"),
    ]));
    resolver.release_roots();
    assert_eq!(ids(&resolver.record_completion("A")), vec!["C"]);
}

#[test]
fn validation_rejects_unknown_dependency() {
    let tasks = registry(vec![
        TaskSpec::new("echo A").id("A"),
        TaskSpec::new("echo B").id("B").after("ghost"),
    ]);

    match validate_tasks(&tasks) {
        Err(SchedulerError::MissingDependency { task, dependency }) => {
            assert_eq!(task, "B");
            assert_eq!(dependency, "ghost");
        }
        other => panic!("expected MissingDependency, got {other:?}"),
    }
}

#[test]
fn validation_rejects_cycles_and_self_dependencies() {
    let cycle = registry(vec![
        TaskSpec::new("echo A").id("A").after("C"),
        TaskSpec::new("echo B").id("B").after("A"),
        TaskSpec::new("echo C").id("C").after("B"),
    ]);
    let err = validate_tasks(&cycle).unwrap_err();
    assert!(matches!(err, SchedulerError::DagCycle(_)), "got {err:?}");
    assert!(err.is_configuration());

    let selfish = registry(vec![TaskSpec::new("echo A").id("A").after("A")]);
    let err = validate_tasks(&selfish).unwrap_err();
    assert!(matches!(err, SchedulerError::ConfigError(_)), "got {err:?}");

    assert!(validate_tasks(&registry(diamond())).is_ok());
}

// Acyclic by construction: task i may only depend on tasks 0..i.
fn dag_strategy(max_tasks: usize) -> impl Strategy<Value = Vec<TaskSpec>> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..num_tasks),
            num_tasks,
        )
        .prop_map(|raw_deps| {
            raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    let mut spec = TaskSpec::new(format!("echo {i}")).id(format!("task_{i:02}"));
                    let deps: HashSet<usize> = potential
                        .into_iter()
                        .filter(|_| i > 0)
                        .map(|d| d % i.max(1))
                        .collect();
                    for d in deps {
                        spec = spec.after(format!("task_{d:02}"));
                    }
                    spec
                })
                .collect()
        })
    })
}

proptest! {
    /// Completing released tasks in any order releases every task exactly
    /// once, and only after all of its dependencies completed.
    #[test]
    fn every_task_released_once_after_its_dependencies(
        specs in dag_strategy(12),
        picks in proptest::collection::vec(any::<usize>(), 0..64),
    ) {
        let tasks = registry(specs);
        prop_assert!(validate_tasks(&tasks).is_ok());

        let mut resolver = DependencyResolver::new(tasks.clone());
        let mut pending: Vec<String> = resolver
            .release_roots()
            .into_iter()
            .map(|t| t.id)
            .collect();
        let mut released: HashSet<String> = pending.iter().cloned().collect();
        let mut completed: HashSet<String> = HashSet::new();
        let mut picks = picks.into_iter();

        while !pending.is_empty() {
            let idx = picks.next().unwrap_or(0) % pending.len();
            let done = pending.swap_remove(idx);
            completed.insert(done.clone());

            for task in resolver.record_completion(&done) {
                prop_assert!(released.insert(task.id.clone()), "{} released twice", task.id);
                prop_assert!(task.dependencies.iter().all(|d| completed.contains(d)));
                pending.push(task.id);
            }
        }

        prop_assert_eq!(completed.len(), tasks.len());
        prop_assert!(resolver.all_completed());
        prop_assert_eq!(resolver.unreleased_count(), 0);
    }
}

#[test]
fn graph_exposes_both_edge_directions() {
    use shellsched::dag::DagGraph;

    let graph = DagGraph::from_tasks(&registry(diamond()));

    assert_eq!(graph.tasks().count(), 4);
    assert_eq!(graph.dependents_of("A"), ["C".to_string(), "D".to_string()]);
    assert_eq!(graph.dependencies_of("D"), ["A".to_string(), "B".to_string()]);
    assert!(graph.dependents_of("D").is_empty());
    assert!(graph.dependencies_of("unknown").is_empty());
}
