// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod types;

use std::collections::BTreeMap;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::config::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::{DagGraph, Task, TaskId};
use crate::engine::{render_result, render_summary, Scheduler, SchedulerOptions, Summary};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - scheduler registration and start
/// - waiting for all tasks or Ctrl-C, whichever comes first
/// - shutdown and the printed report
pub async fn run(args: CliArgs) -> Result<Summary> {
    let cfg = load_and_validate(&args.config)?;

    let mut options = cfg.scheduler_options();
    if let Some(workers) = args.workers {
        options.max_workers = workers;
    }

    if args.dry_run {
        print_dry_run(&cfg, options);
        return Ok(Summary::default());
    }

    let mut scheduler = Scheduler::new(options);
    scheduler.add_tasks(cfg.into_task_specs())?;
    scheduler.start()?;

    println!(
        "shellsched running {} tasks with {} workers; press Ctrl+C to stop",
        scheduler.task_count(),
        scheduler.options().max_workers
    );

    tokio::select! {
        _ = scheduler.wait_for_completion() => {
            info!("all tasks have a result");
        }
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("interrupt received; stopping"),
            Err(e) => warn!(error = %e, "failed to listen for Ctrl+C; stopping"),
        },
    }

    scheduler.stop().await;

    let results = scheduler.results();
    let mut ordered: Vec<_> = results.values().collect();
    ordered.sort_by(|a, b| a.end_time.cmp(&b.end_time));
    for result in ordered {
        println!("{}", render_result(result));
    }

    let unfinished = scheduler.task_count() - results.len();
    if unfinished > 0 {
        warn!(unfinished, "some tasks never ran");
    }

    println!("{}", render_summary(&results));
    Ok(scheduler.summary())
}

/// Simple dry-run output: print tasks, deps and commands.
fn print_dry_run(cfg: &ConfigFile, options: SchedulerOptions) {
    println!("shellsched dry-run");
    println!("  workers = {}", options.max_workers);
    println!("  queue_capacity = {}", options.queue_capacity);
    println!();

    let mut scheduler = Scheduler::new(options);
    for spec in cfg.task_specs() {
        if let Err(e) = scheduler.add_task(spec.clone()) {
            warn!(error = %e, "failed to register task for dry-run");
        }
    }
    let tasks = scheduler.tasks();
    let registry: BTreeMap<TaskId, Task> =
        tasks.iter().map(|t| (t.id.clone(), t.clone())).collect();
    let graph = DagGraph::from_tasks(&registry);

    println!("tasks ({}):", tasks.len());
    for task in &tasks {
        print_task(task, graph.dependents_of(&task.id));
    }

    debug!("dry-run complete (no execution)");
}

fn print_task(task: &Task, dependents: &[String]) {
    println!("  - {} ({})", task.id, task.name);
    println!("      cmd: {}", task.command_line());
    if !task.dependencies.is_empty() {
        println!("      after: {:?}", task.dependencies);
    }
    if !dependents.is_empty() {
        println!("      unblocks: {:?}", dependents);
    }
    println!("      timeout: {:?}", task.timeout);
    if task.retry_count > 0 {
        println!(
            "      retry: {} (delay {:?})",
            task.retry_count, task.retry_delay
        );
    }
    println!("      max_output_lines: {}", task.max_output_lines);
    if let Some(dir) = &task.work_dir {
        println!("      work_dir: {}", dir.display());
    }
    if !task.env.is_empty() {
        println!("      env: {:?}", task.env);
    }
}
