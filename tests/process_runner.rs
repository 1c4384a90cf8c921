// tests/process_runner.rs
//
// Runs real `sh` processes.
#![cfg(unix)]

mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use shellsched::dag::TaskSpec;
use shellsched::engine::{Scheduler, SchedulerOptions};
use shellsched::exec::{run_command, AttemptError};
use shellsched::types::TaskStatus;

#[tokio::test]
async fn shell_line_success_captures_output() -> TestResult {
    init_tracing();

    let task = TaskSpec::new("echo hello && echo world").resolve(|| "t".into());
    let attempt = run_command(&task, &CancellationToken::new()).await;

    assert!(attempt.is_success(), "{attempt:?}");
    assert_eq!(attempt.exit_code, 0);
    assert_eq!(attempt.output, "hello\nworld\n");
    Ok(())
}

#[tokio::test]
async fn stderr_is_merged_into_output() -> TestResult {
    let task = TaskSpec::new("echo out; echo err 1>&2").resolve(|| "t".into());
    let attempt = run_command(&task, &CancellationToken::new()).await;

    assert!(attempt.output.contains("out\n"));
    assert!(attempt.output.contains("err\n"));
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_reported_with_code() -> TestResult {
    let task = TaskSpec::new("echo partial; exit 3").resolve(|| "t".into());
    let attempt = run_command(&task, &CancellationToken::new()).await;

    assert_eq!(attempt.exit_code, 3);
    assert_eq!(attempt.error, Some(AttemptError::Exit(3)));
    assert_eq!(attempt.output, "partial\n");
    Ok(())
}

#[tokio::test]
async fn args_form_runs_program_without_shell() -> TestResult {
    let task = TaskSpec::new("echo")
        .arg("$HOME")
        .arg("a b")
        .resolve(|| "t".into());
    let attempt = run_command(&task, &CancellationToken::new()).await;

    assert!(attempt.is_success(), "{attempt:?}");
    assert_eq!(attempt.output, "$HOME a b\n");
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_launch_error() -> TestResult {
    let task = TaskSpec::new("definitely-not-a-real-program-shellsched")
        .arg("x")
        .resolve(|| "t".into());
    let attempt = run_command(&task, &CancellationToken::new()).await;

    assert!(matches!(attempt.error, Some(AttemptError::Launch(_))), "{attempt:?}");
    Ok(())
}

#[tokio::test]
async fn env_and_work_dir_are_applied() -> TestResult {
    let dir = tempfile::tempdir()?;
    std::fs::write(dir.path().join("marker.txt"), "present")?;

    let task = TaskSpec::new("echo \"$GREETING\"; cat marker.txt")
        .env("GREETING=hi=there")
        .env("MALFORMED")
        .work_dir(dir.path())
        .resolve(|| "t".into());
    let attempt = run_command(&task, &CancellationToken::new()).await;

    assert!(attempt.is_success(), "{attempt:?}");
    assert_eq!(attempt.output, "hi=there\npresent\n");
    Ok(())
}

#[tokio::test]
async fn timeout_kills_process() -> TestResult {
    init_tracing();

    let task = TaskSpec::new("sleep 5")
        .timeout(Duration::from_millis(200))
        .resolve(|| "t".into());
    let started = Instant::now();
    let attempt = with_timeout(run_command(&task, &CancellationToken::new())).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert!(
        matches!(attempt.error, Some(AttemptError::Timeout { limit }) if limit == Duration::from_millis(200)),
        "{attempt:?}"
    );
    Ok(())
}

#[tokio::test]
async fn timeout_kills_processes_started_by_the_shell() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("survived");
    // `; true` keeps `sh` from exec-ing into `sleep`, so `sleep` is a grandchild.
    let task = TaskSpec::new(format!("sleep 2; touch {}; true", marker.display()))
        .timeout(Duration::from_millis(200))
        .resolve(|| "t".into());

    let started = Instant::now();
    let attempt = with_timeout(run_command(&task, &CancellationToken::new())).await;

    // The grandchild held the output pipes; killing it ends the attempt
    // without waiting out the drain grace period.
    assert!(started.elapsed() < Duration::from_millis(900), "took {:?}", started.elapsed());
    assert!(matches!(attempt.error, Some(AttemptError::Timeout { .. })), "{attempt:?}");

    tokio::time::sleep(Duration::from_millis(2500)).await;
    assert!(!marker.exists(), "shell command kept running after the timeout");
    Ok(())
}

#[tokio::test]
async fn cancellation_kills_process() -> TestResult {
    let task = TaskSpec::new("sleep 5").resolve(|| "t".into());
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let attempt = with_timeout(run_command(&task, &cancel)).await;

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(attempt.error, Some(AttemptError::Cancelled));
    Ok(())
}

#[tokio::test]
async fn shutdown_mid_run_finalizes_as_failed() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::new(SchedulerOptions {
        max_workers: 1,
        queue_capacity: 10,
    });
    scheduler.add_tasks([
        TaskSpec::new("sleep 5").id("slow"),
        TaskSpec::new("echo never").id("after").after("slow"),
    ])?;
    scheduler.start()?;

    with_timeout(async {
        while scheduler.task_status("slow") != Some(TaskStatus::Running) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    with_timeout(scheduler.stop()).await;

    let slow = scheduler.result_of("slow").expect("interrupted task has a result");
    assert_eq!(slow.status, TaskStatus::Failed);
    assert_eq!(slow.error, Some(AttemptError::Cancelled));
    assert_eq!(scheduler.task_status("after"), Some(TaskStatus::Cancelled));
    assert_eq!(scheduler.summary().count(TaskStatus::Cancelled), 0);
    Ok(())
}

#[tokio::test]
async fn end_to_end_success_failure_and_timeout() -> TestResult {
    init_tracing();

    let mut scheduler = Scheduler::new(SchedulerOptions {
        max_workers: 3,
        queue_capacity: 10,
    });
    scheduler.add_tasks([
        TaskSpec::new("exit 0").id("ok"),
        TaskSpec::new("exit 1")
            .id("flaky")
            .retry(2, Duration::from_millis(100)),
        TaskSpec::new("sleep 5")
            .id("slow")
            .timeout(Duration::from_secs(1)),
        TaskSpec::new("echo done").id("last").after("flaky").after("slow"),
    ])?;

    scheduler.start()?;
    with_timeout(scheduler.wait_for_completion()).await;
    scheduler.stop().await;

    let results = scheduler.results();
    assert_eq!(results.len(), 4);

    let ok = &results["ok"];
    assert_eq!(ok.status, TaskStatus::Success);
    assert_eq!(ok.exit_code, 0);
    assert_eq!(ok.retry_count, 0);

    let flaky = &results["flaky"];
    assert_eq!(flaky.status, TaskStatus::Failed);
    assert_eq!(flaky.retry_count, 2);
    assert!(flaky.duration >= Duration::from_millis(200));

    let slow = &results["slow"];
    assert_eq!(slow.status, TaskStatus::Timeout);
    let err = slow.error.as_ref().expect("timeout error recorded");
    assert!(err.to_string().contains("1s"), "got: {err}");

    let last = &results["last"];
    assert_eq!(last.status, TaskStatus::Success);
    assert_eq!(last.output, "done\n");
    assert!(last.start_time >= slow.end_time);
    Ok(())
}
