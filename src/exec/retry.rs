// src/exec/retry.rs

//! Bounded retry-with-delay around single attempts.

use std::time::Instant;

use chrono::Local;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dag::{Task, TaskResult};
use crate::types::TaskStatus;

use super::backend::{AttemptError, CommandBackend};
use super::output::truncate_output;

/// Run `task` until an attempt succeeds or `retry_count + 1` attempts have
/// been used, and build its final [`TaskResult`].
///
/// - `retry_delay` is slept before every retry; shutdown interrupts the
///   sleep and ends the sequence.
/// - Only the kept attempt's output survives, truncated to
///   `max_output_lines`.
/// - A final deadline error yields `Timeout`, any other error `Failed`,
///   including an attempt killed by shutdown. `Cancelled` belongs to tasks
///   that never started, so it is never produced here.
pub async fn execute_with_retry(
    backend: &dyn CommandBackend,
    task: &Task,
    cancel: &CancellationToken,
    worker: usize,
) -> TaskResult {
    let start_time = Local::now();
    let started = Instant::now();

    let mut retries: u32 = 0;
    let mut attempt = backend.run_attempt(task, cancel).await;

    loop {
        let reason = match &attempt.error {
            None => break,
            Some(err) if !err.is_retryable() => break,
            Some(err) => err.to_string(),
        };

        if retries >= task.retry_count {
            break;
        }

        warn!(
            task = %task.id,
            worker,
            attempt = retries + 1,
            max_attempts = task.retry_count + 1,
            error = %reason,
            delay = ?task.retry_delay,
            "attempt failed; retrying"
        );

        let interrupted = tokio::select! {
            _ = tokio::time::sleep(task.retry_delay) => false,
            _ = cancel.cancelled() => true,
        };
        if interrupted {
            attempt.error = Some(AttemptError::Cancelled);
            break;
        }

        retries += 1;
        attempt = backend.run_attempt(task, cancel).await;
    }

    let status = match &attempt.error {
        None => TaskStatus::Success,
        Some(AttemptError::Timeout { .. }) => TaskStatus::Timeout,
        Some(_) => TaskStatus::Failed,
    };

    info!(
        task = %task.id,
        worker,
        %status,
        retries,
        exit_code = attempt.exit_code,
        "task finished"
    );

    TaskResult {
        task_id: task.id.clone(),
        task_name: task.name.clone(),
        status,
        start_time,
        end_time: Local::now(),
        duration: started.elapsed(),
        exit_code: attempt.exit_code,
        output: truncate_output(&attempt.output, task.max_output_lines),
        error: attempt.error,
        retry_count: retries,
    }
}
