// src/exec/task_runner.rs

//! Single-attempt process runner.

use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::dag::{Task, TaskId};

use super::backend::{Attempt, AttemptError};
use super::output::OutputSink;

/// How long to keep reading output after the process is gone.
///
/// A grandchild that left the task's process group can keep the pipes open;
/// we stop waiting for it after this long.
const OUTPUT_DRAIN_GRACE: Duration = Duration::from_secs(1);

enum Waited {
    Exited(std::io::Result<std::process::ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Run one attempt of `task` as an external process.
///
/// The attempt ends when the process exits, when `task.timeout` elapses, or
/// when `cancel` fires, whichever comes first. In the latter two cases the
/// child is killed and the error is `Timeout` / `Cancelled` regardless of
/// the exit status the killed process reports.
pub async fn run_command(task: &Task, cancel: &CancellationToken) -> Attempt {
    info!(
        task = %task.id,
        cmd = %task.command_line(),
        timeout = ?task.timeout,
        "starting task process"
    );

    let sink = OutputSink::new();

    let mut child = match build_command(task)
        .spawn()
        .with_context(|| format!("spawning process for task '{}'", task.id))
    {
        Ok(child) => child,
        Err(err) => {
            warn!(task = %task.id, error = %format!("{err:#}"), "failed to launch task process");
            return Attempt::failure(-1, String::new(), AttemptError::Launch(format!("{err:#}")));
        }
    };

    let readers = spawn_output_readers(&task.id, &mut child, &sink);

    let waited = tokio::select! {
        status = child.wait() => Waited::Exited(status),
        _ = tokio::time::sleep(task.timeout) => Waited::TimedOut,
        _ = cancel.cancelled() => Waited::Cancelled,
    };

    let (exit_code, error) = match waited {
        Waited::Exited(Ok(status)) => {
            let code = status.code().unwrap_or(-1);
            info!(
                task = %task.id,
                exit_code = code,
                success = status.success(),
                "task process exited"
            );
            if status.success() {
                (code, None)
            } else {
                (code, Some(AttemptError::Exit(code)))
            }
        }
        Waited::Exited(Err(e)) => {
            warn!(task = %task.id, error = %e, "waiting for task process failed");
            (-1, Some(AttemptError::Io(e.to_string())))
        }
        Waited::TimedOut => {
            warn!(task = %task.id, limit = ?task.timeout, "task deadline exceeded; killing process");
            let code = kill_child(&task.id, &mut child).await;
            (
                code,
                Some(AttemptError::Timeout {
                    limit: task.timeout,
                }),
            )
        }
        Waited::Cancelled => {
            info!(task = %task.id, "shutdown requested; killing process");
            let code = kill_child(&task.id, &mut child).await;
            (code, Some(AttemptError::Cancelled))
        }
    };

    drain_readers(&task.id, readers).await;

    Attempt {
        exit_code,
        output: sink.contents(),
        error,
    }
}

/// Build a process command: args-form when `args` is set, otherwise a shell
/// line appropriate for the platform.
fn build_command(task: &Task) -> Command {
    let mut cmd = if !task.args.is_empty() {
        let mut c = Command::new(&task.command);
        c.args(&task.args);
        c
    } else if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&task.command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&task.command);
        c
    };

    if let Some(dir) = &task.work_dir {
        cmd.current_dir(dir);
    }

    // Inherited environment stays in place; task entries are layered on top.
    for entry in &task.env {
        match entry.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                cmd.env(key, value);
            }
            _ => {
                warn!(task = %task.id, entry = %entry, "ignoring malformed env entry (expected KEY=VALUE)");
            }
        }
    }

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Own process group, so a kill also reaches whatever the shell started.
    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

fn spawn_output_readers(task_id: &TaskId, child: &mut Child, sink: &OutputSink) -> Vec<JoinHandle<()>> {
    let mut readers = Vec::with_capacity(2);

    if let Some(stdout) = child.stdout.take() {
        readers.push(spawn_reader(stdout, "stdout", task_id.clone(), sink.clone()));
    }
    if let Some(stderr) = child.stderr.take() {
        readers.push(spawn_reader(stderr, "stderr", task_id.clone(), sink.clone()));
    }

    readers
}

fn spawn_reader<R>(reader: R, stream: &'static str, task_id: TaskId, sink: OutputSink) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut segments = BufReader::new(reader).split(b'\n');

        while let Ok(Some(raw)) = segments.next_segment().await {
            let decoded = String::from_utf8_lossy(&raw);
            let line = decoded.strip_suffix('\r').unwrap_or(&decoded);
            debug!(task = %task_id, stream, "{}", line);
            sink.push_line(line);
        }
    })
}

async fn drain_readers(task_id: &str, readers: Vec<JoinHandle<()>>) {
    let aborts: Vec<_> = readers.iter().map(|h| h.abort_handle()).collect();

    let join_all = async {
        for handle in readers {
            let _ = handle.await;
        }
    };

    if tokio::time::timeout(OUTPUT_DRAIN_GRACE, join_all).await.is_err() {
        debug!(task = %task_id, "output pipes still open after process ended; abandoning readers");
        for abort in aborts {
            abort.abort();
        }
    }
}

/// Kill the child's whole process group and return its exit code, or -1 if
/// it has none (terminated by signal).
async fn kill_child(task_id: &str, child: &mut Child) -> i32 {
    kill_process_group(task_id, child);

    if let Err(e) = child.kill().await {
        warn!(task = %task_id, error = %e, "failed to kill task process");
    }

    match child.try_wait() {
        Ok(Some(status)) => status.code().unwrap_or(-1),
        _ => -1,
    }
}

#[cfg(unix)]
fn kill_process_group(task_id: &str, child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pgid) = child.id().and_then(|id| i32::try_from(id).ok()) else {
        return;
    };

    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        debug!(task = %task_id, pgid, error = %e, "failed to kill process group");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_task_id: &str, _child: &Child) {}
