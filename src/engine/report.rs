// src/engine/report.rs

//! Aggregate reporting and text rendering of results.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::time::Duration;

use colored::{ColoredString, Colorize};

use crate::dag::{TaskId, TaskResult};
use crate::types::TaskStatus;

/// Lines of output shown per task in [`render_result`].
const OUTPUT_PREVIEW_LINES: usize = 5;
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Counts by terminal status plus total and average duration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub counts: BTreeMap<TaskStatus, usize>,
    pub total_duration: Duration,
    pub average_duration: Duration,
}

impl Summary {
    pub fn from_results<'a>(results: impl IntoIterator<Item = &'a TaskResult>) -> Self {
        let mut summary = Summary::default();

        for result in results {
            summary.total += 1;
            *summary.counts.entry(result.status).or_insert(0) += 1;
            summary.total_duration += result.duration;
        }

        if summary.total > 0 {
            summary.average_duration = summary.total_duration / summary.total as u32;
        }
        summary
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    /// Every recorded task succeeded (vacuously true with no results).
    pub fn all_succeeded(&self) -> bool {
        self.count(TaskStatus::Success) == self.total
    }
}

/// Multi-line block describing one finished task.
pub fn render_result(result: &TaskResult) -> String {
    let mut out = String::new();

    let header = format!("task finished: {} ({})", result.task_name, result.task_id);
    let _ = writeln!(out, "{}", paint(result.status, header).bold());
    let _ = writeln!(
        out,
        "  status: {}  duration: {:?}  exit code: {}  retries: {}",
        result.status,
        round_ms(result.duration),
        result.exit_code,
        result.retry_count
    );
    let _ = writeln!(
        out,
        "  started: {}  ended: {}",
        result.start_time.format(TIME_FORMAT),
        result.end_time.format(TIME_FORMAT)
    );

    if let Some(err) = &result.error {
        let _ = writeln!(out, "  error: {err}");
    }

    let trimmed = result.output.trim_end_matches('\n');
    if !trimmed.is_empty() {
        let _ = writeln!(out, "  output preview:");
        let mut lines = trimmed.lines();
        for line in lines.by_ref().take(OUTPUT_PREVIEW_LINES) {
            let _ = writeln!(out, "    {line}");
        }
        if lines.next().is_some() {
            let _ = writeln!(out, "    ... (more output omitted)");
        }
    }

    out
}

/// Summary report: totals followed by one table row per task, ordered by
/// start time.
pub fn render_summary(results: &HashMap<TaskId, TaskResult>) -> String {
    let summary = Summary::from_results(results.values());
    let rule = "-".repeat(80);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "task summary");
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "total:     {}", summary.total);
    for status in TaskStatus::TERMINAL {
        let label = format!("{}:", status);
        let _ = writeln!(out, "{:<10} {}", label, summary.count(status));
    }
    let _ = writeln!(out, "total time:   {:?}", round_ms(summary.total_duration));
    let _ = writeln!(out, "average time: {:?}", round_ms(summary.average_duration));

    let mut rows: Vec<&TaskResult> = results.values().collect();
    rows.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.task_id.cmp(&b.task_id)));

    let _ = writeln!(out);
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(
        out,
        "{:<20} {:<10} {:<12} {:<6} {:<20}",
        "task", "status", "duration", "exit", "started"
    );
    let _ = writeln!(out, "{rule}");
    for r in rows {
        // Pad before coloring so escape codes don't skew the columns.
        let status = paint(r.status, format!("{:<10}", r.status.as_str()));
        let _ = writeln!(
            out,
            "{:<20} {} {:<12} {:<6} {:<20}",
            r.task_name,
            status,
            format!("{:?}", round_ms(r.duration)),
            r.exit_code,
            r.start_time.format(TIME_FORMAT)
        );
    }
    let _ = writeln!(out, "{rule}");

    out
}

fn paint(status: TaskStatus, text: String) -> ColoredString {
    match status {
        TaskStatus::Success => text.green(),
        TaskStatus::Failed | TaskStatus::Timeout => text.red(),
        TaskStatus::Cancelled => text.yellow(),
        TaskStatus::Pending | TaskStatus::Running => text.normal(),
    }
}

fn round_ms(d: Duration) -> Duration {
    Duration::from_millis(d.as_millis() as u64)
}
