// src/exec/output.rs

//! Merged process output and truncation.

use std::sync::{Arc, Mutex, MutexGuard};

/// Line inserted between the kept head and tail of truncated output.
pub const ELISION_MARKER: &str = "... (output truncated) ...";

/// Append-only buffer shared by the stdout and stderr readers of one attempt.
///
/// Lines are appended whole, so the two streams interleave at line
/// granularity in arrival order.
#[derive(Debug, Clone, Default)]
pub struct OutputSink {
    inner: Arc<Mutex<String>>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_line(&self, line: &str) {
        let mut buf = self.lock();
        buf.push_str(line);
        buf.push('\n');
    }

    /// Copy of everything captured so far.
    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        // A reader that panicked mid-append leaves a whole-line buffer behind.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Bound `output` to roughly `max_lines` lines.
///
/// A trailing newline terminates the last line rather than starting an
/// empty one. If the output has more than `max_lines` lines, keep the first
/// `max_lines / 2` and the last `max_lines / 2` lines joined by
/// [`ELISION_MARKER`]. Otherwise it is returned unchanged. Applying this
/// twice with the same limit gives the same result as applying it once.
pub fn truncate_output(output: &str, max_lines: usize) -> String {
    let (body, terminated) = match output.strip_suffix('\n') {
        Some(body) => (body, true),
        None => (output, false),
    };

    let lines: Vec<&str> = body.split('\n').collect();
    if lines.len() <= max_lines {
        return output.to_string();
    }

    let keep = max_lines / 2;
    let head = &lines[..keep];
    let tail = &lines[lines.len() - keep..];

    let mut out = String::new();
    for line in head {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(ELISION_MARKER);
    for line in tail {
        out.push('\n');
        out.push_str(line);
    }
    if terminated {
        out.push('\n');
    }
    out
}
