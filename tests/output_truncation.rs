use proptest::prelude::*;

use shellsched::exec::{truncate_output, OutputSink, ELISION_MARKER};

fn numbered(n: usize) -> String {
    (1..=n).map(|i| format!("line {i}")).collect::<Vec<_>>().join("\n")
}

#[test]
fn short_output_is_unchanged() {
    let out = numbered(10);
    assert_eq!(truncate_output(&out, 10), out);
    assert_eq!(truncate_output("", 3), "");
}

#[test]
fn long_output_keeps_head_and_tail() {
    let out = numbered(20);
    let truncated = truncate_output(&out, 6);

    let lines: Vec<&str> = truncated.split('\n').collect();
    assert_eq!(
        lines,
        vec!["line 1", "line 2", "line 3", ELISION_MARKER, "line 18", "line 19", "line 20"]
    );
}

#[test]
fn odd_limit_rounds_down_each_half() {
    let truncated = truncate_output(&numbered(9), 5);
    let lines: Vec<&str> = truncated.split('\n').collect();
    assert_eq!(lines, vec!["line 1", "line 2", ELISION_MARKER, "line 8", "line 9"]);
}

#[test]
fn newline_terminated_output_at_limit_is_unchanged() {
    let out = "a\nb\nc\nd\n";
    assert_eq!(truncate_output(out, 4), out);

    assert_eq!(truncate_output("only\n", 1), "only\n");
}

#[test]
fn newline_terminated_output_keeps_full_halves() {
    let out = format!("{}\n", numbered(10));
    let truncated = truncate_output(&out, 4);

    assert_eq!(
        truncated,
        format!("line 1\nline 2\n{ELISION_MARKER}\nline 9\nline 10\n")
    );
    assert_eq!(truncate_output(&truncated, 4), truncated);
}

#[test]
fn sink_contents_truncate_by_captured_lines() {
    let sink = OutputSink::new();
    for i in 1..=6 {
        sink.push_line(&format!("line {i}"));
    }

    assert_eq!(truncate_output(&sink.contents(), 6), sink.contents());
    assert_eq!(
        truncate_output(&sink.contents(), 5),
        format!("line 1\nline 2\n{ELISION_MARKER}\nline 5\nline 6\n")
    );
}

#[test]
fn sink_keeps_lines_in_arrival_order() {
    let sink = OutputSink::new();
    let other = sink.clone();

    sink.push_line("stdout one");
    other.push_line("stderr one");
    sink.push_line("stdout two");

    assert_eq!(sink.contents(), "stdout one\nstderr one\nstdout two\n");
}

proptest! {
    #[test]
    fn truncation_is_idempotent(
        lines in proptest::collection::vec("[a-z ]{0,12}", 1..200),
        max in 1usize..50,
        terminated in any::<bool>(),
    ) {
        let mut out = lines.join("\n");
        if terminated {
            out.push('\n');
        }
        let once = truncate_output(&out, max);
        let twice = truncate_output(&once, max);
        prop_assert_eq!(&once, &twice);
        let line_count = out.strip_suffix('\n').unwrap_or(&out).split('\n').count();
        if line_count <= max {
            prop_assert_eq!(&once, &out);
        } else {
            prop_assert!(once.contains(ELISION_MARKER));
        }
    }
}
