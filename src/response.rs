//! Report formatting. Pure functions over fully computed inputs; this
//! layer never fails.

use crate::engine::{ExecFailure, ExecReport};
use crate::store::VarSnapshot;

/// Renders one execution report as a single text block, in fixed order:
/// output, error, saved names, timing. A request blocked by the
/// validator renders only the violation block.
pub fn render(report: &ExecReport, max_output_chars: usize, show_timing: bool) -> String {
    if let Some(failure @ ExecFailure::Validation(_)) = &report.failure {
        return format!("**Error:** {}", failure);
    }

    let mut parts = Vec::new();

    let output = report.output.trim_end();
    if !output.is_empty() {
        parts.push(format!(
            "**Output:**\n```\n{}\n```",
            truncate(output, max_output_chars)
        ));
    }
    if let Some(failure) = &report.failure {
        parts.push(format!("**Error:** {}", failure));
    }
    if !report.saved.is_empty() {
        parts.push(format!("**Saved:** {}", report.saved.join(", ")));
    }
    if parts.is_empty() {
        parts.push("Executed successfully (no output).".to_string());
    }
    if show_timing {
        parts.push(format!(
            "Execution #{} ({:.3}s)",
            report.count,
            report.elapsed.as_secs_f64()
        ));
    }
    parts.join("\n\n")
}

/// Caps the output at `max_chars` characters, appending an explicit
/// trailer only when something was actually cut.
fn truncate(output: &str, max_chars: usize) -> String {
    let total = output.chars().count();
    if total <= max_chars {
        return output.to_string();
    }
    let head: String = output.chars().take(max_chars).collect();
    format!("{}\n... truncated ({} total chars)", head, total)
}

/// Fixed-width table over a state snapshot.
pub fn render_snapshot(entries: &[VarSnapshot]) -> String {
    if entries.is_empty() {
        return "No saved variables.".to_string();
    }

    let headers = ["name", "type", "size", "preview"];
    let rows: Vec<[String; 4]> = entries
        .iter()
        .map(|e| {
            [
                e.name.clone(),
                e.type_name.to_string(),
                e.size.to_string(),
                e.preview.clone(),
            ]
        })
        .collect();
    let widths: Vec<usize> = (0..4)
        .map(|i| {
            rows.iter()
                .map(|row| row[i].chars().count())
                .chain([headers[i].len()])
                .max()
                .unwrap_or(0)
        })
        .collect();

    let format_row = |cells: [String; 4]| {
        let padded: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect();
        format!("| {} |", padded.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format_row(headers.map(str::to_string)));
    lines.push(format_row([
        "-".repeat(widths[0]),
        "-".repeat(widths[1]),
        "-".repeat(widths[2]),
        "-".repeat(widths[3]),
    ]));
    for row in rows {
        lines.push(format_row(row));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn report(output: &str, failure: Option<ExecFailure>, saved: Vec<&str>) -> ExecReport {
        ExecReport {
            output: output.to_string(),
            failure,
            saved: saved.into_iter().map(str::to_string).collect(),
            elapsed: Duration::from_millis(12),
            count: 3,
        }
    }

    #[test]
    fn test_success_with_output_and_timing() {
        let rendered = render(&report("hello\n", None, vec!["x"]), 1000, true);
        let expected = "**Output:**\n```\nhello\n```\n\n**Saved:** x\n\nExecution #3 (0.012s)";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn test_no_output_message() {
        let rendered = render(&report("", None, vec![]), 1000, false);
        assert_eq!(rendered, "Executed successfully (no output).");
    }

    #[test]
    fn test_timing_line_is_gated() {
        let with_timing = render(&report("", None, vec![]), 1000, true);
        assert!(with_timing.contains("Execution #3"));
        let without = render(&report("", None, vec![]), 1000, false);
        assert!(!without.contains("Execution #3"));
    }

    #[test]
    fn test_truncation_trailer_only_when_cut() {
        let long = "x".repeat(150);
        let rendered = render(&report(&long, None, vec![]), 100, false);
        assert!(rendered.contains("... truncated (150 total chars)"));

        let short = "x".repeat(100);
        let rendered = render(&report(&short, None, vec![]), 100, false);
        assert!(!rendered.contains("truncated"));
    }

    #[test]
    fn test_runtime_error_block() {
        let failure = ExecFailure::Runtime("RuntimeError: division by zero".to_string());
        let rendered = render(&report("partial\n", Some(failure), vec![]), 1000, false);
        assert!(rendered.starts_with("**Output:**"));
        assert!(rendered.contains("**Error:** RuntimeError: division by zero"));
    }

    #[test]
    fn test_validation_renders_only_violation() {
        let failure = ExecFailure::Validation(vec!["os.".to_string()]);
        let rendered = render(&report("", Some(failure), vec![]), 1000, true);
        assert_eq!(rendered, "**Error:** Sandbox violation: blocked pattern(s) os.");
    }

    #[test]
    fn test_snapshot_table() {
        let entries = vec![
            VarSnapshot {
                name: "total".to_string(),
                type_name: "int",
                size: 56,
                preview: "42".to_string(),
            },
            VarSnapshot {
                name: "xs".to_string(),
                type_name: "list",
                size: 168,
                preview: "[1, 2, 3]".to_string(),
            },
        ];
        let rendered = render_snapshot(&entries);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| name  | type | size | preview   |");
        assert_eq!(lines[2], "| total | int  | 56   | 42        |");
    }

    #[test]
    fn test_empty_snapshot() {
        assert_eq!(render_snapshot(&[]), "No saved variables.");
    }
}
