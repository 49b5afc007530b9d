//! Plain text formatter.

use crate::analyzer::scclint::batch::{BatchReport, SetOutcome};
use crate::analyzer::scclint::report::{Report, Verdict};
use crate::analyzer::scclint::types::Severity;
use colored::Colorize;

fn severity_cell(severity: Severity, width: usize, color: bool) -> String {
    let cell = format!("{:<width$}", severity.as_str(), width = width);
    if !color {
        return cell;
    }
    match severity {
        Severity::Fail => cell.red().bold().to_string(),
        Severity::Warn => cell.yellow().to_string(),
        Severity::Info => cell.dimmed().to_string(),
    }
}

fn verdict_text(verdict: Verdict, color: bool) -> String {
    let text = verdict.as_str().to_uppercase();
    match (color, verdict) {
        (false, _) => text,
        (true, Verdict::Pass) => text.green().bold().to_string(),
        (true, Verdict::Fail) => text.red().bold().to_string(),
    }
}

/// Format a report as a findings table, a deltas table and a verdict line.
pub fn format(report: &Report, color: bool) -> String {
    let mut output = format!(
        "SCC {} / {} (baseline {})\n\n",
        report.scc, report.pod, report.baseline
    );

    let rule_width = report
        .results
        .iter()
        .map(|r| r.rule.as_str().len())
        .chain(std::iter::once("RULE".len()))
        .max()
        .unwrap_or(4);
    let sev_width = "SEVERITY".len();

    output.push_str(&format!(
        "{:<rule_width$}  {:<sev_width$}  MESSAGE\n",
        "RULE", "SEVERITY"
    ));
    for result in &report.results {
        output.push_str(&format!(
            "{:<rule_width$}  {}  {}\n",
            result.rule.as_str(),
            severity_cell(result.severity, sev_width, color),
            result.message,
        ));
        if result.severity != Severity::Info {
            if !result.field_path.is_empty() {
                output.push_str(&format!("{:<rule_width$}  {:<sev_width$}  at {}\n", "", "", result.field_path));
            }
            if let Some(remediation) = &result.remediation {
                output.push_str(&format!("{:<rule_width$}  {:<sev_width$}  fix: {}\n", "", "", remediation));
            }
        }
    }
    if report.results.is_empty() {
        output.push_str("(no applicable rules)\n");
    }

    if !report.deltas.is_empty() {
        let path_width = report
            .deltas
            .iter()
            .map(|d| d.path.len())
            .chain(std::iter::once("FIELD".len()))
            .max()
            .unwrap_or(5);
        output.push_str(&format!(
            "\n{:<path_width$}  {:<9}  BASELINE -> CANDIDATE\n",
            "FIELD", "DIRECTION"
        ));
        for delta in &report.deltas {
            output.push_str(&format!(
                "{:<path_width$}  {:<9}  {} -> {}\n",
                delta.path,
                delta.direction.as_str(),
                delta.baseline_value,
                delta.candidate_value,
            ));
        }
    }

    output.push_str(&format!(
        "\n{}: {} fail, {} warn, {} info\n",
        verdict_text(report.verdict, color),
        report.summary.fail,
        report.summary.warn,
        report.summary.info,
    ));
    output
}

/// Format a batch report, one section per set.
pub fn format_batch(report: &BatchReport, color: bool) -> String {
    let mut output = String::new();
    for set in &report.sets {
        output.push_str(&format!("== {} ==\n", set.name));
        match &set.outcome {
            SetOutcome::Evaluated { report } => output.push_str(&format(report, color)),
            SetOutcome::Error { message } => output.push_str(&format!("error: {}\n", message)),
            SetOutcome::Skipped => output.push_str("skipped (cancelled)\n"),
        }
        output.push('\n');
    }
    let mut summary = format!("batch: {}", verdict_text(report.verdict, color));
    if report.cancelled {
        summary.push_str(" (cancelled)");
    }
    output.push_str(&summary);
    output.push('\n');
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::scclint::diff::{Direction, FieldDelta};
    use crate::analyzer::scclint::types::{Diagnostic, RuleResult};

    fn report() -> Report {
        Report::build(
            "operator-scc",
            "Pod/web",
            "restricted",
            vec![
                RuleResult::from_diagnostic(
                    "pod-uid-in-range",
                    Diagnostic::fail("spec.securityContext.runAsUser", "UID 2001 outside 1000-2000")
                        .with_remediation("pick a UID in range"),
                ),
                RuleResult::from_diagnostic("host-namespaces", Diagnostic::info("allowHostNetwork", "ok")),
            ],
            vec![FieldDelta {
                path: "allowHostPID".to_string(),
                baseline_value: "false".to_string(),
                candidate_value: "true".to_string(),
                direction: Direction::Loosened,
            }],
        )
    }

    #[test]
    fn test_table_without_color() {
        let text = format(&report(), false);
        assert!(text.contains("RULE"));
        assert!(text.contains("pod-uid-in-range  fail"));
        assert!(text.contains("at spec.securityContext.runAsUser"));
        assert!(text.contains("fix: pick a UID in range"));
        assert!(text.contains("allowHostPID  loosened   false -> true"));
        assert!(text.ends_with("FAIL: 1 fail, 0 warn, 1 info\n"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_batch_sections() {
        let batch = BatchReport {
            verdict: Verdict::Fail,
            cancelled: true,
            sets: vec![
                crate::analyzer::scclint::batch::SetResult {
                    name: "a".to_string(),
                    outcome: SetOutcome::Evaluated { report: report() },
                },
                crate::analyzer::scclint::batch::SetResult {
                    name: "b".to_string(),
                    outcome: SetOutcome::Skipped,
                },
            ],
        };
        let text = format_batch(&batch, false);
        assert!(text.contains("== a =="));
        assert!(text.contains("skipped (cancelled)"));
        assert!(text.ends_with("batch: FAIL (cancelled)\n"));
    }
}
