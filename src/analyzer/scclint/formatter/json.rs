//! JSON formatter.

use crate::analyzer::scclint::batch::BatchReport;
use crate::analyzer::scclint::report::Report;
use serde::Serialize;

fn to_json<T: Serialize>(value: &T) -> String {
    let mut output = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    output.push('\n');
    output
}

/// Format a report as `{verdict, scc, pod, baseline, summary, results, deltas}`.
pub fn format(report: &Report) -> String {
    to_json(report)
}

/// Format a batch report as `{verdict, cancelled, sets}`.
pub fn format_batch(report: &BatchReport) -> String {
    to_json(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::scclint::types::{Diagnostic, RuleResult};

    #[test]
    fn test_report_fields() {
        let report = Report::build(
            "operator-scc",
            "Pod/web",
            "restricted",
            vec![RuleResult::from_diagnostic(
                "fsgroup-in-range",
                Diagnostic::info("spec.securityContext.fsGroup", "default").with_effective_value(5000),
            )],
            vec![],
        );
        let value: serde_json::Value = serde_json::from_str(&format(&report)).unwrap();
        assert_eq!(value["verdict"], "pass");
        assert_eq!(value["scc"], "operator-scc");
        assert_eq!(value["pod"], "Pod/web");
        assert_eq!(value["results"][0]["rule"], "fsgroup-in-range");
        assert_eq!(value["results"][0]["severity"], "info");
        assert_eq!(value["results"][0]["fieldPath"], "spec.securityContext.fsGroup");
        assert_eq!(value["results"][0]["effectiveValue"], 5000);
        assert!(value["results"][0].get("remediation").is_none());
        assert!(value["deltas"].is_array());
    }
}
