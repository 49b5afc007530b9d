//! Check reports.

use crate::analyzer::scclint::diff::FieldDelta;
use crate::analyzer::scclint::types::{RuleResult, Severity};
use serde::Serialize;
use std::fmt;

/// Overall outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Fail => "fail",
        }
    }

    /// Process exit code for this verdict.
    pub fn exit_code(&self, no_fail: bool) -> i32 {
        match self {
            Self::Fail if !no_fail => 1,
            _ => 0,
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Number of findings per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SeverityCounts {
    pub fail: usize,
    pub warn: usize,
    pub info: usize,
}

impl SeverityCounts {
    pub fn from_results(results: &[RuleResult]) -> Self {
        let mut counts = Self::default();
        for result in results {
            match result.severity {
                Severity::Fail => counts.fail += 1,
                Severity::Warn => counts.warn += 1,
                Severity::Info => counts.info += 1,
            }
        }
        counts
    }
}

/// The result of checking one SCC against one pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub verdict: Verdict,
    pub scc: String,
    /// `Kind/name` of the evaluated workload.
    pub pod: String,
    pub baseline: String,
    pub summary: SeverityCounts,
    pub results: Vec<RuleResult>,
    pub deltas: Vec<FieldDelta>,
}

impl Report {
    /// Assemble a report. Findings and deltas keep the order given.
    pub fn build(
        scc: impl Into<String>,
        pod: impl Into<String>,
        baseline: impl Into<String>,
        results: Vec<RuleResult>,
        deltas: Vec<FieldDelta>,
    ) -> Self {
        let summary = SeverityCounts::from_results(&results);
        let verdict = if summary.fail > 0 {
            Verdict::Fail
        } else {
            Verdict::Pass
        };
        Self {
            verdict,
            scc: scc.into(),
            pod: pod.into(),
            baseline: baseline.into(),
            summary,
            results,
            deltas,
        }
    }

    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    pub fn exit_code(&self, no_fail: bool) -> i32 {
        self.verdict.exit_code(no_fail)
    }
}
