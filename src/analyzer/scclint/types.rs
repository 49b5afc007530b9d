//! Core types for the scc-lint rule engine.
//!
//! - `Severity` - finding severity levels
//! - `RuleCode` - rule identifiers (e.g., "pod-uid-in-range")
//! - `Diagnostic` - raw output of a single rule
//! - `RuleResult` - a diagnostic tagged with the rule that produced it

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Severity of a finding.
///
/// Ordered from most severe to least severe:
/// `Fail > Warn > Info`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Violates a least-privilege rule; makes the verdict fail.
    Fail,
    /// Permitted but looser than recommended.
    Warn,
    /// Rule applied and passed, or a derived value worth reporting.
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fail => "fail",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Fail => 2,
            Self::Warn => 1,
            Self::Info => 0,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A rule identifier (e.g., "no-run-as-any").
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleCode(pub String);

impl RuleCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RuleCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for RuleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// What a rule reports when it applies.
///
/// This is the raw output from a rule before it is tagged with the
/// rule's code by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Path of the offending (or derived) field, e.g. `runAsUser.uidRangeMin`.
    pub field_path: String,
    pub remediation: Option<String>,
    /// A value the rule derived rather than read, such as an admission default.
    pub effective_value: Option<i64>,
}

impl Diagnostic {
    pub fn new(severity: Severity, field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            field_path: field_path.into(),
            remediation: None,
            effective_value: None,
        }
    }

    pub fn fail(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Fail, field_path, message)
    }

    pub fn warn(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warn, field_path, message)
    }

    pub fn info(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, field_path, message)
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn with_effective_value(mut self, value: i64) -> Self {
        self.effective_value = Some(value);
        self
    }
}

/// A finding in the report: one rule's outcome for one (SCC, Pod) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleResult {
    pub rule: RuleCode,
    pub severity: Severity,
    pub message: String,
    pub field_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_value: Option<i64>,
}

impl RuleResult {
    pub fn from_diagnostic(rule: impl Into<RuleCode>, diag: Diagnostic) -> Self {
        Self {
            rule: rule.into(),
            severity: diag.severity,
            message: diag.message,
            field_path: diag.field_path,
            remediation: diag.remediation,
            effective_value: diag.effective_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Fail > Severity::Warn);
        assert!(Severity::Warn > Severity::Info);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Severity::Warn).unwrap(), "warn");
        assert_eq!(Severity::Fail.to_string(), "fail");
    }

    #[test]
    fn test_rule_result_from_diagnostic() {
        let diag = Diagnostic::info("fsGroup", "defaulted")
            .with_effective_value(5000)
            .with_remediation("set it");
        let result = RuleResult::from_diagnostic("fsgroup-in-range", diag);
        assert_eq!(result.rule.as_str(), "fsgroup-in-range");
        assert_eq!(result.effective_value, Some(5000));
        assert_eq!(result.severity, Severity::Info);
    }

    #[test]
    fn test_rule_result_json_shape() {
        let result = RuleResult::from_diagnostic("no-run-as-any", Diagnostic::fail("runAsUser.type", "bad"));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["rule"], "no-run-as-any");
        assert_eq!(json["severity"], "fail");
        assert_eq!(json["fieldPath"], "runAsUser.type");
        assert!(json.get("effectiveValue").is_none());
    }
}
