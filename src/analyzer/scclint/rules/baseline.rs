//! Baseline comparison rule.

use crate::analyzer::scclint::diff::{Direction, diff};
use crate::analyzer::scclint::rules::{Rule, RuleInput, RuleOutcome};
use crate::analyzer::scclint::types::Diagnostic;

/// Warns when the SCC grants anything its baseline does not.
pub struct PreferRestrictedBaseline;

impl Rule for PreferRestrictedBaseline {
    fn code(&self) -> &'static str {
        "prefer-restricted-baseline"
    }

    fn description(&self) -> &'static str {
        "Warns when the SCC grants permissions beyond the restricted baseline"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let loosened: Vec<String> = diff(input.baseline, input.scc)
            .into_iter()
            .filter(|d| d.direction == Direction::Loosened)
            .map(|d| d.path)
            .collect();

        match loosened.first() {
            None => Ok(Some(Diagnostic::info(
                "",
                format!(
                    "SCC '{}' grants nothing beyond baseline '{}'",
                    input.scc.name, input.baseline.name
                ),
            ))),
            Some(first) => Ok(Some(
                Diagnostic::warn(
                    first.clone(),
                    format!(
                        "SCC '{}' loosens baseline '{}' at: {}",
                        input.scc.name,
                        input.baseline.name,
                        loosened.join(", ")
                    ),
                )
                .with_remediation(format!(
                    "Start from '{}' and grant only what the workload needs.",
                    input.baseline.name
                )),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::scclint::model::RunAsUserStrategy;
    use crate::analyzer::scclint::rules::test_support::{pod, run, scc};
    use crate::analyzer::scclint::types::Severity;

    #[test]
    fn test_loosened_scc_warns() {
        let mut s = scc();
        s.run_as_user = RunAsUserStrategy::RunAsAny;
        s.allow_host_pid = true;
        let diag = run(&PreferRestrictedBaseline, &s, &pod()).unwrap().unwrap();
        assert_eq!(diag.severity, Severity::Warn);
        assert_eq!(diag.field_path, "allowHostPID");
        assert!(diag.message.contains("runAsUser"));
    }

    #[test]
    fn test_fixture_scc_within_baseline() {
        // explicit UID/GID ranges are not looser than namespace-allocated ones
        let diag = run(&PreferRestrictedBaseline, &scc(), &pod()).unwrap().unwrap();
        assert_eq!(diag.severity, Severity::Info);
    }
}
