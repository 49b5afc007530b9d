//! `supplementalGroups` rule.

use crate::analyzer::scclint::model::GroupStrategy;
use crate::analyzer::scclint::rules::fs_group::{render_ranges, validate_ranges};
use crate::analyzer::scclint::rules::{Rule, RuleEvaluationError, RuleInput, RuleOutcome};
use crate::analyzer::scclint::types::Diagnostic;

/// Derives the supplemental group admission assigns when the pod omits them,
/// and checks declared groups otherwise.
pub struct SupplementalGroupsDefault;

impl Rule for SupplementalGroupsDefault {
    fn code(&self) -> &'static str {
        "supplemental-groups-default"
    }

    fn description(&self) -> &'static str {
        "Reports the effective supplemental group when the pod omits supplementalGroups"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let strategy = &input.scc.supplemental_groups;
        let GroupStrategy::MustRunAs { ranges } = strategy else {
            return Ok(None);
        };
        let field = format!("{}.securityContext.supplementalGroups", input.pod.spec_path);

        if ranges.is_empty() {
            return Err(RuleEvaluationError::new(
                "supplementalGroups.ranges",
                "supplementalGroups is MustRunAs but declares no ranges, so no default can be derived",
            ));
        }
        validate_ranges(ranges, "supplementalGroups")?;

        let Some(groups) = &input.pod.security_context.supplemental_groups else {
            let first = ranges[0];
            return Ok(Some(
                Diagnostic::info(
                    field,
                    format!(
                        "supplementalGroups not set; effective supplementalGroups is [{}] (minimum of first range {})",
                        first.min, first
                    ),
                )
                .with_effective_value(first.min),
            ));
        };

        let outside: Vec<String> = groups
            .iter()
            .filter(|gid| !strategy.allows(**gid))
            .map(i64::to_string)
            .collect();
        if outside.is_empty() {
            return Ok(Some(Diagnostic::info(
                field,
                format!("supplementalGroups are within {}", render_ranges(ranges)),
            )));
        }

        Ok(Some(
            Diagnostic::fail(
                field,
                format!(
                    "supplementalGroups {} outside every declared range ({})",
                    outside.join(", "),
                    render_ranges(ranges)
                ),
            )
            .with_remediation("Use groups from the SCC supplementalGroups ranges."),
        ))
    }
}
