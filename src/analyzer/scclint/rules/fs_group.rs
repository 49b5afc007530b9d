//! `fsGroup` rules.

use crate::analyzer::scclint::model::{GroupStrategy, IdRange};
use crate::analyzer::scclint::rules::{Rule, RuleEvaluationError, RuleInput, RuleOutcome};
use crate::analyzer::scclint::types::Diagnostic;

/// Reject inverted ranges: they admit nothing, so membership and defaults are
/// meaningless.
pub(crate) fn validate_ranges(ranges: &[IdRange], field: &str) -> Result<(), RuleEvaluationError> {
    match ranges.iter().position(IdRange::is_inverted) {
        Some(i) => Err(RuleEvaluationError::new(
            format!("{}.ranges[{}]", field, i),
            format!("{}.ranges[{}] ({}) has min greater than max", field, i, ranges[i]),
        )),
        None => Ok(()),
    }
}

pub(crate) fn render_ranges(ranges: &[IdRange]) -> String {
    let parts: Vec<String> = ranges.iter().map(IdRange::to_string).collect();
    parts.join(", ")
}

/// `fsGroup: MustRunAs` needs at least one range.
pub struct FsGroupRangesNonEmpty;

impl Rule for FsGroupRangesNonEmpty {
    fn code(&self) -> &'static str {
        "fsgroup-ranges-nonempty"
    }

    fn description(&self) -> &'static str {
        "Fails when fsGroup is MustRunAs without any declared range"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        match &input.scc.fs_group {
            GroupStrategy::RunAsAny => Ok(None),
            GroupStrategy::MustRunAs { ranges } if ranges.is_empty() => Ok(Some(
                Diagnostic::fail(
                    "fsGroup.ranges",
                    "fsGroup is MustRunAs but declares no ranges",
                )
                .with_remediation("Add at least one {min, max} entry under fsGroup.ranges."),
            )),
            GroupStrategy::MustRunAs { ranges } => Ok(Some(Diagnostic::info(
                "fsGroup.ranges",
                format!("fsGroup ranges: {}", render_ranges(ranges)),
            ))),
        }
    }
}

/// The pod's `fsGroup` must fall inside a declared range.
pub struct FsGroupInRange;

impl Rule for FsGroupInRange {
    fn code(&self) -> &'static str {
        "fsgroup-in-range"
    }

    fn description(&self) -> &'static str {
        "Fails when the pod fsGroup is outside every declared range; reports the default when unset"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let GroupStrategy::MustRunAs { ranges } = &input.scc.fs_group else {
            return Ok(None);
        };
        let field = format!("{}.securityContext.fsGroup", input.pod.spec_path);
        let declared = input.pod.security_context.fs_group;

        if ranges.is_empty() {
            return match declared {
                // reported by fsgroup-ranges-nonempty
                None => Ok(None),
                Some(gid) => Err(RuleEvaluationError::new(
                    field,
                    format!("fsGroup {} cannot be checked: the SCC declares no fsGroup ranges", gid),
                )),
            };
        }
        validate_ranges(ranges, "fsGroup")?;

        match declared {
            None => {
                let first = ranges[0];
                Ok(Some(
                    Diagnostic::info(
                        field,
                        format!(
                            "fsGroup not set; effective fsGroup is {} (minimum of first range {})",
                            first.min, first
                        ),
                    )
                    .with_effective_value(first.min),
                ))
            }
            Some(gid) if input.scc.fs_group.allows(gid) => Ok(Some(Diagnostic::info(
                field,
                format!("fsGroup {} is within {}", gid, render_ranges(ranges)),
            ))),
            Some(gid) => Ok(Some(
                Diagnostic::fail(
                    field,
                    format!("fsGroup {} is outside every declared range ({})", gid, render_ranges(ranges)),
                )
                .with_remediation("Pick an fsGroup from the SCC ranges or omit it to get the default."),
            )),
        }
    }
}
