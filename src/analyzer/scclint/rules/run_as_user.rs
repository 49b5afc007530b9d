//! `runAsUser` rules.

use crate::analyzer::scclint::model::{Pod, RunAsUserStrategy};
use crate::analyzer::scclint::rules::{Rule, RuleEvaluationError, RuleInput, RuleOutcome};
use crate::analyzer::scclint::types::Diagnostic;

/// Privileged containers combined with an unrestricted UID.
pub struct NoRunAsAny;

impl Rule for NoRunAsAny {
    fn code(&self) -> &'static str {
        "no-run-as-any"
    }

    fn description(&self) -> &'static str {
        "Fails when runAsUser is RunAsAny and privileged containers are allowed"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let scc = input.scc;
        if scc.run_as_user == RunAsUserStrategy::RunAsAny && scc.allow_privileged_container {
            return Ok(Some(
                Diagnostic::fail(
                    "runAsUser.type",
                    format!(
                        "SCC '{}' allows privileged containers to run as any UID, including root",
                        scc.name
                    ),
                )
                .with_remediation(
                    "Set runAsUser.type to MustRunAsRange (or MustRunAsNonRoot) and \
                     allowPrivilegedContainer to false.",
                ),
            ));
        }

        Ok(Some(Diagnostic::info(
            "runAsUser.type",
            format!(
                "runAsUser is {} with allowPrivilegedContainer={}",
                scc.run_as_user.type_name(),
                scc.allow_privileged_container
            ),
        )))
    }
}

/// `MustRunAs` / `MustRunAsRange` must carry usable bounds.
pub struct MustRunAsRangeBounds;

impl Rule for MustRunAsRangeBounds {
    fn code(&self) -> &'static str {
        "must-run-as-range-bounds"
    }

    fn description(&self) -> &'static str {
        "Fails when a MustRunAs/MustRunAsRange runAsUser strategy has missing or inverted bounds"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let remediation = "Declare the bound explicitly: runAsUser.uid for MustRunAs, \
                           runAsUser.uidRangeMin and uidRangeMax for MustRunAsRange.";

        let diag = match input.scc.run_as_user {
            RunAsUserStrategy::MustRunAs { uid: None } => Diagnostic::fail(
                "runAsUser.uid",
                "runAsUser is MustRunAs but no uid is set: missing bound runAsUser.uid",
            )
            .with_remediation(remediation),
            RunAsUserStrategy::MustRunAs { uid: Some(uid) } => {
                Diagnostic::info("runAsUser.uid", format!("runAsUser is pinned to UID {}", uid))
            }
            RunAsUserStrategy::MustRunAsRange { min, max } => match (min, max) {
                (None, None) => Diagnostic::fail(
                    "runAsUser.uidRangeMin",
                    "runAsUser is MustRunAsRange but missing bounds runAsUser.uidRangeMin and runAsUser.uidRangeMax",
                )
                .with_remediation(remediation),
                (None, Some(_)) => Diagnostic::fail(
                    "runAsUser.uidRangeMin",
                    "runAsUser is MustRunAsRange but missing bound runAsUser.uidRangeMin",
                )
                .with_remediation(remediation),
                (Some(_), None) => Diagnostic::fail(
                    "runAsUser.uidRangeMax",
                    "runAsUser is MustRunAsRange but missing bound runAsUser.uidRangeMax",
                )
                .with_remediation(remediation),
                (Some(min), Some(max)) if min > max => Diagnostic::fail(
                    "runAsUser.uidRangeMin",
                    format!(
                        "runAsUser.uidRangeMin ({}) is greater than runAsUser.uidRangeMax ({})",
                        min, max
                    ),
                )
                .with_remediation("Swap the bounds so that uidRangeMin <= uidRangeMax."),
                (Some(min), Some(max)) => Diagnostic::info(
                    "runAsUser.uidRangeMin",
                    format!("runAsUser range {}-{} is well formed", min, max),
                ),
            },
            RunAsUserStrategy::RunAsAny | RunAsUserStrategy::MustRunAsNonRoot => return Ok(None),
        };

        Ok(Some(diag))
    }
}

/// Every UID the pod sets, with the field it came from.
fn declared_uids(pod: &Pod) -> Vec<(String, i64)> {
    let mut uids = Vec::new();
    if let Some(uid) = pod.security_context.run_as_user {
        uids.push((format!("{}.securityContext.runAsUser", pod.spec_path), uid));
    }
    for container in &pod.containers {
        if let Some(uid) = container.run_as_user {
            uids.push((format!("{}.securityContext.runAsUser", container.path), uid));
        }
    }
    uids
}

/// UIDs a usable `runAsUser` strategy admits.
enum UidConstraint {
    NonRoot,
    Exactly(i64),
    Range(i64, i64),
}

impl UidConstraint {
    fn allows(&self, uid: i64) -> bool {
        match *self {
            Self::NonRoot => uid != 0,
            Self::Exactly(fixed) => uid == fixed,
            Self::Range(min, max) => min <= uid && uid <= max,
        }
    }

    fn label(&self) -> String {
        match *self {
            Self::NonRoot => "a non-root UID".to_string(),
            Self::Exactly(fixed) => format!("UID {}", fixed),
            Self::Range(min, max) => format!("range {}-{}", min, max),
        }
    }

    /// UID admission assigns when the pod sets none.
    fn default_uid(&self) -> Option<i64> {
        match *self {
            Self::NonRoot => None,
            Self::Exactly(uid) | Self::Range(uid, _) => Some(uid),
        }
    }
}

/// Pod and container UIDs must satisfy the SCC strategy.
pub struct PodUidInRange;

impl Rule for PodUidInRange {
    fn code(&self) -> &'static str {
        "pod-uid-in-range"
    }

    fn description(&self) -> &'static str {
        "Fails when a pod or container runAsUser is outside the UIDs the SCC admits"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let uids = declared_uids(input.pod);
        let pod_field = format!("{}.securityContext.runAsUser", input.pod.spec_path);

        let constraint = match input.scc.run_as_user {
            RunAsUserStrategy::RunAsAny => return Ok(None),
            RunAsUserStrategy::MustRunAsNonRoot => UidConstraint::NonRoot,
            RunAsUserStrategy::MustRunAs { uid: Some(fixed) } => UidConstraint::Exactly(fixed),
            RunAsUserStrategy::MustRunAsRange {
                min: Some(min),
                max: Some(max),
            } if min <= max => UidConstraint::Range(min, max),
            RunAsUserStrategy::MustRunAs { .. } | RunAsUserStrategy::MustRunAsRange { .. } => {
                if uids.is_empty() {
                    return Ok(Some(Diagnostic::info(
                        pod_field,
                        "runAsUser not set; UID is assigned at admission",
                    )));
                }
                return Err(RuleEvaluationError::new(
                    "runAsUser",
                    format!(
                        "SCC '{}' has no usable runAsUser bound ({}), pod UIDs cannot be checked",
                        input.scc.name, input.scc.run_as_user
                    ),
                ));
            }
        };
        let label = constraint.label();
        let default = constraint.default_uid();

        if uids.is_empty() {
            let mut diag = Diagnostic::info(
                pod_field,
                match default {
                    Some(uid) => format!("runAsUser not set; admission assigns UID {}", uid),
                    None => format!("runAsUser not set; the image must run as {}", label),
                },
            );
            if let Some(uid) = default {
                diag = diag.with_effective_value(uid);
            }
            return Ok(Some(diag));
        }

        let offending: Vec<&(String, i64)> = uids.iter().filter(|(_, uid)| !constraint.allows(*uid)).collect();
        match offending.first() {
            None => Ok(Some(Diagnostic::info(
                pod_field,
                format!("all runAsUser values are within {}", label),
            ))),
            Some((first_field, _)) => {
                let details: Vec<String> = offending
                    .iter()
                    .map(|(field, uid)| format!("{}={}", field, uid))
                    .collect();
                Ok(Some(
                    Diagnostic::fail(
                        first_field.clone(),
                        format!("{} outside {}", details.join(", "), label),
                    )
                    .with_remediation(format!(
                        "Use a UID within {} or remove runAsUser and let admission assign one.",
                        label
                    )),
                ))
            }
        }
    }
}
