//! ServiceAccount binding rule.

use crate::analyzer::scclint::binding::SCC_ROLE_PREFIX;
use crate::analyzer::scclint::model::SCC_RESOURCE;
use crate::analyzer::scclint::rules::{AccountLookup, Rule, RuleInput, RuleOutcome};
use crate::analyzer::scclint::types::Diagnostic;

/// The pod's service account must be allowed to use the SCC.
pub struct ServiceAccountBinding;

impl Rule for ServiceAccountBinding {
    fn code(&self) -> &'static str {
        "service-account-binding"
    }

    fn description(&self) -> &'static str {
        "Fails when the pod's ServiceAccount is missing or not bound to the SCC"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let pod = input.pod;
        let field = format!("{}.serviceAccountName", pod.spec_path);
        let identifier = format!("{}/{}", pod.namespace_or_default(), pod.service_account());
        let remediation = format!(
            "Bind the ServiceAccount to the ClusterRole {}{}, or to a Role allowing `use` on {}/{}.",
            SCC_ROLE_PREFIX, input.scc.name, SCC_RESOURCE, input.scc.name
        );

        let diag = match input.service_account {
            AccountLookup::NotProvided => return Ok(None),
            AccountLookup::Missing => Diagnostic::fail(
                field,
                format!("service account {} is not defined in the service account input", identifier),
            )
            .with_remediation(remediation),
            AccountLookup::Found(sa) if sa.is_bound_to(&input.scc.name) => {
                let others: Vec<&str> = sa
                    .bound_sccs
                    .iter()
                    .map(String::as_str)
                    .filter(|name| *name != input.scc.name)
                    .collect();
                let mut message = format!("service account {} may use SCC '{}'", identifier, input.scc.name);
                if !others.is_empty() {
                    message.push_str(&format!(" (also bound to: {})", others.join(", ")));
                }
                Diagnostic::info(field, message)
            }
            AccountLookup::Found(sa) => {
                let bound: Vec<&str> = sa.bound_sccs.iter().map(String::as_str).collect();
                let bound = if bound.is_empty() {
                    "none".to_string()
                } else {
                    bound.join(", ")
                };
                Diagnostic::fail(
                    field,
                    format!(
                        "service account {} is not bound to SCC '{}' (bound: {})",
                        identifier, input.scc.name, bound
                    ),
                )
                .with_remediation(remediation)
            }
        };

        Ok(Some(diag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::scclint::diff::restricted_baseline;
    use crate::analyzer::scclint::model::ServiceAccount;
    use crate::analyzer::scclint::rules::test_support::{pod, scc};
    use crate::analyzer::scclint::types::Severity;

    fn eval(lookup: AccountLookup<'_>) -> RuleOutcome {
        let (s, p, b) = (scc(), pod(), restricted_baseline());
        ServiceAccountBinding.evaluate(&RuleInput {
            scc: &s,
            pod: &p,
            service_account: lookup,
            baseline: &b,
        })
    }

    #[test]
    fn test_not_provided_is_not_applicable() {
        assert_eq!(eval(AccountLookup::NotProvided), Ok(None));
    }

    #[test]
    fn test_missing_account_fails() {
        let diag = eval(AccountLookup::Missing).unwrap().unwrap();
        assert_eq!(diag.severity, Severity::Fail);
        assert!(diag.message.contains("default/default"));
    }

    #[test]
    fn test_bound_and_unbound() {
        let mut sa = ServiceAccount {
            name: "default".to_string(),
            namespace: "default".to_string(),
            ..Default::default()
        };
        let diag = eval(AccountLookup::Found(&sa)).unwrap().unwrap();
        assert_eq!(diag.severity, Severity::Fail);
        assert!(diag.message.contains("bound: none"));
        let remediation = diag.remediation.unwrap();
        assert!(remediation.contains("system:openshift:scc:operator-scc"));
        assert!(remediation.contains("securitycontextconstraints/operator-scc"));

        sa.bound_sccs.insert("operator-scc".to_string());
        let diag = eval(AccountLookup::Found(&sa)).unwrap().unwrap();
        assert_eq!(diag.severity, Severity::Info);
    }
}
