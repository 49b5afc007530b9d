//! The rule catalog.
//!
//! Each rule is an independent, stateless check over one (SCC, Pod,
//! ServiceAccount) triple. The catalog order is the report order.

pub mod baseline;
pub mod fs_group;
pub mod host;
pub mod run_as_user;
pub mod service_account;
pub mod supplemental_groups;

use crate::analyzer::scclint::model::{Pod, SecurityContextConstraints, ServiceAccount};
use crate::analyzer::scclint::types::Diagnostic;
use std::sync::OnceLock;
use thiserror::Error;

/// How the pod's service account was found in the input.
#[derive(Debug, Clone, Copy)]
pub enum AccountLookup<'a> {
    /// No service account input was given.
    NotProvided,
    /// Input was given but does not contain the pod's service account.
    Missing,
    Found(&'a ServiceAccount),
}

/// Everything a rule may look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleInput<'a> {
    pub scc: &'a SecurityContextConstraints,
    pub pod: &'a Pod,
    pub service_account: AccountLookup<'a>,
    pub baseline: &'a SecurityContextConstraints,
}

/// A rule could not decide, e.g. because the SCC contradicts itself.
///
/// The engine turns this into a `fail` finding for the rule; it never aborts
/// the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot evaluate: {message}")]
pub struct RuleEvaluationError {
    pub field_path: String,
    pub message: String,
}

impl RuleEvaluationError {
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of one rule: `Ok(None)` when the rule does not apply.
pub type RuleOutcome = Result<Option<Diagnostic>, RuleEvaluationError>;

/// A least-privilege rule.
pub trait Rule: Send + Sync {
    /// Stable identifier, e.g. `pod-uid-in-range`.
    fn code(&self) -> &'static str;

    /// One-line description for `scc-lint rules`.
    fn description(&self) -> &'static str;

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome;
}

static CATALOG: OnceLock<Vec<Box<dyn Rule>>> = OnceLock::new();

/// All rules, in evaluation order.
pub fn catalog() -> &'static [Box<dyn Rule>] {
    CATALOG.get_or_init(|| {
        vec![
            Box::new(run_as_user::NoRunAsAny),
            Box::new(run_as_user::MustRunAsRangeBounds),
            Box::new(run_as_user::PodUidInRange),
            Box::new(fs_group::FsGroupRangesNonEmpty),
            Box::new(fs_group::FsGroupInRange),
            Box::new(supplemental_groups::SupplementalGroupsDefault),
            Box::new(baseline::PreferRestrictedBaseline),
            Box::new(service_account::ServiceAccountBinding),
            Box::new(host::HostNamespaces),
            Box::new(host::PrivilegedRequest),
        ]
    })
}

/// Look up a rule by code.
pub fn get_rule(code: &str) -> Option<&'static dyn Rule> {
    catalog()
        .iter()
        .find(|r| r.code() == code)
        .map(|r| r.as_ref())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::analyzer::scclint::diff::restricted_baseline;
    use crate::analyzer::scclint::model::*;

    /// A range-bound SCC close to what the Operator docs recommend.
    pub fn scc() -> SecurityContextConstraints {
        SecurityContextConstraints {
            name: "operator-scc".to_string(),
            run_as_user: RunAsUserStrategy::MustRunAsRange {
                min: Some(1000),
                max: Some(2000),
            },
            fs_group: GroupStrategy::MustRunAs {
                ranges: vec![IdRange::new(5000, 6000)],
            },
            supplemental_groups: GroupStrategy::MustRunAs {
                ranges: vec![IdRange::new(5000, 6000)],
            },
            ..restricted_baseline()
        }
    }

    pub fn pod() -> Pod {
        Pod {
            name: "web".to_string(),
            kind: "Pod".to_string(),
            spec_path: "spec".to_string(),
            containers: vec![Container {
                name: "app".to_string(),
                path: "spec.containers[0]".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    pub fn run(rule: &dyn Rule, scc: &SecurityContextConstraints, pod: &Pod) -> RuleOutcome {
        let baseline = restricted_baseline();
        rule.evaluate(&RuleInput {
            scc,
            pod,
            service_account: AccountLookup::NotProvided,
            baseline: &baseline,
        })
    }
}
