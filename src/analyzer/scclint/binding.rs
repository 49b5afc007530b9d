//! ServiceAccount to SCC mapping.
//!
//! The mapping is taken from explicit inputs only:
//! - RoleBindings to the `system:openshift:scc:<name>` cluster role
//! - RoleBindings to a Role or ClusterRole allowing `use` on
//!   `securitycontextconstraints`
//! - the `users` and `groups` subject lists of the SCCs themselves
//!
//! Admission priority between several usable SCCs is not modelled.

use crate::analyzer::scclint::model::{
    Pod, RbacInput, Role, RoleBinding, SecurityContextConstraints, ServiceAccount,
};
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

/// Prefix of the cluster roles OpenShift generates for each SCC.
pub const SCC_ROLE_PREFIX: &str = "system:openshift:scc:";

/// Group that contains every service account in the cluster.
const ALL_SERVICE_ACCOUNTS_GROUP: &str = "system:serviceaccounts";

/// Group that contains every authenticated identity, service accounts included.
const AUTHENTICATED_GROUP: &str = "system:authenticated";

/// SCC name granted by a role reference, if any.
pub fn scc_for_role(role_name: &str) -> Option<&str> {
    role_name
        .strip_prefix(SCC_ROLE_PREFIX)
        .filter(|name| !name.is_empty())
}

/// Whether a service account in `namespace` is a member of `group`.
fn in_group(group: &str, namespace: &str) -> bool {
    group == AUTHENTICATED_GROUP
        || group == ALL_SERVICE_ACCOUNTS_GROUP
        || group
            .strip_prefix(ALL_SERVICE_ACCOUNTS_GROUP)
            .and_then(|rest| rest.strip_prefix(':'))
            == Some(namespace)
}

fn binding_namespace(binding: &RoleBinding) -> &str {
    binding.namespace.as_deref().unwrap_or("default")
}

fn subject_matches(binding: &RoleBinding, namespace: &str, name: &str) -> bool {
    binding.subjects.iter().any(|s| match s.kind.as_str() {
        "ServiceAccount" => {
            let ns = s.namespace.as_deref().unwrap_or_else(|| binding_namespace(binding));
            s.name == name && ns == namespace
        }
        "User" => s.name == format!("system:serviceaccount:{}:{}", namespace, name),
        "Group" => in_group(&s.name, namespace),
        _ => false,
    })
}

fn scc_grants_groups(scc: &SecurityContextConstraints, namespace: &str) -> bool {
    scc.groups.iter().any(|g| in_group(g, namespace))
}

/// The Role or ClusterRole a binding refers to.
fn referenced_role<'a>(binding: &RoleBinding, roles: &'a [Role]) -> Option<&'a Role> {
    roles.iter().find(|role| {
        role.name == binding.role_ref_name
            && match binding.role_ref_kind.as_str() {
                "ClusterRole" => role.cluster_scoped,
                "Role" => {
                    !role.cluster_scoped
                        && role.namespace.as_deref().unwrap_or("default") == binding_namespace(binding)
                }
                _ => false,
            }
    })
}

/// SCC names a binding grants `use` of.
///
/// A rule without `resourceNames` grants every SCC in `sccs`.
fn granted_sccs(binding: &RoleBinding, roles: &[Role], sccs: &[&SecurityContextConstraints]) -> BTreeSet<String> {
    let mut granted = BTreeSet::new();
    if let Some(scc) = scc_for_role(&binding.role_ref_name) {
        granted.insert(scc.to_string());
    }
    if let Some(role) = referenced_role(binding, roles) {
        for rule in role.rules.iter().filter(|r| r.grants_scc_use()) {
            if rule.resource_names.is_empty() {
                granted.extend(sccs.iter().map(|scc| scc.name.clone()));
            } else {
                granted.extend(rule.resource_names.iter().cloned());
            }
        }
    }
    granted
}

/// Fill in `bound_sccs` for every service account.
///
/// Service accounts that appear only as RoleBinding subjects are added so a
/// bindings-only input still yields a mapping. Output is sorted by
/// `namespace/name`.
pub fn resolve(input: &RbacInput, sccs: &[&SecurityContextConstraints]) -> Vec<ServiceAccount> {
    let mut resolved: BTreeMap<(String, String), ServiceAccount> = BTreeMap::new();

    for sa in &input.service_accounts {
        resolved
            .entry((sa.namespace.clone(), sa.name.clone()))
            .or_insert_with(|| sa.clone());
    }

    let grants: Vec<(&RoleBinding, BTreeSet<String>)> = input
        .role_bindings
        .iter()
        .map(|binding| (binding, granted_sccs(binding, &input.roles, sccs)))
        .filter(|(binding, granted)| {
            if granted.is_empty() {
                debug!("binding {} grants no SCC", binding.name);
            }
            !granted.is_empty()
        })
        .collect();

    for (binding, _) in &grants {
        for subject in binding.subjects.iter().filter(|s| s.kind == "ServiceAccount") {
            let namespace = subject
                .namespace
                .clone()
                .unwrap_or_else(|| binding_namespace(binding).to_string());
            resolved
                .entry((namespace.clone(), subject.name.clone()))
                .or_insert_with(|| ServiceAccount {
                    name: subject.name.clone(),
                    namespace,
                    ..Default::default()
                });
        }
    }

    for sa in resolved.values_mut() {
        for (binding, granted) in &grants {
            if subject_matches(binding, &sa.namespace, &sa.name) {
                sa.bound_sccs.extend(granted.iter().cloned());
            }
        }
        for scc in sccs {
            if scc.grants_user(&sa.namespace, &sa.name) || scc_grants_groups(scc, &sa.namespace) {
                sa.bound_sccs.insert(scc.name.clone());
            }
        }
        debug!("service account {} may use {:?}", sa.identifier(), sa.bound_sccs);
    }

    resolved.into_values().collect()
}

/// The service account a pod runs as, if it is among `accounts`.
pub fn find_for_pod<'a>(accounts: &'a [ServiceAccount], pod: &Pod) -> Option<&'a ServiceAccount> {
    let namespace = pod.namespace_or_default();
    let name = pod.service_account();
    accounts
        .iter()
        .find(|sa| sa.name == name && sa.namespace == namespace)
}
