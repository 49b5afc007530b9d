//! Typed records produced by the manifest loader.
//!
//! All records are plain values: the loader builds them once and everything
//! downstream only reads them.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Wildcard entry accepted by capability and volume lists.
pub const WILDCARD: &str = "*";

/// Volume type gated by `allowHostDirVolumePlugin`.
pub const HOST_PATH_VOLUME: &str = "hostPath";

/// Every volume type an SCC can list, wildcard and `none` excluded.
pub const ALL_VOLUME_TYPES: &[&str] = &[
    "awsElasticBlockStore",
    "azureDisk",
    "azureFile",
    "cephFS",
    "cinder",
    "configMap",
    "csi",
    "downwardAPI",
    "emptyDir",
    "ephemeral",
    "fc",
    "flexVolume",
    "flocker",
    "gcePersistentDisk",
    "gitRepo",
    "glusterfs",
    "hostPath",
    "iscsi",
    "nfs",
    "persistentVolumeClaim",
    "photonPersistentDisk",
    "portworxVolume",
    "projected",
    "quobyte",
    "rbd",
    "scaleIO",
    "secret",
    "storageos",
    "vsphere",
];

/// Volumes admission allows when an SCC leaves `volumes` empty.
///
/// `*` when host directories are allowed, otherwise every type but `hostPath`.
pub fn default_volumes(allow_host_dir_volume_plugin: bool) -> BTreeSet<String> {
    if allow_host_dir_volume_plugin {
        return BTreeSet::from([WILDCARD.to_string()]);
    }
    ALL_VOLUME_TYPES
        .iter()
        .filter(|v| **v != HOST_PATH_VOLUME)
        .map(|v| (*v).to_string())
        .collect()
}

/// Default service account used when a pod does not name one.
pub const DEFAULT_SERVICE_ACCOUNT: &str = "default";

/// An inclusive ID range (`{min, max}` in SCC manifests).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct IdRange {
    pub min: i64,
    pub max: i64,
}

impl IdRange {
    pub fn new(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    /// Inclusive at both ends.
    pub fn contains(&self, id: i64) -> bool {
        self.min <= id && id <= self.max
    }

    pub fn is_inverted(&self) -> bool {
        self.min > self.max
    }
}

impl fmt::Display for IdRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

/// `runAsUser` strategy of an SCC.
///
/// Bounds are optional because manifests may omit them; a missing bound is
/// reported by the rule engine, never filled in here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunAsUserStrategy {
    RunAsAny,
    MustRunAs { uid: Option<i64> },
    MustRunAsRange { min: Option<i64>, max: Option<i64> },
    MustRunAsNonRoot,
}

impl RunAsUserStrategy {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunAsAny => "RunAsAny",
            Self::MustRunAs { .. } => "MustRunAs",
            Self::MustRunAsRange { .. } => "MustRunAsRange",
            Self::MustRunAsNonRoot => "MustRunAsNonRoot",
        }
    }
}

fn fmt_bound(bound: Option<i64>) -> String {
    bound.map_or_else(|| "<unset>".to_string(), |v| v.to_string())
}

impl fmt::Display for RunAsUserStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunAsAny | Self::MustRunAsNonRoot => write!(f, "{}", self.type_name()),
            Self::MustRunAs { uid } => write!(f, "MustRunAs(uid={})", fmt_bound(*uid)),
            Self::MustRunAsRange { min, max } => {
                write!(f, "MustRunAsRange({}-{})", fmt_bound(*min), fmt_bound(*max))
            }
        }
    }
}

/// `fsGroup` / `supplementalGroups` strategy of an SCC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupStrategy {
    RunAsAny,
    /// Ranges keep manifest order: the first one supplies the default.
    MustRunAs { ranges: Vec<IdRange> },
}

impl GroupStrategy {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::RunAsAny => "RunAsAny",
            Self::MustRunAs { .. } => "MustRunAs",
        }
    }

    /// Admission default: the minimum of the first declared range.
    pub fn default_id(&self) -> Option<i64> {
        match self {
            Self::MustRunAs { ranges } => ranges.first().map(|r| r.min),
            Self::RunAsAny => None,
        }
    }

    /// Whether `id` is allowed. `RunAsAny` allows everything.
    pub fn allows(&self, id: i64) -> bool {
        match self {
            Self::RunAsAny => true,
            Self::MustRunAs { ranges } => ranges.iter().any(|r| r.contains(id)),
        }
    }
}

impl fmt::Display for GroupStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RunAsAny => write!(f, "RunAsAny"),
            Self::MustRunAs { ranges } => {
                let parts: Vec<String> = ranges.iter().map(IdRange::to_string).collect();
                write!(f, "MustRunAs[{}]", parts.join(","))
            }
        }
    }
}

/// An OpenShift SecurityContextConstraints object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityContextConstraints {
    pub name: String,
    pub allow_privileged_container: bool,
    pub allow_host_network: bool,
    pub allow_host_pid: bool,
    pub allow_host_ipc: bool,
    pub allow_host_ports: bool,
    pub allow_host_dir_volume_plugin: bool,
    pub allow_privilege_escalation: bool,
    pub read_only_root_filesystem: bool,
    pub run_as_user: RunAsUserStrategy,
    pub fs_group: GroupStrategy,
    pub supplemental_groups: GroupStrategy,
    pub allowed_capabilities: BTreeSet<String>,
    pub default_add_capabilities: BTreeSet<String>,
    pub required_drop_capabilities: BTreeSet<String>,
    /// Effective volume types, after admission defaulting.
    pub volumes: BTreeSet<String>,
    /// Subjects granted the SCC directly, e.g. `system:serviceaccount:ns:name`.
    pub users: Vec<String>,
    pub groups: Vec<String>,
}

impl SecurityContextConstraints {
    /// Whether a container may add `capability`.
    pub fn allows_capability(&self, capability: &str) -> bool {
        self.allowed_capabilities.contains(WILDCARD)
            || self.allowed_capabilities.contains(capability)
            || self.default_add_capabilities.contains(capability)
    }

    /// Whether the SCC lists the service account among its `users`.
    pub fn grants_user(&self, namespace: &str, name: &str) -> bool {
        let subject = format!("system:serviceaccount:{}:{}", namespace, name);
        self.users.iter().any(|u| *u == subject)
    }
}

/// Pod-level `securityContext` fields the rules look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PodSecurityContext {
    pub run_as_user: Option<i64>,
    pub fs_group: Option<i64>,
    /// `None` when omitted; an empty list in the manifest is treated as omitted.
    pub supplemental_groups: Option<Vec<i64>>,
}

/// Container fields the rules look at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Container {
    pub name: String,
    /// Field path prefix, e.g. `spec.containers[0]`.
    pub path: String,
    pub run_as_user: Option<i64>,
    pub privileged: bool,
    pub added_capabilities: Vec<String>,
}

/// A pod, or the pod template of a workload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pod {
    pub name: String,
    pub kind: String,
    pub namespace: Option<String>,
    pub service_account_name: Option<String>,
    pub host_network: bool,
    pub host_pid: bool,
    pub host_ipc: bool,
    pub security_context: PodSecurityContext,
    pub containers: Vec<Container>,
    /// Field path prefix of the pod spec (`spec` or `spec.template.spec`).
    pub spec_path: String,
}

impl Pod {
    pub fn service_account(&self) -> &str {
        self.service_account_name
            .as_deref()
            .unwrap_or(DEFAULT_SERVICE_ACCOUNT)
    }

    pub fn namespace_or_default(&self) -> &str {
        self.namespace.as_deref().unwrap_or("default")
    }
}

/// A service account with the SCCs it may use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceAccount {
    pub name: String,
    pub namespace: String,
    pub bound_sccs: BTreeSet<String>,
}

impl ServiceAccount {
    pub fn is_bound_to(&self, scc: &str) -> bool {
        self.bound_sccs.contains(scc)
    }

    pub fn identifier(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// A subject of a RoleBinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

/// A RoleBinding or ClusterRoleBinding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleBinding {
    pub name: String,
    pub namespace: Option<String>,
    pub role_ref_kind: String,
    pub role_ref_name: String,
    pub subjects: Vec<Subject>,
}

/// API group of `securitycontextconstraints`.
pub const SCC_API_GROUP: &str = "security.openshift.io";

/// RBAC resource name of SCCs.
pub const SCC_RESOURCE: &str = "securitycontextconstraints";

/// One entry of a Role's `rules`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyRule {
    pub api_groups: Vec<String>,
    pub resources: Vec<String>,
    pub verbs: Vec<String>,
    /// Empty means every object of the resource.
    pub resource_names: Vec<String>,
}

fn lists(items: &[String], value: &str) -> bool {
    items.iter().any(|item| item == value || item == WILDCARD)
}

impl PolicyRule {
    /// Whether the rule allows `use` on SCCs.
    pub fn grants_scc_use(&self) -> bool {
        lists(&self.api_groups, SCC_API_GROUP)
            && lists(&self.resources, SCC_RESOURCE)
            && lists(&self.verbs, "use")
    }
}

/// A Role or ClusterRole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub name: String,
    pub namespace: Option<String>,
    pub cluster_scoped: bool,
    pub rules: Vec<PolicyRule>,
}

/// Everything read from the service account input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RbacInput {
    pub service_accounts: Vec<ServiceAccount>,
    pub role_bindings: Vec<RoleBinding>,
    pub roles: Vec<Role>,
}
