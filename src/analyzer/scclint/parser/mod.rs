//! Manifest loading.

pub mod yaml;

use crate::analyzer::scclint::model::{Pod, Role, RoleBinding, SecurityContextConstraints, ServiceAccount};
use std::fmt;

pub use yaml::{
    load_document, load_pod_file, load_scc_file, load_service_account_file, parse_manifests,
    read_file,
};

/// Kinds the loader understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    SecurityContextConstraints,
    /// A Pod or any workload carrying a pod template.
    Pod,
    ServiceAccount,
    /// RoleBinding or ClusterRoleBinding.
    RoleBinding,
    /// Role or ClusterRole.
    Role,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SecurityContextConstraints => "SecurityContextConstraints",
            Self::Pod => "Pod",
            Self::ServiceAccount => "ServiceAccount",
            Self::RoleBinding => "RoleBinding",
            Self::Role => "Role",
        }
    }

    /// Parse from a Kubernetes `kind` string.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "SecurityContextConstraints" => Some(Self::SecurityContextConstraints),
            "Pod" | "Deployment" | "StatefulSet" | "DaemonSet" | "ReplicaSet" | "Job"
            | "CronJob" | "DeploymentConfig" => Some(Self::Pod),
            "ServiceAccount" => Some(Self::ServiceAccount),
            "RoleBinding" | "ClusterRoleBinding" => Some(Self::RoleBinding),
            "Role" | "ClusterRole" => Some(Self::Role),
            _ => None,
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A typed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Manifest {
    Scc(Box<SecurityContextConstraints>),
    Pod(Box<Pod>),
    ServiceAccount(ServiceAccount),
    RoleBinding(RoleBinding),
    Role(Role),
}

impl Manifest {
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Scc(_) => ObjectKind::SecurityContextConstraints,
            Self::Pod(_) => ObjectKind::Pod,
            Self::ServiceAccount(_) => ObjectKind::ServiceAccount,
            Self::RoleBinding(_) => ObjectKind::RoleBinding,
            Self::Role(_) => ObjectKind::Role,
        }
    }
}
