//! Field-by-field comparison of a candidate SCC against a baseline.
//!
//! The field list is fixed and each field is compared by the set of runtime
//! behaviours it admits, so a rewrite that admits the same set (for example
//! `MustRunAs(uid=1000)` versus `MustRunAsRange(1000-1000)`) is reported as
//! `unchanged` rather than loosened.

use crate::analyzer::scclint::model::{
    GroupStrategy, IdRange, RunAsUserStrategy, SecurityContextConstraints, WILDCARD,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// How a candidate field compares to the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// The candidate admits something the baseline does not.
    Loosened,
    /// The candidate admits strictly less.
    Tightened,
    /// Written differently, admits the same.
    Unchanged,
}

impl Direction {
    fn from_containment(baseline_covers_candidate: bool, candidate_covers_baseline: bool) -> Self {
        match (baseline_covers_candidate, candidate_covers_baseline) {
            (true, true) => Self::Unchanged,
            (true, false) => Self::Tightened,
            (false, _) => Self::Loosened,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loosened => "loosened",
            Self::Tightened => "tightened",
            Self::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One differing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDelta {
    pub path: String,
    pub baseline_value: String,
    pub candidate_value: String,
    pub direction: Direction,
}

/// Compare `candidate` against `baseline`.
///
/// Only fields whose rendered values differ produce a delta, in a fixed field
/// order, so `diff(x, x)` is always empty.
pub fn diff(baseline: &SecurityContextConstraints, candidate: &SecurityContextConstraints) -> Vec<FieldDelta> {
    let mut deltas = Vec::new();

    let flags: [(&str, bool, bool, bool); 8] = [
        ("allowPrivilegedContainer", baseline.allow_privileged_container, candidate.allow_privileged_container, true),
        ("allowHostNetwork", baseline.allow_host_network, candidate.allow_host_network, true),
        ("allowHostPID", baseline.allow_host_pid, candidate.allow_host_pid, true),
        ("allowHostIPC", baseline.allow_host_ipc, candidate.allow_host_ipc, true),
        ("allowHostPorts", baseline.allow_host_ports, candidate.allow_host_ports, true),
        ("allowHostDirVolumePlugin", baseline.allow_host_dir_volume_plugin, candidate.allow_host_dir_volume_plugin, true),
        ("allowPrivilegeEscalation", baseline.allow_privilege_escalation, candidate.allow_privilege_escalation, true),
        // read-only root is the restrictive setting
        ("readOnlyRootFilesystem", baseline.read_only_root_filesystem, candidate.read_only_root_filesystem, false),
    ];
    for (path, base, cand, true_is_permissive) in flags {
        if base != cand {
            let loosened = cand == true_is_permissive;
            deltas.push(FieldDelta {
                path: path.to_string(),
                baseline_value: base.to_string(),
                candidate_value: cand.to_string(),
                direction: if loosened { Direction::Loosened } else { Direction::Tightened },
            });
        }
    }

    push_id_delta(
        &mut deltas,
        "runAsUser",
        &baseline.run_as_user.to_string(),
        &candidate.run_as_user.to_string(),
        IdSet::from_run_as_user(&baseline.run_as_user),
        IdSet::from_run_as_user(&candidate.run_as_user),
    );
    push_id_delta(
        &mut deltas,
        "fsGroup",
        &baseline.fs_group.to_string(),
        &candidate.fs_group.to_string(),
        IdSet::from_group(&baseline.fs_group),
        IdSet::from_group(&candidate.fs_group),
    );
    push_id_delta(
        &mut deltas,
        "supplementalGroups",
        &baseline.supplemental_groups.to_string(),
        &candidate.supplemental_groups.to_string(),
        IdSet::from_group(&baseline.supplemental_groups),
        IdSet::from_group(&candidate.supplemental_groups),
    );

    push_set_delta(&mut deltas, "allowedCapabilities", &baseline.allowed_capabilities, &candidate.allowed_capabilities, WILDCARD, true);
    push_set_delta(&mut deltas, "defaultAddCapabilities", &baseline.default_add_capabilities, &candidate.default_add_capabilities, WILDCARD, true);
    // dropping more is tighter
    push_set_delta(&mut deltas, "requiredDropCapabilities", &baseline.required_drop_capabilities, &candidate.required_drop_capabilities, "ALL", false);
    push_set_delta(&mut deltas, "volumes", &baseline.volumes, &candidate.volumes, WILDCARD, true);

    deltas
}

fn push_id_delta(
    deltas: &mut Vec<FieldDelta>,
    path: &str,
    baseline_value: &str,
    candidate_value: &str,
    baseline: IdSet,
    candidate: IdSet,
) {
    if baseline_value == candidate_value {
        return;
    }
    deltas.push(FieldDelta {
        path: path.to_string(),
        baseline_value: baseline_value.to_string(),
        candidate_value: candidate_value.to_string(),
        direction: Direction::from_containment(baseline.covers(&candidate), candidate.covers(&baseline)),
    });
}

fn push_set_delta(
    deltas: &mut Vec<FieldDelta>,
    path: &str,
    baseline: &BTreeSet<String>,
    candidate: &BTreeSet<String>,
    wildcard: &str,
    more_is_permissive: bool,
) {
    if baseline == candidate {
        return;
    }
    let covers = |a: &BTreeSet<String>, b: &BTreeSet<String>| a.contains(wildcard) || b.is_subset(a);
    let (base_covers, cand_covers) = (covers(baseline, candidate), covers(candidate, baseline));
    let direction = if more_is_permissive {
        Direction::from_containment(base_covers, cand_covers)
    } else {
        Direction::from_containment(cand_covers, base_covers)
    };
    deltas.push(FieldDelta {
        path: path.to_string(),
        baseline_value: render_set(baseline),
        candidate_value: render_set(candidate),
        direction,
    });
}

fn render_set(set: &BTreeSet<String>) -> String {
    let items: Vec<&str> = set.iter().map(String::as_str).collect();
    format!("[{}]", items.join(", "))
}

/// The IDs a strategy admits.
#[derive(Debug, Clone, PartialEq, Eq)]
enum IdSet {
    /// Every ID, root included.
    Any,
    /// Every ID except 0.
    NonRoot,
    /// A finite union of ranges, merged and sorted. May be empty.
    Ranges(Vec<IdRange>),
    /// Allocated from the namespace at admission; bounds unknown but non-root.
    Allocated,
}

impl IdSet {
    fn from_run_as_user(strategy: &RunAsUserStrategy) -> Self {
        match strategy {
            RunAsUserStrategy::RunAsAny => Self::Any,
            RunAsUserStrategy::MustRunAsNonRoot => Self::NonRoot,
            RunAsUserStrategy::MustRunAs { uid: Some(uid) } => Self::Ranges(vec![IdRange::new(*uid, *uid)]),
            RunAsUserStrategy::MustRunAsRange {
                min: Some(min),
                max: Some(max),
            } => Self::Ranges(normalize(&[IdRange::new(*min, *max)])),
            RunAsUserStrategy::MustRunAs { uid: None } | RunAsUserStrategy::MustRunAsRange { .. } => {
                Self::Allocated
            }
        }
    }

    fn from_group(strategy: &GroupStrategy) -> Self {
        match strategy {
            GroupStrategy::RunAsAny => Self::Any,
            GroupStrategy::MustRunAs { ranges } if ranges.is_empty() => Self::Allocated,
            GroupStrategy::MustRunAs { ranges } => Self::Ranges(normalize(ranges)),
        }
    }

    /// Whether `self` admits every ID `other` admits.
    fn covers(&self, other: &IdSet) -> bool {
        match (self, other) {
            (Self::Any, _) => true,
            (_, Self::Any) => false,
            (Self::NonRoot, Self::NonRoot | Self::Allocated) => true,
            (Self::NonRoot, Self::Ranges(r)) => r.iter().all(|r| r.min >= 1),
            (Self::Ranges(_) | Self::Allocated, Self::NonRoot) => false,
            (Self::Ranges(a), Self::Ranges(b)) => b.iter().all(|rb| a.iter().any(|ra| ra.min <= rb.min && rb.max <= ra.max)),
            // unknown bounds: compare by strategy only
            (Self::Ranges(_), Self::Allocated) | (Self::Allocated, Self::Allocated) => true,
            (Self::Allocated, Self::Ranges(r)) => r.iter().all(|r| r.min >= 1),
        }
    }
}

/// Drop inverted ranges, sort, and merge overlapping or adjacent ones.
fn normalize(ranges: &[IdRange]) -> Vec<IdRange> {
    let mut sorted: Vec<IdRange> = ranges.iter().copied().filter(|r| !r.is_inverted()).collect();
    sorted.sort();

    let mut merged: Vec<IdRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        match merged.last_mut() {
            Some(last) if range.min <= last.max.saturating_add(1) => {
                last.max = last.max.max(range.max);
            }
            _ => merged.push(range),
        }
    }
    merged
}

fn str_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// OpenShift's stock `restricted` SCC.
pub fn restricted_baseline() -> SecurityContextConstraints {
    SecurityContextConstraints {
        name: "restricted".to_string(),
        allow_privileged_container: false,
        allow_host_network: false,
        allow_host_pid: false,
        allow_host_ipc: false,
        allow_host_ports: false,
        allow_host_dir_volume_plugin: false,
        allow_privilege_escalation: true,
        read_only_root_filesystem: false,
        run_as_user: RunAsUserStrategy::MustRunAsRange { min: None, max: None },
        fs_group: GroupStrategy::MustRunAs { ranges: Vec::new() },
        supplemental_groups: GroupStrategy::RunAsAny,
        allowed_capabilities: BTreeSet::new(),
        default_add_capabilities: BTreeSet::new(),
        required_drop_capabilities: str_set(&["KILL", "MKNOD", "SETGID", "SETUID"]),
        volumes: str_set(&[
            "configMap",
            "downwardAPI",
            "emptyDir",
            "persistentVolumeClaim",
            "projected",
            "secret",
        ]),
        users: Vec::new(),
        groups: vec!["system:authenticated".to_string()],
    }
}

/// OpenShift's `restricted-v2` SCC.
pub fn restricted_v2_baseline() -> SecurityContextConstraints {
    SecurityContextConstraints {
        name: "restricted-v2".to_string(),
        allow_privilege_escalation: false,
        allowed_capabilities: str_set(&["NET_BIND_SERVICE"]),
        required_drop_capabilities: str_set(&["ALL"]),
        volumes: str_set(&[
            "configMap",
            "csi",
            "downwardAPI",
            "emptyDir",
            "ephemeral",
            "persistentVolumeClaim",
            "projected",
            "secret",
        ]),
        ..restricted_baseline()
    }
}

/// Look up a built-in baseline by name.
pub fn builtin_baseline(name: &str) -> Option<SecurityContextConstraints> {
    match name {
        "restricted" => Some(restricted_baseline()),
        "restricted-v2" => Some(restricted_v2_baseline()),
        _ => None,
    }
}
