//! YAML/JSON parsing for SCC, Pod, ServiceAccount, Role and RoleBinding manifests.
//!
//! Documents are navigated as `serde_yaml::Value`s so that unknown fields are
//! ignored and every schema error can name the exact field path.

use crate::analyzer::scclint::model::*;
use crate::analyzer::scclint::parser::{Manifest, ObjectKind};
use crate::error::{Result, SccLintError};
use log::debug;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::Path;

/// Read a manifest file into memory.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| SccLintError::io(path, e))
}

/// Load the SecurityContextConstraints document from a file.
pub fn load_scc_file(path: &Path) -> Result<SecurityContextConstraints> {
    match load_document(&read_file(path)?, path, ObjectKind::SecurityContextConstraints)? {
        Manifest::Scc(scc) => Ok(*scc),
        other => Err(unexpected(path, &other, ObjectKind::SecurityContextConstraints)),
    }
}

/// Load the Pod (or pod-template workload) document from a file.
pub fn load_pod_file(path: &Path) -> Result<Pod> {
    match load_document(&read_file(path)?, path, ObjectKind::Pod)? {
        Manifest::Pod(pod) => Ok(*pod),
        other => Err(unexpected(path, &other, ObjectKind::Pod)),
    }
}

/// Load every ServiceAccount, RoleBinding and Role in a file.
///
/// Bound SCCs are left empty; see [`crate::analyzer::scclint::binding`].
pub fn load_service_account_file(path: &Path) -> Result<RbacInput> {
    let mut input = RbacInput::default();
    for manifest in parse_manifests(&read_file(path)?, path)? {
        match manifest {
            Manifest::ServiceAccount(sa) => input.service_accounts.push(sa),
            Manifest::RoleBinding(rb) => input.role_bindings.push(rb),
            Manifest::Role(role) => input.roles.push(role),
            other => debug!(
                "{}: ignoring {} document in service account input",
                path.display(),
                other.kind()
            ),
        }
    }
    if input.service_accounts.is_empty() && input.role_bindings.is_empty() {
        return Err(SccLintError::UnsupportedKind {
            path: path.to_path_buf(),
            found: "no ServiceAccount or RoleBinding documents".to_string(),
            expected: "ServiceAccount or RoleBinding".to_string(),
        });
    }
    Ok(input)
}

fn unexpected(path: &Path, found: &Manifest, expected: ObjectKind) -> SccLintError {
    SccLintError::UnsupportedKind {
        path: path.to_path_buf(),
        found: found.kind().to_string(),
        expected: expected.to_string(),
    }
}

/// Parse the first document of the `expected` kind.
///
/// Documents of other kinds are skipped without being validated. If none
/// matches, the error lists the kinds that were found.
pub fn load_document(content: &[u8], path: &Path, expected: ObjectKind) -> Result<Manifest> {
    let mut found = Vec::new();

    for (value, start_line) in parse_values(content, path)? {
        for (object, prefix) in expand_lists(&value) {
            let reader = Reader { path, prefix };
            let kind = reader.req_str(object, "", "kind")?;
            if ObjectKind::from_kind(&kind) == Some(expected) {
                debug!(
                    "{}:{}: loading {} document",
                    path.display(),
                    start_line,
                    kind
                );
                return reader.convert(object, &kind);
            }
            found.push(kind);
        }
    }

    let found = if found.is_empty() {
        "empty input".to_string()
    } else {
        found.join(", ")
    };
    Err(SccLintError::UnsupportedKind {
        path: path.to_path_buf(),
        found,
        expected: expected.to_string(),
    })
}

/// Parse every supported document in the input.
///
/// Documents of kinds the checker does not model are skipped.
pub fn parse_manifests(content: &[u8], path: &Path) -> Result<Vec<Manifest>> {
    let mut manifests = Vec::new();

    for (value, _) in parse_values(content, path)? {
        for (object, prefix) in expand_lists(&value) {
            let reader = Reader { path, prefix };
            let kind = reader.req_str(object, "", "kind")?;
            if ObjectKind::from_kind(&kind).is_some() {
                manifests.push(reader.convert(object, &kind)?);
            } else {
                debug!("{}: skipping unsupported kind {}", path.display(), kind);
            }
        }
    }

    Ok(manifests)
}

/// A raw document and the 1-indexed line it starts on.
struct RawDocument {
    text: String,
    start_line: u32,
}

fn split_documents(content: &str) -> Vec<RawDocument> {
    let mut docs = Vec::new();
    let mut current = String::new();
    let mut start_line = 1u32;

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx as u32 + 1;
        if line.trim_end() == "---" || line.starts_with("--- ") {
            docs.push(RawDocument {
                text: std::mem::take(&mut current),
                start_line,
            });
            start_line = line_no + 1;
            if let Some(rest) = line.strip_prefix("--- ") {
                current.push_str(rest);
                current.push('\n');
                start_line = line_no;
            }
            continue;
        }
        current.push_str(line);
        current.push('\n');
    }
    docs.push(RawDocument {
        text: current,
        start_line,
    });

    docs
}

fn is_blank(text: &str) -> bool {
    text.lines().all(|l| {
        let t = l.trim();
        t.is_empty() || t.starts_with('#') || t == "..."
    })
}

fn parse_values(content: &[u8], path: &Path) -> Result<Vec<(Value, u32)>> {
    let content = std::str::from_utf8(content)
        .map_err(|e| SccLintError::parse(path, None, format!("input is not valid UTF-8: {}", e)))?;

    let mut values = Vec::new();
    for doc in split_documents(content) {
        if is_blank(&doc.text) {
            continue;
        }
        let value: Value = serde_yaml::from_str(&doc.text).map_err(|e| {
            let line = e
                .location()
                .map(|loc| doc.start_line + loc.line() as u32 - 1)
                .or(Some(doc.start_line));
            SccLintError::parse(path, line, e.to_string())
        })?;
        if value.is_null() {
            continue;
        }
        if !value.is_mapping() {
            return Err(SccLintError::parse(
                path,
                Some(doc.start_line),
                "document root must be a mapping",
            ));
        }
        values.push((value, doc.start_line));
    }

    Ok(values)
}

/// Flatten `kind: List` documents into their items.
fn expand_lists(value: &Value) -> Vec<(&Value, String)> {
    if value.get("kind").and_then(Value::as_str) == Some("List") {
        if let Some(items) = value.get("items").and_then(Value::as_sequence) {
            return items
                .iter()
                .enumerate()
                .map(|(i, item)| (item, format!("items[{}]", i)))
                .collect();
        }
    }
    vec![(value, String::new())]
}

fn join(at: &str, key: &str) -> String {
    if at.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", at, key)
    }
}

/// Field accessors that report schema errors against one document.
struct Reader<'a> {
    path: &'a Path,
    /// Path of the document inside its file (non-empty for `List` items).
    prefix: String,
}

impl Reader<'_> {
    fn schema(&self, field: &str, message: impl Into<String>) -> SccLintError {
        SccLintError::schema(self.path, join(&self.prefix, field), message)
    }

    fn get<'v>(&self, value: &'v Value, key: &str) -> Option<&'v Value> {
        value.get(key).filter(|v| !v.is_null())
    }

    fn opt_str(&self, value: &Value, at: &str, key: &str) -> Result<Option<String>> {
        match self.get(value, key) {
            None => Ok(None),
            Some(v) => v
                .as_str()
                .map(|s| Some(s.to_string()))
                .ok_or_else(|| self.schema(&join(at, key), "expected a string")),
        }
    }

    fn req_str(&self, value: &Value, at: &str, key: &str) -> Result<String> {
        self.opt_str(value, at, key)?
            .ok_or_else(|| self.schema(&join(at, key), "required field is missing"))
    }

    fn opt_bool(&self, value: &Value, at: &str, key: &str) -> Result<Option<bool>> {
        match self.get(value, key) {
            None => Ok(None),
            Some(v) => v
                .as_bool()
                .map(Some)
                .ok_or_else(|| self.schema(&join(at, key), "expected a boolean")),
        }
    }

    fn bool_or(&self, value: &Value, at: &str, key: &str, default: bool) -> Result<bool> {
        Ok(self.opt_bool(value, at, key)?.unwrap_or(default))
    }

    fn opt_i64(&self, value: &Value, at: &str, key: &str) -> Result<Option<i64>> {
        match self.get(value, key) {
            None => Ok(None),
            Some(v) => v
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.schema(&join(at, key), "expected an integer")),
        }
    }

    fn req_i64(&self, value: &Value, at: &str, key: &str) -> Result<i64> {
        self.opt_i64(value, at, key)?
            .ok_or_else(|| self.schema(&join(at, key), "required field is missing"))
    }

    fn opt_map<'v>(&self, value: &'v Value, at: &str, key: &str) -> Result<Option<&'v Value>> {
        match self.get(value, key) {
            None => Ok(None),
            Some(v) if v.is_mapping() => Ok(Some(v)),
            Some(_) => Err(self.schema(&join(at, key), "expected a mapping")),
        }
    }

    fn req_map<'v>(&self, value: &'v Value, at: &str, key: &str) -> Result<&'v Value> {
        self.opt_map(value, at, key)?
            .ok_or_else(|| self.schema(&join(at, key), "required field is missing"))
    }

    fn seq<'v>(&self, value: &'v Value, at: &str, key: &str) -> Result<&'v [Value]> {
        match self.get(value, key) {
            None => Ok(&[][..]),
            Some(v) => v
                .as_sequence()
                .map(|s| s.as_slice())
                .ok_or_else(|| self.schema(&join(at, key), "expected a list")),
        }
    }

    fn str_list(&self, value: &Value, at: &str, key: &str) -> Result<Vec<String>> {
        let field = join(at, key);
        self.seq(value, at, key)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| self.schema(&format!("{}[{}]", field, i), "expected a string"))
            })
            .collect()
    }

    fn str_set(&self, value: &Value, at: &str, key: &str) -> Result<BTreeSet<String>> {
        Ok(self.str_list(value, at, key)?.into_iter().collect())
    }

    fn i64_list(&self, value: &Value, at: &str, key: &str) -> Result<Vec<i64>> {
        let field = join(at, key);
        self.seq(value, at, key)?
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_i64()
                    .ok_or_else(|| self.schema(&format!("{}[{}]", field, i), "expected an integer"))
            })
            .collect()
    }

    fn convert(&self, value: &Value, kind: &str) -> Result<Manifest> {
        match ObjectKind::from_kind(kind) {
            Some(ObjectKind::SecurityContextConstraints) => {
                Ok(Manifest::Scc(Box::new(self.parse_scc(value)?)))
            }
            Some(ObjectKind::Pod) => Ok(Manifest::Pod(Box::new(self.parse_pod(value, kind)?))),
            Some(ObjectKind::ServiceAccount) => {
                Ok(Manifest::ServiceAccount(self.parse_service_account(value)?))
            }
            Some(ObjectKind::RoleBinding) => Ok(Manifest::RoleBinding(self.parse_role_binding(value)?)),
            Some(ObjectKind::Role) => Ok(Manifest::Role(self.parse_role(value, kind)?)),
            None => Err(SccLintError::UnsupportedKind {
                path: self.path.to_path_buf(),
                found: kind.to_string(),
                expected: "SecurityContextConstraints, Pod, ServiceAccount, Role or RoleBinding"
                    .to_string(),
            }),
        }
    }

    fn metadata<'v>(&self, value: &'v Value) -> Result<&'v Value> {
        self.req_map(value, "", "metadata")
    }

    // ========================================================================
    // SecurityContextConstraints
    // ========================================================================

    fn parse_scc(&self, value: &Value) -> Result<SecurityContextConstraints> {
        let metadata = self.metadata(value)?;
        let allow_host_dir_volume_plugin = self.bool_or(value, "", "allowHostDirVolumePlugin", false)?;

        // admission fills in an empty volume list and reconciles hostPath
        let mut volumes = self.str_set(value, "", "volumes")?;
        if volumes.is_empty() {
            volumes = default_volumes(allow_host_dir_volume_plugin);
        } else if allow_host_dir_volume_plugin && !volumes.contains(WILDCARD) {
            volumes.insert(HOST_PATH_VOLUME.to_string());
        }

        Ok(SecurityContextConstraints {
            name: self.req_str(metadata, "metadata", "name")?,
            allow_privileged_container: self.bool_or(value, "", "allowPrivilegedContainer", false)?,
            allow_host_network: self.bool_or(value, "", "allowHostNetwork", false)?,
            allow_host_pid: self.bool_or(value, "", "allowHostPID", false)?,
            allow_host_ipc: self.bool_or(value, "", "allowHostIPC", false)?,
            allow_host_ports: self.bool_or(value, "", "allowHostPorts", false)?,
            allow_host_dir_volume_plugin,
            allow_privilege_escalation: self.bool_or(value, "", "allowPrivilegeEscalation", true)?,
            read_only_root_filesystem: self.bool_or(value, "", "readOnlyRootFilesystem", false)?,
            run_as_user: self.parse_run_as_user(value)?,
            fs_group: self.parse_group_strategy(value, "fsGroup")?,
            supplemental_groups: self.parse_group_strategy(value, "supplementalGroups")?,
            allowed_capabilities: self.str_set(value, "", "allowedCapabilities")?,
            default_add_capabilities: self.str_set(value, "", "defaultAddCapabilities")?,
            required_drop_capabilities: self.str_set(value, "", "requiredDropCapabilities")?,
            volumes,
            users: self.str_list(value, "", "users")?,
            groups: self.str_list(value, "", "groups")?,
        })
    }

    fn parse_run_as_user(&self, value: &Value) -> Result<RunAsUserStrategy> {
        let at = "runAsUser";
        let strategy = self.req_map(value, "", at)?;
        let type_name = self.req_str(strategy, at, "type")?;

        match type_name.as_str() {
            "RunAsAny" => Ok(RunAsUserStrategy::RunAsAny),
            "MustRunAs" => Ok(RunAsUserStrategy::MustRunAs {
                uid: self.opt_i64(strategy, at, "uid")?,
            }),
            "MustRunAsRange" => Ok(RunAsUserStrategy::MustRunAsRange {
                min: self.opt_i64(strategy, at, "uidRangeMin")?,
                max: self.opt_i64(strategy, at, "uidRangeMax")?,
            }),
            "MustRunAsNonRoot" => Ok(RunAsUserStrategy::MustRunAsNonRoot),
            other => Err(self.schema(
                "runAsUser.type",
                format!(
                    "unsupported strategy `{}` (expected RunAsAny, MustRunAs, MustRunAsRange or MustRunAsNonRoot)",
                    other
                ),
            )),
        }
    }

    fn parse_group_strategy(&self, value: &Value, at: &str) -> Result<GroupStrategy> {
        let strategy = self.req_map(value, "", at)?;
        let type_name = self.req_str(strategy, at, "type")?;

        match type_name.as_str() {
            "RunAsAny" => Ok(GroupStrategy::RunAsAny),
            "MustRunAs" => {
                let ranges_at = join(at, "ranges");
                let ranges = self
                    .seq(strategy, at, "ranges")?
                    .iter()
                    .enumerate()
                    .map(|(i, range)| {
                        let range_at = format!("{}[{}]", ranges_at, i);
                        if !range.is_mapping() {
                            return Err(self.schema(&range_at, "expected a mapping"));
                        }
                        Ok(IdRange::new(
                            self.req_i64(range, &range_at, "min")?,
                            self.req_i64(range, &range_at, "max")?,
                        ))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(GroupStrategy::MustRunAs { ranges })
            }
            other => Err(self.schema(
                &join(at, "type"),
                format!("unsupported strategy `{}` (expected RunAsAny or MustRunAs)", other),
            )),
        }
    }

    // ========================================================================
    // Pods and workloads
    // ========================================================================

    fn pod_spec<'v>(&self, value: &'v Value, kind: &str) -> Result<(&'v Value, String)> {
        let segments: &[&str] = match kind {
            "Pod" => &["spec"],
            "CronJob" => &["spec", "jobTemplate", "spec", "template", "spec"],
            _ => &["spec", "template", "spec"],
        };

        let mut current = value;
        let mut at = String::new();
        for segment in segments {
            current = self.req_map(current, &at, segment)?;
            at = join(&at, segment);
        }
        Ok((current, at))
    }

    fn parse_pod(&self, value: &Value, kind: &str) -> Result<Pod> {
        let metadata = self.metadata(value)?;
        let (spec, spec_path) = self.pod_spec(value, kind)?;

        let service_account_name = match self.opt_str(spec, &spec_path, "serviceAccountName")? {
            Some(name) => Some(name),
            None => self.opt_str(spec, &spec_path, "serviceAccount")?,
        };

        let security_context = match self.opt_map(spec, &spec_path, "securityContext")? {
            Some(sc) => {
                let at = join(&spec_path, "securityContext");
                let groups = self.i64_list(sc, &at, "supplementalGroups")?;
                PodSecurityContext {
                    run_as_user: self.opt_i64(sc, &at, "runAsUser")?,
                    fs_group: self.opt_i64(sc, &at, "fsGroup")?,
                    supplemental_groups: if groups.is_empty() { None } else { Some(groups) },
                }
            }
            None => PodSecurityContext::default(),
        };

        let mut containers = Vec::new();
        for list in ["initContainers", "containers"] {
            let list_at = join(&spec_path, list);
            for (i, c) in self.seq(spec, &spec_path, list)?.iter().enumerate() {
                let at = format!("{}[{}]", list_at, i);
                containers.push(self.parse_container(c, &at, i)?);
            }
        }

        Ok(Pod {
            name: self.req_str(metadata, "metadata", "name")?,
            kind: kind.to_string(),
            namespace: self.opt_str(metadata, "metadata", "namespace")?,
            service_account_name,
            host_network: self.bool_or(spec, &spec_path, "hostNetwork", false)?,
            host_pid: self.bool_or(spec, &spec_path, "hostPID", false)?,
            host_ipc: self.bool_or(spec, &spec_path, "hostIPC", false)?,
            security_context,
            containers,
            spec_path,
        })
    }

    fn parse_container(&self, value: &Value, at: &str, index: usize) -> Result<Container> {
        if !value.is_mapping() {
            return Err(self.schema(at, "expected a mapping"));
        }
        let name = self
            .opt_str(value, at, "name")?
            .unwrap_or_else(|| format!("container-{}", index));

        let mut container = Container {
            name,
            path: at.to_string(),
            ..Default::default()
        };

        if let Some(sc) = self.opt_map(value, at, "securityContext")? {
            let sc_at = join(at, "securityContext");
            container.run_as_user = self.opt_i64(sc, &sc_at, "runAsUser")?;
            container.privileged = self.bool_or(sc, &sc_at, "privileged", false)?;
            if let Some(caps) = self.opt_map(sc, &sc_at, "capabilities")? {
                container.added_capabilities =
                    self.str_list(caps, &join(&sc_at, "capabilities"), "add")?;
            }
        }

        Ok(container)
    }

    // ========================================================================
    // ServiceAccounts, Roles and RoleBindings
    // ========================================================================

    fn parse_service_account(&self, value: &Value) -> Result<ServiceAccount> {
        let metadata = self.metadata(value)?;
        Ok(ServiceAccount {
            name: self.req_str(metadata, "metadata", "name")?,
            namespace: self
                .opt_str(metadata, "metadata", "namespace")?
                .unwrap_or_else(|| "default".to_string()),
            bound_sccs: BTreeSet::new(),
        })
    }

    fn parse_role_binding(&self, value: &Value) -> Result<RoleBinding> {
        let metadata = self.metadata(value)?;
        let role_ref = self.req_map(value, "", "roleRef")?;

        let subjects = self
            .seq(value, "", "subjects")?
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let at = format!("subjects[{}]", i);
                Ok(Subject {
                    kind: self.req_str(s, &at, "kind")?,
                    name: self.req_str(s, &at, "name")?,
                    namespace: self.opt_str(s, &at, "namespace")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RoleBinding {
            name: self.req_str(metadata, "metadata", "name")?,
            namespace: self.opt_str(metadata, "metadata", "namespace")?,
            role_ref_kind: self.req_str(role_ref, "roleRef", "kind")?,
            role_ref_name: self.req_str(role_ref, "roleRef", "name")?,
            subjects,
        })
    }

    fn parse_role(&self, value: &Value, kind: &str) -> Result<Role> {
        let metadata = self.metadata(value)?;

        let rules = self
            .seq(value, "", "rules")?
            .iter()
            .enumerate()
            .map(|(i, rule)| {
                let at = format!("rules[{}]", i);
                if !rule.is_mapping() {
                    return Err(self.schema(&at, "expected a mapping"));
                }
                Ok(PolicyRule {
                    api_groups: self.str_list(rule, &at, "apiGroups")?,
                    resources: self.str_list(rule, &at, "resources")?,
                    verbs: self.str_list(rule, &at, "verbs")?,
                    resource_names: self.str_list(rule, &at, "resourceNames")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Role {
            name: self.req_str(metadata, "metadata", "name")?,
            namespace: self.opt_str(metadata, "metadata", "namespace")?,
            cluster_scoped: kind == "ClusterRole",
            rules,
        })
    }
}
