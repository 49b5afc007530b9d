//! Host namespace and privilege rules.

use crate::analyzer::scclint::rules::{Rule, RuleInput, RuleOutcome};
use crate::analyzer::scclint::types::Diagnostic;

/// Host namespaces the pod asks for against what the SCC allows.
pub struct HostNamespaces;

impl Rule for HostNamespaces {
    fn code(&self) -> &'static str {
        "host-namespaces"
    }

    fn description(&self) -> &'static str {
        "Fails when the pod requests a host namespace the SCC forbids; warns when the SCC allows any"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let (scc, pod) = (input.scc, input.pod);
        let namespaces = [
            ("hostNetwork", "allowHostNetwork", pod.host_network, scc.allow_host_network),
            ("hostPID", "allowHostPID", pod.host_pid, scc.allow_host_pid),
            ("hostIPC", "allowHostIPC", pod.host_ipc, scc.allow_host_ipc),
        ];

        let denied: Vec<String> = namespaces
            .iter()
            .filter(|(_, _, requested, allowed)| *requested && !*allowed)
            .map(|(pod_field, _, _, _)| format!("{}.{}", pod.spec_path, pod_field))
            .collect();
        if let Some(first) = denied.first() {
            return Ok(Some(
                Diagnostic::fail(
                    first.clone(),
                    format!("pod requests {} but SCC '{}' does not allow it", denied.join(", "), scc.name),
                )
                .with_remediation("Remove the host namespace from the pod spec."),
            ));
        }

        let allowed: Vec<&str> = namespaces
            .iter()
            .filter(|(_, _, _, allowed)| *allowed)
            .map(|(_, scc_field, _, _)| *scc_field)
            .collect();
        if let Some(first) = allowed.first() {
            return Ok(Some(
                Diagnostic::warn(
                    *first,
                    format!("SCC '{}' allows host namespaces: {}", scc.name, allowed.join(", ")),
                )
                .with_remediation("Operators rarely need host namespaces; set these fields to false."),
            ));
        }

        Ok(Some(Diagnostic::info(
            "allowHostNetwork",
            "no host namespaces allowed or requested",
        )))
    }
}

/// Privileged mode and added capabilities must be allowed by the SCC.
pub struct PrivilegedRequest;

impl Rule for PrivilegedRequest {
    fn code(&self) -> &'static str {
        "privileged-request"
    }

    fn description(&self) -> &'static str {
        "Fails when a container requests privileged mode or capabilities the SCC does not allow"
    }

    fn evaluate(&self, input: &RuleInput<'_>) -> RuleOutcome {
        let scc = input.scc;
        let mut violations: Vec<(String, String)> = Vec::new();

        for container in &input.pod.containers {
            if container.privileged && !scc.allow_privileged_container {
                violations.push((
                    format!("{}.securityContext.privileged", container.path),
                    format!("container '{}' requests privileged mode", container.name),
                ));
            }
            for cap in &container.added_capabilities {
                if !scc.allows_capability(cap) {
                    violations.push((
                        format!("{}.securityContext.capabilities.add", container.path),
                        format!("container '{}' adds capability {}", container.name, cap),
                    ));
                }
            }
        }

        match violations.first() {
            None => Ok(Some(Diagnostic::info(
                format!("{}.containers", input.pod.spec_path),
                format!("all container privileges are allowed by SCC '{}'", scc.name),
            ))),
            Some((field, _)) => {
                let messages: Vec<&str> = violations.iter().map(|(_, m)| m.as_str()).collect();
                Ok(Some(
                    Diagnostic::fail(
                        field.clone(),
                        format!("{}; not allowed by SCC '{}'", messages.join("; "), scc.name),
                    )
                    .with_remediation(
                        "Drop the request from the container or grant it in a dedicated SCC bound \
                         only to this ServiceAccount.",
                    ),
                ))
            }
        }
    }
}
