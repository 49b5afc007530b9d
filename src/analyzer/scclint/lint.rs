//! Main checking orchestration for scc-lint.
//!
//! This module ties together loading, binding resolution, the rule catalog
//! and the baseline diff to produce a [`Report`].

use crate::analyzer::scclint::binding;
use crate::analyzer::scclint::config::SccLintConfig;
use crate::analyzer::scclint::diff::{builtin_baseline, diff, restricted_baseline};
use crate::analyzer::scclint::model::{Pod, SecurityContextConstraints, ServiceAccount};
use crate::analyzer::scclint::parser::{load_pod_file, load_scc_file, load_service_account_file};
use crate::analyzer::scclint::report::Report;
use crate::analyzer::scclint::rules::{AccountLookup, RuleInput, catalog};
use crate::analyzer::scclint::types::{Diagnostic, RuleResult};
use crate::error::Result;

use log::{debug, info};
use std::path::{Path, PathBuf};

/// Input files for one check.
#[derive(Debug, Clone, Default)]
pub struct CheckPaths {
    pub scc: PathBuf,
    pub pod: PathBuf,
    pub service_account: Option<PathBuf>,
    /// A baseline file path or a built-in baseline name.
    pub baseline: Option<String>,
}

/// Run every non-excluded rule in catalog order.
///
/// A rule that cannot evaluate is reported as a `fail` finding and the
/// remaining rules still run.
pub fn run_rules(input: &RuleInput<'_>, config: &SccLintConfig) -> Vec<RuleResult> {
    let mut results = Vec::new();
    for rule in catalog() {
        if config.is_rule_excluded(rule.code()) {
            debug!("skipping excluded rule {}", rule.code());
            continue;
        }
        match rule.evaluate(input) {
            Ok(Some(diag)) => results.push(RuleResult::from_diagnostic(rule.code(), diag)),
            Ok(None) => debug!("rule {} not applicable", rule.code()),
            Err(err) => {
                debug!("rule {} could not evaluate: {}", rule.code(), err.message);
                let diag = Diagnostic::fail(err.field_path.clone(), err.to_string());
                results.push(RuleResult::from_diagnostic(rule.code(), diag));
            }
        }
    }
    results
}

/// Check one SCC against one pod.
///
/// `service_accounts` is `None` when no service account input was given;
/// otherwise it must already have bound SCCs resolved.
pub fn check(
    scc: &SecurityContextConstraints,
    pod: &Pod,
    service_accounts: Option<&[ServiceAccount]>,
    baseline: &SecurityContextConstraints,
    config: &SccLintConfig,
) -> Report {
    let service_account = match service_accounts {
        None => AccountLookup::NotProvided,
        Some(accounts) => match binding::find_for_pod(accounts, pod) {
            Some(sa) => AccountLookup::Found(sa),
            None => AccountLookup::Missing,
        },
    };
    let input = RuleInput {
        scc,
        pod,
        service_account,
        baseline,
    };

    let results = run_rules(&input, config);
    let deltas = diff(baseline, scc);
    let report = Report::build(
        scc.name.clone(),
        format!("{}/{}", pod.kind, pod.name),
        baseline.name.clone(),
        results,
        deltas,
    );
    info!(
        "checked SCC {} against {}: {} ({} fail, {} warn, {} info)",
        report.scc, report.pod, report.verdict, report.summary.fail, report.summary.warn, report.summary.info
    );
    report
}

/// Resolve a baseline reference.
///
/// An existing file wins; otherwise a built-in name (`restricted`,
/// `restricted-v2`) is accepted. Anything else is loaded as a path so the
/// error names the missing file.
pub fn resolve_baseline(reference: Option<&str>, base_dir: Option<&Path>) -> Result<SecurityContextConstraints> {
    let Some(reference) = reference else {
        return Ok(restricted_baseline());
    };
    let path = match base_dir {
        Some(dir) => dir.join(reference),
        None => PathBuf::from(reference),
    };
    if !path.exists() {
        if let Some(builtin) = builtin_baseline(reference) {
            debug!("using built-in baseline {}", reference);
            return Ok(builtin);
        }
    }
    load_scc_file(&path)
}

/// Load the files named in `paths` and check them.
pub fn check_files(paths: &CheckPaths, config: &SccLintConfig) -> Result<Report> {
    let scc = load_scc_file(&paths.scc)?;
    let pod = load_pod_file(&paths.pod)?;
    let baseline_ref = paths.baseline.as_deref().or(config.baseline.as_deref());
    let baseline = resolve_baseline(baseline_ref, None)?;

    let accounts = match &paths.service_account {
        Some(path) => {
            let rbac = load_service_account_file(path)?;
            Some(binding::resolve(&rbac, &[&scc]))
        }
        None => None,
    };

    Ok(check(&scc, &pod, accounts.as_deref(), &baseline, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::scclint::model::{GroupStrategy, IdRange, RunAsUserStrategy};
    use crate::analyzer::scclint::report::Verdict;
    use crate::analyzer::scclint::rules::test_support::{pod, scc};
    use crate::analyzer::scclint::types::Severity;

    fn codes(report: &Report) -> Vec<&str> {
        report.results.iter().map(|r| r.rule.as_str()).collect()
    }

    #[test]
    fn test_results_follow_catalog_order() {
        let report = check(&scc(), &pod(), None, &restricted_baseline(), &SccLintConfig::default());
        let order: Vec<&str> = catalog().iter().map(|r| r.code()).collect();
        let mut positions = codes(&report)
            .into_iter()
            .map(|c| order.iter().position(|o| *o == c).unwrap());
        let mut last = positions.next().unwrap();
        for pos in positions {
            assert!(pos > last);
            last = pos;
        }
        // no service account input, so that rule does not apply
        assert!(!codes(&report).contains(&"service-account-binding"));
        assert_eq!(report.verdict, Verdict::Pass);
    }

    #[test]
    fn test_check_is_deterministic() {
        let mut s = scc();
        s.run_as_user = RunAsUserStrategy::RunAsAny;
        s.allow_privileged_container = true;
        let a = check(&s, &pod(), None, &restricted_baseline(), &SccLintConfig::default());
        let b = check(&s, &pod(), None, &restricted_baseline(), &SccLintConfig::default());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.verdict, Verdict::Fail);
    }

    #[test]
    fn test_evaluation_error_becomes_finding() {
        let mut s = scc();
        s.fs_group = GroupStrategy::MustRunAs {
            ranges: vec![IdRange::new(6000, 5000)],
        };
        let report = check(&s, &pod(), None, &restricted_baseline(), &SccLintConfig::default());
        let finding = report
            .results
            .iter()
            .find(|r| r.rule.as_str() == "fsgroup-in-range")
            .unwrap();
        assert_eq!(finding.severity, Severity::Fail);
        assert_eq!(finding.field_path, "fsGroup.ranges[0]");
        assert!(finding.message.starts_with("cannot evaluate"));
        // later rules still ran
        assert!(codes(&report).contains(&"privileged-request"));
    }

    #[test]
    fn test_excluded_rules_are_skipped() {
        let config = SccLintConfig::new().exclude("host-namespaces");
        let report = check(&scc(), &pod(), None, &restricted_baseline(), &config);
        assert!(!codes(&report).contains(&"host-namespaces"));
    }

    #[test]
    fn test_missing_service_account() {
        let report = check(&scc(), &pod(), Some(&[]), &restricted_baseline(), &SccLintConfig::default());
        let finding = report
            .results
            .iter()
            .find(|r| r.rule.as_str() == "service-account-binding")
            .unwrap();
        assert_eq!(finding.severity, Severity::Fail);
        assert_eq!(report.verdict, Verdict::Fail);
    }

    #[test]
    fn test_resolve_baseline() {
        assert_eq!(resolve_baseline(None, None).unwrap().name, "restricted");
        assert_eq!(
            resolve_baseline(Some("restricted-v2"), None).unwrap().name,
            "restricted-v2"
        );
        let err = resolve_baseline(Some("no-such-baseline.yaml"), None).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_resolve_baseline_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let scc_yaml = "kind: SecurityContextConstraints\nmetadata: {name: team}\nrunAsUser: {type: MustRunAsNonRoot}\nfsGroup: {type: RunAsAny}\nsupplementalGroups: {type: RunAsAny}\n";
        std::fs::write(dir.path().join("team.yaml"), scc_yaml).unwrap();
        // a file named like a built-in wins over the built-in
        std::fs::write(dir.path().join("restricted"), scc_yaml).unwrap();

        let baseline = resolve_baseline(Some("team.yaml"), Some(dir.path())).unwrap();
        assert_eq!(baseline.name, "team");
        assert_eq!(baseline.run_as_user, RunAsUserStrategy::MustRunAsNonRoot);
        assert_eq!(resolve_baseline(Some("restricted"), Some(dir.path())).unwrap().name, "team");
    }

    #[test]
    fn test_check_files() {
        let dir = tempfile::tempdir().unwrap();
        let scc_path = dir.path().join("scc.yaml");
        let pod_path = dir.path().join("pod.yaml");
        std::fs::write(
            &scc_path,
            r#"
kind: SecurityContextConstraints
metadata:
  name: operator-scc
runAsUser:
  type: MustRunAsRange
  uidRangeMin: 1000
  uidRangeMax: 2000
fsGroup:
  type: MustRunAs
  ranges:
    - min: 5000
      max: 6000
supplementalGroups:
  type: RunAsAny
"#,
        )
        .unwrap();
        std::fs::write(
            &pod_path,
            r#"
apiVersion: v1
kind: Pod
metadata:
  name: web
spec:
  securityContext:
    runAsUser: 2001
  containers:
    - name: app
      image: app:latest
"#,
        )
        .unwrap();

        let paths = CheckPaths {
            scc: scc_path,
            pod: pod_path,
            ..Default::default()
        };
        let report = check_files(&paths, &SccLintConfig::default()).unwrap();
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.pod, "Pod/web");
        let uid = report
            .results
            .iter()
            .find(|r| r.rule.as_str() == "pod-uid-in-range")
            .unwrap();
        assert_eq!(uid.field_path, "spec.securityContext.runAsUser");
    }
}
