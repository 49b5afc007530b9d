use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// End-to-end tests for the scc-lint binary.
/// Every command runs in an empty directory with HOME pointed at it so no
/// stray `.scc-lint.yaml` is picked up.

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/scclint")
        .join(name)
}

fn scc_lint(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("scc-lint").unwrap();
    cmd.current_dir(workdir.path())
        .env("HOME", workdir.path())
        .env_remove("RUST_LOG");
    cmd
}

fn json_output(cmd: &mut Command) -> (i32, serde_json::Value) {
    let output = cmd.output().unwrap();
    let code = output.status.code().unwrap();
    let value = serde_json::from_slice(&output.stdout).unwrap();
    (code, value)
}

#[test]
fn test_passing_check_exits_zero() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("operator-scc.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("pod-uid-in-range"))
        .stdout(predicate::str::contains("PASS"));
}

#[test]
fn test_uid_outside_range_fails_with_field_path() {
    let dir = TempDir::new().unwrap();
    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(fixture("operator-scc.yaml"))
            .arg("--pod")
            .arg(fixture("pod-bad-uid.yaml"))
            .args(["--format", "json"]),
    );
    assert_eq!(code, 1);
    assert_eq!(report["verdict"], "fail");
    assert_eq!(report["scc"], "operator-scc");
    assert_eq!(report["pod"], "Pod/operator");

    let results = report["results"].as_array().unwrap();
    let uid = results
        .iter()
        .find(|r| r["rule"] == "pod-uid-in-range")
        .unwrap();
    assert_eq!(uid["severity"], "fail");
    assert_eq!(uid["fieldPath"], "spec.securityContext.runAsUser");

    // derived admission defaults are still reported
    let fs_group = results
        .iter()
        .find(|r| r["rule"] == "fsgroup-in-range")
        .unwrap();
    assert_eq!(fs_group["severity"], "info");
    assert_eq!(fs_group["effectiveValue"], 5000);
}

#[test]
fn test_no_fail_keeps_exit_zero() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("operator-scc.yaml"))
        .arg("--pod")
        .arg(fixture("pod-bad-uid.yaml"))
        .arg("--no-fail")
        .assert()
        .success()
        .stdout(predicate::str::contains("FAIL"));
}

#[test]
fn test_workload_template_is_checked() {
    let dir = TempDir::new().unwrap();
    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(fixture("operator-scc.yaml"))
            .arg("--pod")
            .arg(fixture("deployment.yaml"))
            .args(["--format", "json"]),
    );
    assert_eq!(code, 1);
    assert_eq!(report["pod"], "Deployment/operator");
    let uid = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["rule"] == "pod-uid-in-range")
        .unwrap();
    assert_eq!(uid["fieldPath"], "spec.template.spec.securityContext.runAsUser");
}

#[test]
fn test_permissive_scc_reports_deltas() {
    let dir = TempDir::new().unwrap();
    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(fixture("permissive-scc.yaml"))
            .arg("--pod")
            .arg(fixture("pod-ok.yaml"))
            .args(["--format", "json"]),
    );
    assert_eq!(code, 1);
    let rules: Vec<&str> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["rule"].as_str().unwrap())
        .collect();
    assert_eq!(rules.first(), Some(&"no-run-as-any"));

    let deltas = report["deltas"].as_array().unwrap();
    let privileged = deltas
        .iter()
        .find(|d| d["path"] == "allowPrivilegedContainer")
        .unwrap();
    assert_eq!(privileged["direction"], "loosened");
    assert_eq!(privileged["baselineValue"], "false");
    assert_eq!(privileged["candidateValue"], "true");
}

#[test]
fn test_service_account_binding() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("operator-scc.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .arg("--service-account")
        .arg(fixture("rbac.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("service-account-binding"));

    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("operator-scc.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .arg("--service-account")
        .arg(fixture("rbac-unbound.yaml"))
        .assert()
        .code(1)
        .stdout(predicate::str::contains("not bound to SCC 'operator-scc'"));
}

#[test]
fn test_service_account_bound_through_custom_role() {
    let dir = TempDir::new().unwrap();
    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(fixture("operator-scc.yaml"))
            .arg("--pod")
            .arg(fixture("pod-ok.yaml"))
            .arg("--service-account")
            .arg(fixture("rbac-role.yaml"))
            .args(["--format", "json"]),
    );
    assert_eq!(code, 0);
    let binding = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["rule"] == "service-account-binding")
        .unwrap();
    assert_eq!(binding["severity"], "info");
}

#[test]
fn test_service_account_bound_through_authenticated_group() {
    let dir = TempDir::new().unwrap();
    let scc = dir.path().join("scc.yaml");
    let mut content = fs::read_to_string(fixture("operator-scc.yaml")).unwrap();
    content.push_str("groups:\n  - system:authenticated\n");
    fs::write(&scc, content).unwrap();

    scc_lint(&dir)
        .arg("--scc")
        .arg(&scc)
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .arg("--service-account")
        .arg(fixture("rbac-unbound.yaml"))
        .assert()
        .success()
        .stdout(predicate::str::contains("may use SCC 'operator-scc'"));
}

#[test]
fn test_baseline_file() {
    let dir = TempDir::new().unwrap();
    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(fixture("operator-scc.yaml"))
            .arg("--pod")
            .arg(fixture("pod-ok.yaml"))
            .arg("--baseline")
            .arg(fixture("team-baseline.yaml"))
            .args(["--format", "json"]),
    );
    assert_eq!(code, 0);
    assert_eq!(report["baseline"], "team-baseline");

    // only the extra projected volume differs
    let deltas = report["deltas"].as_array().unwrap();
    assert_eq!(deltas.len(), 1);
    assert_eq!(deltas[0]["path"], "volumes");
    assert_eq!(deltas[0]["direction"], "loosened");
    assert_eq!(deltas[0]["baselineValue"], "[configMap, emptyDir, secret]");
    assert_eq!(deltas[0]["candidateValue"], "[configMap, emptyDir, projected, secret]");

    let warn = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["rule"] == "prefer-restricted-baseline")
        .unwrap();
    assert_eq!(warn["severity"], "warn");
}

#[test]
fn test_scc_without_volumes_is_loosened() {
    let dir = TempDir::new().unwrap();
    let scc = dir.path().join("scc.yaml");
    let content = fs::read_to_string(fixture("operator-scc.yaml")).unwrap();
    let without_volumes = &content[..content.find("volumes:").unwrap()];
    fs::write(&scc, without_volumes).unwrap();

    let (_, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(&scc)
            .arg("--pod")
            .arg(fixture("pod-ok.yaml"))
            .args(["--format", "json"]),
    );
    let volumes = report["deltas"]
        .as_array()
        .unwrap()
        .iter()
        .find(|d| d["path"] == "volumes")
        .unwrap();
    assert_eq!(volumes["direction"], "loosened");
    assert!(!volumes["candidateValue"].as_str().unwrap().contains("hostPath"));
}

#[test]
fn test_malformed_input_exits_two() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("malformed.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("malformed.yaml"))
        .stderr(predicate::str::contains("malformed document"));
}

#[test]
fn test_schema_error_names_field() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("scc-missing-type.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("runAsUser.type"));
}

#[test]
fn test_wrong_kind_exits_two() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("pod-ok.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unsupported kind"));
}

#[test]
fn test_missing_pod_argument_is_usage_error() {
    let dir = TempDir::new().unwrap();
    scc_lint(&dir)
        .arg("--scc")
        .arg(fixture("operator-scc.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--pod"));
}

#[test]
fn test_config_excludes_rules() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".scc-lint.yaml"),
        "exclude:\n  - pod-uid-in-range\n",
    )
    .unwrap();
    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("--scc")
            .arg(fixture("operator-scc.yaml"))
            .arg("--pod")
            .arg(fixture("pod-bad-uid.yaml"))
            .args(["--format", "json"]),
    );
    assert_eq!(code, 0);
    assert!(
        report["results"]
            .as_array()
            .unwrap()
            .iter()
            .all(|r| r["rule"] != "pod-uid-in-range")
    );
}

#[test]
fn test_invalid_config_exits_two() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("bad.yaml");
    fs::write(&config, "noFail: [1, 2]\n").unwrap();
    scc_lint(&dir)
        .arg("--config")
        .arg(&config)
        .arg("--scc")
        .arg(fixture("operator-scc.yaml"))
        .arg("--pod")
        .arg(fixture("pod-ok.yaml"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid configuration"));
}

#[test]
fn test_rules_lists_catalog_in_order() {
    let dir = TempDir::new().unwrap();
    let output = scc_lint(&dir).arg("rules").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let first = stdout.find("no-run-as-any").unwrap();
    let last = stdout.find("privileged-request").unwrap();
    assert!(first < last);
}

#[test]
fn test_batch_preserves_order_and_exit_code() {
    let dir = TempDir::new().unwrap();
    let sets = dir.path().join("sets.yaml");
    fs::write(
        &sets,
        format!(
            "sets:\n  - name: ok\n    scc: {scc}\n    pod: {ok}\n  - name: bad\n    scc: {scc}\n    pod: {bad}\n  - name: ok-again\n    scc: {scc}\n    pod: {ok}\n",
            scc = fixture("operator-scc.yaml").display(),
            ok = fixture("pod-ok.yaml").display(),
            bad = fixture("pod-bad-uid.yaml").display(),
        ),
    )
    .unwrap();

    let (code, report) = json_output(
        scc_lint(&dir)
            .arg("batch")
            .arg(&sets)
            .args(["--jobs", "2", "--format", "json"]),
    );
    assert_eq!(code, 1);
    assert_eq!(report["verdict"], "fail");
    assert_eq!(report["cancelled"], false);
    let names: Vec<&str> = report["sets"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["ok", "bad", "ok-again"]);
    assert_eq!(report["sets"][0]["status"], "evaluated");
    assert_eq!(report["sets"][1]["report"]["verdict"], "fail");
}

#[test]
fn test_batch_input_error_exits_two() {
    let dir = TempDir::new().unwrap();
    let sets = dir.path().join("sets.yaml");
    fs::write(
        &sets,
        format!(
            "sets:\n  - scc: missing.yaml\n    pod: {ok}\n  - scc: {scc}\n    pod: {ok}\n",
            scc = fixture("operator-scc.yaml").display(),
            ok = fixture("pod-ok.yaml").display(),
        ),
    )
    .unwrap();

    let (code, report) = json_output(scc_lint(&dir).arg("batch").arg(&sets).args(["--format", "json"]));
    assert_eq!(code, 2);
    assert_eq!(report["sets"][0]["status"], "error");
    assert_eq!(report["sets"][1]["status"], "evaluated");
}
