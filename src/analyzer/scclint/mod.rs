//! SCC-Lint: least-privilege checks for OpenShift SecurityContextConstraints.
//!
//! Evaluates a candidate SCC against the pod it will admit (and optionally the
//! pod's ServiceAccount bindings) using a fixed, ordered rule catalog, and
//! diffs it against a baseline SCC (`restricted` unless told otherwise).
//!
//! # Example
//!
//! ```rust,no_run
//! use scc_lint::analyzer::scclint::{CheckPaths, SccLintConfig, check_files};
//!
//! let paths = CheckPaths {
//!     scc: "deploy/scc.yaml".into(),
//!     pod: "deploy/pod.yaml".into(),
//!     ..Default::default()
//! };
//! let report = check_files(&paths, &SccLintConfig::default())?;
//! for result in &report.results {
//!     println!("{} [{}] {}", result.rule, result.severity, result.message);
//! }
//! # Ok::<(), scc_lint::error::SccLintError>(())
//! ```
//!
//! # Rules
//!
//! ## runAsUser
//! - `no-run-as-any`
//! - `must-run-as-range-bounds`
//! - `pod-uid-in-range`
//!
//! ## Groups
//! - `fsgroup-ranges-nonempty`
//! - `fsgroup-in-range`
//! - `supplemental-groups-default`
//!
//! ## Posture
//! - `prefer-restricted-baseline`
//! - `service-account-binding`
//! - `host-namespaces`
//! - `privileged-request`

pub mod batch;
pub mod binding;
pub mod config;
pub mod diff;
pub mod formatter;
pub mod lint;
pub mod model;
pub mod parser;
pub mod report;
pub mod rules;
pub mod types;

pub use batch::{BatchReport, CancellationToken, SetOutcome, SetSpec, load_sets_file, run_batch};
pub use config::SccLintConfig;
pub use diff::{Direction, FieldDelta, builtin_baseline, diff, restricted_baseline, restricted_v2_baseline};
pub use formatter::{OutputFormat, format_batch, format_report};
pub use lint::{CheckPaths, check, check_files, resolve_baseline};
pub use report::{Report, SeverityCounts, Verdict};
pub use rules::{Rule, RuleEvaluationError, catalog, get_rule};
pub use types::{Diagnostic, RuleCode, RuleResult, Severity};
