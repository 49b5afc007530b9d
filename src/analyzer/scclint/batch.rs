//! Batch evaluation of many independent manifest sets.
//!
//! A sets file lists (SCC, Pod, ServiceAccount?, baseline?) tuples:
//!
//! ```yaml
//! sets:
//!   - name: web
//!     scc: scc.yaml
//!     pod: web-pod.yaml
//!     serviceAccount: rbac.yaml
//!     baseline: restricted-v2
//! ```
//!
//! Paths are relative to the sets file. Sets run in parallel on a rayon pool
//! and results come back in input order. Cancellation is best-effort: sets
//! that have not started when the token fires are reported as skipped, sets
//! already running finish.

use crate::analyzer::scclint::config::SccLintConfig;
use crate::analyzer::scclint::lint::{CheckPaths, check_files};
use crate::analyzer::scclint::report::{Report, Verdict};
use crate::error::{Result, SccLintError};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One entry of a sets file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetSpec {
    #[serde(default)]
    pub name: Option<String>,
    pub scc: PathBuf,
    pub pod: PathBuf,
    #[serde(default)]
    pub service_account: Option<PathBuf>,
    #[serde(default)]
    pub baseline: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetsFile {
    sets: Vec<SetSpec>,
}

/// Parse a sets file, resolving paths against its directory.
pub fn load_sets_file(path: &Path) -> Result<Vec<SetSpec>> {
    let content = std::fs::read_to_string(path).map_err(|e| SccLintError::io(path, e))?;
    let file: SetsFile = serde_yaml::from_str(&content).map_err(|e| SccLintError::Batch {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    if file.sets.is_empty() {
        return Err(SccLintError::Batch {
            path: path.to_path_buf(),
            message: "no sets defined".to_string(),
        });
    }

    let base = path.parent().unwrap_or_else(|| Path::new(""));
    Ok(file
        .sets
        .into_iter()
        .map(|set| SetSpec {
            scc: base.join(&set.scc),
            pod: base.join(&set.pod),
            service_account: set.service_account.map(|p| base.join(p)),
            // a built-in name is kept as-is when no such file exists
            baseline: set.baseline.map(|b| {
                let candidate = base.join(&b);
                if candidate.exists() {
                    candidate.display().to_string()
                } else {
                    b
                }
            }),
            name: set.name,
        })
        .collect())
}

/// Shared flag telling workers to stop picking up new sets.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What happened to one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum SetOutcome {
    Evaluated { report: Report },
    /// The set's inputs could not be loaded.
    Error { message: String },
    /// Cancelled before it started.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SetResult {
    pub name: String,
    #[serde(flatten)]
    pub outcome: SetOutcome,
}

/// Results of a batch, in input order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub verdict: Verdict,
    pub cancelled: bool,
    pub sets: Vec<SetResult>,
}

impl BatchReport {
    fn build(sets: Vec<SetResult>, cancelled: bool) -> Self {
        let all_passed = sets.iter().all(|s| match &s.outcome {
            SetOutcome::Evaluated { report } => report.passed(),
            SetOutcome::Error { .. } | SetOutcome::Skipped => false,
        });
        let verdict = if all_passed && !cancelled {
            Verdict::Pass
        } else {
            Verdict::Fail
        };
        Self {
            verdict,
            cancelled,
            sets,
        }
    }

    pub fn has_errors(&self) -> bool {
        self.sets
            .iter()
            .any(|s| matches!(s.outcome, SetOutcome::Error { .. }))
    }

    /// 2 if any set had an input error, 1 if cancelled or any set failed,
    /// otherwise 0. `no_fail` only relaxes failing verdicts.
    pub fn exit_code(&self, no_fail: bool) -> i32 {
        if self.has_errors() {
            2
        } else if self.cancelled {
            1
        } else {
            self.verdict.exit_code(no_fail)
        }
    }
}

fn set_name(index: usize, set: &SetSpec) -> String {
    set.name.clone().unwrap_or_else(|| format!("set-{}", index + 1))
}

/// Evaluate `sets` on a pool of `jobs` threads (rayon's default when `None`).
pub fn run_batch(
    sets: &[SetSpec],
    config: &SccLintConfig,
    jobs: Option<usize>,
    token: &CancellationToken,
) -> Result<BatchReport> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder
        .build()
        .map_err(|e| SccLintError::Internal(format!("cannot start worker pool: {}", e)))?;
    info!("evaluating {} sets on {} threads", sets.len(), pool.current_num_threads());

    let results: Vec<SetResult> = pool.install(|| {
        sets.par_iter()
            .enumerate()
            .map(|(index, set)| {
                let name = set_name(index, set);
                if token.is_cancelled() {
                    debug!("skipping set {} after cancellation", name);
                    return SetResult {
                        name,
                        outcome: SetOutcome::Skipped,
                    };
                }
                let paths = CheckPaths {
                    scc: set.scc.clone(),
                    pod: set.pod.clone(),
                    service_account: set.service_account.clone(),
                    baseline: set.baseline.clone(),
                };
                let outcome = match check_files(&paths, config) {
                    Ok(report) => SetOutcome::Evaluated { report },
                    Err(e) => {
                        warn!("set {}: {}", name, e);
                        SetOutcome::Error {
                            message: e.to_string(),
                        }
                    }
                };
                SetResult { name, outcome }
            })
            .collect()
    });

    // an interrupt after the last set started still counts
    let cancelled = token.is_cancelled() || results.iter().any(|r| r.outcome == SetOutcome::Skipped);
    Ok(BatchReport::build(results, cancelled))
}
