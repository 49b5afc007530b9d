//! # scc-lint
//!
//! A command-line checker for OpenShift SecurityContextConstraints. It
//! evaluates an SCC against the pod it will admit, and optionally the pod's
//! ServiceAccount bindings, with a fixed catalog of least-privilege rules.
//!
//! ## Features
//!
//! - **Rule catalog**: ten ordered rules covering runAsUser, fsGroup,
//!   supplementalGroups, host namespaces, privileges and bindings
//! - **Admission defaults**: reports the UID and GIDs admission would assign
//!   when the pod leaves them unset
//! - **Baseline diff**: field-by-field deltas against `restricted`,
//!   `restricted-v2` or any SCC file
//! - **Batch mode**: many manifest sets evaluated in parallel
//!
//! ## Example
//!
//! ```rust,no_run
//! use scc_lint::analyzer::scclint::{CheckPaths, SccLintConfig, check_files};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let paths = CheckPaths {
//!     scc: "scc.yaml".into(),
//!     pod: "pod.yaml".into(),
//!     ..Default::default()
//! };
//! let report = check_files(&paths, &SccLintConfig::default())?;
//! println!("{}", report.verdict);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod cli;
pub mod error;
pub mod handlers;

// Re-export commonly used types and functions
pub use analyzer::scclint::{Report, SccLintConfig, Verdict, check_files};
pub use error::{Result, SccLintError};
pub use handlers::*;
use cli::{Cli, Commands};
use std::io::IsTerminal;

/// The current version of the CLI tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run the parsed command line and return the process exit code.
pub async fn run(cli: Cli) -> Result<i32> {
    let mut config = SccLintConfig::load(cli.config.as_deref())?;
    if cli.no_fail {
        config.no_fail = true;
    }
    let format = cli.format.unwrap_or_default();
    let color = !cli.no_color && std::io::stdout().is_terminal();

    match cli.command {
        Some(Commands::Batch { sets, jobs }) => handlers::handle_batch(sets, jobs, config, format, color).await,
        Some(Commands::Rules) => handlers::handle_rules(format),
        None => handlers::handle_check(cli.check, &config, format, color),
    }
}
