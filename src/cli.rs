use crate::analyzer::scclint::formatter::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "scc-lint")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check OpenShift SecurityContextConstraints against the pods they admit")]
#[command(long_about = "Evaluates a SecurityContextConstraints manifest against a Pod (or workload) \
manifest and, optionally, the ServiceAccounts, Roles and RoleBindings that grant it, using a fixed catalog \
of least-privilege rules. Exits 0 on pass, 1 on fail and 2 on input errors.")]
#[command(args_conflicts_with_subcommands = true, subcommand_negates_reqs = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub check: CheckArgs,

    /// Path to configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Exit 0 even when the verdict is fail
    #[arg(long, global = true)]
    pub no_fail: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable verbose logging (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Inputs for a single check.
#[derive(Args, Debug, Clone, Default)]
pub struct CheckArgs {
    /// SecurityContextConstraints manifest
    #[arg(long, value_name = "FILE", required = true)]
    pub scc: Option<PathBuf>,

    /// Pod or pod-template workload manifest
    #[arg(long, value_name = "FILE", required = true)]
    pub pod: Option<PathBuf>,

    /// ServiceAccount, Role and RoleBinding manifests
    #[arg(long, value_name = "FILE")]
    pub service_account: Option<PathBuf>,

    /// Baseline SCC file, or a built-in name (restricted, restricted-v2)
    #[arg(long, value_name = "FILE|NAME")]
    pub baseline: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate many manifest sets in parallel
    Batch {
        /// YAML file listing the sets to evaluate
        #[arg(value_name = "SETS_FILE")]
        sets: PathBuf,

        /// Number of worker threads
        #[arg(short, long)]
        jobs: Option<usize>,
    },

    /// List the rule catalog
    Rules,
}

impl Cli {
    pub fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let level = match self.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        };

        env_logger::Builder::from_default_env()
            .filter_level(level)
            .init();
    }
}
