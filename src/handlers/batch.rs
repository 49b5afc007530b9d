use crate::{
    analyzer::scclint::{CancellationToken, OutputFormat, SccLintConfig, format_batch, load_sets_file, run_batch},
    error::SccLintError,
};
use log::warn;
use std::path::PathBuf;

pub async fn handle_batch(
    sets_path: PathBuf,
    jobs: Option<usize>,
    config: SccLintConfig,
    format: OutputFormat,
    color: bool,
) -> crate::Result<i32> {
    let jobs = jobs.or(config.jobs);
    if jobs == Some(0) {
        return Err(SccLintError::Usage("--jobs must be at least 1".to_string()));
    }
    let sets = load_sets_file(&sets_path)?;

    let token = CancellationToken::new();
    let signal_token = token.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing in-flight sets");
            signal_token.cancel();
        }
    });

    let no_fail = config.no_fail;
    let result = tokio::task::spawn_blocking(move || run_batch(&sets, &config, jobs, &token)).await;
    watcher.abort();

    let report = result.map_err(|e| SccLintError::Internal(format!("batch task failed: {}", e)))??;
    print!("{}", format_batch(&report, format, color));
    Ok(report.exit_code(no_fail))
}
