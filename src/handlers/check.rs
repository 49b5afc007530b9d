use crate::{
    analyzer::scclint::{CheckPaths, OutputFormat, SccLintConfig, check_files, format_report},
    cli::CheckArgs,
    error::SccLintError,
};

pub fn handle_check(
    args: CheckArgs,
    config: &SccLintConfig,
    format: OutputFormat,
    color: bool,
) -> crate::Result<i32> {
    let (Some(scc), Some(pod)) = (args.scc, args.pod) else {
        return Err(SccLintError::Usage("both --scc and --pod are required".to_string()));
    };
    let paths = CheckPaths {
        scc,
        pod,
        service_account: args.service_account,
        baseline: args.baseline,
    };

    let report = check_files(&paths, config)?;
    print!("{}", format_report(&report, format, color));
    Ok(report.exit_code(config.no_fail))
}
