use clap::Parser;
use scc_lint::cli::Cli;
use std::process;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    match scc_lint::run(cli).await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}
