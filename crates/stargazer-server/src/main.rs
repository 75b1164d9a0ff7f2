use std::process::ExitCode;

use clap::{CommandFactory, Parser};

use stargazer_server::cli::Cli;
use stargazer_server::config::StargazerConfig;
use stargazer_server::error::ServerError;
use stargazer_server::logging;

fn usage_error(err: &ServerError) -> ExitCode {
    eprintln!("github-stargazer: {err}\n");
    let _ = Cli::command().print_help();
    ExitCode::FAILURE
}

#[tokio::main]
async fn main() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let mut config = match StargazerConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Unable to load configuration");
            return ExitCode::FAILURE;
        },
    };
    config.apply_env();
    config.apply_cli(&cli);

    let plan = match config.validate() {
        Ok(plan) => plan,
        Err(e) => return usage_error(&e),
    };

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "github-stargazer starting");

    match stargazer_server::run(config, plan).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) if e.is_usage() => usage_error(&e),
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            ExitCode::FAILURE
        },
    }
}
