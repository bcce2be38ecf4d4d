use clap::Parser;
use live_tally::cli::{Cli, Role};
use live_tally::commands;
use live_tally::config::Config;
use live_tally::server;
use log::{error, info};
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let role = cli.role();
    info!("Starting live-tally as {}", role.as_str());

    let result = match role {
        Role::Serve => server::serve(&config).await,
        Role::Participant => commands::participant::run(&config).await,
        Role::Admin => commands::admin::run(&config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(why) => {
            error!("{} exited with error: {}", role.as_str(), why);
            ExitCode::FAILURE
        }
    }
}
