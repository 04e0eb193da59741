//! `crmchat-auth` entry point

use std::process::ExitCode;

use clap::Parser;
use crmchat_cli::{execute, load_config, AppContext, Cli};
use crmchat_infra::init_tracing;
use tracing::{debug, error};

// Commands run to completion; background refreshes must not race them
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load .env before the configuration reads the environment
    let dotenv = dotenvy::dotenv();

    let config = match load_config(cli.config.clone(), cli.state_dir.clone()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e:#}");
            return ExitCode::from(2);
        }
    };

    init_tracing(&config.logging);
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "Loaded .env"),
        Err(e) => debug!(error = %e, "No .env file loaded"),
    }

    let ctx = match AppContext::new(config) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("fatal: {e:#}");
            eprintln!("error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    let result = execute(&ctx, cli.command).await;
    ctx.shutdown();

    match result {
        Ok(report) => {
            println!("{}", report.render(cli.json));
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
