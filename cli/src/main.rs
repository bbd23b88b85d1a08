//! CLI entrypoint for conductor
//!
//! Loads configuration, wires the layers together and dispatches to the
//! selected command.

mod app;
mod commands;
mod logging;
mod output;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use commands::{Cli, Command};
use conductor_infrastructure::ConfigLoader;
use serde::Serialize;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    app::apply_overrides(&mut config, &cli);

    let _log_guard = logging::init(cli.verbose, &config.logging);
    info!("Starting conductor");

    app::check_issues(&config.validate())?;

    if let Command::Config = cli.command {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        println!();
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(ExitCode::SUCCESS);
    }

    let cancellation = CancellationToken::new();
    let token = cancellation.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping agents");
            token.cancel();
        }
    });

    let app = App::build(config, cli.script.as_ref(), cancellation)?;

    let success = match cli.command {
        Command::Run { task, role } => {
            let result = app.run_agent(&task, &role).await?;
            emit(cli.json, &result, || output::format_agent_result(&result))?;
            result.success
        }
        Command::Plan { task, no_enforce } => {
            let plan = app.plan(&task, !no_enforce).await?;
            emit(true, &plan, || output::format_plan(&plan))?;
            true
        }
        Command::Workflow {
            task,
            max_concurrency,
            skip_enforcement,
        } => {
            let result = app.workflow(&task, max_concurrency, skip_enforcement).await?;
            emit(cli.json, &result, || output::format_workflow_result(&result))?;
            result.success
        }
        Command::Config => true,
    };

    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}
