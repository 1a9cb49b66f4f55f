//! obwizard - Entry Point
//!
//! Drives the OceanBase installer service through a deployment plan without
//! the web console.

use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context};
use colored::Colorize;
use tracing::{error, info};

use obwizard::app::options::AppOptions;
use obwizard::app::run::run;
use obwizard::filesys::file::File;
use obwizard::flow::fsm::{Phase, TaskOutcome, WizardState};
use obwizard::logs::{init_logging, LogLevel, LogOptions};
use obwizard::models::deployment::DeploymentPlan;
use obwizard::storage::layout::StorageLayout;
use obwizard::storage::settings::Settings;
use obwizard::utils::version_info;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse command line arguments
    let mut cli_args: HashMap<String, String> = HashMap::new();
    for arg in env::args().skip(1) {
        if let Some((key, value)) = arg.split_once('=') {
            cli_args.insert(key.trim_start_matches('-').to_string(), value.to_string());
        } else if arg.starts_with("--") {
            cli_args.insert(arg.trim_start_matches('-').to_string(), "true".to_string());
        }
    }

    if cli_args.contains_key("version") {
        match serde_json::to_string_pretty(&version_info()) {
            Ok(version) => println!("{}", version),
            Err(e) => eprintln!("{}", e),
        }
        return ExitCode::SUCCESS;
    }

    match run_wizard(&cli_args).await {
        Ok(state) => report(&state),
        Err(e) => {
            error!("{:#}", e);
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run_wizard(cli_args: &HashMap<String, String>) -> anyhow::Result<WizardState> {
    let layout = match cli_args.get("base-dir") {
        Some(dir) => StorageLayout::new(dir),
        None => StorageLayout::default(),
    };

    let settings_file = match cli_args.get("settings") {
        Some(path) => File::new(path),
        None => layout.settings_file(),
    };
    let mut settings = settings_file
        .read_json_opt::<Settings>()
        .await
        .context("unable to read the settings file")?
        .unwrap_or_default();
    if let Some(level) = cli_args.get("log-level") {
        settings.log_level = level.parse::<LogLevel>().map_err(anyhow::Error::msg)?;
    }

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_logging(LogOptions {
        log_level: settings.log_level.clone(),
        log_dir: Some(layout.logs_dir().path().to_path_buf()),
        ..Default::default()
    })
    .context("failed to initialize logging")?;

    let options = AppOptions::from_settings(layout, &settings).with_cli_args(cli_args)?;
    let Some(plan_file) = options.plan_file.clone() else {
        bail!("no deployment plan given, pass --plan=<file>");
    };
    let plan = read_plan(plan_file).await?;

    info!(
        "Running obwizard {} against {}",
        version_info().version,
        options.backend.base_url
    );
    let state = run(options, plan, await_shutdown_signal()).await?;
    Ok(state)
}

async fn read_plan(path: PathBuf) -> anyhow::Result<DeploymentPlan> {
    File::new(&path)
        .read_json::<DeploymentPlan>()
        .await
        .with_context(|| format!("invalid deployment plan {}", path.display()))
}

fn report(state: &WizardState) -> ExitCode {
    match state.phase {
        Phase::Finished(TaskOutcome::Succeeded) => {
            println!("{} {} finished", "✔".green(), state.flow.as_str().bold());
            ExitCode::SUCCESS
        }
        Phase::Finished(TaskOutcome::Failed) => {
            println!("{} {} failed", "✘".red(), state.flow);
            ExitCode::FAILURE
        }
        Phase::ServiceStopped => {
            println!("{} installer service stopped", "!".yellow());
            ExitCode::FAILURE
        }
        Phase::InProgress => {
            println!(
                "{} {} paused at step {}, run again to continue",
                "…".yellow(),
                state.flow,
                state.step
            );
            ExitCode::SUCCESS
        }
    }
}

async fn await_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
            let _ = tokio::signal::ctrl_c().await;
            return;
        };

        tokio::select! {
            _ = sigterm.recv() => {
                info!("SIGTERM received, shutting down...");
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("Ctrl+C received, shutting down...");
    }
}
