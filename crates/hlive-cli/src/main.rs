use std::{process, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use hlive_core::{Orchestrator, run_once, wait_for_shutdown_signal};
use hlive_engine::{ContainerSupervisor, DockerEngine, SupervisorConfig};
use hlive_model::HostOs;
use hlive_observe::{LoggerConfig, logger_init};

mod cli;
mod config;

use cli::{Cli, Command};
use config::AppConfig;

// Exits from inside the runtime: a blocking stdin read cannot be cancelled
// and would otherwise hold up runtime shutdown until the next keypress.
#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("hlive: {e:#}");
            1
        }
    };
    process::exit(i32::from(code));
}

async fn run(cli: Cli) -> Result<u8> {
    let cfg = AppConfig::from_env().context("reading configuration")?;
    let log = LoggerConfig::from_parts(cfg.log_format.as_deref(), cfg.log_level.as_deref())?;
    logger_init(&log)?;

    let os = HostOs::detect();
    let engine = DockerEngine::connect().context("connecting to the container engine")?;
    let supervisor = ContainerSupervisor::new(Arc::new(engine)).with_config(SupervisorConfig {
        stop_grace: cfg.stop_grace,
    });

    match cli.into_command() {
        Command::Server => {
            let spec = cfg.server_spec(os);
            info!(
                target: "hlive",
                image = %spec.image,
                root = %cfg.watch_dir.display(),
                port = cfg.host_port,
                "starting live preview"
            );
            Orchestrator::new(supervisor, spec, &cfg.watch_dir)
                .with_window(cfg.debounce)
                .serve(wait_for_shutdown_signal())
                .await?;
            Ok(0)
        }
        Command::Build { args } => {
            let spec = cfg.build_spec(args, os);
            let status = run_once(&supervisor, &spec, wait_for_shutdown_signal()).await?;
            Ok(exit_status(status))
        }
    }
}

/// Map a container exit status onto a process exit code.
fn exit_status(status: i64) -> u8 {
    match status {
        0 => 0,
        s => s.clamp(1, 255) as u8,
    }
}
