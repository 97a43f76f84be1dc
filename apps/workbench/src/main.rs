use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use plugkit::runtime::{run, RunOptions, ShutdownOptions};
use plugkit_bootstrap::{AppConfig, AppConfigProvider, CliArgs};

mod registered_plugins;

/// Workbench - extensible development workbench
#[derive(Parser)]
#[command(name = "workbench")]
#[command(about = "Workbench - extensible development workbench")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the workbench
    Run,
    /// Validate configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    registered_plugins::ensure_linked();

    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        verbose: cli.verbose,
        print_config: cli.print_config,
    };

    // Layered config:
    // 1) defaults -> 2) YAML (if provided) -> 3) env (WORKBENCH__*) -> 4) CLI overrides
    // Also normalizes + creates app.home_dir.
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging = config.logging.clone().unwrap_or_default();
    plugkit_bootstrap::init_logging(&logging, std::path::Path::new(&config.app.home_dir));

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_workbench(config).await,
        Commands::Check => check_config(config),
    }
}

async fn run_workbench(config: AppConfig) -> Result<()> {
    tracing::info!("Workbench starting");

    let stop_deadline = config.stop_deadline();
    let plugins_cfg = Arc::new(AppConfigProvider::new(config));

    run(RunOptions {
        plugins_cfg,
        shutdown: ShutdownOptions::Signals,
        stop_deadline: Some(stop_deadline),
    })
    .await
}

fn check_config(config: AppConfig) -> Result<()> {
    println!("Configuration is valid");
    println!("{}", config.to_yaml()?);
    Ok(())
}
