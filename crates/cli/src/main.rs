use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eots_core::{ConfigLoader, EotsConfig};

mod commands;
mod pipeline;
mod summary;

use commands::{ProcessArgs, RunArgs};

#[derive(Parser)]
#[command(name = "eots")]
#[command(about = "Options metrics engine: flow, gamma and composite impact analytics", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = "config/Config.toml")]
    config: PathBuf,

    /// Profile overlay (loads `<config stem>.<profile>.toml` on top)
    #[arg(short, long, global = true, env = "EOTS_PROFILE")]
    profile: Option<String>,

    /// Symbol override for this invocation
    #[arg(short, long, global = true)]
    symbol: Option<String>,

    /// Optional log file path (logs to file instead of stderr)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one cycle from files and write the processed bundle
    Process(ProcessArgs),
    /// Run cycles on an interval until stopped
    Run(RunArgs),
    /// Print the merged configuration
    ShowConfig,
}

fn init_logging(log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<EotsConfig> {
    let mut config = match &cli.profile {
        Some(profile) => ConfigLoader::load_profile_from(&cli.config, profile)?,
        None => ConfigLoader::load_from(&cli.config)?,
    };
    if let Some(symbol) = &cli.symbol {
        config.data.symbol = symbol.to_uppercase();
    }
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file.as_ref())?;

    let config = load_config(&cli)?;
    tracing::debug!(config = %cli.config.display(), symbol = %config.data.symbol, "Configuration ready");

    match cli.command {
        Commands::Process(args) => {
            commands::run_process(config, args).await?;
        }
        Commands::Run(args) => {
            commands::run_loop(config, args).await?;
        }
        Commands::ShowConfig => {
            commands::run_show_config(&config)?;
        }
    }

    Ok(())
}
