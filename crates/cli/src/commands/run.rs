//! Run command: repeated cycles on a fixed interval.

use std::time::Duration;

use anyhow::Result;
use clap::Args;
use eots_core::EotsConfig;
use tokio::time::{interval, MissedTickBehavior};

use crate::pipeline::Pipeline;
use crate::summary::print_cycle_line;

/// Arguments for the run command.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Seconds between cycles
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Stop after this many cycles (runs until Ctrl+C if omitted)
    #[arg(long)]
    pub cycles: Option<u64>,

    /// Write the strike table CSV next to each bundle
    #[arg(long)]
    pub strikes_csv: bool,
}

/// Runs the run command. A failed cycle is logged and the loop continues.
///
/// # Errors
/// Returns an error only if the interval is zero.
pub async fn run_loop(config: EotsConfig, args: RunArgs) -> Result<()> {
    anyhow::ensure!(args.interval_secs > 0, "--interval-secs must be positive");

    let pipeline = Pipeline::new(config);
    let mut ticker = interval(Duration::from_secs(args.interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        symbol = pipeline.symbol(),
        interval_secs = args.interval_secs,
        cycles = ?args.cycles,
        "Starting metrics loop"
    );

    let mut completed = 0u64;
    let mut failed = 0u64;
    loop {
        if args.cycles.is_some_and(|limit| completed + failed >= limit) {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                let cycle = completed + failed + 1;
                match run_one(&pipeline, args.strikes_csv).await {
                    Ok(bundle) => {
                        completed += 1;
                        print_cycle_line(cycle, &bundle);
                    }
                    Err(e) => {
                        failed += 1;
                        tracing::error!(cycle, error = %format!("{e:#}"), "Cycle failed, continuing");
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
        }
    }

    tracing::info!(completed, failed, "Metrics loop stopped");
    Ok(())
}

async fn run_one(pipeline: &Pipeline, strikes_csv: bool) -> Result<eots_core::ProcessedDataBundle> {
    let bundle = pipeline.run_once().await?;
    let csv = strikes_csv.then(|| pipeline.bundle_path(&bundle).with_extension("csv"));
    pipeline.persist(&bundle, None, csv)?;
    Ok(bundle)
}
