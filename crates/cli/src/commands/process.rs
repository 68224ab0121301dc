//! Process command: one cycle from files.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use eots_core::EotsConfig;

use crate::pipeline::Pipeline;
use crate::summary::print_summary;

/// Arguments for the process command.
#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Bundle JSON path (defaults to `<output_dir>/<symbol>_<timestamp>.json`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the strike table to this CSV file
    #[arg(long)]
    pub strikes_csv: Option<PathBuf>,

    /// Skip the terminal summary
    #[arg(long)]
    pub quiet: bool,
}

/// Runs the process command.
///
/// # Errors
/// Returns an error if inputs cannot be read or fail validation, or if the
/// outputs cannot be written.
pub async fn run_process(config: EotsConfig, args: ProcessArgs) -> Result<()> {
    let pipeline = Pipeline::new(config);
    tracing::info!(symbol = pipeline.symbol(), "Processing one cycle");

    let bundle = pipeline.run_once().await?;
    let path = pipeline.persist(&bundle, args.output, args.strikes_csv)?;

    if !args.quiet {
        print_summary(&bundle);
        println!("Bundle written to {}", path.display());
    }
    Ok(())
}
