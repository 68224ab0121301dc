//! File-backed cycle shared by `process` and `run`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use eots_core::{EotsConfig, ProcessedDataBundle};
use eots_data::{CsvStorage, FileDataFetcher, JsonStorage};
use eots_metrics::supplementary::session_bar;
use eots_metrics::{run_cycle, MetricsCalculator};

pub struct Pipeline {
    config: EotsConfig,
    fetcher: FileDataFetcher,
    calculator: MetricsCalculator,
}

impl Pipeline {
    pub fn new(config: EotsConfig) -> Self {
        let fetcher = FileDataFetcher::from_config(&config.data);
        let calculator = MetricsCalculator::new(config.metrics.clone());
        Self {
            config,
            fetcher,
            calculator,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.config.data.symbol
    }

    fn history_path(&self) -> PathBuf {
        PathBuf::from(self.config.data.resolve(&self.config.data.history_path))
    }

    /// Default bundle location: `<output_dir>/<symbol>_<yyyymmdd_hhmmss>.json`.
    pub fn bundle_path(&self, bundle: &ProcessedDataBundle) -> PathBuf {
        let stamp = bundle.processing_timestamp.format("%Y%m%d_%H%M%S");
        PathBuf::from(self.config.data.resolve(&self.config.data.output_dir))
            .join(format!("{}_{stamp}.json", self.symbol()))
    }

    /// Loads history, runs one cycle, folds today's bar into history and
    /// saves it back. History is saved only when the cycle succeeds.
    pub async fn run_once(&self) -> Result<ProcessedDataBundle> {
        let symbol = self.symbol();
        let history_path = self.history_path();
        let mut history = JsonStorage::load_history(&history_path)?;

        let bundle = run_cycle(&self.fetcher, &self.calculator, symbol, &mut history)
            .await
            .with_context(|| format!("Metrics cycle failed for {symbol}"))?;

        if let Some(bar) = session_bar(&bundle.underlying_data_enriched.raw) {
            history.push_bar(symbol, bar);
        }
        JsonStorage::save_history(&history_path, &history)?;

        Ok(bundle)
    }

    /// Writes the bundle JSON and, if requested, the strike table CSV.
    pub fn persist(
        &self,
        bundle: &ProcessedDataBundle,
        output: Option<PathBuf>,
        strikes_csv: Option<PathBuf>,
    ) -> Result<PathBuf> {
        let path = output.unwrap_or_else(|| self.bundle_path(bundle));
        JsonStorage::write_bundle(&path, bundle)?;
        tracing::info!(path = %path.display(), "Wrote processed bundle");

        if let Some(csv_path) = strikes_csv {
            CsvStorage::write_strikes(&csv_path, &bundle.strike_level_data_with_metrics)?;
            tracing::info!(path = %csv_path.display(), "Wrote strike table");
        }
        Ok(path)
    }
}
