//! A `DataFetcher` that reads snapshots written to disk by an upstream
//! collector: the options chain as CSV and the underlying as JSON.

use std::path::PathBuf;

use async_trait::async_trait;
use eots_core::{
    DataConfig, DataFetcher, EotsError, EotsResult, RawOptionsContract, RawUnderlyingData,
};

use crate::csv_storage::CsvStorage;

const SYMBOL_PLACEHOLDER: &str = "{symbol}";

/// Reads per-symbol files from path templates containing `{symbol}`.
#[derive(Debug, Clone)]
pub struct FileDataFetcher {
    options_template: String,
    underlying_template: String,
}

impl FileDataFetcher {
    #[must_use]
    pub fn new(options_template: impl Into<String>, underlying_template: impl Into<String>) -> Self {
        Self {
            options_template: options_template.into(),
            underlying_template: underlying_template.into(),
        }
    }

    #[must_use]
    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(config.options_path.clone(), config.underlying_path.clone())
    }

    /// Chain file location for `symbol`.
    #[must_use]
    pub fn options_path(&self, symbol: &str) -> PathBuf {
        PathBuf::from(self.options_template.replace(SYMBOL_PLACEHOLDER, symbol))
    }

    /// Underlying snapshot location for `symbol`.
    #[must_use]
    pub fn underlying_path(&self, symbol: &str) -> PathBuf {
        PathBuf::from(self.underlying_template.replace(SYMBOL_PLACEHOLDER, symbol))
    }
}

fn source_error(what: &str, path: &std::path::Path, err: impl std::fmt::Display) -> EotsError {
    EotsError::DataSource(format!("failed to read {what} from {}: {err}", path.display()))
}

#[async_trait]
impl DataFetcher for FileDataFetcher {
    async fn fetch_underlying(&self, symbol: &str) -> EotsResult<RawUnderlyingData> {
        let path = self.underlying_path(symbol);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| source_error("underlying snapshot", &path, e))?;
        let underlying: RawUnderlyingData = serde_json::from_str(&text).map_err(|e| {
            EotsError::Serialization(format!("{}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), price = underlying.price, "Loaded underlying snapshot");
        Ok(underlying)
    }

    async fn fetch_options_chain(&self, symbol: &str) -> EotsResult<Vec<RawOptionsContract>> {
        let path = self.options_path(symbol);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| source_error("options chain", &path, e))?;
        let chain = CsvStorage::parse_chain(&text)?;
        tracing::debug!(path = %path.display(), contracts = chain.len(), "Loaded options chain");
        Ok(chain)
    }

    fn name(&self) -> &str {
        "file"
    }
}
