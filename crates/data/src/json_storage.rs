use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use eots_core::{InMemoryHistory, ProcessedDataBundle};

pub struct JsonStorage;

impl JsonStorage {
    /// Loads a history snapshot. A missing file yields an empty history so
    /// the first cycle for a symbol can run without seeding.
    ///
    /// # Errors
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load_history(path: impl AsRef<Path>) -> Result<InMemoryHistory> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "No history snapshot found, starting empty");
            return Ok(InMemoryHistory::new());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read history: {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse history: {}", path.display()))
    }

    /// Saves a history snapshot, replacing the previous file only once the
    /// new one is fully written.
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn save_history(path: impl AsRef<Path>, history: &InMemoryHistory) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("json.tmp");
        write_json(&tmp, history)?;
        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace history: {}", path.display()))?;
        Ok(())
    }

    /// Writes a processed bundle as pretty-printed JSON.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or serialization fails
    pub fn write_bundle(path: impl AsRef<Path>, bundle: &ProcessedDataBundle) -> Result<()> {
        write_json(path.as_ref(), bundle)
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write JSON file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use eots_core::{
        HistoryStore, PriceBar, RawUnderlyingData, StrikeMetrics, UnderlyingAggregates,
    };
    use rust_decimal_macros::dec;

    #[test]
    fn missing_history_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let history = JsonStorage::load_history(dir.path().join("none.json")).unwrap();
        assert!(history.series("SPY", "dwfd").is_empty());
    }

    #[test]
    fn history_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/SPY_history.json");
        let mut history = InMemoryHistory::new();
        for v in [1.0, 2.0, 3.0] {
            history.record("SPY", "vapi_fa", v, 2);
        }
        history.push_bar(
            "SPY",
            PriceBar {
                date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
                open: 450.0,
                high: 452.0,
                low: 448.0,
                close: 451.0,
            },
        );

        JsonStorage::save_history(&path, &history).unwrap();
        let loaded = JsonStorage::load_history(&path).unwrap();

        assert_eq!(loaded.series("SPY", "vapi_fa"), vec![2.0, 3.0]);
        assert_eq!(loaded.price_bars("SPY").len(), 1);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_history_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "[not json").unwrap();
        assert!(JsonStorage::load_history(&path).is_err());
    }

    #[test]
    fn bundle_is_written_flat() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/bundle.json");
        let raw = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let bundle = ProcessedDataBundle {
            options_data_with_metrics: Vec::new(),
            strike_level_data_with_metrics: vec![StrikeMetrics::new(dec!(450), &raw)],
            underlying_data_enriched: UnderlyingAggregates::from_raw(raw),
            processing_timestamp: Utc::now(),
            errors: vec!["heatmap: boom".to_string()],
        };

        JsonStorage::write_bundle(&path, &bundle).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["underlying_data_enriched"]["symbol"], "SPY");
        assert_eq!(value["errors"][0], "heatmap: boom");
    }
}
