use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim, Writer};
use eots_core::{EotsError, EotsResult, RawOptionsContract, StrikeMetrics};

pub struct CsvStorage;

impl CsvStorage {
    /// Reads an options chain CSV with one contract per row.
    ///
    /// Headers name `RawOptionsContract` fields. `strike` and `opt_kind` are
    /// required; any other column may be missing or left empty.
    ///
    /// # Errors
    /// Returns an I/O error if the file cannot be opened and a serialization
    /// error naming the row if a record cannot be parsed.
    pub fn read_chain(path: impl AsRef<Path>) -> EotsResult<Vec<RawOptionsContract>> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let chain = Self::read_chain_from(file)?;
        tracing::debug!(path = %path.display(), contracts = chain.len(), "Loaded options chain");
        Ok(chain)
    }

    /// Parses an options chain from CSV text.
    ///
    /// # Errors
    /// Returns a serialization error naming the first bad row.
    pub fn parse_chain(text: &str) -> EotsResult<Vec<RawOptionsContract>> {
        Self::read_chain_from(text.as_bytes())
    }

    fn read_chain_from<R: Read>(reader: R) -> EotsResult<Vec<RawOptionsContract>> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        reader
            .deserialize()
            .enumerate()
            .map(|(i, row)| {
                row.map_err(|e| EotsError::Serialization(format!("chain row {}: {e}", i + 1)))
            })
            .collect()
    }

    /// Writes the strike table, one row per strike in ascending order.
    ///
    /// # Errors
    /// Returns error if file cannot be created or writing fails
    pub fn write_strikes(path: impl AsRef<Path>, strikes: &[StrikeMetrics]) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        let mut writer = Writer::from_writer(file);

        let mut sorted: Vec<&StrikeMetrics> = strikes.iter().collect();
        sorted.sort_by_key(|s| s.strike);

        for row in sorted {
            writer
                .serialize(row)
                .with_context(|| format!("Failed to write strike {}", row.strike))?;
        }

        writer.flush()?;
        Ok(())
    }
}
