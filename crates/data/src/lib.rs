//! File-backed data sources and storage for the EOTS metrics engine.
//!
//! This crate provides:
//! - A `DataFetcher` reading chain CSV and underlying JSON snapshots
//! - CSV storage for options chains and the strike table
//! - JSON storage for history snapshots and processed bundles

pub mod csv_storage;
pub mod file_fetcher;
pub mod json_storage;

pub use csv_storage::CsvStorage;
pub use file_fetcher::FileDataFetcher;
pub use json_storage::JsonStorage;
