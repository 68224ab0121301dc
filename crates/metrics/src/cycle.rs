//! One fetch-then-compute cycle.

use eots_core::{DataFetcher, EotsError, EotsResult, HistoryStore, ProcessedDataBundle};

use crate::calculator::MetricsCalculator;

/// Fetches the underlying snapshot and options chain concurrently, then runs
/// the calculation. Computation starts only once both fetches are in.
///
/// A snapshot whose symbol differs from `symbol` only in case is accepted and
/// relabelled as `symbol`, so history reads and writes use one key.
///
/// # Errors
/// Returns the first fetch error, a cycle abort if the fetched snapshot is
/// for a different symbol, or any input validation error.
pub async fn run_cycle(
    fetcher: &dyn DataFetcher,
    calculator: &MetricsCalculator,
    symbol: &str,
    history: &mut dyn HistoryStore,
) -> EotsResult<ProcessedDataBundle> {
    tracing::debug!(symbol, fetcher = fetcher.name(), "fetching cycle inputs");

    let (mut underlying, chain) = tokio::try_join!(
        fetcher.fetch_underlying(symbol),
        fetcher.fetch_options_chain(symbol)
    )?;

    if !underlying.symbol.eq_ignore_ascii_case(symbol) {
        return Err(EotsError::CycleAborted(format!(
            "requested {symbol} but fetcher returned {}",
            underlying.symbol
        )));
    }
    if underlying.symbol != symbol {
        tracing::debug!(fetched = %underlying.symbol, symbol, "normalizing snapshot symbol");
        underlying.symbol = symbol.to_string();
    }

    calculator.calculate_all_metrics(chain, underlying, history)
}
