//! The enrichment stage abstraction.
//!
//! Each stage reads the outputs of earlier stages from a [`StageContext`] and
//! writes its own fields back. The calculator hands every stage a private
//! copy of the strike table and underlying record, and only keeps that copy
//! if the stage returns `Ok`.

use anyhow::Result;
use eots_core::{
    HistoryStore, MetricsConfig, ProcessedContractMetrics, StrikeMetrics, UnderlyingAggregates,
};

/// Working state visible to a single stage run.
pub struct StageContext<'a> {
    pub config: &'a MetricsConfig,
    pub contracts: &'a [ProcessedContractMetrics],
    history: &'a dyn HistoryStore,
    pub strikes: Vec<StrikeMetrics>,
    pub underlying: UnderlyingAggregates,
    recorded: Vec<(String, f64)>,
}

impl<'a> StageContext<'a> {
    #[must_use]
    pub fn new(
        config: &'a MetricsConfig,
        contracts: &'a [ProcessedContractMetrics],
        history: &'a dyn HistoryStore,
        strikes: Vec<StrikeMetrics>,
        underlying: UnderlyingAggregates,
    ) -> Self {
        Self {
            config,
            contracts,
            history,
            strikes,
            underlying,
            recorded: Vec::new(),
        }
    }

    /// Stored history for `metric` on this symbol, excluding anything
    /// recorded during the current run.
    #[must_use]
    pub fn history(&self, metric: &str) -> Vec<f64> {
        self.history.series(self.underlying.symbol(), metric)
    }

    /// Daily bars for this symbol.
    #[must_use]
    pub fn price_bars(&self) -> Vec<eots_core::PriceBar> {
        self.history.price_bars(self.underlying.symbol())
    }

    /// Queues a value to be appended to history once the stage succeeds.
    pub fn record(&mut self, metric: &str, value: f64) {
        self.recorded.push((metric.to_string(), value));
    }

    /// Splits the context into the stage outputs.
    #[must_use]
    pub fn into_parts(self) -> (Vec<StrikeMetrics>, UnderlyingAggregates, Vec<(String, f64)>) {
        (self.strikes, self.underlying, self.recorded)
    }
}

/// One enrichment step in the pipeline.
pub trait MetricStage: Send + Sync {
    /// Stage name used in logs and in the bundle's error list.
    fn name(&self) -> &str;

    /// Computes this stage's fields.
    ///
    /// # Errors
    /// Any error discards the stage's writes; later stages still run.
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()>;
}

/// Fails with context when a computed value is not finite.
///
/// # Errors
/// Returns an error naming `field` if `value` is NaN or infinite.
pub(crate) fn finite(field: &str, value: f64) -> Result<f64> {
    anyhow::ensure!(value.is_finite(), "{field} is not finite ({value})");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eots_core::{InMemoryHistory, RawUnderlyingData};

    #[test]
    fn recorded_values_stay_out_of_history_reads() {
        let config = MetricsConfig::default();
        let mut store = InMemoryHistory::new();
        store.record("SPY", "vapi_fa", 1.0, 10);

        let underlying =
            UnderlyingAggregates::from_raw(RawUnderlyingData::new("SPY", Utc::now(), 450.0));
        let mut ctx = StageContext::new(&config, &[], &store, Vec::new(), underlying);
        ctx.record("vapi_fa", 2.0);

        assert_eq!(ctx.history("vapi_fa"), vec![1.0]);
        let (_, _, recorded) = ctx.into_parts();
        assert_eq!(recorded, vec![("vapi_fa".to_string(), 2.0)]);
    }

    #[test]
    fn finite_rejects_nan() {
        assert!(finite("x", 1.0).is_ok());
        let err = finite("gib", f64::NAN).unwrap_err();
        assert!(err.to_string().contains("gib"));
    }
}
