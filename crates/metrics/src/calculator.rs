//! The metrics calculator: validation, aggregation and the ordered stage run.

use chrono::Utc;
use eots_core::{
    validate_chain, EotsResult, HistoryStore, MetricsConfig, ProcessedDataBundle,
    RawOptionsContract, RawUnderlyingData, UnderlyingAggregates,
};

use crate::adaptive::AdaptiveStage;
use crate::aggregates::AggregatesStage;
use crate::aggregation::{aggregate_strikes, build_contract_metrics};
use crate::elite::EliteStage;
use crate::flow::FlowStage;
use crate::foundational::FoundationalStage;
use crate::heatmap::HeatmapStage;
use crate::stage::{MetricStage, StageContext};
use crate::supplementary::SupplementaryStage;

/// The standard stage order. Each stage may read anything written before it.
#[must_use]
pub fn standard_stages() -> Vec<Box<dyn MetricStage>> {
    vec![
        Box::new(FoundationalStage),
        Box::new(FlowStage),
        Box::new(AdaptiveStage),
        Box::new(HeatmapStage),
        Box::new(AggregatesStage),
        Box::new(SupplementaryStage),
        Box::new(EliteStage),
    ]
}

/// Turns a raw chain and underlying snapshot into a processed bundle.
///
/// Inputs are validated first and any violation aborts the cycle. After
/// that, a failing stage is logged and recorded in the bundle's `errors`,
/// its writes are dropped, and the remaining stages still run.
pub struct MetricsCalculator {
    config: MetricsConfig,
    stages: Vec<Box<dyn MetricStage>>,
}

impl MetricsCalculator {
    /// Creates a calculator running the standard stages.
    #[must_use]
    pub fn new(config: MetricsConfig) -> Self {
        Self::with_stages(config, standard_stages())
    }

    /// Creates a calculator running `stages` in the given order.
    #[must_use]
    pub fn with_stages(config: MetricsConfig, stages: Vec<Box<dyn MetricStage>>) -> Self {
        Self { config, stages }
    }

    #[must_use]
    pub fn config(&self) -> &MetricsConfig {
        &self.config
    }

    /// Stage names in run order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Runs one full calculation.
    ///
    /// # Errors
    /// Returns a validation error if the underlying snapshot or any contract
    /// fails schema checks, or if the assembled bundle has a non-finite or
    /// out-of-range value. Stage failures never surface here.
    pub fn calculate_all_metrics(
        &self,
        chain: Vec<RawOptionsContract>,
        underlying: RawUnderlyingData,
        history: &mut dyn HistoryStore,
    ) -> EotsResult<ProcessedDataBundle> {
        let span = tracing::info_span!("calculate_all_metrics", symbol = %underlying.symbol);
        let _guard = span.enter();

        underlying.validate()?;
        validate_chain(&chain)?;

        let contracts = build_contract_metrics(chain, self.config.dte_max);
        let mut strikes = aggregate_strikes(&contracts, &underlying);
        let mut enriched = UnderlyingAggregates::from_raw(underlying);
        let mut errors = Vec::new();

        tracing::debug!(
            contracts = contracts.len(),
            strikes = strikes.len(),
            "strike aggregation complete"
        );

        for stage in &self.stages {
            let name = stage.name();
            let mut ctx = StageContext::new(
                &self.config,
                &contracts,
                &*history,
                strikes.clone(),
                enriched.clone(),
            );

            match stage.run(&mut ctx) {
                Ok(()) => {
                    let (next_strikes, next_underlying, recorded) = ctx.into_parts();
                    strikes = next_strikes;
                    enriched = next_underlying;
                    for (metric, value) in recorded {
                        history.record(
                            enriched.symbol(),
                            &metric,
                            value,
                            self.config.flow.history_window,
                        );
                    }
                    tracing::debug!(stage = %name, "stage complete");
                }
                Err(e) => {
                    tracing::warn!(
                        stage = %name,
                        error = %e,
                        "Stage failed, discarding its output"
                    );
                    errors.push(format!("{name}: {e:#}"));
                }
            }
        }

        tracing::info!(
            strikes = strikes.len(),
            failed_stages = errors.len(),
            score = ?enriched.elite_impact_score_und,
            "metrics calculation complete"
        );

        let bundle = ProcessedDataBundle {
            options_data_with_metrics: contracts,
            strike_level_data_with_metrics: strikes,
            underlying_data_enriched: enriched,
            processing_timestamp: Utc::now(),
            errors,
        };
        if let Err(e) = bundle.validate(self.config.elite.score_scale) {
            tracing::error!(error = %e, "Processed bundle failed output validation");
            return Err(e);
        }
        Ok(bundle)
    }
}

impl std::fmt::Debug for MetricsCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCalculator")
            .field("stages", &self.stage_names())
            .finish()
    }
}
