pub mod adaptive;
pub mod aggregates;
pub mod aggregation;
pub mod calculator;
pub mod cycle;
pub mod elite;
pub mod flow;
pub mod foundational;
pub mod heatmap;
pub mod stage;
pub mod supplementary;

pub use adaptive::{classify_regime, AdaptiveStage};
pub use aggregates::AggregatesStage;
pub use aggregation::{aggregate_strikes, build_contract_metrics};
pub use calculator::{standard_stages, MetricsCalculator};
pub use cycle::run_cycle;
pub use elite::{CompositeImpact, EliteStage, ImpactComponents};
pub use flow::FlowStage;
pub use foundational::FoundationalStage;
pub use heatmap::HeatmapStage;
pub use stage::{MetricStage, StageContext};
pub use supplementary::SupplementaryStage;
