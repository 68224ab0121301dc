pub mod config;
pub mod config_loader;
pub mod contract;
pub mod error;
pub mod history;
pub mod processed;
pub mod regime;
pub mod stats;
pub mod traits;
pub mod underlying;
pub mod validation;

pub use config::{
    AdaptiveConfig, DataConfig, EliteConfig, EotsConfig, FlowConfig, HeatmapConfig,
    MetricsConfig, SupplementaryConfig,
};
pub use config_loader::ConfigLoader;
pub use contract::{validate_chain, OptionKind, ProcessedContractMetrics, RawOptionsContract};
pub use error::{EotsError, EotsResult};
pub use history::{HistoryStore, InMemoryHistory, PriceBar};
pub use processed::{ProcessedDataBundle, StrikeMetrics, UnderlyingAggregates};
pub use regime::{
    session_progress, FlowType, MarketRegime, MarketSession, TrendDirection, VolatilityRegime,
};
pub use traits::DataFetcher;
pub use underlying::RawUnderlyingData;
