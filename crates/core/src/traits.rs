use async_trait::async_trait;

use crate::contract::RawOptionsContract;
use crate::error::EotsResult;
use crate::underlying::RawUnderlyingData;

/// External source of raw market data.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch_underlying(&self, symbol: &str) -> EotsResult<RawUnderlyingData>;
    async fn fetch_options_chain(&self, symbol: &str) -> EotsResult<Vec<RawOptionsContract>>;
    fn name(&self) -> &str;
}
