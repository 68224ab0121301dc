//! Rolling metric history and daily price bars used by z-scores and
//! volatility estimates.

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLC bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

/// Source of historical observations for a symbol.
///
/// Stages read a series before recording the current value, so a z-score
/// never includes the observation being scored.
pub trait HistoryStore: Send + Sync {
    /// Stored values for `metric`, oldest first.
    fn series(&self, symbol: &str, metric: &str) -> Vec<f64>;

    /// Appends a value, dropping the oldest entries beyond `capacity`.
    fn record(&mut self, symbol: &str, metric: &str, value: f64, capacity: usize);

    /// Daily bars for `symbol`, oldest first.
    fn price_bars(&self, symbol: &str) -> Vec<PriceBar>;
}

/// Hash-map backed history, serializable as a JSON snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryHistory {
    #[serde(default)]
    series: HashMap<String, VecDeque<f64>>,
    #[serde(default)]
    bars: HashMap<String, Vec<PriceBar>>,
}

impl InMemoryHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a daily bar, replacing any existing bar for the same date and
    /// keeping bars in date order.
    pub fn push_bar(&mut self, symbol: &str, bar: PriceBar) {
        let bars = self.bars.entry(symbol.to_string()).or_default();
        bars.retain(|existing| existing.date != bar.date);
        bars.push(bar);
        bars.sort_by_key(|b| b.date);
    }

    /// Number of stored values for one symbol's `metric`.
    #[must_use]
    pub fn series_len(&self, symbol: &str, metric: &str) -> usize {
        self.series.get(&key(symbol, metric)).map_or(0, VecDeque::len)
    }

    /// True when the store holds no series and no bars for any symbol.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty() && self.bars.is_empty()
    }
}

fn key(symbol: &str, metric: &str) -> String {
    format!("{symbol}:{metric}")
}

impl HistoryStore for InMemoryHistory {
    fn series(&self, symbol: &str, metric: &str) -> Vec<f64> {
        self.series
            .get(&key(symbol, metric))
            .map(|values| values.iter().copied().collect())
            .unwrap_or_default()
    }

    fn record(&mut self, symbol: &str, metric: &str, value: f64, capacity: usize) {
        let values = self.series.entry(key(symbol, metric)).or_default();
        values.push_back(value);
        while values.len() > capacity {
            values.pop_front();
        }
    }

    fn price_bars(&self, symbol: &str) -> Vec<PriceBar> {
        self.bars.get(symbol).cloned().unwrap_or_default()
    }
}
