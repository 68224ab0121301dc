//! Raw underlying snapshot delivered once per fetch cycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EotsError, EotsResult};
use crate::validation::{
    ensure_finite, ensure_finite_opt, ensure_non_negative, ensure_non_negative_opt,
    ensure_not_blank, ensure_positive,
};

const RECORD: &str = "underlying";

/// Price, volatility and aggregate flow for the underlying at one point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawUnderlyingData {
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    #[serde(default)]
    pub price_change_abs_und: f64,
    /// Fractional change from the previous close (0.01 = 1%).
    #[serde(default)]
    pub price_change_pct_und: f64,
    #[serde(default)]
    pub day_open_price_und: f64,
    #[serde(default)]
    pub day_high_price_und: f64,
    #[serde(default)]
    pub day_low_price_und: f64,
    #[serde(default)]
    pub prev_day_close_price_und: f64,
    /// Annualized volatility as a fraction (0.20 = 20%).
    #[serde(default)]
    pub u_volatility: f64,
    #[serde(default)]
    pub day_volume: f64,
    #[serde(default)]
    pub call_gxoi: Option<f64>,
    #[serde(default)]
    pub put_gxoi: Option<f64>,
    #[serde(default)]
    pub value_bs: Option<f64>,
    #[serde(default)]
    pub volm_bs: Option<f64>,
    #[serde(default)]
    pub net_value_flow_5m_und: Option<f64>,
    #[serde(default)]
    pub net_value_flow_15m_und: Option<f64>,
    #[serde(default)]
    pub net_value_flow_30m_und: Option<f64>,
    #[serde(default)]
    pub net_value_flow_60m_und: Option<f64>,
    #[serde(default)]
    pub net_vol_flow_5m_und: Option<f64>,
    #[serde(default)]
    pub net_vol_flow_15m_und: Option<f64>,
    #[serde(default)]
    pub net_vol_flow_30m_und: Option<f64>,
    #[serde(default)]
    pub net_vol_flow_60m_und: Option<f64>,
    #[serde(default)]
    pub total_call_oi_und: Option<f64>,
    #[serde(default)]
    pub total_put_oi_und: Option<f64>,
    #[serde(default)]
    pub total_call_vol_und: Option<f64>,
    #[serde(default)]
    pub total_put_vol_und: Option<f64>,
}

impl RawUnderlyingData {
    /// Creates a snapshot with only symbol, timestamp and price set.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timestamp: DateTime<Utc>, price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            price,
            price_change_abs_und: 0.0,
            price_change_pct_und: 0.0,
            day_open_price_und: 0.0,
            day_high_price_und: 0.0,
            day_low_price_und: 0.0,
            prev_day_close_price_und: 0.0,
            u_volatility: 0.0,
            day_volume: 0.0,
            call_gxoi: None,
            put_gxoi: None,
            value_bs: None,
            volm_bs: None,
            net_value_flow_5m_und: None,
            net_value_flow_15m_und: None,
            net_value_flow_30m_und: None,
            net_value_flow_60m_und: None,
            net_vol_flow_5m_und: None,
            net_vol_flow_15m_und: None,
            net_vol_flow_30m_und: None,
            net_vol_flow_60m_und: None,
            total_call_oi_und: None,
            total_put_oi_und: None,
            total_call_vol_und: None,
            total_put_vol_und: None,
        }
    }

    /// Sets the day's open/high/low and the previous close.
    #[must_use]
    pub fn with_day_range(mut self, open: f64, high: f64, low: f64, prev_close: f64) -> Self {
        self.day_open_price_und = open;
        self.day_high_price_und = high;
        self.day_low_price_und = low;
        self.prev_day_close_price_und = prev_close;
        if prev_close > 0.0 {
            self.price_change_abs_und = self.price - prev_close;
            self.price_change_pct_und = (self.price - prev_close) / prev_close;
        }
        self
    }

    /// Sets volatility and day volume.
    #[must_use]
    pub fn with_volatility(mut self, u_volatility: f64, day_volume: f64) -> Self {
        self.u_volatility = u_volatility;
        self.day_volume = day_volume;
        self
    }

    /// Sets the rolling net value flows (5m, 15m, 30m, 60m).
    #[must_use]
    pub fn with_value_flows(mut self, flows: [f64; 4]) -> Self {
        self.net_value_flow_5m_und = Some(flows[0]);
        self.net_value_flow_15m_und = Some(flows[1]);
        self.net_value_flow_30m_und = Some(flows[2]);
        self.net_value_flow_60m_und = Some(flows[3]);
        self
    }

    /// Sets the day's net customer premium and contract flow.
    #[must_use]
    pub fn with_net_flow(mut self, value_bs: f64, volm_bs: f64) -> Self {
        self.value_bs = Some(value_bs);
        self.volm_bs = Some(volm_bs);
        self
    }

    /// Rolling net value flows paired with their window length in minutes.
    #[must_use]
    pub fn value_flow_windows(&self) -> [(f64, Option<f64>); 4] {
        [
            (5.0, self.net_value_flow_5m_und),
            (15.0, self.net_value_flow_15m_und),
            (30.0, self.net_value_flow_30m_und),
            (60.0, self.net_value_flow_60m_und),
        ]
    }

    /// Validates the snapshot. Any failure here is fatal for the cycle.
    ///
    /// # Errors
    /// Returns a validation error naming the first offending field.
    pub fn validate(&self) -> EotsResult<()> {
        ensure_not_blank(RECORD, "symbol", &self.symbol)?;
        ensure_positive(RECORD, "price", self.price)?;
        ensure_finite(RECORD, "price_change_abs_und", self.price_change_abs_und)?;
        ensure_finite(RECORD, "price_change_pct_und", self.price_change_pct_und)?;
        ensure_non_negative(RECORD, "day_open_price_und", self.day_open_price_und)?;
        ensure_non_negative(RECORD, "day_high_price_und", self.day_high_price_und)?;
        ensure_non_negative(RECORD, "day_low_price_und", self.day_low_price_und)?;
        ensure_non_negative(
            RECORD,
            "prev_day_close_price_und",
            self.prev_day_close_price_und,
        )?;
        ensure_non_negative(RECORD, "u_volatility", self.u_volatility)?;
        ensure_non_negative(RECORD, "day_volume", self.day_volume)?;

        if self.day_high_price_und > 0.0
            && self.day_low_price_und > 0.0
            && self.day_high_price_und < self.day_low_price_und
        {
            return Err(EotsError::validation(
                RECORD,
                "day_high_price_und",
                format!(
                    "day high {} is below day low {}",
                    self.day_high_price_und, self.day_low_price_und
                ),
            ));
        }

        ensure_finite_opt(RECORD, "call_gxoi", self.call_gxoi)?;
        ensure_finite_opt(RECORD, "put_gxoi", self.put_gxoi)?;
        ensure_finite_opt(RECORD, "value_bs", self.value_bs)?;
        ensure_finite_opt(RECORD, "volm_bs", self.volm_bs)?;
        for (field, value) in [
            ("net_value_flow_5m_und", self.net_value_flow_5m_und),
            ("net_value_flow_15m_und", self.net_value_flow_15m_und),
            ("net_value_flow_30m_und", self.net_value_flow_30m_und),
            ("net_value_flow_60m_und", self.net_value_flow_60m_und),
            ("net_vol_flow_5m_und", self.net_vol_flow_5m_und),
            ("net_vol_flow_15m_und", self.net_vol_flow_15m_und),
            ("net_vol_flow_30m_und", self.net_vol_flow_30m_und),
            ("net_vol_flow_60m_und", self.net_vol_flow_60m_und),
        ] {
            ensure_finite_opt(RECORD, field, value)?;
        }
        for (field, value) in [
            ("total_call_oi_und", self.total_call_oi_und),
            ("total_put_oi_und", self.total_put_oi_und),
            ("total_call_vol_und", self.total_call_vol_und),
            ("total_put_vol_und", self.total_put_vol_und),
        ] {
            ensure_non_negative_opt(RECORD, field, value)?;
        }
        Ok(())
    }
}
