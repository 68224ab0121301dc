//! Enhanced flow signals: VAPI-FA, DWFD and TW-LAF.
//!
//! Raw values come from the snapshot's rolling net flows. Each raw value is
//! standardized against the stored history for the symbol before being
//! queued for recording, so a z-score never sees its own observation.

use anyhow::Result;
use eots_core::stats::{safe_div, zscore};
use eots_core::{FlowConfig, RawUnderlyingData};

use crate::stage::{finite, MetricStage, StageContext};

pub const VAPI_FA: &str = "vapi_fa";
pub const DWFD: &str = "dwfd";
pub const TW_LAF: &str = "tw_laf";

pub struct FlowStage;

/// Volatility-adjusted premium intensity with flow acceleration.
///
/// `None` when the 5m value flow is missing.
#[must_use]
pub fn vapi_fa(raw: &RawUnderlyingData, config: &FlowConfig) -> Option<f64> {
    let nvf5 = raw.net_value_flow_5m_und?;
    let iv = raw.u_volatility.max(config.iv_floor);

    let acceleration = raw.net_value_flow_15m_und.map_or(0.0, |nvf15| {
        let rate5 = nvf5 / 5.0;
        let rate15 = nvf15 / 15.0;
        safe_div(rate5 - rate15, rate15.abs(), 0.0).clamp(-1.0, 1.0)
    });

    Some(nvf5 / iv * (1.0 + acceleration))
}

fn max_abs_scaled(first: Option<f64>, windows: &[Option<f64>]) -> f64 {
    let Some(value) = first else {
        return 0.0;
    };
    let max_abs = windows
        .iter()
        .flatten()
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    safe_div(value, max_abs, 0.0)
}

/// Delta-weighted flow divergence.
///
/// Scales net customer delta flow by how far normalized premium flow runs
/// ahead of (or behind) normalized contract flow.
#[must_use]
pub fn dwfd(raw: &RawUnderlyingData, delta_flow: f64, config: &FlowConfig) -> f64 {
    let value_windows = [
        raw.net_value_flow_5m_und,
        raw.net_value_flow_15m_und,
        raw.net_value_flow_30m_und,
        raw.net_value_flow_60m_und,
    ];
    let volume_windows = [
        raw.net_vol_flow_5m_und,
        raw.net_vol_flow_15m_und,
        raw.net_vol_flow_30m_und,
        raw.net_vol_flow_60m_und,
    ];
    let value_norm = max_abs_scaled(raw.net_value_flow_5m_und, &value_windows);
    let volume_norm = max_abs_scaled(raw.net_vol_flow_5m_und, &volume_windows);

    delta_flow * (1.0 + config.dwfd_divergence_weight * (value_norm - volume_norm))
}

/// Time-weighted, liquidity-adjusted per-minute value flow.
///
/// `None` when no rolling window is present.
#[must_use]
pub fn tw_laf(raw: &RawUnderlyingData, config: &FlowConfig) -> Option<f64> {
    let mut weighted = 0.0;
    let mut weight_sum = 0.0;
    for ((minutes, flow), weight) in raw.value_flow_windows().iter().zip(config.twlaf_weights) {
        if let Some(flow) = flow {
            weighted += weight * flow / minutes;
            weight_sum += weight;
        }
    }
    if weight_sum <= 0.0 {
        return None;
    }

    let volume = raw.day_volume.max(0.0);
    let liquidity = volume / (volume + config.liquidity_half_volume);
    Some(weighted / weight_sum * liquidity)
}

impl FlowStage {
    fn standardize(ctx: &mut StageContext<'_>, metric: &str, raw: f64) -> Option<f64> {
        let history = ctx.history(metric);
        let z = if history.len() >= ctx.config.flow.min_history {
            zscore(&history, raw)
        } else {
            None
        };
        ctx.record(metric, raw);
        z
    }
}

impl MetricStage for FlowStage {
    fn name(&self) -> &str {
        "enhanced_flow"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let metrics = ctx.config;
        let config = &metrics.flow;
        let raw = &ctx.underlying.raw;

        let delta_flow = ctx
            .underlying
            .net_cust_delta_flow_und
            .unwrap_or_else(|| ctx.strikes.iter().map(|s| s.net_cust_delta_flow_at_strike).sum());

        let vapi = vapi_fa(raw, config).map(|v| finite("vapi_fa_raw_und", v)).transpose()?;
        let dwfd_raw = finite("dwfd_raw_und", dwfd(raw, delta_flow, config))?;
        let twlaf = tw_laf(raw, config).map(|v| finite("tw_laf_raw_und", v)).transpose()?;

        let vapi_z = vapi.and_then(|v| Self::standardize(ctx, VAPI_FA, v));
        let dwfd_z = Self::standardize(ctx, DWFD, dwfd_raw);
        let twlaf_z = twlaf.and_then(|v| Self::standardize(ctx, TW_LAF, v));

        tracing::debug!(
            vapi_fa = ?vapi,
            vapi_fa_z = ?vapi_z,
            dwfd = dwfd_raw,
            dwfd_z = ?dwfd_z,
            tw_laf = ?twlaf,
            tw_laf_z = ?twlaf_z,
            "enhanced flow computed"
        );

        let und = &mut ctx.underlying;
        und.vapi_fa_raw_und = vapi;
        und.vapi_fa_z_score_und = vapi_z;
        und.dwfd_raw_und = Some(dwfd_raw);
        und.dwfd_z_score_und = dwfd_z;
        und.tw_laf_raw_und = twlaf;
        und.tw_laf_z_score_und = twlaf_z;
        Ok(())
    }
}
