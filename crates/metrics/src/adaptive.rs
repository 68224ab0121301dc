//! Regime-dependent adaptive strike metrics.
//!
//! Exposures are max-abs normalized across the strike table, so every input
//! to the formulas below sits in [-1, 1] and the regime multiplier alone sets
//! the overall scale.

use anyhow::Result;
use eots_core::stats::{normalize_max_abs, safe_div};
use eots_core::{AdaptiveConfig, MarketRegime, RawUnderlyingData, StrikeMetrics};

use crate::stage::{finite, MetricStage, StageContext};

/// Flow z-score magnitude that flags a trend as possibly reversing.
const REVERSAL_Z: f64 = 2.0;

/// Classifies the current regime from volatility, price change and flow.
///
/// High volatility wins over direction. A trend whose flow z-score points the
/// other way by more than two standard deviations is transitional.
#[must_use]
pub fn classify_regime(
    raw: &RawUnderlyingData,
    flow_z: Option<f64>,
    config: &AdaptiveConfig,
) -> MarketRegime {
    let vol = raw.u_volatility;
    let change = raw.price_change_pct_und;

    let regime = if vol >= config.high_vol_threshold {
        MarketRegime::HighVolatility
    } else if change > config.trend_threshold {
        MarketRegime::BullishTrend
    } else if change < -config.trend_threshold {
        MarketRegime::BearishTrend
    } else if vol > 0.0 && vol <= config.low_vol_threshold {
        MarketRegime::LowVolatilityRange
    } else {
        MarketRegime::Neutral
    };

    match (regime, flow_z) {
        (MarketRegime::BullishTrend, Some(z)) if z <= -REVERSAL_Z => MarketRegime::Transitional,
        (MarketRegime::BearishTrend, Some(z)) if z >= REVERSAL_Z => MarketRegime::Transitional,
        _ => regime,
    }
}

/// Max-abs normalizes one field across the strike table.
pub(crate) fn normalized_column(
    strikes: &[StrikeMetrics],
    field: impl Fn(&StrikeMetrics) -> f64,
) -> Vec<f64> {
    let values: Vec<f64> = strikes.iter().map(field).collect();
    normalize_max_abs(&values)
}

/// Normalized per-strike inputs shared by the adaptive formulas.
pub(crate) struct NormalizedExposures {
    pub gamma: Vec<f64>,
    pub delta: Vec<f64>,
    pub vega: Vec<f64>,
    pub theta: Vec<f64>,
    pub delta_flow: Vec<f64>,
    pub vega_flow: Vec<f64>,
    pub theta_flow: Vec<f64>,
    pub nvp: Vec<f64>,
}

impl NormalizedExposures {
    pub(crate) fn from_strikes(strikes: &[StrikeMetrics]) -> Self {
        Self {
            gamma: normalized_column(strikes, |s| s.net_gxoi),
            delta: normalized_column(strikes, |s| s.dxoi),
            vega: normalized_column(strikes, |s| s.vxoi),
            theta: normalized_column(strikes, |s| s.txoi),
            delta_flow: normalized_column(strikes, |s| s.net_cust_delta_flow_at_strike),
            vega_flow: normalized_column(strikes, |s| s.net_cust_vega_flow_at_strike),
            theta_flow: normalized_column(strikes, |s| s.net_cust_theta_flow_at_strike),
            nvp: normalized_column(strikes, |s| s.nvp_at_strike),
        }
    }
}

pub struct AdaptiveStage;

impl MetricStage for AdaptiveStage {
    fn name(&self) -> &str {
        "adaptive"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let config = &ctx.config.adaptive;
        let regime = classify_regime(
            &ctx.underlying.raw,
            ctx.underlying.vapi_fa_z_score_und,
            config,
        );
        let m = config.multiplier(regime);
        let alpha = config.flow_alignment_weight;
        let (wg, wd) = (config.sdag_gamma_weight, config.sdag_delta_weight);
        let vol_factor = ctx.underlying.raw.u_volatility.clamp(0.0, 2.0);
        let u_vol = ctx.underlying.raw.u_volatility;

        let n = NormalizedExposures::from_strikes(&ctx.strikes);

        for (i, row) in ctx.strikes.iter_mut().enumerate() {
            let (g, d, v, t) = (n.gamma[i], n.delta[i], n.vega[i], n.theta[i]);
            let time_factor = 1.0 + 1.0 / (1.0 + row.avg_dte.max(0.0));

            row.a_dag_strike = m * g * (1.0 + alpha * n.delta_flow[i]);
            row.e_sdag_mult_strike = m * g * (1.0 + d.abs());
            row.e_sdag_dir_strike = if d == 0.0 {
                m * g
            } else {
                m * g * d.signum() * (1.0 + d.abs())
            };
            row.e_sdag_w_strike = m * (wg * g + wd * d) / (wg + wd);
            row.e_sdag_vf_strike = m * g * (1.0 + d * vol_factor);
            row.d_tdpi_strike = m * d * t.abs() * time_factor;
            row.e_ctr_strike = (t / (v.abs() + 0.01)).clamp(-10.0, 10.0);
            row.e_tdfi_strike = n.theta_flow[i] * time_factor;
            row.vri_2_0_strike = m * v * (1.0 + n.vega_flow[i]);
            row.e_vvr_sens_strike = n.vega_flow[i] * (1.0 + u_vol);
            row.e_vfi_sens_strike = n.vega_flow[i].abs() * time_factor;

            let imbalance = safe_div(
                row.call_volume - row.put_volume,
                row.call_volume + row.put_volume,
                0.0,
            );
            row.arfi_strike = imbalance * (1.0 + n.nvp[i].abs());

            finite("a_dag_strike", row.a_dag_strike)?;
            finite("vri_2_0_strike", row.vri_2_0_strike)?;
            finite("d_tdpi_strike", row.d_tdpi_strike)?;
        }

        tracing::debug!(regime = %regime, multiplier = m, strikes = ctx.strikes.len(), "adaptive metrics computed");
        ctx.underlying.current_market_regime = Some(regime);
        Ok(())
    }
}
