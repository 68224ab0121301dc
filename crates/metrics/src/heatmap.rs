//! Heatmap scores: proximity-weighted gamma hedging pressure (SGDHP) and the
//! unified Greek concentration score (UGCH).

use anyhow::Result;
use eots_core::HeatmapConfig;

use crate::adaptive::NormalizedExposures;
use crate::stage::{finite, MetricStage, StageContext};

/// Proximity weight of a strike to the underlying price, in (0, 1].
#[must_use]
pub fn proximity(strike: f64, price: f64, config: &HeatmapConfig) -> f64 {
    if price <= 0.0 {
        return 0.0;
    }
    (-(strike - price).abs() / price / config.proximity_bandwidth).exp()
}

pub struct HeatmapStage;

impl MetricStage for HeatmapStage {
    fn name(&self) -> &str {
        "heatmap"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let config = &ctx.config.heatmap;
        let price = ctx.underlying.price();
        let n = NormalizedExposures::from_strikes(&ctx.strikes);
        let weight_sum =
            config.delta_weight + config.gamma_weight + config.vega_weight + config.theta_weight;

        for (i, row) in ctx.strikes.iter_mut().enumerate() {
            let (g, d, v, t) = (n.gamma[i], n.delta[i], n.vega[i], n.theta[i]);
            let p = proximity(row.strike_f64(), price, config);

            row.sgdhp_score_strike = finite("sgdhp_score_strike", g * (1.0 + d.abs()) * p)?;
            row.ugch_score_strike = finite(
                "ugch_score_strike",
                (config.delta_weight * d
                    + config.gamma_weight * g
                    + config.vega_weight * v
                    + config.theta_weight * t)
                    / weight_sum,
            )?;
        }

        tracing::debug!(strikes = ctx.strikes.len(), "heatmap scores computed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eots_core::{
        InMemoryHistory, MetricsConfig, RawUnderlyingData, StrikeMetrics, UnderlyingAggregates,
    };
    use rust_decimal_macros::dec;

    #[test]
    fn proximity_decays_with_distance() {
        let config = HeatmapConfig::default();
        assert!((proximity(100.0, 100.0, &config) - 1.0).abs() < 1e-12);
        let near = proximity(101.0, 100.0, &config);
        let far = proximity(105.0, 100.0, &config);
        assert!(near > far);
        assert!((near - (-0.5_f64).exp()).abs() < 1e-12);
        assert_eq!(proximity(100.0, 0.0, &config), 0.0);
    }

    #[test]
    fn sgdhp_peaks_at_the_money() {
        let config = MetricsConfig::default();
        let history = InMemoryHistory::new();
        let und = RawUnderlyingData::new("SPY", Utc::now(), 100.0);

        let mut atm = StrikeMetrics::new(dec!(100), &und);
        atm.net_gxoi = 10.0;
        let mut otm = StrikeMetrics::new(dec!(110), &und);
        otm.net_gxoi = 10.0;
        otm.vxoi = 5.0;

        let mut ctx = StageContext::new(
            &config,
            &[],
            &history,
            vec![atm, otm],
            UnderlyingAggregates::from_raw(und),
        );
        HeatmapStage.run(&mut ctx).unwrap();
        let (strikes, _, _) = ctx.into_parts();

        assert!((strikes[0].sgdhp_score_strike - 1.0).abs() < 1e-12);
        assert!(strikes[1].sgdhp_score_strike < 0.01);
        // ugch: gamma weight 1.5 (+ vega 0.8 on the second) over a total of 3.8
        assert!((strikes[0].ugch_score_strike - 1.5 / 3.8).abs() < 1e-12);
        assert!((strikes[1].ugch_score_strike - 2.3 / 3.8).abs() < 1e-12);
    }
}
