//! Per-strike elite fields derived from the composite score.

use eots_core::stats::{mean, population_std};
use eots_core::{EliteConfig, StrikeMetrics};

use super::composite::CompositeImpact;

/// Impact score carried to a strike at `distance` (relative to the price).
///
/// Magnitude strictly decreases as the strike moves away from the price.
#[must_use]
pub fn scaled_impact(score: f64, distance: f64, decay: f64) -> f64 {
    score / (1.0 + decay * distance.abs())
}

/// Confidence discount for strikes far from the price, floored at 0.1.
#[must_use]
pub fn distance_factor(distance: f64) -> f64 {
    (1.0 - 2.0 * distance.abs()).max(0.1)
}

/// Writes SDAG consensus, prediction confidence, signal strength, strike
/// magnetism, volatility pressure and the propagated impact score.
pub fn apply_strike_pass(
    strikes: &mut [StrikeMetrics],
    impact: &CompositeImpact,
    price: f64,
    config: &EliteConfig,
) {
    for row in strikes.iter_mut() {
        let methods = [
            row.e_sdag_mult_strike,
            row.e_sdag_dir_strike,
            row.e_sdag_w_strike,
            row.e_sdag_vf_strike,
        ];
        let consensus = mean(&methods).unwrap_or(0.0);
        let consistency = 1.0 / (1.0 + population_std(&methods).unwrap_or(0.0));
        let distance = row.relative_distance(price);
        let proximity = 1.0 / (1.0 + config.distance_decay * distance);

        row.sdag_consensus = Some(consensus);
        row.prediction_confidence =
            Some((impact.confidence * consistency * distance_factor(distance)).clamp(0.0, 1.0));
        row.signal_strength = Some((consensus.abs().tanh() * consistency).clamp(0.0, 1.0));
        row.strike_magnetism_index =
            Some(((row.call_gxoi + row.put_gxoi) / config.magnetism_scale).tanh() * proximity);
        row.volatility_pressure_index = Some((row.vxoi / config.vega_pressure_scale).tanh());
        row.elite_impact_score = Some(scaled_impact(impact.score, distance, config.distance_decay));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eots_core::RawUnderlyingData;
    use rust_decimal_macros::dec;

    #[test]
    fn impact_shrinks_with_distance() {
        let near = scaled_impact(80.0, 0.01, 10.0);
        let far = scaled_impact(80.0, 0.05, 10.0);
        assert!(near.abs() > far.abs());
        assert_eq!(scaled_impact(80.0, 0.0, 10.0), 80.0);
        assert!(scaled_impact(-80.0, 0.05, 10.0) < 0.0);
    }

    #[test]
    fn distance_factor_floors() {
        assert_eq!(distance_factor(0.0), 1.0);
        assert!((distance_factor(0.25) - 0.5).abs() < 1e-12);
        assert_eq!(distance_factor(3.0), 0.1);
    }

    #[test]
    fn strike_pass_fills_every_field() {
        let config = EliteConfig::default();
        let und = RawUnderlyingData::new("SPY", Utc::now(), 100.0);
        let mut near = StrikeMetrics::new(dec!(101), &und);
        near.e_sdag_mult_strike = 1.0;
        near.e_sdag_dir_strike = 1.0;
        near.e_sdag_w_strike = 1.0;
        near.e_sdag_vf_strike = 1.0;
        near.call_gxoi = 5_000.0;
        let far = StrikeMetrics::new(dec!(120), &und);
        let mut strikes = vec![near, far];

        let impact = CompositeImpact {
            score: 50.0,
            confidence: 0.8,
            coverage: 1.0,
            agreement: 1.0,
        };
        apply_strike_pass(&mut strikes, &impact, 100.0, &config);

        let near = &strikes[0];
        assert_eq!(near.sdag_consensus, Some(1.0));
        // unanimous methods: consistency 1, distance factor 0.98
        assert!((near.prediction_confidence.unwrap() - 0.8 * 0.98).abs() < 1e-12);
        assert!(near.strike_magnetism_index.unwrap() > 0.0);

        let far = &strikes[1];
        assert!(far.elite_impact_score.unwrap() < near.elite_impact_score.unwrap());
        assert_eq!(far.signal_strength, Some(0.0));
        assert_eq!(far.volatility_pressure_index, Some(0.0));
    }
}
