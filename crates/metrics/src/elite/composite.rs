//! Composite impact scoring.
//!
//! Four sub-signals, each already in [-1, 1], are combined with a weighted
//! average over whichever components are available. The result is scaled so
//! the score lies in [-score_scale, score_scale].

use eots_core::stats::{mean, safe_div};
use eots_core::{EliteConfig, MarketRegime, RawUnderlyingData, UnderlyingAggregates};
use serde::Serialize;

/// Boost applied to institutional intensity when VAPI-FA confirms it.
const VAPI_BOOST: f64 = 0.5;

/// Normalized sub-signals feeding the composite score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ImpactComponents {
    pub flow: Option<f64>,
    pub momentum: Option<f64>,
    pub institutional: Option<f64>,
    pub structure: Option<f64>,
}

impl ImpactComponents {
    /// Derives every component from an enriched underlying record.
    #[must_use]
    pub fn from_underlying(
        und: &UnderlyingAggregates,
        delta_flow: f64,
        config: &EliteConfig,
        contract_multiplier: f64,
    ) -> Self {
        let premium = und.raw.value_bs.or(und.total_nvp_und);
        let contracts = und.raw.volm_bs.or(und.total_nvp_vol_und);
        Self {
            flow: flow_component(und),
            momentum: flow_momentum_index(&und.raw),
            institutional: institutional_component(
                premium,
                contracts,
                und.vapi_fa_z_score_und,
                config,
                contract_multiplier,
            ),
            structure: Some(structure_component(delta_flow, config)),
        }
    }

    fn weighted(&self, config: &EliteConfig) -> [(f64, Option<f64>); 4] {
        [
            (config.flow_weight, self.flow),
            (config.momentum_weight, self.momentum),
            (config.institutional_weight, self.institutional),
            (config.structure_weight, self.structure),
        ]
    }
}

/// Mean of the available flow z-scores, divided by 3 and clamped to [-1, 1].
#[must_use]
pub fn flow_component(und: &UnderlyingAggregates) -> Option<f64> {
    let zs: Vec<f64> = [
        und.vapi_fa_z_score_und,
        und.dwfd_z_score_und,
        und.tw_laf_z_score_und,
    ]
    .into_iter()
    .flatten()
    .collect();
    mean(&zs).map(|z| (z / 3.0).clamp(-1.0, 1.0))
}

/// Compares the 5m per-minute value flow rate with the longest window
/// available. Positive when recent flow runs ahead of the longer trend.
#[must_use]
pub fn flow_momentum_index(raw: &RawUnderlyingData) -> Option<f64> {
    let short = raw.net_value_flow_5m_und? / 5.0;
    let long = raw
        .net_value_flow_60m_und
        .map(|v| v / 60.0)
        .or_else(|| raw.net_value_flow_30m_und.map(|v| v / 30.0))
        .or_else(|| raw.net_value_flow_15m_und.map(|v| v / 15.0))?;
    Some(safe_div(short - long, short.abs() + long.abs(), 0.0).clamp(-1.0, 1.0))
}

/// Premium-per-contract intensity, signed by net premium direction.
///
/// `None` without both net premium and a non-zero net contract count.
#[must_use]
pub fn institutional_component(
    net_premium: Option<f64>,
    net_contracts: Option<f64>,
    vapi_z: Option<f64>,
    config: &EliteConfig,
    contract_multiplier: f64,
) -> Option<f64> {
    let premium = net_premium?;
    let contracts = net_contracts?;
    if contracts.abs() < f64::EPSILON || premium.abs() < f64::EPSILON {
        return None;
    }

    let per_contract = premium.abs() / (contracts.abs() * contract_multiplier);
    let intensity = (per_contract / config.institutional_premium_threshold).clamp(0.0, 1.0);
    let boost = match vapi_z {
        Some(z) if z.signum() == premium.signum() => {
            1.0 + VAPI_BOOST * (z.abs() / 3.0).clamp(0.0, 1.0)
        }
        _ => 1.0,
    };
    Some((premium.signum() * intensity * boost).clamp(-1.0, 1.0))
}

/// Customer delta positioning, squashed into [-1, 1].
#[must_use]
pub fn structure_component(delta_flow: f64, config: &EliteConfig) -> f64 {
    (delta_flow / config.delta_flow_scale).tanh()
}

/// The combined score with its confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompositeImpact {
    /// In [-score_scale, score_scale].
    pub score: f64,
    /// In [0, 1].
    pub confidence: f64,
    /// Share of the total weight carried by available components.
    pub coverage: f64,
    /// Directional agreement of available components, in [0, 1].
    pub agreement: f64,
}

impl CompositeImpact {
    #[must_use]
    pub fn neutral() -> Self {
        Self {
            score: 0.0,
            confidence: 0.0,
            coverage: 0.0,
            agreement: 0.0,
        }
    }

    /// Weighted average of available components, scaled by `score_scale`.
    #[must_use]
    pub fn combine(components: &ImpactComponents, config: &EliteConfig) -> Self {
        let weighted = components.weighted(config);
        let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();

        let available: Vec<(f64, f64)> = weighted
            .iter()
            .filter_map(|(w, c)| c.map(|c| (*w, c.clamp(-1.0, 1.0))))
            .collect();
        let available_weight: f64 = available.iter().map(|(w, _)| w).sum();
        if available_weight < f64::EPSILON || total_weight < f64::EPSILON {
            return Self::neutral();
        }

        let signed: f64 = available.iter().map(|(w, c)| w * c).sum();
        let magnitude: f64 = available.iter().map(|(w, c)| w * c.abs()).sum();

        let coverage = (available_weight / total_weight).clamp(0.0, 1.0);
        let agreement = safe_div(signed.abs(), magnitude, 0.0).clamp(0.0, 1.0);
        let score = (config.score_scale * signed / available_weight)
            .clamp(-config.score_scale, config.score_scale);
        // no negative zero in the output
        let score = if score == 0.0 { 0.0 } else { score };
        let confidence = (coverage * (0.5 + 0.5 * agreement)).clamp(0.0, 1.0);

        Self {
            score,
            confidence,
            coverage,
            agreement,
        }
    }
}

/// Likelihood of a regime change, in [0, 1].
///
/// Rises when components disagree and when the score points against the
/// adaptive regime's trend.
#[must_use]
pub fn transition_risk(
    impact: &CompositeImpact,
    regime: Option<MarketRegime>,
    config: &EliteConfig,
) -> f64 {
    let threshold = config.trend_score_threshold;
    let conflict = match regime {
        Some(MarketRegime::Transitional) => 1.0,
        Some(MarketRegime::BullishTrend) if impact.score < -threshold => 1.0,
        Some(MarketRegime::BearishTrend) if impact.score > threshold => 1.0,
        _ => 0.0,
    };
    (0.6 * (1.0 - impact.agreement) + 0.4 * conflict).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn components(flow: f64, momentum: f64, institutional: f64, structure: f64) -> ImpactComponents {
        ImpactComponents {
            flow: Some(flow),
            momentum: Some(momentum),
            institutional: Some(institutional),
            structure: Some(structure),
        }
    }

    #[test]
    fn unanimous_components_hit_the_bounds() {
        let config = EliteConfig::default();
        let bull = CompositeImpact::combine(&components(1.0, 1.0, 1.0, 1.0), &config);
        assert!((bull.score - 100.0).abs() < 1e-9);
        assert!((bull.confidence - 1.0).abs() < 1e-9);

        let bear = CompositeImpact::combine(&components(-1.0, -1.0, -1.0, -1.0), &config);
        assert!((bear.score + 100.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_components_are_clamped() {
        let config = EliteConfig::default();
        let impact = CompositeImpact::combine(&components(7.0, 3.0, -9.0, 2.0), &config);
        assert!(impact.score.abs() <= 100.0);
        assert!((0.0..=1.0).contains(&impact.confidence));
    }

    #[test]
    fn missing_components_reduce_confidence() {
        let config = EliteConfig::default();
        let partial = ImpactComponents {
            flow: Some(0.5),
            structure: Some(0.5),
            ..ImpactComponents::default()
        };
        let impact = CompositeImpact::combine(&partial, &config);
        assert!((impact.score - 50.0).abs() < 1e-9);
        assert!((impact.coverage - 0.5).abs() < 1e-9);
        assert!((impact.confidence - 0.5).abs() < 1e-9);

        let none = CompositeImpact::combine(&ImpactComponents::default(), &config);
        assert_eq!(none, CompositeImpact::neutral());
    }

    #[test]
    fn zero_score_is_positive_zero() {
        let config = EliteConfig::default();
        let flat = CompositeImpact::combine(&components(-0.0, -0.0, -0.0, -0.0), &config);
        assert_eq!(flat.score, 0.0);
        assert!(flat.score.is_sign_positive());
    }

    #[test]
    fn disagreement_lowers_agreement() {
        let config = EliteConfig::default();
        let mixed = CompositeImpact::combine(&components(1.0, -1.0, 1.0, -1.0), &config);
        assert!(mixed.agreement < 0.5);
        assert!(transition_risk(&mixed, None, &config) > 0.3);
    }

    #[test]
    fn institutional_intensity_signed_and_boosted() {
        let config = EliteConfig::default();
        // $1_000_000 over 1_000 contracts = $10 per share, above the $5 threshold
        let buy = institutional_component(Some(1_000_000.0), Some(1_000.0), None, &config, 100.0);
        assert_eq!(buy, Some(1.0));

        let small = institutional_component(Some(-50_000.0), Some(500.0), None, &config, 100.0)
            .unwrap();
        assert!((small - -0.2).abs() < 1e-12);

        let boosted =
            institutional_component(Some(-50_000.0), Some(500.0), Some(-3.0), &config, 100.0)
                .unwrap();
        assert!((boosted - -0.3).abs() < 1e-12);

        assert!(institutional_component(Some(1.0), Some(0.0), None, &config, 100.0).is_none());
        assert!(institutional_component(None, Some(10.0), None, &config, 100.0).is_none());
    }

    #[test]
    fn momentum_compares_short_and_long_rates() {
        let raw = RawUnderlyingData::new("SPY", chrono::Utc::now(), 450.0)
            .with_value_flows([50_000.0, 90_000.0, 120_000.0, 120_000.0]);
        // 10_000/min vs 2_000/min
        let fmi = flow_momentum_index(&raw).unwrap();
        assert!((fmi - 8_000.0 / 12_000.0).abs() < 1e-12);

        let bare = RawUnderlyingData::new("SPY", chrono::Utc::now(), 450.0);
        assert!(flow_momentum_index(&bare).is_none());
    }

    #[test]
    fn transition_risk_flags_conflict_with_trend() {
        let config = EliteConfig::default();
        let impact = CompositeImpact {
            score: -60.0,
            confidence: 1.0,
            coverage: 1.0,
            agreement: 1.0,
        };
        assert!((transition_risk(&impact, Some(MarketRegime::BullishTrend), &config) - 0.4).abs() < 1e-12);
        assert_eq!(transition_risk(&impact, Some(MarketRegime::BearishTrend), &config), 0.0);
    }
}
