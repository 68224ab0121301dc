//! Elite labels: market regime, flow type and volatility regime.

use eots_core::{EliteConfig, FlowType, MarketRegime, VolatilityRegime};

use super::composite::ImpactComponents;

/// Transition risk above which the regime is labelled transitional.
const TRANSITION_RISK_THRESHOLD: f64 = 0.7;

/// Structure magnitude below which large premium reads as hedging.
const HEDGING_STRUCTURE_CEILING: f64 = 0.1;

#[must_use]
pub fn classify_volatility(volatility: f64, config: &EliteConfig) -> VolatilityRegime {
    if volatility < config.low_vol_threshold {
        VolatilityRegime::Low
    } else if volatility < config.elevated_vol_threshold {
        VolatilityRegime::Normal
    } else if volatility < config.extreme_vol_threshold {
        VolatilityRegime::Elevated
    } else {
        VolatilityRegime::Extreme
    }
}

#[must_use]
pub fn classify_flow(components: &ImpactComponents, config: &EliteConfig) -> FlowType {
    if let Some(institutional) = components.institutional {
        if institutional.abs() >= config.institutional_flow_threshold {
            let structure = components.structure.unwrap_or(0.0);
            return if structure.abs() < HEDGING_STRUCTURE_CEILING {
                FlowType::Hedging
            } else if institutional > 0.0 {
                FlowType::InstitutionalBuying
            } else {
                FlowType::InstitutionalSelling
            };
        }
    }

    match components.flow {
        Some(flow) if flow >= config.retail_flow_threshold => FlowType::RetailBullish,
        Some(flow) if flow <= -config.retail_flow_threshold => FlowType::RetailBearish,
        _ => FlowType::Neutral,
    }
}

#[must_use]
pub fn classify_market(
    score: f64,
    transition_risk: f64,
    volatility: VolatilityRegime,
    config: &EliteConfig,
) -> MarketRegime {
    if volatility == VolatilityRegime::Extreme {
        MarketRegime::HighVolatility
    } else if transition_risk > TRANSITION_RISK_THRESHOLD {
        MarketRegime::Transitional
    } else if score > config.trend_score_threshold {
        MarketRegime::BullishTrend
    } else if score < -config.trend_score_threshold {
        MarketRegime::BearishTrend
    } else if volatility == VolatilityRegime::Low {
        MarketRegime::LowVolatilityRange
    } else {
        MarketRegime::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volatility_bands() {
        let config = EliteConfig::default();
        assert_eq!(classify_volatility(0.10, &config), VolatilityRegime::Low);
        assert_eq!(classify_volatility(0.20, &config), VolatilityRegime::Normal);
        assert_eq!(classify_volatility(0.30, &config), VolatilityRegime::Elevated);
        assert_eq!(classify_volatility(0.80, &config), VolatilityRegime::Extreme);
    }

    #[test]
    fn institutional_flow_beats_retail() {
        let config = EliteConfig::default();
        let buying = ImpactComponents {
            flow: Some(-0.9),
            institutional: Some(0.8),
            structure: Some(0.4),
            ..ImpactComponents::default()
        };
        assert_eq!(classify_flow(&buying, &config), FlowType::InstitutionalBuying);

        let hedging = ImpactComponents {
            institutional: Some(-0.8),
            structure: Some(0.02),
            ..ImpactComponents::default()
        };
        assert_eq!(classify_flow(&hedging, &config), FlowType::Hedging);
    }

    #[test]
    fn retail_and_neutral_flow() {
        let config = EliteConfig::default();
        let bearish = ImpactComponents {
            flow: Some(-0.3),
            institutional: Some(0.1),
            ..ImpactComponents::default()
        };
        assert_eq!(classify_flow(&bearish, &config), FlowType::RetailBearish);
        assert_eq!(classify_flow(&ImpactComponents::default(), &config), FlowType::Neutral);
    }

    #[test]
    fn market_regime_precedence() {
        let config = EliteConfig::default();
        assert_eq!(
            classify_market(90.0, 0.0, VolatilityRegime::Extreme, &config),
            MarketRegime::HighVolatility
        );
        assert_eq!(
            classify_market(90.0, 0.9, VolatilityRegime::Normal, &config),
            MarketRegime::Transitional
        );
        assert_eq!(
            classify_market(40.0, 0.1, VolatilityRegime::Normal, &config),
            MarketRegime::BullishTrend
        );
        assert_eq!(
            classify_market(-40.0, 0.1, VolatilityRegime::Normal, &config),
            MarketRegime::BearishTrend
        );
        assert_eq!(
            classify_market(5.0, 0.1, VolatilityRegime::Low, &config),
            MarketRegime::LowVolatilityRange
        );
        assert_eq!(
            classify_market(5.0, 0.1, VolatilityRegime::Normal, &config),
            MarketRegime::Neutral
        );
    }
}
