//! Elite composite impact scoring and classification.

pub mod classification;
pub mod composite;
pub mod strike;

use anyhow::Result;

use crate::stage::{MetricStage, StageContext};

pub use classification::{classify_flow, classify_market, classify_volatility};
pub use composite::{transition_risk, CompositeImpact, ImpactComponents};
pub use strike::{apply_strike_pass, scaled_impact};

pub struct EliteStage;

impl MetricStage for EliteStage {
    fn name(&self) -> &str {
        "elite"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let metrics = ctx.config;
        let config = &metrics.elite;
        let und = &ctx.underlying;

        let delta_flow = und
            .net_cust_delta_flow_und
            .unwrap_or_else(|| ctx.strikes.iter().map(|s| s.net_cust_delta_flow_at_strike).sum());
        let components =
            ImpactComponents::from_underlying(und, delta_flow, config, metrics.contract_multiplier);
        let impact = CompositeImpact::combine(&components, config);
        anyhow::ensure!(
            impact.score.is_finite() && impact.confidence.is_finite(),
            "composite score is not finite ({impact:?})"
        );

        let risk = transition_risk(&impact, und.current_market_regime, config);
        let volatility = classify_volatility(und.impl_vol_atm.unwrap_or(und.raw.u_volatility), config);
        let regime = classify_market(impact.score, risk, volatility, config);
        let flow_type = classify_flow(&components, config);
        let price = und.price();

        tracing::debug!(
            score = impact.score,
            confidence = impact.confidence,
            transition_risk = risk,
            regime = %regime,
            flow_type = %flow_type,
            volatility = %volatility,
            "elite impact computed"
        );

        apply_strike_pass(&mut ctx.strikes, &impact, price, config);

        let und = &mut ctx.underlying;
        und.elite_impact_score_und = Some(impact.score);
        und.institutional_flow_score_und = components.institutional;
        und.flow_momentum_index_und = components.momentum;
        und.market_regime_elite = Some(regime);
        und.flow_type_elite = Some(flow_type);
        und.volatility_regime_elite = Some(volatility);
        und.confidence = impact.confidence;
        und.transition_risk = risk;
        Ok(())
    }
}
