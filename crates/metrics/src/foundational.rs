//! Gamma imbalance, session-weighted gamma and net customer Greek flows.

use anyhow::Result;
use eots_core::{session_progress, MarketSession};

use crate::stage::{finite, MetricStage, StageContext};

pub struct FoundationalStage;

impl MetricStage for FoundationalStage {
    fn name(&self) -> &str {
        "foundational"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let raw = &ctx.underlying.raw;
        let price = raw.price;

        let gib_raw = match (raw.call_gxoi, raw.put_gxoi) {
            (Some(call), Some(put)) => call - put,
            _ => ctx.strikes.iter().map(|s| s.net_gxoi).sum(),
        };
        let gib_dollar = finite(
            "gib_dollar_value_full_und",
            gib_raw * price * price * 0.01 * ctx.config.contract_multiplier,
        )?;

        let session = MarketSession::from_timestamp(raw.timestamp);
        let progress = session_progress(raw.timestamp);
        let open = raw.day_open_price_und;
        let hp_eod = (open > 0.0).then(|| gib_dollar * (price - open) / open);

        let delta_flow: f64 = ctx.strikes.iter().map(|s| s.net_cust_delta_flow_at_strike).sum();
        let gamma_flow: f64 = ctx.strikes.iter().map(|s| s.net_cust_gamma_flow_at_strike).sum();
        let vega_flow: f64 = ctx.strikes.iter().map(|s| s.net_cust_vega_flow_at_strike).sum();
        let theta_flow: f64 = ctx.strikes.iter().map(|s| s.net_cust_theta_flow_at_strike).sum();

        tracing::debug!(
            gib_raw,
            gib_dollar,
            session = ?session,
            progress,
            "foundational metrics computed"
        );

        let und = &mut ctx.underlying;
        und.gib_raw_gamma_units_und = Some(finite("gib_raw_gamma_units_und", gib_raw)?);
        und.gib_dollar_value_full_und = Some(gib_dollar);
        und.gib_oi_based_und = Some(gib_dollar);
        und.td_gib_und = Some(gib_dollar * progress);
        und.hp_eod_und = hp_eod;
        und.market_session = Some(session);
        und.net_cust_delta_flow_und = Some(finite("net_cust_delta_flow_und", delta_flow)?);
        und.net_cust_gamma_flow_und = Some(finite("net_cust_gamma_flow_und", gamma_flow)?);
        und.net_cust_vega_flow_und = Some(finite("net_cust_vega_flow_und", vega_flow)?);
        und.net_cust_theta_flow_und = Some(finite("net_cust_theta_flow_und", theta_flow)?);
        Ok(())
    }
}
