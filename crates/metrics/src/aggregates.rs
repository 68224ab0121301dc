//! Structural pressure (A-MSPI) per strike and underlying-level summaries.

use std::collections::BTreeMap;

use anyhow::Result;
use eots_core::stats::{alignment, mean, safe_div};
use eots_core::{ProcessedContractMetrics, StrikeMetrics};
use rust_decimal::Decimal;

use crate::adaptive::normalized_column;
use crate::heatmap::proximity;
use crate::stage::{finite, MetricStage, StageContext};

/// A-MSPI blend weights for A-DAG, E-SDAG (weighted), D-TDPI and VRI 2.0.
const MSPI_WEIGHTS: [f64; 4] = [0.35, 0.25, 0.2, 0.2];

/// Contracts with fewer days to expiry than this count as same-day.
const ZERO_DTE_CUTOFF: f64 = 1.0;

#[derive(Debug, Default)]
struct StrikeActivity {
    same_day_volume: f64,
    volume: f64,
    same_day_oi: f64,
    oi: f64,
}

impl StrikeActivity {
    /// Same-day share by volume, or by open interest when nothing traded.
    fn same_day_share(&self) -> f64 {
        if self.volume > 0.0 {
            self.same_day_volume / self.volume
        } else {
            safe_div(self.same_day_oi, self.oi, 0.0)
        }
    }
}

/// Underlying-level view of the same-day (0DTE) expiries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZeroDteSummary {
    /// VRI 2.0 attributable to same-day contracts, summed over strikes.
    pub vri_sum: f64,
    /// E-VFI sensitivity attributable to same-day contracts, summed.
    pub vfi_sum: f64,
    /// Same-day-share weighted mean of E-VVR sensitivity.
    pub vvr_avg: f64,
    /// Herfindahl concentration of same-day VRI across strikes, in [0, 1].
    pub vci: Option<f64>,
}

/// Splits each strike's VRI, VFI and VVR by the share of its activity in
/// same-day expiries. `None` when no same-day contract carries activity.
#[must_use]
pub fn zero_dte_summary(
    strikes: &[StrikeMetrics],
    contracts: &[ProcessedContractMetrics],
) -> Option<ZeroDteSummary> {
    let mut activity: BTreeMap<Decimal, StrikeActivity> = BTreeMap::new();
    for contract in contracts.iter().filter(|c| c.within_dte_window) {
        let raw = &contract.raw;
        let entry = activity.entry(raw.strike.normalize()).or_default();
        entry.volume += raw.volume();
        entry.oi += raw.oi();
        if raw.dte_calc < ZERO_DTE_CUTOFF {
            entry.same_day_volume += raw.volume();
            entry.same_day_oi += raw.oi();
        }
    }

    let shares: Vec<f64> = strikes
        .iter()
        .map(|row| {
            activity
                .get(&row.strike.normalize())
                .map_or(0.0, StrikeActivity::same_day_share)
        })
        .collect();
    let share_total: f64 = shares.iter().sum();
    if share_total <= 0.0 {
        return None;
    }

    let mut vri_sum = 0.0;
    let mut vfi_sum = 0.0;
    let mut vvr_weighted = 0.0;
    let mut vri_parts = Vec::with_capacity(strikes.len());
    for (row, share) in strikes.iter().zip(&shares) {
        let vri = share * row.vri_2_0_strike;
        vri_sum += vri;
        vfi_sum += share * row.e_vfi_sens_strike;
        vvr_weighted += share * row.e_vvr_sens_strike;
        vri_parts.push(vri.abs());
    }

    let vri_abs: f64 = vri_parts.iter().sum();
    let vci = (vri_abs > 0.0).then(|| {
        let squares: f64 = vri_parts.iter().map(|v| v * v).sum();
        (squares / (vri_abs * vri_abs)).clamp(0.0, 1.0)
    });

    Some(ZeroDteSummary {
        vri_sum,
        vfi_sum,
        vvr_avg: vvr_weighted / share_total,
        vci,
    })
}

pub struct AggregatesStage;

impl MetricStage for AggregatesStage {
    fn name(&self) -> &str {
        "aggregates"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let heatmap = &ctx.config.heatmap;
        let price = ctx.underlying.price();

        let a_dag = normalized_column(&ctx.strikes, |s| s.a_dag_strike);
        let sdag_w = normalized_column(&ctx.strikes, |s| s.e_sdag_w_strike);
        let sdag_mult = normalized_column(&ctx.strikes, |s| s.e_sdag_mult_strike);
        let tdpi = normalized_column(&ctx.strikes, |s| s.d_tdpi_strike);
        let vri = normalized_column(&ctx.strikes, |s| s.vri_2_0_strike);
        let weight_sum: f64 = MSPI_WEIGHTS.iter().sum();

        let mut weighted_mspi = 0.0;
        let mut proximity_sum = 0.0;
        let mut sai = Vec::with_capacity(ctx.strikes.len());
        let mut ssi = Vec::with_capacity(ctx.strikes.len());

        for (i, row) in ctx.strikes.iter_mut().enumerate() {
            let mspi = ((MSPI_WEIGHTS[0] * a_dag[i]
                + MSPI_WEIGHTS[1] * sdag_w[i]
                + MSPI_WEIGHTS[2] * tdpi[i]
                + MSPI_WEIGHTS[3] * vri[i])
                / weight_sum)
                .clamp(-1.0, 1.0);
            row.a_mspi_strike = finite("a_mspi_strike", mspi)?;

            let p = proximity(row.strike_f64(), price, heatmap);
            weighted_mspi += p * mspi;
            proximity_sum += p;

            sai.push(alignment(row.a_dag_strike, row.e_sdag_w_strike));
            ssi.push(1.0 - (a_dag[i] - sdag_mult[i]).abs() / 2.0);
        }

        let strikes = &ctx.strikes;
        let summary =
            (proximity_sum > 0.0).then(|| (weighted_mspi / proximity_sum).clamp(-1.0, 1.0));
        let vri_total: f64 = strikes.iter().map(|s| s.vri_2_0_strike).sum();
        let arfi: Vec<f64> = strikes.iter().map(|s| s.arfi_strike).collect();
        let total_nvp: f64 = strikes.iter().map(|s| s.nvp_at_strike).sum();
        let total_nvp_vol: f64 = strikes.iter().map(|s| s.nvp_vol_at_strike).sum();
        let max_gamma_strike: Option<Decimal> = strikes
            .iter()
            .filter(|s| s.net_gxoi != 0.0)
            .max_by(|a, b| a.net_gxoi.abs().total_cmp(&b.net_gxoi.abs()))
            .map(|s| s.strike);

        let zero_dte = zero_dte_summary(strikes, ctx.contracts);

        tracing::debug!(
            a_mspi = ?summary,
            max_gamma_strike = ?max_gamma_strike,
            zero_dte = ?zero_dte,
            "underlying aggregates computed"
        );

        let und = &mut ctx.underlying;
        und.a_mspi_und_summary_score = summary;
        und.a_sai_und_avg = mean(&sai);
        und.a_ssi_und_avg = mean(&ssi);
        und.vri_2_0_und_aggregate = Some(finite("vri_2_0_und_aggregate", vri_total)?);
        und.arfi_overall_und_avg = mean(&arfi);
        und.total_nvp_und = Some(total_nvp);
        und.total_nvp_vol_und = Some(total_nvp_vol);
        und.max_gamma_strike = max_gamma_strike;
        if let Some(zero) = zero_dte {
            und.vri_0dte_und_sum = Some(finite("vri_0dte_und_sum", zero.vri_sum)?);
            und.vfi_0dte_und_sum = Some(finite("vfi_0dte_und_sum", zero.vfi_sum)?);
            und.vvr_0dte_und_avg = Some(finite("vvr_0dte_und_avg", zero.vvr_avg)?);
            und.vci_0dte_agg = zero.vci;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use eots_core::{
        InMemoryHistory, MetricsConfig, OptionKind, RawOptionsContract, RawUnderlyingData,
        UnderlyingAggregates,
    };
    use rust_decimal_macros::dec;

    fn run(strikes: Vec<StrikeMetrics>, und: RawUnderlyingData) -> (Vec<StrikeMetrics>, UnderlyingAggregates) {
        let config = MetricsConfig::default();
        let history = InMemoryHistory::new();
        let mut ctx = StageContext::new(
            &config,
            &[],
            &history,
            strikes,
            UnderlyingAggregates::from_raw(und),
        );
        AggregatesStage.run(&mut ctx).unwrap();
        let (strikes, und, _) = ctx.into_parts();
        (strikes, und)
    }

    #[test]
    fn mspi_stays_in_unit_range_and_sums_are_totals() {
        let und = RawUnderlyingData::new("SPY", Utc::now(), 100.0);
        let mut a = StrikeMetrics::new(dec!(99), &und);
        a.a_dag_strike = 3.0;
        a.e_sdag_w_strike = 1.0;
        a.e_sdag_mult_strike = 3.0;
        a.d_tdpi_strike = -2.0;
        a.vri_2_0_strike = 0.5;
        a.nvp_at_strike = 1_000.0;
        a.net_gxoi = 40.0;
        a.arfi_strike = 0.5;
        let mut b = StrikeMetrics::new(dec!(101), &und);
        b.a_dag_strike = -1.0;
        b.e_sdag_w_strike = 2.0;
        b.e_sdag_mult_strike = 1.0;
        b.vri_2_0_strike = 1.0;
        b.nvp_at_strike = -400.0;
        b.net_gxoi = -60.0;
        b.arfi_strike = -0.1;

        let (strikes, agg) = run(vec![a, b], und);
        for row in &strikes {
            assert!(row.a_mspi_strike.abs() <= 1.0);
        }
        assert!(agg.a_mspi_und_summary_score.unwrap().abs() <= 1.0);
        // aligned at 99, opposed at 101
        assert_eq!(agg.a_sai_und_avg, Some(0.0));
        assert_eq!(agg.total_nvp_und, Some(600.0));
        assert!((agg.vri_2_0_und_aggregate.unwrap() - 1.5).abs() < 1e-12);
        assert!((agg.arfi_overall_und_avg.unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(agg.max_gamma_strike, Some(dec!(101)));
        let ssi = agg.a_ssi_und_avg.unwrap();
        assert!((0.0..=1.0).contains(&ssi));
    }

    #[test]
    fn empty_table_leaves_averages_unset() {
        let und = RawUnderlyingData::new("SPY", Utc::now(), 100.0);
        let (_, agg) = run(Vec::new(), und);
        assert!(agg.a_mspi_und_summary_score.is_none());
        assert!(agg.a_sai_und_avg.is_none());
        assert!(agg.max_gamma_strike.is_none());
        assert_eq!(agg.total_nvp_und, Some(0.0));
        assert!(agg.vri_0dte_und_sum.is_none());
        assert!(agg.vci_0dte_agg.is_none());
    }

    fn contract(strike: Decimal, kind: OptionKind, dte: f64, volume: f64) -> ProcessedContractMetrics {
        let raw = RawOptionsContract::new(strike, kind, dte).with_activity(volume, 1_000.0);
        ProcessedContractMetrics::from_raw(raw, 45.0)
    }

    #[test]
    fn zero_dte_share_splits_strike_metrics() {
        let und = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let mut near = StrikeMetrics::new(dec!(450), &und);
        near.vri_2_0_strike = 2.0;
        near.e_vfi_sens_strike = 4.0;
        near.e_vvr_sens_strike = 1.2;
        let mut far = StrikeMetrics::new(dec!(455), &und);
        far.vri_2_0_strike = 10.0;
        far.e_vvr_sens_strike = 9.0;

        let contracts = vec![
            contract(dec!(450), OptionKind::Call, 0.5, 300.0),
            contract(dec!(450), OptionKind::Put, 5.0, 100.0),
            contract(dec!(455), OptionKind::Call, 5.0, 500.0),
        ];

        let zero = zero_dte_summary(&[near, far], &contracts).unwrap();
        // three quarters of the 450 volume expires today, none of the 455
        assert!((zero.vri_sum - 1.5).abs() < 1e-12);
        assert!((zero.vfi_sum - 3.0).abs() < 1e-12);
        assert!((zero.vvr_avg - 1.2).abs() < 1e-12);
        assert_eq!(zero.vci, Some(1.0));
    }

    #[test]
    fn no_same_day_contracts_leaves_zero_dte_unset() {
        let und = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let mut row = StrikeMetrics::new(dec!(450), &und);
        row.vri_2_0_strike = 3.0;
        let contracts = vec![contract(dec!(450), OptionKind::Call, 2.0, 100.0)];

        assert!(zero_dte_summary(&[row.clone()], &contracts).is_none());

        let config = MetricsConfig::default();
        let history = InMemoryHistory::new();
        let same_day = vec![contract(dec!(450), OptionKind::Put, 0.0, 50.0)];
        let mut ctx = StageContext::new(
            &config,
            &same_day,
            &history,
            vec![row],
            UnderlyingAggregates::from_raw(und),
        );
        AggregatesStage.run(&mut ctx).unwrap();
        let (_, agg, _) = ctx.into_parts();
        assert_eq!(agg.vri_0dte_und_sum, Some(3.0));
        assert_eq!(agg.vci_0dte_agg, Some(1.0));
    }
}
