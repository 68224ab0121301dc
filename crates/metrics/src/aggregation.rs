//! Contract-level exposures and the per-strike aggregation table.

use std::collections::BTreeMap;

use eots_core::{ProcessedContractMetrics, RawOptionsContract, RawUnderlyingData, StrikeMetrics};
use rust_decimal::Decimal;

/// Derives exposures for every contract in the chain.
#[must_use]
pub fn build_contract_metrics(
    chain: Vec<RawOptionsContract>,
    dte_max: f64,
) -> Vec<ProcessedContractMetrics> {
    chain
        .into_iter()
        .map(|raw| ProcessedContractMetrics::from_raw(raw, dte_max))
        .collect()
}

#[derive(Default)]
struct DteAccumulator {
    weighted_sum: f64,
    volume: f64,
    plain_sum: f64,
    count: usize,
}

impl DteAccumulator {
    fn add(&mut self, dte: f64, volume: f64) {
        self.weighted_sum += dte * volume;
        self.volume += volume;
        self.plain_sum += dte;
        self.count += 1;
    }

    fn mean(&self) -> f64 {
        if self.volume > 0.0 {
            self.weighted_sum / self.volume
        } else if self.count > 0 {
            self.plain_sum / self.count as f64
        } else {
            0.0
        }
    }
}

/// Groups contracts by strike, summing activity and exposures separately for
/// calls and puts. Contracts outside the DTE window are skipped. Rows come
/// back in ascending strike order.
#[must_use]
pub fn aggregate_strikes(
    contracts: &[ProcessedContractMetrics],
    underlying: &RawUnderlyingData,
) -> Vec<StrikeMetrics> {
    let mut table: BTreeMap<Decimal, (StrikeMetrics, DteAccumulator)> = BTreeMap::new();

    for contract in contracts.iter().filter(|c| c.within_dte_window) {
        let raw = &contract.raw;
        let strike = raw.strike.normalize();
        let (row, dte) = table.entry(strike).or_insert_with(|| {
            (
                StrikeMetrics::new(strike, underlying),
                DteAccumulator::default(),
            )
        });

        let volume = raw.volume();
        let oi = raw.oi();
        if raw.is_call() {
            row.call_volume += volume;
            row.call_oi += oi;
            row.call_gxoi += contract.gxoi;
        } else {
            row.put_volume += volume;
            row.put_oi += oi;
            row.put_gxoi += contract.gxoi;
        }

        row.total_delta += raw.delta_contract.unwrap_or(0.0);
        row.total_gamma += raw.gamma_contract.unwrap_or(0.0);
        row.total_vega += raw.vega_contract.unwrap_or(0.0);
        row.total_theta += raw.theta_contract.unwrap_or(0.0);

        row.dxoi += contract.dxoi;
        row.vxoi += contract.vxoi;
        row.txoi += contract.txoi;

        row.net_cust_delta_flow_at_strike += contract.delta_flow;
        row.net_cust_gamma_flow_at_strike += contract.gamma_flow;
        row.net_cust_vega_flow_at_strike += contract.vega_flow;
        row.net_cust_theta_flow_at_strike += contract.theta_flow;

        row.nvp_at_strike += raw.value_bs.unwrap_or(0.0);
        row.nvp_vol_at_strike += raw.volm_bs.unwrap_or(0.0);

        dte.add(raw.dte_calc, volume);
    }

    table
        .into_values()
        .map(|(mut row, dte)| {
            row.total_volume = row.call_volume + row.put_volume;
            row.total_oi = row.call_oi + row.put_oi;
            row.net_gxoi = row.call_gxoi - row.put_gxoi;
            row.avg_dte = dte.mean();
            row
        })
        .collect()
}
