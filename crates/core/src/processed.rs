//! Outputs of a processing cycle: the strike table, the enriched underlying
//! record and the bundle that carries both.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::contract::ProcessedContractMetrics;
use crate::error::EotsResult;
use crate::regime::{FlowType, MarketRegime, MarketSession, TrendDirection, VolatilityRegime};
use crate::underlying::RawUnderlyingData;
use crate::validation::{
    ensure_finite, ensure_finite_opt, ensure_symmetric_range, ensure_unit_interval,
};

fn ensure_unit_interval_opt(record: &str, field: &str, value: Option<f64>) -> EotsResult<()> {
    value.map_or(Ok(()), |v| ensure_unit_interval(record, field, v))
}

fn ensure_symmetric_opt(record: &str, field: &str, value: Option<f64>, bound: f64) -> EotsResult<()> {
    value.map_or(Ok(()), |v| ensure_symmetric_range(record, field, v, bound))
}

/// Aggregated and derived metrics for a single strike.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrikeMetrics {
    pub strike: Decimal,
    pub symbol: String,
    pub timestamp: DateTime<Utc>,
    pub underlying_price: f64,

    // Activity
    pub call_volume: f64,
    pub put_volume: f64,
    pub total_volume: f64,
    pub call_oi: f64,
    pub put_oi: f64,
    pub total_oi: f64,

    // Summed per-contract Greeks
    pub total_delta: f64,
    pub total_gamma: f64,
    pub total_vega: f64,
    pub total_theta: f64,

    // OI-weighted exposures
    pub call_gxoi: f64,
    pub put_gxoi: f64,
    pub net_gxoi: f64,
    pub dxoi: f64,
    pub vxoi: f64,
    pub txoi: f64,

    // Volume-weighted Greek flow, the customer positioning proxy
    pub net_cust_delta_flow_at_strike: f64,
    pub net_cust_gamma_flow_at_strike: f64,
    pub net_cust_vega_flow_at_strike: f64,
    pub net_cust_theta_flow_at_strike: f64,

    pub nvp_at_strike: f64,
    pub nvp_vol_at_strike: f64,
    /// Volume-weighted mean days to expiry (simple mean when no volume traded).
    pub avg_dte: f64,

    // Adaptive
    pub a_dag_strike: f64,
    pub e_sdag_mult_strike: f64,
    pub e_sdag_dir_strike: f64,
    pub e_sdag_w_strike: f64,
    pub e_sdag_vf_strike: f64,
    pub d_tdpi_strike: f64,
    pub e_ctr_strike: f64,
    pub e_tdfi_strike: f64,
    pub vri_2_0_strike: f64,
    pub e_vvr_sens_strike: f64,
    pub e_vfi_sens_strike: f64,
    pub arfi_strike: f64,

    // Heatmap
    pub sgdhp_score_strike: f64,
    pub ugch_score_strike: f64,

    pub a_mspi_strike: f64,

    // Elite, unset until the elite stage succeeds
    pub sdag_consensus: Option<f64>,
    pub prediction_confidence: Option<f64>,
    pub signal_strength: Option<f64>,
    pub strike_magnetism_index: Option<f64>,
    pub volatility_pressure_index: Option<f64>,
    pub elite_impact_score: Option<f64>,
}

impl StrikeMetrics {
    /// Creates an empty row for `strike`, stamped from the underlying snapshot.
    #[must_use]
    pub fn new(strike: Decimal, underlying: &RawUnderlyingData) -> Self {
        Self {
            strike,
            symbol: underlying.symbol.clone(),
            timestamp: underlying.timestamp,
            underlying_price: underlying.price,
            ..Self::default()
        }
    }

    /// Strike as `f64` for numeric work. Decimal strikes are small enough
    /// that the conversion cannot fail in practice; zero is returned if it does.
    #[must_use]
    pub fn strike_f64(&self) -> f64 {
        self.strike.to_f64().unwrap_or(0.0)
    }

    /// Relative distance of the strike from the underlying price.
    #[must_use]
    pub fn relative_distance(&self, price: f64) -> f64 {
        (self.strike_f64() - price).abs() / price.abs().max(1.0)
    }

    /// Checks that every value is finite and bounded scores are in range.
    ///
    /// # Errors
    /// Returns a validation error naming the strike and the first bad field.
    pub fn validate(&self) -> EotsResult<()> {
        let record = format!("strike_metrics[{}]", self.strike);
        let values = [
            ("underlying_price", self.underlying_price),
            ("call_volume", self.call_volume),
            ("put_volume", self.put_volume),
            ("total_volume", self.total_volume),
            ("call_oi", self.call_oi),
            ("put_oi", self.put_oi),
            ("total_oi", self.total_oi),
            ("total_delta", self.total_delta),
            ("total_gamma", self.total_gamma),
            ("total_vega", self.total_vega),
            ("total_theta", self.total_theta),
            ("call_gxoi", self.call_gxoi),
            ("put_gxoi", self.put_gxoi),
            ("net_gxoi", self.net_gxoi),
            ("dxoi", self.dxoi),
            ("vxoi", self.vxoi),
            ("txoi", self.txoi),
            ("net_cust_delta_flow_at_strike", self.net_cust_delta_flow_at_strike),
            ("net_cust_gamma_flow_at_strike", self.net_cust_gamma_flow_at_strike),
            ("net_cust_vega_flow_at_strike", self.net_cust_vega_flow_at_strike),
            ("net_cust_theta_flow_at_strike", self.net_cust_theta_flow_at_strike),
            ("nvp_at_strike", self.nvp_at_strike),
            ("nvp_vol_at_strike", self.nvp_vol_at_strike),
            ("avg_dte", self.avg_dte),
            ("a_dag_strike", self.a_dag_strike),
            ("e_sdag_mult_strike", self.e_sdag_mult_strike),
            ("e_sdag_dir_strike", self.e_sdag_dir_strike),
            ("e_sdag_w_strike", self.e_sdag_w_strike),
            ("e_sdag_vf_strike", self.e_sdag_vf_strike),
            ("d_tdpi_strike", self.d_tdpi_strike),
            ("e_ctr_strike", self.e_ctr_strike),
            ("e_tdfi_strike", self.e_tdfi_strike),
            ("vri_2_0_strike", self.vri_2_0_strike),
            ("e_vvr_sens_strike", self.e_vvr_sens_strike),
            ("e_vfi_sens_strike", self.e_vfi_sens_strike),
            ("arfi_strike", self.arfi_strike),
            ("sgdhp_score_strike", self.sgdhp_score_strike),
            ("ugch_score_strike", self.ugch_score_strike),
        ];
        for (field, value) in values {
            ensure_finite(&record, field, value)?;
        }
        ensure_symmetric_range(&record, "a_mspi_strike", self.a_mspi_strike, 1.0)?;

        ensure_finite_opt(&record, "sdag_consensus", self.sdag_consensus)?;
        ensure_finite_opt(&record, "strike_magnetism_index", self.strike_magnetism_index)?;
        ensure_finite_opt(&record, "elite_impact_score", self.elite_impact_score)?;
        ensure_unit_interval_opt(&record, "prediction_confidence", self.prediction_confidence)?;
        ensure_unit_interval_opt(&record, "signal_strength", self.signal_strength)?;
        ensure_symmetric_opt(
            &record,
            "volatility_pressure_index",
            self.volatility_pressure_index,
            1.0,
        )
    }
}

/// The underlying snapshot plus every underlying-level enrichment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingAggregates {
    #[serde(flatten)]
    pub raw: RawUnderlyingData,

    // Foundational
    pub gib_oi_based_und: Option<f64>,
    pub gib_raw_gamma_units_und: Option<f64>,
    pub gib_dollar_value_full_und: Option<f64>,
    pub td_gib_und: Option<f64>,
    pub hp_eod_und: Option<f64>,
    pub net_cust_delta_flow_und: Option<f64>,
    pub net_cust_gamma_flow_und: Option<f64>,
    pub net_cust_vega_flow_und: Option<f64>,
    pub net_cust_theta_flow_und: Option<f64>,
    pub market_session: Option<MarketSession>,

    // Enhanced flow
    pub vapi_fa_raw_und: Option<f64>,
    pub vapi_fa_z_score_und: Option<f64>,
    pub dwfd_raw_und: Option<f64>,
    pub dwfd_z_score_und: Option<f64>,
    pub tw_laf_raw_und: Option<f64>,
    pub tw_laf_z_score_und: Option<f64>,

    // Adaptive context
    pub current_market_regime: Option<MarketRegime>,

    // Aggregates
    pub a_mspi_und_summary_score: Option<f64>,
    pub a_sai_und_avg: Option<f64>,
    pub a_ssi_und_avg: Option<f64>,
    pub vri_2_0_und_aggregate: Option<f64>,
    pub arfi_overall_und_avg: Option<f64>,
    pub total_nvp_und: Option<f64>,
    pub total_nvp_vol_und: Option<f64>,
    pub max_gamma_strike: Option<Decimal>,

    // Same-day expiry share of the aggregates, unset without 0DTE activity
    pub vri_0dte_und_sum: Option<f64>,
    pub vfi_0dte_und_sum: Option<f64>,
    pub vvr_0dte_und_avg: Option<f64>,
    pub vci_0dte_agg: Option<f64>,

    // Supplementary
    pub atr_und: Option<f64>,
    pub hist_vol_20d: Option<f64>,
    pub impl_vol_atm: Option<f64>,
    pub trend_strength: Option<f64>,
    pub trend_direction: Option<TrendDirection>,

    // Elite
    pub elite_impact_score_und: Option<f64>,
    pub institutional_flow_score_und: Option<f64>,
    pub flow_momentum_index_und: Option<f64>,
    pub market_regime_elite: Option<MarketRegime>,
    pub flow_type_elite: Option<FlowType>,
    pub volatility_regime_elite: Option<VolatilityRegime>,
    pub confidence: f64,
    pub transition_risk: f64,
}

impl UnderlyingAggregates {
    /// Wraps a raw snapshot with every enrichment unset.
    #[must_use]
    pub fn from_raw(raw: RawUnderlyingData) -> Self {
        Self {
            raw,
            gib_oi_based_und: None,
            gib_raw_gamma_units_und: None,
            gib_dollar_value_full_und: None,
            td_gib_und: None,
            hp_eod_und: None,
            net_cust_delta_flow_und: None,
            net_cust_gamma_flow_und: None,
            net_cust_vega_flow_und: None,
            net_cust_theta_flow_und: None,
            market_session: None,
            vapi_fa_raw_und: None,
            vapi_fa_z_score_und: None,
            dwfd_raw_und: None,
            dwfd_z_score_und: None,
            tw_laf_raw_und: None,
            tw_laf_z_score_und: None,
            current_market_regime: None,
            a_mspi_und_summary_score: None,
            a_sai_und_avg: None,
            a_ssi_und_avg: None,
            vri_2_0_und_aggregate: None,
            arfi_overall_und_avg: None,
            total_nvp_und: None,
            total_nvp_vol_und: None,
            max_gamma_strike: None,
            vri_0dte_und_sum: None,
            vfi_0dte_und_sum: None,
            vvr_0dte_und_avg: None,
            vci_0dte_agg: None,
            atr_und: None,
            hist_vol_20d: None,
            impl_vol_atm: None,
            trend_strength: None,
            trend_direction: None,
            elite_impact_score_und: None,
            institutional_flow_score_und: None,
            flow_momentum_index_und: None,
            market_regime_elite: None,
            flow_type_elite: None,
            volatility_regime_elite: None,
            confidence: 0.0,
            transition_risk: 0.0,
        }
    }

    #[must_use]
    pub fn price(&self) -> f64 {
        self.raw.price
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.raw.symbol
    }

    /// Checks enrichments: every value finite, scores and probabilities in
    /// range. `score_scale` bounds the elite impact score.
    ///
    /// # Errors
    /// Returns a validation error naming the first bad field.
    pub fn validate(&self, score_scale: f64) -> EotsResult<()> {
        const RECORD: &str = "underlying_enriched";
        let values = [
            ("gib_oi_based_und", self.gib_oi_based_und),
            ("gib_raw_gamma_units_und", self.gib_raw_gamma_units_und),
            ("gib_dollar_value_full_und", self.gib_dollar_value_full_und),
            ("td_gib_und", self.td_gib_und),
            ("hp_eod_und", self.hp_eod_und),
            ("net_cust_delta_flow_und", self.net_cust_delta_flow_und),
            ("net_cust_gamma_flow_und", self.net_cust_gamma_flow_und),
            ("net_cust_vega_flow_und", self.net_cust_vega_flow_und),
            ("net_cust_theta_flow_und", self.net_cust_theta_flow_und),
            ("vapi_fa_raw_und", self.vapi_fa_raw_und),
            ("vapi_fa_z_score_und", self.vapi_fa_z_score_und),
            ("dwfd_raw_und", self.dwfd_raw_und),
            ("dwfd_z_score_und", self.dwfd_z_score_und),
            ("tw_laf_raw_und", self.tw_laf_raw_und),
            ("tw_laf_z_score_und", self.tw_laf_z_score_und),
            ("a_sai_und_avg", self.a_sai_und_avg),
            ("vri_2_0_und_aggregate", self.vri_2_0_und_aggregate),
            ("arfi_overall_und_avg", self.arfi_overall_und_avg),
            ("total_nvp_und", self.total_nvp_und),
            ("total_nvp_vol_und", self.total_nvp_vol_und),
            ("vri_0dte_und_sum", self.vri_0dte_und_sum),
            ("vfi_0dte_und_sum", self.vfi_0dte_und_sum),
            ("vvr_0dte_und_avg", self.vvr_0dte_und_avg),
            ("atr_und", self.atr_und),
            ("hist_vol_20d", self.hist_vol_20d),
            ("impl_vol_atm", self.impl_vol_atm),
        ];
        for (field, value) in values {
            ensure_finite_opt(RECORD, field, value)?;
        }

        ensure_symmetric_opt(RECORD, "a_mspi_und_summary_score", self.a_mspi_und_summary_score, 1.0)?;
        ensure_unit_interval_opt(RECORD, "a_ssi_und_avg", self.a_ssi_und_avg)?;
        ensure_unit_interval_opt(RECORD, "vci_0dte_agg", self.vci_0dte_agg)?;
        ensure_unit_interval_opt(RECORD, "trend_strength", self.trend_strength)?;
        ensure_symmetric_opt(
            RECORD,
            "elite_impact_score_und",
            self.elite_impact_score_und,
            score_scale,
        )?;
        ensure_symmetric_opt(
            RECORD,
            "institutional_flow_score_und",
            self.institutional_flow_score_und,
            1.0,
        )?;
        ensure_symmetric_opt(RECORD, "flow_momentum_index_und", self.flow_momentum_index_und, 1.0)?;
        ensure_unit_interval(RECORD, "confidence", self.confidence)?;
        ensure_unit_interval(RECORD, "transition_risk", self.transition_risk)
    }
}

/// Everything one cycle produces. Built fresh per cycle and then discarded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedDataBundle {
    pub options_data_with_metrics: Vec<ProcessedContractMetrics>,
    pub strike_level_data_with_metrics: Vec<StrikeMetrics>,
    pub underlying_data_enriched: UnderlyingAggregates,
    pub processing_timestamp: DateTime<Utc>,
    /// `"<stage>: <error>"` for every stage that failed this cycle.
    pub errors: Vec<String>,
}

impl ProcessedDataBundle {
    /// True when every stage completed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Validates the enriched underlying, every strike row and every
    /// contract row.
    ///
    /// # Errors
    /// Returns the first validation error found.
    pub fn validate(&self, score_scale: f64) -> EotsResult<()> {
        self.underlying_data_enriched.validate(score_scale)?;
        for row in &self.strike_level_data_with_metrics {
            row.validate()?;
        }
        for (index, contract) in self.options_data_with_metrics.iter().enumerate() {
            contract.validate_exposures(index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn strike_row_copies_traceability_fields() {
        let und = RawUnderlyingData::new("QQQ", Utc::now(), 380.0);
        let row = StrikeMetrics::new(dec!(385.5), &und);
        assert_eq!(row.symbol, "QQQ");
        assert_eq!(row.timestamp, und.timestamp);
        assert_eq!(row.underlying_price, 380.0);
        assert!((row.strike_f64() - 385.5).abs() < 1e-9);
        assert!(row.elite_impact_score.is_none());
    }

    #[test]
    fn relative_distance_is_symmetric() {
        let und = RawUnderlyingData::new("SPY", Utc::now(), 400.0);
        let above = StrikeMetrics::new(dec!(420), &und);
        let below = StrikeMetrics::new(dec!(380), &und);
        assert!((above.relative_distance(400.0) - 0.05).abs() < 1e-12);
        assert!((below.relative_distance(400.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn aggregates_serialize_flat() {
        let und = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let mut agg = UnderlyingAggregates::from_raw(und);
        agg.market_session = Some(MarketSession::Regular);
        let json = serde_json::to_value(&agg).unwrap();
        assert_eq!(json["symbol"], "SPY");
        assert_eq!(json["price"], 450.0);
        assert_eq!(json["market_session"], "regular");
        assert!(json["gib_oi_based_und"].is_null());
    }

    fn bundle(und: UnderlyingAggregates, strikes: Vec<StrikeMetrics>) -> ProcessedDataBundle {
        ProcessedDataBundle {
            options_data_with_metrics: Vec::new(),
            strike_level_data_with_metrics: strikes,
            underlying_data_enriched: und,
            processing_timestamp: Utc::now(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn fresh_bundle_is_valid() {
        let raw = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let row = StrikeMetrics::new(dec!(450), &raw);
        assert!(bundle(UnderlyingAggregates::from_raw(raw), vec![row]).validate(100.0).is_ok());
    }

    #[test]
    fn out_of_range_probabilities_rejected() {
        let raw = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let mut agg = UnderlyingAggregates::from_raw(raw);
        agg.confidence = 2.5;
        let err = agg.validate(100.0).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("confidence"));

        agg.confidence = 0.5;
        agg.transition_risk = -3.0;
        assert!(agg.validate(100.0).unwrap_err().to_string().contains("transition_risk"));
    }

    #[test]
    fn score_bound_follows_scale() {
        let raw = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let mut agg = UnderlyingAggregates::from_raw(raw);
        agg.elite_impact_score_und = Some(80.0);
        assert!(agg.validate(100.0).is_ok());
        assert!(agg.validate(50.0).is_err());
    }

    #[test]
    fn bad_strike_row_named_in_error() {
        let raw = RawUnderlyingData::new("SPY", Utc::now(), 450.0);
        let mut row = StrikeMetrics::new(dec!(455), &raw);
        row.a_mspi_strike = 1.4;
        let err = bundle(UnderlyingAggregates::from_raw(raw.clone()), vec![row.clone()])
            .validate(100.0)
            .unwrap_err();
        assert!(err.to_string().contains("strike_metrics[455].a_mspi_strike"));

        row.a_mspi_strike = 0.0;
        row.net_gxoi = f64::NAN;
        assert!(row.validate().unwrap_err().to_string().contains("net_gxoi"));
    }
}
