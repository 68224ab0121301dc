//! Per-contract records: raw chain rows and their derived exposures.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EotsError, EotsResult};
use crate::validation::{
    ensure_finite, ensure_finite_opt, ensure_non_negative, ensure_non_negative_opt,
};

const RECORD: &str = "contract";

/// Option right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    #[serde(alias = "CALL", alias = "Call", alias = "C", alias = "c")]
    Call,
    #[serde(alias = "PUT", alias = "Put", alias = "P", alias = "p")]
    Put,
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "call"),
            Self::Put => write!(f, "put"),
        }
    }
}

/// A raw options chain row as delivered by the data fetcher.
///
/// Every numeric column except strike and DTE is optional: a feed that
/// omits a column still produces usable (zero-filled) aggregates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawOptionsContract {
    #[serde(default)]
    pub contract_symbol: String,
    pub strike: Decimal,
    pub opt_kind: OptionKind,
    #[serde(default)]
    pub dte_calc: f64,
    #[serde(default)]
    pub expiration: Option<NaiveDate>,
    #[serde(default)]
    pub open_interest: Option<f64>,
    #[serde(default)]
    pub volm: Option<f64>,
    #[serde(default)]
    pub iv: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub delta_contract: Option<f64>,
    #[serde(default)]
    pub gamma_contract: Option<f64>,
    #[serde(default)]
    pub vega_contract: Option<f64>,
    #[serde(default)]
    pub theta_contract: Option<f64>,
    /// Net customer premium (buy minus sell).
    #[serde(default)]
    pub value_bs: Option<f64>,
    /// Net customer contracts (buy minus sell).
    #[serde(default)]
    pub volm_bs: Option<f64>,
}

impl RawOptionsContract {
    /// Creates a contract with only the required fields set.
    #[must_use]
    pub fn new(strike: Decimal, opt_kind: OptionKind, dte_calc: f64) -> Self {
        Self {
            contract_symbol: String::new(),
            strike,
            opt_kind,
            dte_calc,
            expiration: None,
            open_interest: None,
            volm: None,
            iv: None,
            price: None,
            delta_contract: None,
            gamma_contract: None,
            vega_contract: None,
            theta_contract: None,
            value_bs: None,
            volm_bs: None,
        }
    }

    /// Sets volume and open interest.
    #[must_use]
    pub fn with_activity(mut self, volume: f64, open_interest: f64) -> Self {
        self.volm = Some(volume);
        self.open_interest = Some(open_interest);
        self
    }

    /// Sets all four Greeks.
    #[must_use]
    pub fn with_greeks(mut self, delta: f64, gamma: f64, vega: f64, theta: f64) -> Self {
        self.delta_contract = Some(delta);
        self.gamma_contract = Some(gamma);
        self.vega_contract = Some(vega);
        self.theta_contract = Some(theta);
        self
    }

    /// Sets the implied volatility.
    #[must_use]
    pub fn with_iv(mut self, iv: f64) -> Self {
        self.iv = Some(iv);
        self
    }

    /// Sets net customer premium and contract flow.
    #[must_use]
    pub fn with_net_flow(mut self, value_bs: f64, volm_bs: f64) -> Self {
        self.value_bs = Some(value_bs);
        self.volm_bs = Some(volm_bs);
        self
    }

    #[must_use]
    pub fn is_call(&self) -> bool {
        self.opt_kind == OptionKind::Call
    }

    /// Traded volume, zero when absent.
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.volm.unwrap_or(0.0)
    }

    /// Open interest, zero when absent.
    #[must_use]
    pub fn oi(&self) -> f64 {
        self.open_interest.unwrap_or(0.0)
    }

    /// Validates the row against the chain schema.
    ///
    /// # Errors
    /// Returns a validation error naming the first offending field.
    pub fn validate(&self) -> EotsResult<()> {
        if self.strike <= Decimal::ZERO {
            return Err(crate::EotsError::validation(
                RECORD,
                "strike",
                format!("must be > 0, got {} ({})", self.strike, self.contract_symbol),
            ));
        }
        ensure_non_negative(RECORD, "dte_calc", self.dte_calc)?;
        ensure_non_negative_opt(RECORD, "open_interest", self.open_interest)?;
        ensure_non_negative_opt(RECORD, "volm", self.volm)?;
        ensure_non_negative_opt(RECORD, "iv", self.iv)?;
        ensure_finite_opt(RECORD, "price", self.price)?;
        ensure_finite_opt(RECORD, "delta_contract", self.delta_contract)?;
        ensure_finite_opt(RECORD, "gamma_contract", self.gamma_contract)?;
        ensure_finite_opt(RECORD, "vega_contract", self.vega_contract)?;
        ensure_finite_opt(RECORD, "theta_contract", self.theta_contract)?;
        ensure_finite_opt(RECORD, "value_bs", self.value_bs)?;
        ensure_finite_opt(RECORD, "volm_bs", self.volm_bs)?;
        Ok(())
    }
}

/// A contract row enriched with OI-weighted exposures and volume-weighted flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedContractMetrics {
    #[serde(flatten)]
    pub raw: RawOptionsContract,
    /// Delta x open interest.
    pub dxoi: f64,
    /// Gamma x open interest.
    pub gxoi: f64,
    /// Vega x open interest.
    pub vxoi: f64,
    /// Theta x open interest.
    pub txoi: f64,
    /// Delta x traded volume.
    pub delta_flow: f64,
    /// Gamma x traded volume.
    pub gamma_flow: f64,
    /// Vega x traded volume.
    pub vega_flow: f64,
    /// Theta x traded volume.
    pub theta_flow: f64,
    /// Whether the contract falls inside the configured DTE window.
    pub within_dte_window: bool,
}

impl ProcessedContractMetrics {
    /// Derives exposures from a raw row. Missing Greeks count as zero.
    #[must_use]
    pub fn from_raw(raw: RawOptionsContract, dte_max: f64) -> Self {
        let oi = raw.oi();
        let volume = raw.volume();
        let delta = raw.delta_contract.unwrap_or(0.0);
        let gamma = raw.gamma_contract.unwrap_or(0.0);
        let vega = raw.vega_contract.unwrap_or(0.0);
        let theta = raw.theta_contract.unwrap_or(0.0);
        let within_dte_window = raw.dte_calc <= dte_max;

        Self {
            dxoi: delta * oi,
            gxoi: gamma * oi,
            vxoi: vega * oi,
            txoi: theta * oi,
            delta_flow: delta * volume,
            gamma_flow: gamma * volume,
            vega_flow: vega * volume,
            theta_flow: theta * volume,
            within_dte_window,
            raw,
        }
    }

    /// Checks the derived exposures are finite. `index` is the row position
    /// reported in the error.
    ///
    /// # Errors
    /// Returns a validation error naming the row and field.
    pub fn validate_exposures(&self, index: usize) -> EotsResult<()> {
        let record = row_label(index, &self.raw);
        for (field, value) in [
            ("dxoi", self.dxoi),
            ("gxoi", self.gxoi),
            ("vxoi", self.vxoi),
            ("txoi", self.txoi),
            ("delta_flow", self.delta_flow),
            ("gamma_flow", self.gamma_flow),
            ("vega_flow", self.vega_flow),
            ("theta_flow", self.theta_flow),
        ] {
            ensure_finite(&record, field, value)?;
        }
        Ok(())
    }
}

fn row_label(index: usize, contract: &RawOptionsContract) -> String {
    if contract.contract_symbol.is_empty() {
        format!("{RECORD}[{index}]")
    } else {
        format!("{RECORD}[{index}] {}", contract.contract_symbol)
    }
}

/// Validates a complete chain, stopping at the first bad row.
///
/// # Errors
/// Returns the first validation error found, with the record relabelled by
/// row index and contract symbol.
pub fn validate_chain(contracts: &[RawOptionsContract]) -> EotsResult<()> {
    for (index, contract) in contracts.iter().enumerate() {
        contract.validate().map_err(|err| match err {
            EotsError::Validation { field, message, .. } => EotsError::Validation {
                record: row_label(index, contract),
                field,
                message,
            },
            other => other,
        })?;
    }
    Ok(())
}
