use serde::{Deserialize, Serialize};

use crate::error::{EotsError, EotsResult};
use crate::regime::MarketRegime;

/// Top-level configuration. Every section falls back to its defaults, so an
/// empty or missing file yields a runnable configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EotsConfig {
    pub metrics: MetricsConfig,
    pub data: DataConfig,
}

impl EotsConfig {
    /// Checks every section for inconsistent values.
    ///
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        self.metrics.validate()?;
        self.data.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Contracts with more days to expiry are left out of strike aggregation.
    pub dte_max: f64,
    pub contract_multiplier: f64,
    pub flow: FlowConfig,
    pub adaptive: AdaptiveConfig,
    pub heatmap: HeatmapConfig,
    pub elite: EliteConfig,
    pub supplementary: SupplementaryConfig,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            dte_max: 45.0,
            contract_multiplier: 100.0,
            flow: FlowConfig::default(),
            adaptive: AdaptiveConfig::default(),
            heatmap: HeatmapConfig::default(),
            elite: EliteConfig::default(),
            supplementary: SupplementaryConfig::default(),
        }
    }
}

impl MetricsConfig {
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        positive("metrics.dte_max", self.dte_max)?;
        positive("metrics.contract_multiplier", self.contract_multiplier)?;
        self.flow.validate()?;
        self.adaptive.validate()?;
        self.heatmap.validate()?;
        self.elite.validate()?;
        self.supplementary.validate()
    }
}

/// Enhanced flow (VAPI-FA, DWFD, TW-LAF) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Minimum stored observations before a z-score is reported.
    pub min_history: usize,
    /// Maximum stored observations per metric.
    pub history_window: usize,
    /// Lower bound on IV used as a divisor.
    pub iv_floor: f64,
    pub dwfd_divergence_weight: f64,
    /// TW-LAF weights for the 5m, 15m, 30m and 60m windows.
    pub twlaf_weights: [f64; 4],
    /// Day volume at which the liquidity factor reaches 0.5.
    pub liquidity_half_volume: f64,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            min_history: 10,
            history_window: 200,
            iv_floor: 0.01,
            dwfd_divergence_weight: 0.5,
            twlaf_weights: [1.0, 0.8, 0.6, 0.4],
            liquidity_half_volume: 1_000_000.0,
        }
    }
}

impl FlowConfig {
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        if self.min_history < 2 {
            return Err(EotsError::Configuration(format!(
                "metrics.flow.min_history must be >= 2, got {}",
                self.min_history
            )));
        }
        if self.history_window < self.min_history {
            return Err(EotsError::Configuration(format!(
                "metrics.flow.history_window ({}) must be >= min_history ({})",
                self.history_window, self.min_history
            )));
        }
        positive("metrics.flow.iv_floor", self.iv_floor)?;
        non_negative(
            "metrics.flow.dwfd_divergence_weight",
            self.dwfd_divergence_weight,
        )?;
        weights("metrics.flow.twlaf_weights", &self.twlaf_weights)?;
        positive(
            "metrics.flow.liquidity_half_volume",
            self.liquidity_half_volume,
        )
    }
}

/// Regime classification thresholds and regime-dependent multipliers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Annualized volatility above which the regime is high-volatility.
    pub high_vol_threshold: f64,
    /// Annualized volatility below which a flat market is a low-volatility range.
    pub low_vol_threshold: f64,
    /// Fractional price change that counts as a trend.
    pub trend_threshold: f64,
    pub bullish_multiplier: f64,
    pub bearish_multiplier: f64,
    pub high_vol_multiplier: f64,
    pub low_vol_multiplier: f64,
    pub neutral_multiplier: f64,
    pub transitional_multiplier: f64,
    /// Weight of normalized delta flow in A-DAG.
    pub flow_alignment_weight: f64,
    pub sdag_gamma_weight: f64,
    pub sdag_delta_weight: f64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            high_vol_threshold: 0.35,
            low_vol_threshold: 0.15,
            trend_threshold: 0.005,
            bullish_multiplier: 1.2,
            bearish_multiplier: 1.2,
            high_vol_multiplier: 1.5,
            low_vol_multiplier: 0.8,
            neutral_multiplier: 1.0,
            transitional_multiplier: 1.0,
            flow_alignment_weight: 0.5,
            sdag_gamma_weight: 0.6,
            sdag_delta_weight: 0.4,
        }
    }
}

impl AdaptiveConfig {
    /// Multiplier applied to adaptive formulas under `regime`.
    #[must_use]
    pub fn multiplier(&self, regime: MarketRegime) -> f64 {
        match regime {
            MarketRegime::BullishTrend => self.bullish_multiplier,
            MarketRegime::BearishTrend => self.bearish_multiplier,
            MarketRegime::HighVolatility => self.high_vol_multiplier,
            MarketRegime::LowVolatilityRange => self.low_vol_multiplier,
            MarketRegime::Neutral => self.neutral_multiplier,
            MarketRegime::Transitional => self.transitional_multiplier,
        }
    }

    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        non_negative("metrics.adaptive.low_vol_threshold", self.low_vol_threshold)?;
        if self.high_vol_threshold <= self.low_vol_threshold {
            return Err(EotsError::Configuration(format!(
                "metrics.adaptive.high_vol_threshold ({}) must exceed low_vol_threshold ({})",
                self.high_vol_threshold, self.low_vol_threshold
            )));
        }
        positive("metrics.adaptive.trend_threshold", self.trend_threshold)?;
        for (name, value) in [
            ("bullish_multiplier", self.bullish_multiplier),
            ("bearish_multiplier", self.bearish_multiplier),
            ("high_vol_multiplier", self.high_vol_multiplier),
            ("low_vol_multiplier", self.low_vol_multiplier),
            ("neutral_multiplier", self.neutral_multiplier),
            ("transitional_multiplier", self.transitional_multiplier),
        ] {
            positive(&format!("metrics.adaptive.{name}"), value)?;
        }
        non_negative(
            "metrics.adaptive.flow_alignment_weight",
            self.flow_alignment_weight,
        )?;
        weights(
            "metrics.adaptive.sdag_weights",
            &[self.sdag_gamma_weight, self.sdag_delta_weight],
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Relative distance at which proximity decays to 1/e.
    pub proximity_bandwidth: f64,
    pub delta_weight: f64,
    pub gamma_weight: f64,
    pub vega_weight: f64,
    pub theta_weight: f64,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            proximity_bandwidth: 0.02,
            delta_weight: 1.0,
            gamma_weight: 1.5,
            vega_weight: 0.8,
            theta_weight: 0.5,
        }
    }
}

impl HeatmapConfig {
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        positive("metrics.heatmap.proximity_bandwidth", self.proximity_bandwidth)?;
        weights(
            "metrics.heatmap.greek_weights",
            &[
                self.delta_weight,
                self.gamma_weight,
                self.vega_weight,
                self.theta_weight,
            ],
        )
    }
}

/// Composite impact scoring and elite classification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EliteConfig {
    pub flow_weight: f64,
    pub momentum_weight: f64,
    pub institutional_weight: f64,
    pub structure_weight: f64,
    /// Premium per contract (in option price points) that marks institutional size.
    pub institutional_premium_threshold: f64,
    /// Institutional score magnitude that labels flow as institutional.
    pub institutional_flow_threshold: f64,
    /// Flow component magnitude that labels flow as retail directional.
    pub retail_flow_threshold: f64,
    /// Decay rate of the impact score with relative strike distance.
    pub distance_decay: f64,
    /// Net customer delta flow that saturates the structure component.
    pub delta_flow_scale: f64,
    pub score_scale: f64,
    /// Score magnitude that labels the regime as trending.
    pub trend_score_threshold: f64,
    pub low_vol_threshold: f64,
    pub elevated_vol_threshold: f64,
    pub extreme_vol_threshold: f64,
    /// Gamma exposure that saturates the strike magnetism index.
    pub magnetism_scale: f64,
    /// Vega exposure that saturates the volatility pressure index.
    pub vega_pressure_scale: f64,
}

impl Default for EliteConfig {
    fn default() -> Self {
        Self {
            flow_weight: 0.35,
            momentum_weight: 0.25,
            institutional_weight: 0.25,
            structure_weight: 0.15,
            institutional_premium_threshold: 5.0,
            institutional_flow_threshold: 0.5,
            retail_flow_threshold: 0.2,
            distance_decay: 10.0,
            delta_flow_scale: 100_000.0,
            score_scale: 100.0,
            trend_score_threshold: 25.0,
            low_vol_threshold: 0.15,
            elevated_vol_threshold: 0.25,
            extreme_vol_threshold: 0.5,
            magnetism_scale: 10_000.0,
            vega_pressure_scale: 5_000.0,
        }
    }
}

impl EliteConfig {
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        weights(
            "metrics.elite.component_weights",
            &[
                self.flow_weight,
                self.momentum_weight,
                self.institutional_weight,
                self.structure_weight,
            ],
        )?;
        positive(
            "metrics.elite.institutional_premium_threshold",
            self.institutional_premium_threshold,
        )?;
        unit(
            "metrics.elite.institutional_flow_threshold",
            self.institutional_flow_threshold,
        )?;
        unit("metrics.elite.retail_flow_threshold", self.retail_flow_threshold)?;
        positive("metrics.elite.distance_decay", self.distance_decay)?;
        positive("metrics.elite.delta_flow_scale", self.delta_flow_scale)?;
        positive("metrics.elite.score_scale", self.score_scale)?;
        non_negative("metrics.elite.trend_score_threshold", self.trend_score_threshold)?;
        if !(self.low_vol_threshold < self.elevated_vol_threshold
            && self.elevated_vol_threshold < self.extreme_vol_threshold)
        {
            return Err(EotsError::Configuration(format!(
                "metrics.elite volatility thresholds must increase: low {}, elevated {}, extreme {}",
                self.low_vol_threshold, self.elevated_vol_threshold, self.extreme_vol_threshold
            )));
        }
        positive("metrics.elite.magnetism_scale", self.magnetism_scale)?;
        positive("metrics.elite.vega_pressure_scale", self.vega_pressure_scale)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplementaryConfig {
    pub atr_period: usize,
    pub hist_vol_window: usize,
    /// Daily closes fitted for the trend line.
    pub trend_window: usize,
    /// Minimum R-squared of the fit before a direction is called.
    pub trend_min_r2: f64,
}

impl Default for SupplementaryConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            hist_vol_window: 20,
            trend_window: 20,
            trend_min_r2: 0.3,
        }
    }
}

impl SupplementaryConfig {
    /// # Errors
    /// Returns a configuration error describing the first problem found.
    pub fn validate(&self) -> EotsResult<()> {
        if self.atr_period == 0 || self.hist_vol_window < 2 || self.trend_window < 3 {
            return Err(EotsError::Configuration(format!(
                "metrics.supplementary windows too small: atr_period {}, hist_vol_window {}, trend_window {}",
                self.atr_period, self.hist_vol_window, self.trend_window
            )));
        }
        if !(0.0..=1.0).contains(&self.trend_min_r2) {
            return Err(EotsError::Configuration(format!(
                "metrics.supplementary.trend_min_r2 must be in [0, 1], got {}",
                self.trend_min_r2
            )));
        }
        Ok(())
    }
}

/// File locations for the file-backed fetcher and history store.
///
/// `{symbol}` in a path is replaced with the configured symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub symbol: String,
    pub options_path: String,
    pub underlying_path: String,
    pub history_path: String,
    pub output_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            symbol: "SPY".to_string(),
            options_path: "data/{symbol}_chain.csv".to_string(),
            underlying_path: "data/{symbol}_underlying.json".to_string(),
            history_path: "data/{symbol}_history.json".to_string(),
            output_dir: "output".to_string(),
        }
    }
}

impl DataConfig {
    /// Substitutes the configured symbol into a path template.
    #[must_use]
    pub fn resolve(&self, template: &str) -> String {
        template.replace("{symbol}", &self.symbol)
    }

    /// # Errors
    /// Returns a configuration error if the symbol is blank.
    pub fn validate(&self) -> EotsResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(EotsError::Configuration(
                "data.symbol must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

fn positive(name: &str, value: f64) -> EotsResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EotsError::Configuration(format!(
            "{name} must be > 0, got {value}"
        )))
    }
}

fn non_negative(name: &str, value: f64) -> EotsResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(EotsError::Configuration(format!(
            "{name} must be >= 0, got {value}"
        )))
    }
}

fn unit(name: &str, value: f64) -> EotsResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(EotsError::Configuration(format!(
            "{name} must be in [0, 1], got {value}"
        )))
    }
}

fn weights(name: &str, values: &[f64]) -> EotsResult<()> {
    for value in values {
        non_negative(name, *value)?;
    }
    if values.iter().sum::<f64>() <= 0.0 {
        return Err(EotsError::Configuration(format!(
            "{name} must have a positive sum"
        )));
    }
    Ok(())
}
