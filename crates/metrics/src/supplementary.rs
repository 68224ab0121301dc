//! ATR, realized volatility and at-the-money implied volatility.

use anyhow::Result;
use eots_core::stats::{mean, sample_std};
use eots_core::{PriceBar, ProcessedContractMetrics, RawUnderlyingData, TrendDirection};
use rust_decimal::prelude::ToPrimitive;

use crate::stage::{MetricStage, StageContext};

const TRADING_DAYS: f64 = 252.0;

/// Today's bar built from the snapshot, if the day range is populated.
#[must_use]
pub fn session_bar(raw: &RawUnderlyingData) -> Option<PriceBar> {
    if raw.day_high_price_und <= 0.0 || raw.day_low_price_und <= 0.0 {
        return None;
    }
    let open = if raw.day_open_price_und > 0.0 {
        raw.day_open_price_und
    } else {
        raw.price
    };
    Some(PriceBar {
        date: raw.timestamp.date_naive(),
        open,
        high: raw.day_high_price_und.max(raw.price),
        low: raw.day_low_price_und.min(raw.price),
        close: raw.price,
    })
}

/// Average true range over the last `period` bars.
///
/// A single bar falls back to its high-low range.
#[must_use]
pub fn average_true_range(bars: &[PriceBar], period: usize) -> Option<f64> {
    match bars {
        [] => None,
        [only] => Some(only.high - only.low),
        _ => {
            let ranges: Vec<f64> = bars
                .windows(2)
                .map(|pair| {
                    let (prev, bar) = (pair[0], pair[1]);
                    (bar.high - bar.low)
                        .max((bar.high - prev.close).abs())
                        .max((bar.low - prev.close).abs())
                })
                .collect();
            let start = ranges.len().saturating_sub(period);
            mean(&ranges[start..])
        }
    }
}

/// Annualized close-to-close volatility over the last `window` log returns.
#[must_use]
pub fn historical_volatility(bars: &[PriceBar], window: usize) -> Option<f64> {
    let returns: Vec<f64> = bars
        .windows(2)
        .filter(|pair| pair[0].close > 0.0 && pair[1].close > 0.0)
        .map(|pair| (pair[1].close / pair[0].close).ln())
        .collect();
    let start = returns.len().saturating_sub(window);
    sample_std(&returns[start..]).map(|std| std * TRADING_DAYS.sqrt())
}

/// Mean IV of the contracts at the strike nearest the price.
#[must_use]
pub fn atm_implied_volatility(contracts: &[ProcessedContractMetrics], price: f64) -> Option<f64> {
    let with_iv: Vec<(f64, f64)> = contracts
        .iter()
        .filter_map(|c| {
            let iv = c.raw.iv?;
            let strike = c.raw.strike.to_f64()?;
            Some((strike, iv))
        })
        .collect();

    let nearest = with_iv
        .iter()
        .map(|(strike, _)| (strike - price).abs())
        .min_by(f64::total_cmp)?;
    let ivs: Vec<f64> = with_iv
        .iter()
        .filter(|(strike, _)| ((strike - price).abs() - nearest).abs() < 1e-9)
        .map(|(_, iv)| *iv)
        .collect();
    mean(&ivs)
}

/// Least-squares line through the last `window` closes.
///
/// Returns the fit's R-squared as trend strength, with a direction from the
/// slope once strength reaches `min_r2`. Needs at least three closes.
#[must_use]
pub fn close_trend(bars: &[PriceBar], window: usize, min_r2: f64) -> Option<(f64, TrendDirection)> {
    let start = bars.len().saturating_sub(window);
    let closes: Vec<f64> = bars[start..].iter().map(|bar| bar.close).collect();
    if closes.len() < 3 {
        return None;
    }

    let x_mean = (closes.len() - 1) as f64 / 2.0;
    let y_mean = mean(&closes)?;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (i, close) in closes.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = close - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if syy <= 0.0 {
        return Some((0.0, TrendDirection::Sideways));
    }

    let strength = (sxy * sxy / (sxx * syy)).clamp(0.0, 1.0);
    let direction = if strength < min_r2 {
        TrendDirection::Sideways
    } else if sxy > 0.0 {
        TrendDirection::Up
    } else {
        TrendDirection::Down
    };
    Some((strength, direction))
}

pub struct SupplementaryStage;

impl MetricStage for SupplementaryStage {
    fn name(&self) -> &str {
        "supplementary"
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<()> {
        let config = &ctx.config.supplementary;
        let raw = &ctx.underlying.raw;

        let mut bars = ctx.price_bars();
        if let Some(today) = session_bar(raw) {
            bars.retain(|bar| bar.date < today.date);
            bars.push(today);
        }

        let atr = average_true_range(&bars, config.atr_period);
        let hist_vol = historical_volatility(&bars, config.hist_vol_window);
        let atm_iv = atm_implied_volatility(ctx.contracts, raw.price);
        let trend = close_trend(&bars, config.trend_window, config.trend_min_r2);

        tracing::debug!(bars = bars.len(), atr = ?atr, hist_vol = ?hist_vol, atm_iv = ?atm_iv, trend = ?trend, "supplementary metrics computed");

        let und = &mut ctx.underlying;
        und.atr_und = atr;
        und.hist_vol_20d = hist_vol;
        und.impl_vol_atm = atm_iv;
        und.trend_strength = trend.map(|(strength, _)| strength);
        und.trend_direction = trend.map(|(_, direction)| direction);
        Ok(())
    }
}
