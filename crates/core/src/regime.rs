//! Market classification labels and the US equity trading session clock.

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::US::Eastern;
use serde::{Deserialize, Serialize};

/// Overall market regime used to pick adaptive multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    /// Price rising beyond the trend threshold.
    BullishTrend,
    /// Price falling beyond the trend threshold.
    BearishTrend,
    /// Volatility above the high threshold, regardless of direction.
    HighVolatility,
    /// Volatility below the low threshold with no trend.
    LowVolatilityRange,
    /// No condition met.
    Neutral,
    /// Signals disagree; a regime change is likely.
    Transitional,
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::BullishTrend => "bullish_trend",
            Self::BearishTrend => "bearish_trend",
            Self::HighVolatility => "high_volatility",
            Self::LowVolatilityRange => "low_volatility_range",
            Self::Neutral => "neutral",
            Self::Transitional => "transitional",
        };
        f.write_str(label)
    }
}

/// Who appears to be driving the options flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    InstitutionalBuying,
    InstitutionalSelling,
    RetailBullish,
    RetailBearish,
    /// Large premium with little directional delta.
    Hedging,
    Neutral,
}

impl std::fmt::Display for FlowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::InstitutionalBuying => "institutional_buying",
            Self::InstitutionalSelling => "institutional_selling",
            Self::RetailBullish => "retail_bullish",
            Self::RetailBearish => "retail_bearish",
            Self::Hedging => "hedging",
            Self::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// Volatility level classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    Normal,
    Elevated,
    Extreme,
}

impl std::fmt::Display for VolatilityRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::Elevated => "elevated",
            Self::Extreme => "extreme",
        };
        f.write_str(label)
    }
}

/// Direction of the daily close trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Up,
    Down,
    /// Fit too weak to call a direction.
    Sideways,
}

impl std::fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Sideways => "sideways",
        };
        f.write_str(label)
    }
}

/// US equity trading session, evaluated in US/Eastern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSession {
    /// 04:00 - 09:30 ET.
    PreMarket,
    /// 09:30 - 16:00 ET.
    Regular,
    /// 16:00 - 20:00 ET.
    AfterHours,
    /// Overnight and weekends.
    Closed,
}

const PRE_MARKET_OPEN: (u32, u32) = (4, 0);
const REGULAR_OPEN: (u32, u32) = (9, 30);
const REGULAR_CLOSE: (u32, u32) = (16, 0);
const AFTER_HOURS_CLOSE: (u32, u32) = (20, 0);

fn at((hour, minute): (u32, u32)) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

impl MarketSession {
    /// Classifies a UTC timestamp into a session.
    #[must_use]
    pub fn from_timestamp(timestamp: DateTime<Utc>) -> Self {
        let eastern = timestamp.with_timezone(&Eastern);
        if matches!(eastern.weekday(), Weekday::Sat | Weekday::Sun) {
            return Self::Closed;
        }

        let time = eastern.time();
        if time < at(PRE_MARKET_OPEN) {
            Self::Closed
        } else if time < at(REGULAR_OPEN) {
            Self::PreMarket
        } else if time < at(REGULAR_CLOSE) {
            Self::Regular
        } else if time < at(AFTER_HOURS_CLOSE) {
            Self::AfterHours
        } else {
            Self::Closed
        }
    }
}

/// Fraction of the 09:30-16:00 ET regular session elapsed at `timestamp`.
///
/// 0.0 before the open, 1.0 after the close. Weekends count as a finished
/// session so end-of-day figures stay at full weight.
#[must_use]
pub fn session_progress(timestamp: DateTime<Utc>) -> f64 {
    let eastern = timestamp.with_timezone(&Eastern);
    if matches!(eastern.weekday(), Weekday::Sat | Weekday::Sun) {
        return 1.0;
    }

    let minutes = f64::from(eastern.hour() * 60 + eastern.minute());
    let open = f64::from(REGULAR_OPEN.0 * 60 + REGULAR_OPEN.1);
    let close = f64::from(REGULAR_CLOSE.0 * 60 + REGULAR_CLOSE.1);
    ((minutes - open) / (close - open)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn eastern(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Eastern
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .single()
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn classifies_weekday_sessions() {
        // 2026-10-16 is a Friday
        assert_eq!(
            MarketSession::from_timestamp(eastern(2026, 10, 16, 3, 0)),
            MarketSession::Closed
        );
        assert_eq!(
            MarketSession::from_timestamp(eastern(2026, 10, 16, 8, 0)),
            MarketSession::PreMarket
        );
        assert_eq!(
            MarketSession::from_timestamp(eastern(2026, 10, 16, 9, 30)),
            MarketSession::Regular
        );
        assert_eq!(
            MarketSession::from_timestamp(eastern(2026, 10, 16, 16, 0)),
            MarketSession::AfterHours
        );
        assert_eq!(
            MarketSession::from_timestamp(eastern(2026, 10, 16, 21, 0)),
            MarketSession::Closed
        );
    }

    #[test]
    fn weekend_is_closed() {
        assert_eq!(
            MarketSession::from_timestamp(eastern(2026, 10, 17, 12, 0)),
            MarketSession::Closed
        );
        assert_eq!(session_progress(eastern(2026, 10, 17, 12, 0)), 1.0);
    }

    #[test]
    fn session_progress_is_clamped() {
        assert_eq!(session_progress(eastern(2026, 10, 16, 8, 0)), 0.0);
        assert_eq!(session_progress(eastern(2026, 10, 16, 17, 0)), 1.0);
        let midday = session_progress(eastern(2026, 10, 16, 12, 45));
        assert!((midday - 0.5).abs() < 1e-9);
    }

    #[test]
    fn labels_serialize_snake_case() {
        let json = serde_json::to_string(&MarketRegime::LowVolatilityRange).unwrap();
        assert_eq!(json, "\"low_volatility_range\"");
        assert_eq!(FlowType::InstitutionalBuying.to_string(), "institutional_buying");
        assert_eq!(serde_json::to_string(&TrendDirection::Sideways).unwrap(), "\"sideways\"");
    }
}
