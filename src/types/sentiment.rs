use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timeframe;

/// Per-instrument contribution to a sector, derived from one quote.
///
/// Ephemeral: created per computation cycle, consumed by the aggregator,
/// never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentPerformance {
    /// Ticker symbol.
    pub symbol: String,
    /// Percent change over the horizon, clamped to the configured cap.
    pub percent_change: f64,
    /// Volume weight: current/average volume, clamped to the configured range.
    pub volume_weight: f64,
}

/// Five-tier sentiment classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentColor {
    DarkRed,
    LightRed,
    BlueNeutral,
    LightGreen,
    DarkGreen,
}

impl SentimentColor {
    /// Classify a normalized sentiment score in [-1, 1].
    ///
    /// Tier bounds are inclusive-lower/exclusive-upper except at the
    /// extremes; the neutral band is closed on both sides.
    pub fn from_score(score: f64) -> Self {
        if score < -0.6 {
            Self::DarkRed
        } else if score < -0.2 {
            Self::LightRed
        } else if score <= 0.2 {
            Self::BlueNeutral
        } else if score < 0.6 {
            Self::LightGreen
        } else {
            Self::DarkGreen
        }
    }

    /// Get display label for this tier.
    pub fn label(&self) -> &'static str {
        match self {
            Self::DarkRed => "Dark Red",
            Self::LightRed => "Light Red",
            Self::BlueNeutral => "Blue Neutral",
            Self::LightGreen => "Light Green",
            Self::DarkGreen => "Dark Green",
        }
    }

    /// Fixed 1:1 mapping from tier to trading signal.
    pub fn signal(&self) -> TradingSignal {
        match self {
            Self::DarkRed => TradingSignal::PrimeShortingEnvironment,
            Self::LightRed => TradingSignal::GoodShortingEnvironment,
            Self::BlueNeutral => TradingSignal::NeutralCautious,
            Self::LightGreen => TradingSignal::AvoidShorts,
            Self::DarkGreen => TradingSignal::DoNotShort,
        }
    }
}

/// Trading signal derived from the sentiment tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingSignal {
    PrimeShortingEnvironment,
    GoodShortingEnvironment,
    NeutralCautious,
    AvoidShorts,
    DoNotShort,
}

impl TradingSignal {
    /// Get display label for this signal.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PrimeShortingEnvironment => "Prime Shorting Environment",
            Self::GoodShortingEnvironment => "Good Shorting Environment",
            Self::NeutralCautious => "Neutral - Cautious",
            Self::AvoidShorts => "Avoid Shorts",
            Self::DoNotShort => "Do Not Short",
        }
    }
}

/// Sector performance relative to the benchmark index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelativeStrength {
    StrongOutperform,
    Outperform,
    Neutral,
    Underperform,
    StrongUnderperform,
}

impl RelativeStrength {
    /// Classify alpha (percentage points versus the benchmark).
    ///
    /// Ties at bucket boundaries resolve to the more bullish bucket.
    pub fn from_alpha(alpha: f64) -> Self {
        if alpha >= 2.0 {
            Self::StrongOutperform
        } else if alpha >= 0.5 {
            Self::Outperform
        } else if alpha >= -0.5 {
            Self::Neutral
        } else if alpha >= -2.0 {
            Self::Underperform
        } else {
            Self::StrongUnderperform
        }
    }

    /// Get display label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::StrongOutperform => "Strong Outperform",
            Self::Outperform => "Outperform",
            Self::Neutral => "Neutral",
            Self::Underperform => "Underperform",
            Self::StrongUnderperform => "Strong Underperform",
        }
    }
}

/// Complete per-sector output of one computation cycle.
///
/// Immutable once written into a batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorResult {
    /// Sector identifier.
    pub sector: String,
    /// Volume-weighted sector performance before the volatility multiplier.
    pub raw_performance: f64,
    /// Sector-specific volatility multiplier applied.
    pub volatility_multiplier: f64,
    /// Final sector performance (raw x multiplier), percent.
    pub final_performance: f64,
    /// Benchmark index performance for the same horizon, percent.
    pub benchmark_performance: f64,
    /// Final performance minus benchmark performance.
    pub alpha: f64,
    /// Relative-strength label derived from alpha.
    pub relative_strength: RelativeStrength,
    /// Normalized sentiment score in [-1, 1].
    pub sentiment_score: f64,
    /// Five-tier color classification.
    pub color: SentimentColor,
    /// Trading signal mapped from the color tier.
    pub signal: TradingSignal,
    /// Number of instruments that contributed to the aggregate.
    pub instrument_count: usize,
    /// Fraction of the sector universe with valid data.
    pub coverage: f64,
    /// Confidence in [0, 1] from coverage, count, and weight balance.
    pub confidence: f64,
    /// Whether the sector fell below the minimum contributor count.
    pub low_confidence: bool,
}

/// One immutable, complete snapshot of all sector results for a timeframe.
///
/// Persisted only when every expected sector is present; superseded, never
/// mutated, by later batches for the same timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentBatch {
    /// Batch identifier.
    pub id: Uuid,
    /// Timeframe this batch covers.
    pub timeframe: Timeframe,
    /// Computation timestamp.
    pub computed_at: DateTime<Utc>,
    /// Sector results in configured sector order.
    pub sectors: Vec<SectorResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_tier_bounds() {
        assert_eq!(SentimentColor::from_score(-1.0), SentimentColor::DarkRed);
        assert_eq!(SentimentColor::from_score(-0.61), SentimentColor::DarkRed);
        assert_eq!(SentimentColor::from_score(-0.6), SentimentColor::LightRed);
        assert_eq!(SentimentColor::from_score(-0.2), SentimentColor::BlueNeutral);
        assert_eq!(SentimentColor::from_score(0.0), SentimentColor::BlueNeutral);
        assert_eq!(SentimentColor::from_score(0.2), SentimentColor::BlueNeutral);
        assert_eq!(SentimentColor::from_score(0.21), SentimentColor::LightGreen);
        assert_eq!(SentimentColor::from_score(0.6), SentimentColor::DarkGreen);
        assert_eq!(SentimentColor::from_score(1.0), SentimentColor::DarkGreen);
    }

    #[test]
    fn test_color_signal_mapping() {
        assert_eq!(
            SentimentColor::DarkRed.signal(),
            TradingSignal::PrimeShortingEnvironment
        );
        assert_eq!(
            SentimentColor::LightRed.signal(),
            TradingSignal::GoodShortingEnvironment
        );
        assert_eq!(
            SentimentColor::BlueNeutral.signal(),
            TradingSignal::NeutralCautious
        );
        assert_eq!(SentimentColor::LightGreen.signal(), TradingSignal::AvoidShorts);
        assert_eq!(SentimentColor::DarkGreen.signal(), TradingSignal::DoNotShort);
    }

    #[test]
    fn test_relative_strength_boundaries_resolve_bullish() {
        assert_eq!(RelativeStrength::from_alpha(2.0), RelativeStrength::StrongOutperform);
        assert_eq!(RelativeStrength::from_alpha(1.99), RelativeStrength::Outperform);
        assert_eq!(RelativeStrength::from_alpha(0.5), RelativeStrength::Outperform);
        assert_eq!(RelativeStrength::from_alpha(-0.5), RelativeStrength::Neutral);
        assert_eq!(RelativeStrength::from_alpha(-0.51), RelativeStrength::Underperform);
        assert_eq!(RelativeStrength::from_alpha(-2.0), RelativeStrength::Underperform);
        assert_eq!(
            RelativeStrength::from_alpha(-2.01),
            RelativeStrength::StrongUnderperform
        );
    }
}
