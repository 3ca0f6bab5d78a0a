use serde::{Deserialize, Serialize};

/// Analysis horizon for sentiment calculations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    /// Intraday: 30-minute rolling window.
    ThirtyMin,
    /// One trading day.
    #[default]
    Daily,
    /// Three trading days.
    ThreeDay,
    /// One week.
    Weekly,
}

impl Timeframe {
    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "thirty_min" | "30min" | "30m" | "intraday" => Some(Self::ThirtyMin),
            "daily" | "1d" | "day" => Some(Self::Daily),
            "three_day" | "3day" | "3d" => Some(Self::ThreeDay),
            "weekly" | "1w" | "week" => Some(Self::Weekly),
            _ => None,
        }
    }

    /// Get display name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ThirtyMin => "30-Minute",
            Self::Daily => "Daily",
            Self::ThreeDay => "3-Day",
            Self::Weekly => "Weekly",
        }
    }

    /// Key used for persistence and cache lookups.
    pub fn key(&self) -> &'static str {
        match self {
            Self::ThirtyMin => "thirty_min",
            Self::Daily => "daily",
            Self::ThreeDay => "three_day",
            Self::Weekly => "weekly",
        }
    }

    /// All timeframes, in cadence order.
    pub fn all() -> [Timeframe; 4] {
        [Self::ThirtyMin, Self::Daily, Self::ThreeDay, Self::Weekly]
    }
}

/// Raw per-instrument market data from the quote supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentQuote {
    /// Ticker symbol (unique id).
    pub symbol: String,
    /// Sector this instrument belongs to.
    pub sector: String,
    /// Current price.
    pub current_price: f64,
    /// Previous reference price for the horizon.
    pub previous_price: f64,
    /// Current volume.
    pub volume: f64,
    /// Average volume over the lookback window (e.g. 20 periods).
    pub avg_volume: f64,
}

impl InstrumentQuote {
    /// Whether this quote has usable price data.
    ///
    /// Quotes with non-positive prices are excluded from aggregation
    /// entirely, never zero-filled. A non-positive average volume does
    /// NOT disqualify a quote; it only neutralizes the volume weight.
    pub fn is_price_eligible(&self) -> bool {
        self.current_price > 0.0 && self.previous_price > 0.0
    }
}
