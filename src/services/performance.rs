//! Per-instrument performance calculation.
//!
//! Converts one raw quote into a capped percent change and a clamped
//! volume weight. Pure and deterministic; quotes with unusable price data
//! are excluded entirely rather than zero-filled.

use tracing::debug;

use crate::config::CalcConfig;
use crate::types::{InstrumentPerformance, InstrumentQuote};

/// Calculate performance for one instrument.
///
/// Returns `None` when the quote's price data is ineligible (either price
/// non-positive). The exclusion is a data-quality event, not an error; the
/// caller counts it toward coverage.
pub fn calculate(quote: &InstrumentQuote, calc: &CalcConfig) -> Option<InstrumentPerformance> {
    if !quote.is_price_eligible() {
        debug!(
            "Excluding {} from aggregation: current={} previous={}",
            quote.symbol, quote.current_price, quote.previous_price
        );
        return None;
    }

    let raw_change = (quote.current_price - quote.previous_price) / quote.previous_price * 100.0;
    let percent_change = raw_change.clamp(-calc.percent_cap, calc.percent_cap);

    // A missing or zero average volume neutralizes the weight rather than
    // excluding the instrument. This is deliberately different from price
    // ineligibility.
    let volume_weight = if quote.avg_volume > 0.0 {
        (quote.volume / quote.avg_volume).clamp(calc.weight_floor, calc.weight_ceiling)
    } else {
        1.0
    };

    Some(InstrumentPerformance {
        symbol: quote.symbol.clone(),
        percent_change,
        volume_weight,
    })
}
