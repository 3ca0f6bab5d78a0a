//! Sector-level aggregation of instrument performances.
//!
//! Combines weighted per-instrument changes into one raw sector
//! performance, applies the configured volatility multiplier, and scores
//! confidence from coverage, contributor count, and weight balance.

use tracing::debug;

use crate::config::CalcConfig;
use crate::types::InstrumentPerformance;

/// Core numeric fields of one sector's result, before benchmark
/// comparison and classification.
#[derive(Debug, Clone)]
pub struct SectorAggregate {
    /// Volume-weighted mean percent change.
    pub raw_performance: f64,
    /// Raw performance scaled by the volatility multiplier.
    pub final_performance: f64,
    /// Number of contributing instruments.
    pub instrument_count: usize,
    /// Fraction of the sector universe that produced valid data.
    pub coverage: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// True when the sector fell below the minimum contributor count or
    /// had no usable weight.
    pub low_confidence: bool,
}

/// Aggregate all eligible performances for one sector.
///
/// `universe_size` is the total number of instruments the supplier
/// reported for the sector, eligible or not; it anchors the coverage
/// ratio. A sector below the minimum contributor count is flagged
/// low-confidence rather than omitted; the caller decides whether it
/// still populates the batch.
pub fn aggregate(
    sector: &str,
    performances: &[InstrumentPerformance],
    universe_size: usize,
    volatility_multiplier: f64,
    calc: &CalcConfig,
) -> SectorAggregate {
    let count = performances.len();
    let weight_sum: f64 = performances.iter().map(|p| p.volume_weight).sum();

    let insufficient = count < calc.min_instruments || weight_sum <= 0.0;
    if insufficient {
        debug!(
            "Sector {} has insufficient data: {} contributors, weight sum {:.3}",
            sector, count, weight_sum
        );
    }

    let raw_performance = if weight_sum > 0.0 {
        let weighted_sum: f64 = performances
            .iter()
            .map(|p| p.percent_change * p.volume_weight)
            .sum();
        weighted_sum / weight_sum
    } else {
        0.0
    };

    let final_performance = raw_performance * volatility_multiplier;

    let coverage = if universe_size > 0 {
        count as f64 / universe_size as f64
    } else {
        0.0
    };

    let confidence = confidence_score(performances, coverage, weight_sum, calc);

    SectorAggregate {
        raw_performance,
        final_performance,
        instrument_count: count,
        coverage,
        confidence,
        low_confidence: insufficient,
    }
}

/// Blend coverage, contributor count, and weight balance into [0, 1].
///
/// A single instrument holding more than the configured share of total
/// weight drags the balance factor down proportionally.
fn confidence_score(
    performances: &[InstrumentPerformance],
    coverage: f64,
    weight_sum: f64,
    calc: &CalcConfig,
) -> f64 {
    if performances.is_empty() || weight_sum <= 0.0 {
        return 0.0;
    }

    let count_factor = if calc.min_instruments > 0 {
        (performances.len() as f64 / calc.min_instruments as f64).min(1.0)
    } else {
        1.0
    };

    let max_share = performances
        .iter()
        .map(|p| p.volume_weight / weight_sum)
        .fold(0.0_f64, f64::max);
    let balance_factor = if max_share > calc.dominance_ceiling {
        // Share of 1.0 (one instrument is the whole sector) scores 0.
        ((1.0 - max_share) / (1.0 - calc.dominance_ceiling)).max(0.0)
    } else {
        1.0
    };

    (coverage.clamp(0.0, 1.0) * 0.4 + count_factor * 0.4 + balance_factor * 0.2).clamp(0.0, 1.0)
}
