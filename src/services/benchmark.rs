//! Benchmark comparison: sector alpha and relative-strength labeling.

use crate::types::RelativeStrength;

/// Result of comparing one sector against the reference index.
#[derive(Debug, Clone, Copy)]
pub struct BenchmarkComparison {
    /// Benchmark performance used, percent. Defaults to 0.0 when the
    /// benchmark was unavailable.
    pub benchmark_performance: f64,
    /// Sector final performance minus benchmark performance.
    pub alpha: f64,
    /// Label derived from alpha.
    pub relative_strength: RelativeStrength,
    /// True when benchmark data was missing and 0.0 was substituted.
    pub benchmark_missing: bool,
}

/// Compare a sector's final performance against the benchmark.
///
/// A missing benchmark is never a failure: performance defaults to zero
/// and the substitution is flagged so the caller can penalize confidence.
pub fn compare(final_performance: f64, benchmark: Option<f64>) -> BenchmarkComparison {
    let benchmark_missing = benchmark.is_none();
    let benchmark_performance = benchmark.unwrap_or(0.0);
    let alpha = final_performance - benchmark_performance;

    BenchmarkComparison {
        benchmark_performance,
        alpha,
        relative_strength: RelativeStrength::from_alpha(alpha),
        benchmark_missing,
    }
}
