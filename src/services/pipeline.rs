//! Sentiment computation pipeline.
//!
//! One cycle: fetch quotes per sector, derive instrument performances,
//! aggregate, compare against the benchmark, classify, validate the
//! complete batch, persist. Sector computations are independent pure
//! functions over disjoint instrument sets and run concurrently; they
//! serialize at the validation step.

use chrono::Utc;
use futures_util::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::services::{aggregator, benchmark, classifier, performance, validator, BatchStore};
use crate::services::quotes::QuoteSupplier;
use crate::types::{SectorResult, SentimentBatch, Timeframe};

/// How instrument contributions are weighted within a sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightingPolicy {
    /// Volume-ratio weights, clamped to the configured range.
    #[default]
    Volume,
    /// Every eligible instrument contributes equally (preview only).
    Equal,
}

impl WeightingPolicy {
    /// Parse from a query-string value.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "volume" => Some(Self::Volume),
            "equal" => Some(Self::Equal),
            _ => None,
        }
    }
}

/// The sector sentiment calculation engine.
pub struct SentimentEngine {
    config: Arc<Config>,
    supplier: QuoteSupplier,
    store: Arc<BatchStore>,
}

impl SentimentEngine {
    /// Create a new engine.
    pub fn new(config: Arc<Config>, supplier: QuoteSupplier, store: Arc<BatchStore>) -> Arc<Self> {
        Arc::new(Self {
            config,
            supplier,
            store,
        })
    }

    /// The batch store this engine persists into.
    pub fn store(&self) -> Arc<BatchStore> {
        self.store.clone()
    }

    /// Run one full cycle for a timeframe and persist the result.
    ///
    /// Fails without persisting anything when the cycle does not cover
    /// the complete expected sector set; the previous batch remains the
    /// latest.
    pub async fn run_cycle(&self, timeframe: Timeframe) -> Result<SentimentBatch> {
        let batch = self
            .compute_batch(timeframe, WeightingPolicy::Volume)
            .await?;
        self.store.write_batch(&batch)?;
        info!(
            "Cycle complete for {}: batch {} ({} sectors)",
            timeframe.key(),
            batch.id,
            batch.sectors.len()
        );
        Ok(batch)
    }

    /// Compute a validated batch without persisting it.
    ///
    /// This is the preview path; it also backs `run_cycle`.
    pub async fn compute_batch(
        &self,
        timeframe: Timeframe,
        weighting: WeightingPolicy,
    ) -> Result<SentimentBatch> {
        // One benchmark fetch per cycle, shared by every sector.
        let benchmark_perf = self.supplier.get_benchmark(timeframe).await;
        if benchmark_perf.is_none() {
            warn!("No benchmark for {}; sectors score against 0", timeframe.key());
        }

        let computations = self.config.sectors.iter().map(|sector| {
            self.compute_sector(&sector.name, timeframe, weighting, benchmark_perf)
        });
        let results: Vec<Option<SectorResult>> = join_all(computations).await;
        let results: Vec<SectorResult> = results.into_iter().flatten().collect();

        validator::validate(
            timeframe,
            results,
            &self.config.sector_names(),
            Utc::now(),
        )
    }

    /// Compute one sector's result.
    ///
    /// Returns `None` only when the sector is low-confidence and the
    /// inclusion policy excludes such sectors; supplier failure is
    /// treated as insufficient data, never propagated.
    async fn compute_sector(
        &self,
        sector: &str,
        timeframe: Timeframe,
        weighting: WeightingPolicy,
        benchmark_perf: Option<f64>,
    ) -> Option<SectorResult> {
        let calc = &self.config.calc;

        let quotes = match self.supplier.get_quotes(sector, timeframe).await {
            Ok(quotes) => quotes,
            Err(e) => {
                warn!("Quote supplier failed for {}: {}", sector, e);
                Vec::new()
            }
        };

        let universe_size = quotes.len();
        let mut performances: Vec<_> = quotes
            .iter()
            .filter_map(|q| performance::calculate(q, calc))
            .collect();
        if weighting == WeightingPolicy::Equal {
            for perf in &mut performances {
                perf.volume_weight = 1.0;
            }
        }

        let multiplier = self.config.multiplier(sector);
        let agg = aggregator::aggregate(sector, &performances, universe_size, multiplier, calc);

        if agg.low_confidence && !calc.include_low_confidence {
            warn!("Excluding low-confidence sector {} by policy", sector);
            return None;
        }

        let cmp = benchmark::compare(agg.final_performance, benchmark_perf);
        let class = classifier::classify(agg.final_performance, calc);

        // A substituted benchmark is reflected in confidence, not an error.
        let confidence = if cmp.benchmark_missing {
            agg.confidence * 0.9
        } else {
            agg.confidence
        };

        Some(SectorResult {
            sector: sector.to_string(),
            raw_performance: agg.raw_performance,
            volatility_multiplier: multiplier,
            final_performance: agg.final_performance,
            benchmark_performance: cmp.benchmark_performance,
            alpha: cmp.alpha,
            relative_strength: cmp.relative_strength,
            sentiment_score: class.score,
            color: class.color,
            signal: class.signal,
            instrument_count: agg.instrument_count,
            coverage: agg.coverage,
            confidence,
            low_confidence: agg.low_confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SectorPolicy;
    use crate::services::quotes::StaticQuoteSupplier;
    use crate::types::InstrumentQuote;

    fn quote(symbol: &str, sector: &str, current: f64, previous: f64, volume: f64, avg: f64) -> InstrumentQuote {
        InstrumentQuote {
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            current_price: current,
            previous_price: previous,
            volume,
            avg_volume: avg,
        }
    }

    fn two_sector_config() -> Arc<Config> {
        Arc::new(Config {
            sectors: vec![
                SectorPolicy {
                    name: "technology".to_string(),
                    volatility_multiplier: 1.3,
                },
                SectorPolicy {
                    name: "energy".to_string(),
                    volatility_multiplier: 1.0,
                },
            ],
            ..Config::default()
        })
    }

    fn engine_with(table: StaticQuoteSupplier, config: Arc<Config>) -> Arc<SentimentEngine> {
        SentimentEngine::new(
            config,
            QuoteSupplier::Static(table),
            Arc::new(BatchStore::new_in_memory().unwrap()),
        )
    }

    fn seed_sector(table: &StaticQuoteSupplier, sector: &str) {
        table.set_quotes(
            sector,
            vec![
                quote("A", sector, 5.0, 4.5, 2_000_000.0, 1_000_000.0),
                quote("B", sector, 3.6, 4.0, 1_500_000.0, 1_500_000.0),
                quote("C", sector, 10.0, 10.0, 500_000.0, 500_000.0),
            ],
        );
    }

    #[tokio::test]
    async fn test_full_cycle_persists_complete_batch() {
        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        seed_sector(&table, "energy");
        table.set_benchmark(Timeframe::Daily, 1.01);

        let engine = engine_with(table, two_sector_config());
        let batch = engine.run_cycle(Timeframe::Daily).await.unwrap();

        assert_eq!(batch.sectors.len(), 2);
        let latest = engine.store().read_latest(Timeframe::Daily).unwrap().unwrap();
        assert_eq!(latest.id, batch.id);

        // technology: A +11.11% w2.0, B -10.00% w1.0, C 0.00% w1.0
        // raw = (22.22 - 10.0 + 0.0) / 4.0 = 3.0555, final = 3.972, alpha = 2.962
        let tech = &batch.sectors[0];
        assert_eq!(tech.sector, "technology");
        assert!((tech.raw_performance - 3.0555).abs() < 1e-3);
        assert!((tech.final_performance - 3.9722).abs() < 1e-3);
        assert!((tech.alpha - 2.9622).abs() < 1e-3);
        assert_eq!(tech.instrument_count, 3);
        assert!(!tech.low_confidence);
    }

    #[tokio::test]
    async fn test_pipeline_is_deterministic() {
        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        seed_sector(&table, "energy");
        table.set_benchmark(Timeframe::Daily, 1.01);

        let engine = engine_with(table, two_sector_config());
        let first = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Volume)
            .await
            .unwrap();
        let second = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Volume)
            .await
            .unwrap();

        for (a, b) in first.sectors.iter().zip(second.sectors.iter()) {
            assert_eq!(a.sector, b.sector);
            assert_eq!(a.raw_performance, b.raw_performance);
            assert_eq!(a.final_performance, b.final_performance);
            assert_eq!(a.sentiment_score, b.sentiment_score);
            assert_eq!(a.confidence, b.confidence);
        }
    }

    #[tokio::test]
    async fn test_supplier_failure_is_insufficient_data_not_fatal() {
        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        table.set_quotes("energy", vec![]);
        table.set_failing("energy", true);
        table.set_benchmark(Timeframe::Daily, 0.5);

        let engine = engine_with(table, two_sector_config());
        let batch = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Volume)
            .await
            .unwrap();

        let energy = batch.sectors.iter().find(|s| s.sector == "energy").unwrap();
        assert!(energy.low_confidence);
        assert_eq!(energy.instrument_count, 0);
        assert_eq!(energy.confidence, 0.0);
        assert_eq!(energy.raw_performance, 0.0);
    }

    #[tokio::test]
    async fn test_exclusion_policy_fails_batch_as_incomplete() {
        let mut config = (*two_sector_config()).clone();
        config.calc.include_low_confidence = false;
        let config = Arc::new(config);

        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        // energy has only 2 contributors, below the minimum of 3.
        table.set_quotes(
            "energy",
            vec![
                quote("XOM", "energy", 5.0, 4.9, 1.0, 1.0),
                quote("CVX", "energy", 5.0, 5.1, 1.0, 1.0),
            ],
        );
        table.set_benchmark(Timeframe::Daily, 0.5);

        let engine = engine_with(table, config);
        let err = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Volume)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::IncompleteBatch { .. }
        ));

        // Nothing was persisted.
        assert!(engine.store().read_latest(Timeframe::Daily).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_low_confidence_sector_included_by_default() {
        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        table.set_quotes(
            "energy",
            vec![
                quote("XOM", "energy", 5.0, 4.9, 1.0, 1.0),
                quote("CVX", "energy", 5.0, 5.1, 1.0, 1.0),
            ],
        );
        table.set_benchmark(Timeframe::Daily, 0.5);

        let engine = engine_with(table, two_sector_config());
        let batch = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Volume)
            .await
            .unwrap();

        let energy = batch.sectors.iter().find(|s| s.sector == "energy").unwrap();
        assert!(energy.low_confidence);
        assert_eq!(energy.instrument_count, 2);
        assert!(energy.confidence > 0.0);
    }

    #[tokio::test]
    async fn test_missing_benchmark_penalizes_confidence() {
        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        seed_sector(&table, "energy");
        // No benchmark set.

        let engine = engine_with(table, two_sector_config());
        let batch = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Volume)
            .await
            .unwrap();

        let tech = &batch.sectors[0];
        assert_eq!(tech.benchmark_performance, 0.0);
        assert_eq!(tech.alpha, tech.final_performance);
        // Coverage and count are perfect; only the benchmark penalty applies.
        assert!((tech.confidence - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_equal_weighting_preview() {
        let table = StaticQuoteSupplier::new();
        seed_sector(&table, "technology");
        seed_sector(&table, "energy");
        table.set_benchmark(Timeframe::Daily, 0.0);

        let engine = engine_with(table, two_sector_config());
        let preview = engine
            .compute_batch(Timeframe::Daily, WeightingPolicy::Equal)
            .await
            .unwrap();

        // technology with equal weights: (11.11 - 10.0 + 0.0) / 3 = 0.370
        let tech = &preview.sectors[0];
        assert!((tech.raw_performance - 0.3703).abs() < 1e-3);

        // Preview is never persisted.
        assert!(engine.store().read_latest(Timeframe::Daily).unwrap().is_none());
    }
}
