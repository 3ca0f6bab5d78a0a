//! Quote supplier seam.
//!
//! Market data comes from an upstream universe service over HTTP in
//! production, or from an in-memory static table in dev mode and tests.
//! Supplier failure for a sector is transient-unavailable: the affected
//! sector computes as insufficient data, never a fatal batch error.

use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::warn;

use crate::error::{AppError, Result};
use crate::types::{InstrumentQuote, Timeframe};

const HTTP_TIMEOUT_SECS: u64 = 10;

/// HTTP client for the upstream quote service.
pub struct HttpQuoteClient {
    client: Client,
    base_url: String,
}

/// Upstream quotes response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuotesResponse {
    quotes: Vec<InstrumentQuote>,
}

/// Upstream benchmark response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BenchmarkResponse {
    percent_change: f64,
}

impl HttpQuoteClient {
    /// Create a new client for the given base URL.
    ///
    /// Panics if the HTTP client cannot be constructed; this runs once at
    /// startup and a client without its timeout is not an acceptable
    /// substitute.
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .expect("Failed to construct HTTP quote client");
        Self { client, base_url }
    }

    /// Fetch all quotes for a sector.
    pub async fn get_quotes(
        &self,
        sector: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<InstrumentQuote>> {
        let url = format!(
            "{}/quotes/{}?timeframe={}",
            self.base_url,
            sector,
            timeframe.key()
        );
        let response: QuotesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.quotes)
    }

    /// Fetch the reference index performance for a timeframe.
    pub async fn get_benchmark(&self, timeframe: Timeframe) -> Result<f64> {
        let url = format!("{}/benchmark?timeframe={}", self.base_url, timeframe.key());
        let response: BenchmarkResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.percent_change)
    }
}

/// In-memory quote table for dev mode and tests.
#[derive(Default)]
pub struct StaticQuoteSupplier {
    /// Quotes keyed by sector.
    quotes: DashMap<String, Vec<InstrumentQuote>>,
    /// Benchmark percent change keyed by timeframe key.
    benchmarks: DashMap<&'static str, f64>,
    /// Sectors that should behave as transiently unavailable.
    failing: DashMap<String, ()>,
    /// Artificial per-fetch latency in milliseconds, to exercise the
    /// running state in tests.
    delay_ms: std::sync::atomic::AtomicU64,
}

impl StaticQuoteSupplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the quotes for a sector.
    pub fn set_quotes(&self, sector: &str, quotes: Vec<InstrumentQuote>) {
        self.quotes.insert(sector.to_string(), quotes);
    }

    /// Set the benchmark for a timeframe.
    pub fn set_benchmark(&self, timeframe: Timeframe, percent_change: f64) {
        self.benchmarks.insert(timeframe.key(), percent_change);
    }

    /// Add artificial latency to every fetch.
    pub fn set_delay_ms(&self, delay_ms: u64) {
        self.delay_ms
            .store(delay_ms, std::sync::atomic::Ordering::Relaxed);
    }

    async fn apply_delay(&self) {
        let delay = self.delay_ms.load(std::sync::atomic::Ordering::Relaxed);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
    }

    /// Make a sector behave as transiently unavailable.
    pub fn set_failing(&self, sector: &str, failing: bool) {
        if failing {
            self.failing.insert(sector.to_string(), ());
        } else {
            self.failing.remove(sector);
        }
    }

    fn get_quotes(&self, sector: &str) -> Result<Vec<InstrumentQuote>> {
        if self.failing.contains_key(sector) {
            return Err(AppError::Internal(format!(
                "Quote source unavailable for sector {}",
                sector
            )));
        }
        Ok(self
            .quotes
            .get(sector)
            .map(|q| q.clone())
            .unwrap_or_default())
    }

    fn get_benchmark(&self, timeframe: Timeframe) -> Option<f64> {
        self.benchmarks.get(timeframe.key()).map(|b| *b)
    }
}

/// Quote supplier backing for the pipeline.
pub enum QuoteSupplier {
    Http(HttpQuoteClient),
    Static(StaticQuoteSupplier),
}

impl QuoteSupplier {
    /// Fetch all quotes for a sector over the given horizon.
    pub async fn get_quotes(
        &self,
        sector: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<InstrumentQuote>> {
        match self {
            Self::Http(client) => client.get_quotes(sector, timeframe).await,
            Self::Static(table) => {
                table.apply_delay().await;
                table.get_quotes(sector)
            }
        }
    }

    /// Fetch the benchmark performance; `None` when unavailable.
    ///
    /// Unavailability is absorbed here because downstream comparison
    /// substitutes zero and flags confidence instead of failing.
    pub async fn get_benchmark(&self, timeframe: Timeframe) -> Option<f64> {
        match self {
            Self::Http(client) => match client.get_benchmark(timeframe).await {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Benchmark unavailable for {}: {}", timeframe.key(), e);
                    None
                }
            },
            Self::Static(table) => table.get_benchmark(timeframe),
        }
    }
}
