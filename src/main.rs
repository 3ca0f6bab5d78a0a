use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sectorpulse::config::Config;
use sectorpulse::services::{
    freshness, BatchStore, HttpQuoteClient, QuoteSupplier, RecomputeOrchestrator, SentimentEngine,
    StaticQuoteSupplier,
};
use sectorpulse::types::{InstrumentQuote, Timeframe};
use sectorpulse::{api, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sectorpulse=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Sectorpulse server on {}:{}", config.host, config.port);

    // Open the batch store
    let store = Arc::new(BatchStore::new(&config.db_path)?);

    // Quote supplier: upstream HTTP service, or static fixtures in dev mode
    let supplier = match &config.quotes_base_url {
        Some(base_url) => {
            info!("Using upstream quote service at {}", base_url);
            QuoteSupplier::Http(HttpQuoteClient::new(base_url.clone()))
        }
        None => {
            warn!("QUOTES_BASE_URL not set; serving static fixture quotes");
            QuoteSupplier::Static(dev_fixtures(&config))
        }
    };

    // Create the engine and orchestrator
    let engine = SentimentEngine::new(config.clone(), supplier, store.clone());
    let orchestrator = RecomputeOrchestrator::new(config.clone(), engine.clone());

    // Restore last-completed timestamps from persisted batches
    orchestrator.bootstrap_from_store().await;

    // Create application state
    let state = AppState {
        config: config.clone(),
        engine: engine.clone(),
        orchestrator: orchestrator.clone(),
    };

    // Start the staleness sweep: stale timeframes re-enter the normal
    // admission path, so cooldown and concurrency rules still apply.
    {
        let config = config.clone();
        let store = store.clone();
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(tokio::time::Duration::from_secs(config.cadence_check_secs))
                    .await;

                for timeframe in Timeframe::all() {
                    let last_computed = match store.read_latest(timeframe) {
                        Ok(batch) => batch.map(|b| b.computed_at),
                        Err(e) => {
                            warn!("Staleness sweep read failed for {}: {}", timeframe.key(), e);
                            continue;
                        }
                    };

                    let policy = config.policy(timeframe);
                    let fresh = freshness::evaluate(
                        last_computed,
                        chrono::Utc::now(),
                        policy.staleness_secs,
                    );
                    if fresh.is_stale {
                        let outcome = orchestrator.request_recompute(timeframe, false).await;
                        info!(
                            "Staleness sweep for {}: {:?}",
                            timeframe.key(),
                            outcome
                        );
                    }
                }
            }
        });
    }

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = Router::new()
        .merge(api::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Sectorpulse server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Deterministic fixture quotes so a dev server can produce full batches
/// without an upstream quote service.
fn dev_fixtures(config: &Config) -> StaticQuoteSupplier {
    let table = StaticQuoteSupplier::new();

    for (index, sector) in config.sectors.iter().enumerate() {
        let drift = (index as f64 - config.sectors.len() as f64 / 2.0) * 0.4;
        let quotes: Vec<InstrumentQuote> = (0..5)
            .map(|n| {
                let previous = 50.0 + 10.0 * n as f64;
                InstrumentQuote {
                    symbol: format!("{}{}", sector.name.to_uppercase(), n),
                    sector: sector.name.clone(),
                    current_price: previous * (1.0 + (drift + n as f64 * 0.1) / 100.0),
                    previous_price: previous,
                    volume: 1_000_000.0 + 250_000.0 * n as f64,
                    avg_volume: 1_000_000.0,
                }
            })
            .collect();
        table.set_quotes(&sector.name, quotes);
    }

    for timeframe in Timeframe::all() {
        table.set_benchmark(timeframe, 0.25);
    }

    table
}
