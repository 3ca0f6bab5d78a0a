//! Sectorpulse - Sector sentiment aggregation and recompute scheduling server

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::{RecomputeOrchestrator, SentimentEngine};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<SentimentEngine>,
    pub orchestrator: Arc<RecomputeOrchestrator>,
}

// Re-export commonly used types
pub use error::{AppError, Result};
pub use types::*;
