//! Sentiment read endpoints: latest batch, history, and preview.

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::{freshness, BatchSummary, WeightingPolicy};
use crate::types::{Freshness, SentimentBatch, Timeframe};
use crate::AppState;

/// Latest batch with freshness metadata.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResponse {
    pub batch: SentimentBatch,
    pub freshness: Freshness,
}

/// History listing for a timeframe.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub timeframe: Timeframe,
    pub batches: Vec<BatchSummary>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PreviewQuery {
    /// Weighting policy: volume (default) or equal.
    pub weighting: Option<String>,
}

/// Create the sentiment router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:timeframe", get(get_latest))
        .route("/:timeframe/history", get(get_history))
        .route("/:timeframe/preview", get(get_preview))
}

fn parse_timeframe(raw: &str) -> Result<Timeframe> {
    Timeframe::from_str(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown timeframe: {}", raw)))
}

/// Get the latest persisted batch for a timeframe, with freshness.
async fn get_latest(
    State(state): State<AppState>,
    Path(timeframe): Path<String>,
) -> Result<Json<SentimentResponse>> {
    let timeframe = parse_timeframe(&timeframe)?;
    let batch = state
        .engine
        .store()
        .read_latest(timeframe)?
        .ok_or_else(|| {
            AppError::NotFound(format!("No batch persisted for {}", timeframe.key()))
        })?;

    let policy = state.config.policy(timeframe);
    let freshness = freshness::evaluate(Some(batch.computed_at), Utc::now(), policy.staleness_secs);

    Ok(Json(SentimentResponse { batch, freshness }))
}

/// List recent batches for a timeframe, newest first.
async fn get_history(
    State(state): State<AppState>,
    Path(timeframe): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>> {
    let timeframe = parse_timeframe(&timeframe)?;
    let limit = query.limit.unwrap_or(20).min(100);
    let batches = state.engine.store().recent_batches(timeframe, limit)?;

    Ok(Json(HistoryResponse { timeframe, batches }))
}

/// Compute a non-persisted preview batch, bypassing the orchestrator.
async fn get_preview(
    State(state): State<AppState>,
    Path(timeframe): Path<String>,
    Query(query): Query<PreviewQuery>,
) -> Result<Json<SentimentBatch>> {
    let timeframe = parse_timeframe(&timeframe)?;
    let weighting = match query.weighting.as_deref() {
        Some(raw) => WeightingPolicy::from_str(raw)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown weighting: {}", raw)))?,
        None => WeightingPolicy::Volume,
    };

    let batch = state.engine.compute_batch(timeframe, weighting).await?;
    Ok(Json(batch))
}
