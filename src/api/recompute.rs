//! Recompute request endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::services::freshness;
use crate::types::{Freshness, JobStatus, RecomputeOutcome, Timeframe};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecomputeQuery {
    /// Bypass the soft-window deferral. Never bypasses the hard cooldown
    /// or an in-progress job.
    pub force: Option<bool>,
}

/// Operational view of one timeframe's job state.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecomputeStatusResponse {
    pub timeframe: Timeframe,
    pub status: JobStatus,
    pub last_completed: Option<chrono::DateTime<Utc>>,
    pub started_at: Option<chrono::DateTime<Utc>>,
    pub scheduled_boundary: Option<chrono::DateTime<Utc>>,
    pub freshness: Freshness,
}

/// Create the recompute router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:timeframe", post(request_recompute))
        .route("/:timeframe/status", get(get_status))
}

fn parse_timeframe(raw: &str) -> Result<Timeframe> {
    Timeframe::from_str(raw)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown timeframe: {}", raw)))
}

/// Map an admission outcome to its HTTP response.
///
/// Rejections become `AppError` variants so the error module stays the
/// single source of truth for the 409/429 mappings.
fn outcome_response(outcome: RecomputeOutcome) -> Result<Response> {
    match outcome {
        RecomputeOutcome::RejectedRunning { started_at, .. } => Err(AppError::AlreadyRunning {
            started_at: started_at.to_rfc3339(),
        }),
        RecomputeOutcome::RejectedCooldown {
            retry_after_seconds,
        } => Err(AppError::CooldownActive {
            retry_after_seconds,
        }),
        accepted => Ok((StatusCode::ACCEPTED, Json(accepted)).into_response()),
    }
}

/// Request a recompute for a timeframe.
async fn request_recompute(
    State(state): State<AppState>,
    Path(timeframe): Path<String>,
    Query(query): Query<RecomputeQuery>,
) -> Result<Response> {
    let timeframe = parse_timeframe(&timeframe)?;
    let force = query.force.unwrap_or(false);

    let outcome = state.orchestrator.request_recompute(timeframe, force).await;
    outcome_response(outcome)
}

/// Get job state and freshness for a timeframe.
async fn get_status(
    State(state): State<AppState>,
    Path(timeframe): Path<String>,
) -> Result<Json<RecomputeStatusResponse>> {
    let timeframe = parse_timeframe(&timeframe)?;
    let job = state.orchestrator.job_state(timeframe).await;

    let last_computed = state
        .engine
        .store()
        .read_latest(timeframe)?
        .map(|b| b.computed_at);
    let policy = state.config.policy(timeframe);
    let freshness = freshness::evaluate(last_computed, Utc::now(), policy.staleness_secs);

    Ok(Json(RecomputeStatusResponse {
        timeframe,
        status: job.status,
        last_completed: job.last_completed,
        started_at: job.started_at,
        scheduled_boundary: job.scheduled_boundary,
        freshness,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn status_of(outcome: RecomputeOutcome) -> StatusCode {
        match outcome_response(outcome) {
            Ok(response) => response.status(),
            Err(e) => e.into_response().status(),
        }
    }

    #[test]
    fn test_accepted_outcomes_are_202() {
        assert_eq!(
            status_of(RecomputeOutcome::AcceptedImmediate {
                job_id: Uuid::new_v4(),
            }),
            StatusCode::ACCEPTED
        );
        assert_eq!(
            status_of(RecomputeOutcome::AcceptedScheduled { eta: Utc::now() }),
            StatusCode::ACCEPTED
        );
    }

    #[test]
    fn test_rejected_running_is_409() {
        let outcome = RecomputeOutcome::RejectedRunning {
            job_id: Uuid::new_v4(),
            started_at: Utc::now(),
        };
        assert_eq!(status_of(outcome), StatusCode::CONFLICT);
    }

    #[test]
    fn test_rejected_cooldown_is_429() {
        let outcome = RecomputeOutcome::RejectedCooldown {
            retry_after_seconds: 120,
        };
        assert_eq!(status_of(outcome), StatusCode::TOO_MANY_REQUESTS);
    }
}
