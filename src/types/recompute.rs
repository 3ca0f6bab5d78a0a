use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of the recompute job for one timeframe.
///
/// Cooling-down is derived from the last-completed timestamp at request
/// time, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Idle,
    Running,
}

/// Mutable scheduling state for one timeframe.
///
/// Owned exclusively by the recompute orchestrator; one instance per
/// timeframe for the life of the process.
#[derive(Debug, Clone, Default)]
pub struct RecomputeJobState {
    /// Current job status.
    pub status: JobStatus,
    /// Timestamp of the last successful completion.
    pub last_completed: Option<DateTime<Utc>>,
    /// Identifier of the currently running job, if any.
    pub job_id: Option<Uuid>,
    /// Start time of the currently running job, if any.
    pub started_at: Option<DateTime<Utc>>,
    /// Boundary a deferred run is already scheduled for, if any.
    pub scheduled_boundary: Option<DateTime<Utc>>,
}

/// Outcome of a recompute request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all_fields = "camelCase")]
pub enum RecomputeOutcome {
    /// Job admitted and started now.
    #[serde(rename = "accepted_immediate")]
    AcceptedImmediate { job_id: Uuid },
    /// Job deferred to the next clock boundary.
    #[serde(rename = "accepted_scheduled")]
    AcceptedScheduled { eta: DateTime<Utc> },
    /// An equivalent job is already in progress.
    #[serde(rename = "rejected_running")]
    RejectedRunning {
        job_id: Uuid,
        started_at: DateTime<Utc>,
    },
    /// Hard cooldown has not yet elapsed.
    #[serde(rename = "rejected_cooldown")]
    RejectedCooldown { retry_after_seconds: i64 },
}

/// Age of the latest persisted batch versus its staleness threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Freshness {
    /// Seconds since the batch was computed; none if no batch exists.
    pub age_seconds: Option<i64>,
    /// Whether the batch is older than the per-timeframe threshold.
    pub is_stale: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = RecomputeOutcome::RejectedCooldown {
            retry_after_seconds: 42,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "rejected_cooldown");
        assert_eq!(json["retryAfterSeconds"], 42);
    }

    #[test]
    fn test_job_state_defaults_idle() {
        let state = RecomputeJobState::default();
        assert_eq!(state.status, JobStatus::Idle);
        assert!(state.last_completed.is_none());
        assert!(state.job_id.is_none());
    }
}
