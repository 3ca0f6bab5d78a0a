//! Recompute orchestration.
//!
//! One scheduling state machine serves every timeframe via the
//! per-timeframe policy table: a hard minimum interval, a soft preferred
//! cadence aligned to clock boundaries, and at-most-one running job per
//! timeframe. The admission decision itself is a pure function over the
//! job state, the policy, and a supplied clock, so it is unit-testable
//! without timers.

use chrono::{DateTime, TimeZone, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{Config, TimeframePolicy};
use crate::error::AppError;
use crate::services::pipeline::SentimentEngine;
use crate::types::{JobStatus, RecomputeJobState, RecomputeOutcome, Timeframe};

/// Pure admission decision for an incoming recompute request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Admit immediately.
    Run,
    /// Defer to the next clock boundary.
    Defer { eta: DateTime<Utc> },
    /// Reject: a job is already in progress.
    RejectRunning,
    /// Reject: hard cooldown has not elapsed.
    RejectCooldown { retry_after_seconds: i64 },
}

/// Decide what to do with a recompute request.
///
/// Cooling-down is derived from `last_completed` at request time.
/// Force never bypasses the hard cooldown or an in-progress job; it only
/// bypasses the soft-window deferral.
pub fn decide(
    state: &RecomputeJobState,
    policy: &TimeframePolicy,
    force: bool,
    now: DateTime<Utc>,
) -> Admission {
    if state.status == JobStatus::Running {
        return Admission::RejectRunning;
    }

    let last = match state.last_completed {
        Some(last) => last,
        // Nothing to cool down from.
        None => return Admission::Run,
    };

    let elapsed = (now - last).num_seconds();
    if elapsed < policy.hard_cooldown_secs {
        return Admission::RejectCooldown {
            retry_after_seconds: policy.hard_cooldown_secs - elapsed,
        };
    }

    if force || elapsed >= policy.soft_window_secs {
        Admission::Run
    } else {
        Admission::Defer {
            eta: next_boundary(policy.boundary_secs, now),
        }
    }
}

/// Next clock boundary strictly after `now` for a boundary interval.
///
/// Boundaries are multiples of the interval from the Unix epoch, so a
/// 30-minute interval yields :00/:30 and a 1-hour interval yields the top
/// of the hour.
pub fn next_boundary(boundary_secs: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    // A misconfigured zero or negative interval degrades to one second.
    let interval = boundary_secs.max(1);
    let secs = now.timestamp();
    let next = (secs.div_euclid(interval) + 1) * interval;
    Utc.timestamp_opt(next, 0).single().unwrap_or(now)
}

/// The recompute orchestrator.
///
/// Owns all per-timeframe job state; each timeframe's state is guarded by
/// its own lock, so timeframes admit and run independently.
pub struct RecomputeOrchestrator {
    config: Arc<Config>,
    engine: Arc<SentimentEngine>,
    states: DashMap<Timeframe, Arc<Mutex<RecomputeJobState>>>,
}

impl RecomputeOrchestrator {
    /// Create a new orchestrator with idle state for every timeframe.
    pub fn new(config: Arc<Config>, engine: Arc<SentimentEngine>) -> Arc<Self> {
        let states = DashMap::new();
        for timeframe in Timeframe::all() {
            states.insert(
                timeframe,
                Arc::new(Mutex::new(RecomputeJobState::default())),
            );
        }
        Arc::new(Self {
            config,
            engine,
            states,
        })
    }

    /// Seed last-completed timestamps from persisted batches.
    ///
    /// Job state does not survive a restart; the store's latest batch per
    /// timeframe is the best available completion record.
    pub async fn bootstrap_from_store(&self) {
        for timeframe in Timeframe::all() {
            match self.engine.store().read_latest(timeframe) {
                Ok(Some(batch)) => {
                    let state = self.state(timeframe);
                    let mut state = state.lock().await;
                    state.last_completed = Some(batch.computed_at);
                    info!(
                        "Restored last completion for {} from batch {}",
                        timeframe.key(),
                        batch.id
                    );
                }
                Ok(None) => {}
                Err(e) => warn!("Could not bootstrap {}: {}", timeframe.key(), e),
            }
        }
    }

    /// Snapshot of the job state for one timeframe.
    pub async fn job_state(&self, timeframe: Timeframe) -> RecomputeJobState {
        self.state(timeframe).lock().await.clone()
    }

    /// Handle a recompute request at the current wall-clock time.
    pub async fn request_recompute(
        self: &Arc<Self>,
        timeframe: Timeframe,
        force: bool,
    ) -> RecomputeOutcome {
        self.request_recompute_at(timeframe, force, Utc::now()).await
    }

    /// Handle a recompute request against a supplied clock.
    pub async fn request_recompute_at(
        self: &Arc<Self>,
        timeframe: Timeframe,
        force: bool,
        now: DateTime<Utc>,
    ) -> RecomputeOutcome {
        let policy = self.config.policy(timeframe);
        let state_arc = self.state(timeframe);
        let mut state = state_arc.lock().await;

        match decide(&state, &policy, force, now) {
            Admission::RejectRunning => RecomputeOutcome::RejectedRunning {
                job_id: state.job_id.unwrap_or_else(Uuid::nil),
                started_at: state.started_at.unwrap_or(now),
            },
            Admission::RejectCooldown {
                retry_after_seconds,
            } => RecomputeOutcome::RejectedCooldown {
                retry_after_seconds,
            },
            Admission::Run => {
                let job_id = Uuid::new_v4();
                state.status = JobStatus::Running;
                state.job_id = Some(job_id);
                state.started_at = Some(now);
                drop(state);

                self.spawn_job(timeframe, job_id, state_arc);
                RecomputeOutcome::AcceptedImmediate { job_id }
            }
            Admission::Defer { eta } => {
                // Duplicate deferrals for the same boundary collapse to
                // one pending task.
                if state.scheduled_boundary != Some(eta) {
                    state.scheduled_boundary = Some(eta);
                    self.spawn_deferred(timeframe, eta);
                }
                RecomputeOutcome::AcceptedScheduled { eta }
            }
        }
    }

    fn state(&self, timeframe: Timeframe) -> Arc<Mutex<RecomputeJobState>> {
        self.states
            .entry(timeframe)
            .or_insert_with(|| Arc::new(Mutex::new(RecomputeJobState::default())))
            .clone()
    }

    /// Execute an admitted job under the pipeline timeout.
    ///
    /// The state lock is not held while the pipeline runs; it is
    /// re-acquired only to record completion. Any failure or timeout
    /// reverts to idle without touching last-completed, so the next
    /// request is evaluated against the previous successful timestamp.
    fn spawn_job(&self, timeframe: Timeframe, job_id: Uuid, state: Arc<Mutex<RecomputeJobState>>) {
        let engine = self.engine.clone();
        let timeout_secs = self.config.pipeline_timeout_secs;

        tokio::spawn(async move {
            let result = match tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                engine.run_cycle(timeframe),
            )
            .await
            {
                Ok(inner) => inner,
                Err(_) => Err(AppError::PipelineTimeout(timeout_secs)),
            };

            let mut state = state.lock().await;
            state.status = JobStatus::Idle;
            state.job_id = None;
            state.started_at = None;

            match result {
                Ok(batch) => {
                    state.last_completed = Some(batch.computed_at);
                    info!(
                        "Recompute job {} for {} completed: batch {}",
                        job_id,
                        timeframe.key(),
                        batch.id
                    );
                }
                Err(e) => {
                    error!(
                        "Recompute job {} for {} failed: {}",
                        job_id,
                        timeframe.key(),
                        e
                    );
                }
            }
        });
    }

    /// Sleep until the boundary, then re-enter the normal admission path.
    fn spawn_deferred(self: &Arc<Self>, timeframe: Timeframe, eta: DateTime<Utc>) {
        let orchestrator = self.clone();

        tokio::spawn(async move {
            let wait = (eta - Utc::now()).num_milliseconds().max(0) as u64;
            tokio::time::sleep(Duration::from_millis(wait)).await;

            {
                let state = orchestrator.state(timeframe);
                let mut state = state.lock().await;
                if state.scheduled_boundary == Some(eta) {
                    state.scheduled_boundary = None;
                }
            }

            let outcome = orchestrator.request_recompute(timeframe, false).await;
            info!(
                "Deferred recompute for {} fired at boundary: {:?}",
                timeframe.key(),
                outcome
            );
        });
    }
}
