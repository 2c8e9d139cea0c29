//! One step of a scenario: fan the measurement reports out to the decision
//! service, then wait at a barrier until every answer is in or the step
//! deadline passes.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use uavsim_core::config::RunnerConfig;
use uavsim_core::report::MeasurementReport;
use uavsim_core::result::StepStatus;
use uavsim_core::types::{DecisionOutcome, StepEntry, StepSnapshot, TrajectoryPoint};
use xapp_client::DecisionService;

pub const DEADLINE_MARKER: &str = "step deadline exceeded";
const TASK_FAILED_MARKER: &str = "decision task failed";

// ---------------------------------------------------------------------------
// RunnerSettings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RunnerSettings {
    pub workers: usize,
    pub step_timeout: Duration,
    pub max_failed_fraction: f64,
}

impl From<&RunnerConfig> for RunnerSettings {
    fn from(cfg: &RunnerConfig) -> Self {
        Self {
            workers: cfg.workers.max(1),
            step_timeout: Duration::from_millis(cfg.step_timeout_ms),
            max_failed_fraction: cfg.max_failed_fraction,
        }
    }
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self::from(&RunnerConfig::default())
    }
}

// ---------------------------------------------------------------------------
// StepState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepState {
    Pending,
    Dispatched(usize),
    Collected,
    Failed,
}

impl fmt::Display for StepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepState::Pending => f.write_str("pending"),
            StepState::Dispatched(k) => write!(f, "dispatched({k})"),
            StepState::Collected => f.write_str("collected"),
            StepState::Failed => f.write_str("failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// StepRunner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// One entry per dispatched UAV, in the order the work was given.
    pub snapshot: StepSnapshot,
    pub status: StepStatus,
}

/// Runs steps against one decision service. The worker permits are shared by
/// every step, so `workers` bounds in-flight calls for the whole scenario.
pub struct StepRunner {
    service: Arc<dyn DecisionService>,
    permits: Arc<Semaphore>,
    settings: RunnerSettings,
}

impl StepRunner {
    pub fn new(service: Arc<dyn DecisionService>, settings: RunnerSettings) -> Self {
        let permits = Arc::new(Semaphore::new(settings.workers.max(1)));
        Self {
            service,
            permits,
            settings,
        }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    /// Dispatch one decision call per `(point, report)` pair and collect the
    /// results. Per-UAV failures come back as markers in the snapshot; the
    /// step itself fails when the deadline passes or too many calls fail.
    pub async fn run_step(
        &self,
        step: usize,
        time_s: f64,
        work: Vec<(TrajectoryPoint, MeasurementReport)>,
    ) -> StepOutcome {
        let mut state = StepState::Pending;
        tracing::debug!(step, %state, "step");

        let n = work.len();
        let deadline = Instant::now() + self.settings.step_timeout;
        let mut set = JoinSet::new();
        let mut points = Vec::with_capacity(n);

        for (idx, (point, report)) in work.into_iter().enumerate() {
            points.push(point);
            let service = Arc::clone(&self.service);
            let permits = Arc::clone(&self.permits);
            set.spawn(async move {
                let _permit = match permits.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return (idx, DecisionOutcome::unavailable("worker pool closed", 0)),
                };
                let outcome = match service.decide(&report).await {
                    Ok(decision) => DecisionOutcome::Decided(decision),
                    Err(e) => DecisionOutcome::unavailable(e.to_string(), e.attempts()),
                };
                (idx, outcome)
            });
        }
        state = StepState::Dispatched(n);
        tracing::debug!(step, %state, "step");

        let mut slots: Vec<Option<DecisionOutcome>> = vec![None; n];
        let mut deadline_hit = false;
        let mut received = 0;
        loop {
            match tokio::time::timeout_at(deadline, set.join_next()).await {
                Ok(Some(joined)) => {
                    received += 1;
                    match joined {
                        Ok((idx, outcome)) => slots[idx] = Some(outcome),
                        Err(e) => tracing::warn!(step, error = %e, "decision task did not finish"),
                    }
                    state = StepState::Dispatched(n - received);
                    tracing::trace!(step, %state, "step");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_hit = true;
                    break;
                }
            }
        }
        if deadline_hit {
            set.shutdown().await;
        }

        let missing = slots.iter().filter(|s| s.is_none()).count();
        let filler = if deadline_hit {
            DEADLINE_MARKER
        } else {
            TASK_FAILED_MARKER
        };
        let entries: Vec<StepEntry> = points
            .into_iter()
            .zip(slots)
            .map(|(point, slot)| StepEntry {
                point,
                outcome: slot.unwrap_or_else(|| DecisionOutcome::unavailable(filler, 0)),
            })
            .collect();
        let snapshot = StepSnapshot::new(step, time_s, entries);
        let failed = snapshot.failed_count();

        let status = if deadline_hit {
            StepStatus::Failed {
                reason: format!("{DEADLINE_MARKER}: {missing} of {n} decisions outstanding"),
            }
        } else if n > 0 && failed as f64 / n as f64 > self.settings.max_failed_fraction {
            StepStatus::Failed {
                reason: format!("{failed} of {n} decisions failed"),
            }
        } else {
            StepStatus::Collected
        };

        state = if status.is_collected() {
            StepState::Collected
        } else {
            StepState::Failed
        };
        tracing::debug!(step, %state, failed, "step");

        StepOutcome { snapshot, status }
    }
}
