use crate::abort::AbortSignal;
use crate::runner::{RunnerSettings, StepRunner};
use std::sync::Arc;
use uavsim_core::aggregate::{aggregate, InterferenceModel};
use uavsim_core::config::HarnessConfig;
use uavsim_core::energy::EnergyModel;
use uavsim_core::report;
use uavsim_core::result::{Completion, ScenarioAccumulator, ScenarioResult, StepStatus};
use uavsim_core::scenario::{self, ScenarioConfig};
use uavsim_core::trajectory::{self, BaseTrajectory};
use uavsim_core::types::TrajectoryPoint;
use uavsim_core::Result;
use xapp_client::DecisionService;

// ---------------------------------------------------------------------------
// TrajectorySource
// ---------------------------------------------------------------------------

/// Where each scenario's base trajectory comes from.
#[derive(Debug, Clone)]
pub enum TrajectorySource {
    /// Synthesized per scenario at the scenario's own interval.
    Synthetic { seed: u64 },
    /// One recorded trajectory shared by every scenario.
    Recorded(BaseTrajectory),
}

impl TrajectorySource {
    pub fn base_for(&self, scenario: &ScenarioConfig) -> BaseTrajectory {
        match self {
            TrajectorySource::Synthetic { seed } => {
                BaseTrajectory::synthetic(scenario.steps, scenario.interval_s, *seed)
            }
            TrajectorySource::Recorded(base) => base.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    service: Arc<dyn DecisionService>,
    runner: StepRunner,
    interference: InterferenceModel,
    energy: EnergyModel,
    abort: AbortSignal,
}

impl Orchestrator {
    pub fn new(
        service: Arc<dyn DecisionService>,
        settings: RunnerSettings,
        interference: InterferenceModel,
    ) -> Self {
        let runner = StepRunner::new(Arc::clone(&service), settings);
        Self {
            service,
            runner,
            interference,
            energy: EnergyModel::default(),
            abort: AbortSignal::never(),
        }
    }

    pub fn from_config(service: Arc<dyn DecisionService>, cfg: &HarnessConfig) -> Self {
        Self::new(
            service,
            RunnerSettings::from(&cfg.runner),
            cfg.interference.clone(),
        )
        .with_energy(cfg.energy.clone())
    }

    pub fn with_energy(mut self, energy: EnergyModel) -> Self {
        self.energy = energy;
        self
    }

    pub fn with_abort(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn strategy(&self) -> &str {
        self.service.label()
    }

    /// Run `scenario` over `base` from the first step to the last, or until
    /// the abort signal is raised.
    ///
    /// Scenario and trajectory errors are returned before any decision is
    /// requested. Everything after that is recorded in the result: failed
    /// decisions as markers, failed steps as failed records, an abort as
    /// [`Completion::Aborted`].
    pub async fn run(&self, scenario: &ScenarioConfig, base: &BaseTrajectory) -> Result<ScenarioResult> {
        scenario.validate()?;
        let trajectories = trajectory::generate(base, scenario)?;
        let duration_s = trajectories[0]
            .points
            .last()
            .map(|p| p.time_s)
            .unwrap_or_default();

        self.service.begin_scenario();
        tracing::info!(
            scenario = %scenario.name,
            uavs = scenario.uav_count(),
            steps = scenario.steps,
            strategy = self.service.label(),
            "scenario started"
        );

        let mut acc = ScenarioAccumulator::new(scenario.clone(), self.service.label());
        let mut completion = Completion::Completed;

        for step in 0..scenario.steps {
            if self.abort.is_aborted() {
                tracing::warn!(
                    scenario = %scenario.name,
                    step,
                    recorded = acc.recorded_steps(),
                    "scenario aborted"
                );
                completion = Completion::Aborted { at_step: step };
                break;
            }

            let time_s = trajectories[0].points[step].time_s;
            let active: Vec<&TrajectoryPoint> = trajectories
                .iter()
                .map(|t| &t.points[step])
                .filter(|p| p.active)
                .collect();
            let reports = report::build_reports(&active, scenario.capacity_prb, duration_s);
            let work = active.into_iter().cloned().zip(reports).collect();

            let outcome = self.runner.run_step(step, time_s, work).await;
            match &outcome.status {
                StepStatus::Collected => {
                    let metrics = aggregate(
                        &outcome.snapshot,
                        scenario.capacity_prb,
                        scenario.interval_s,
                        &self.interference,
                        &self.energy,
                    );
                    if metrics.overrun {
                        tracing::debug!(
                            step,
                            total_prb = metrics.total_prb,
                            capacity = metrics.capacity_prb,
                            "PRB overrun"
                        );
                    }
                    acc.push_collected(&outcome.snapshot, metrics);
                }
                StepStatus::Failed { reason } => {
                    tracing::warn!(scenario = %scenario.name, step, %reason, "step failed");
                    acc.push_failed(&outcome.snapshot, reason.clone());
                }
            }
        }

        let result = acc.finish(completion);
        let s = &result.summary;
        tracing::info!(
            scenario = %scenario.name,
            completion = %result.completion.label(),
            collected = s.collected_steps,
            failed = s.failed_steps,
            failed_decisions = s.failed_decisions,
            mean_utilization = s.mean_prb_utilization,
            overrun_rate = s.overrun_rate,
            "scenario finished"
        );
        Ok(result)
    }

    /// Run the named catalogue scenarios one after another. A scenario that
    /// cannot start is logged and skipped; an abort stops the list after the
    /// scenario it interrupted.
    pub async fn run_catalogue(
        &self,
        names: &[String],
        source: &TrajectorySource,
        steps: Option<usize>,
    ) -> Vec<ScenarioResult> {
        let mut results = Vec::with_capacity(names.len());
        for name in names {
            if self.abort.is_aborted() {
                tracing::warn!(scenario = %name, "skipped after abort");
                continue;
            }
            let scenario = match scenario::find(name) {
                Ok(s) => match steps {
                    Some(n) => s.with_steps(n),
                    None => s,
                },
                Err(e) => {
                    tracing::error!(scenario = %name, error = %e, "scenario skipped");
                    continue;
                }
            };
            let base = source.base_for(&scenario);
            match self.run(&scenario, &base).await {
                Ok(result) => results.push(result),
                Err(e) => tracing::error!(scenario = %name, error = %e, "scenario skipped"),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abort::{abort_pair, AbortHandle};
    use crate::runner::tests::MockService;
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::atomic::Ordering;
    use std::sync::Mutex;
    use std::time::Duration;
    use uavsim_core::report::MeasurementReport;
    use uavsim_core::types::{Decision, DecisionOutcome};
    use uavsim_core::SimError;
    use xapp_client::strategy::RuleBased;
    use xapp_client::DecisionError;

    fn orchestrator(service: Arc<dyn DecisionService>) -> Orchestrator {
        Orchestrator::new(
            service,
            RunnerSettings {
                workers: 4,
                step_timeout: Duration::from_secs(5),
                max_failed_fraction: 0.5,
            },
            InterferenceModel::default(),
        )
    }

    fn formation(steps: usize) -> (ScenarioConfig, BaseTrajectory) {
        let s = scenario::find("3uav_formation").unwrap().with_steps(steps);
        let base = BaseTrajectory::synthetic(s.steps, s.interval_s, 42);
        (s, base)
    }

    #[tokio::test]
    async fn one_record_per_step_and_one_outcome_per_uav() {
        let (s, base) = formation(10);
        let result = orchestrator(Arc::new(MockService::with_prb(10)))
            .run(&s, &base)
            .await
            .unwrap();
        assert_eq!(result.steps.len(), 10);
        assert!(result.is_complete());
        for (i, rec) in result.steps.iter().enumerate() {
            assert_eq!(rec.step, i);
            assert_eq!(rec.outcomes.len(), 3);
            assert!(rec.status.is_collected());
        }
        assert_eq!(result.strategy, "mock");
    }

    #[tokio::test]
    async fn failing_uav_is_contained() {
        let (s, base) = formation(10);
        let mut svc = MockService::with_prb(10);
        svc.failures.push(("uav-wing1".into(), 5));
        let result = orchestrator(Arc::new(svc)).run(&s, &base).await.unwrap();

        let summary = &result.summary;
        assert_eq!(summary.total_steps, 10);
        assert_eq!(summary.collected_steps, 10);
        assert_eq!(summary.total_decisions, 30);
        assert_eq!(summary.failed_decisions, 1);

        let step5 = &result.steps[5];
        assert!(step5.status.is_collected());
        let failed: Vec<_> = step5
            .outcomes
            .iter()
            .filter(|o| o.outcome.is_failed())
            .map(|o| o.uav_id.as_str())
            .collect();
        assert_eq!(failed, vec!["uav-wing1"]);
        let metrics = step5.metrics.as_ref().unwrap();
        assert_eq!(metrics.total_prb, 20);
        assert_eq!(metrics.per_uav.len(), 2);

        let wing1 = &summary.per_uav[1];
        assert_eq!(wing1.failures, 1);
        assert_eq!(wing1.samples, 9);
        assert_eq!(summary.per_uav[0].samples, 10);
        assert_eq!(summary.per_uav[2].samples, 10);
    }

    #[tokio::test]
    async fn formation_at_forty_prb_overruns_every_step() {
        let (s, base) = formation(20);
        let result = orchestrator(Arc::new(MockService::with_prb(40)))
            .run(&s, &base)
            .await
            .unwrap();
        assert_eq!(result.summary.overrun_steps, 20);
        assert_eq!(result.summary.overrun_rate, 1.0);
        for rec in &result.steps {
            let m = rec.metrics.as_ref().unwrap();
            assert_eq!(m.total_prb, 120);
            assert!(m.overrun);
        }
    }

    #[tokio::test]
    async fn energy_model_flows_into_summary() {
        let (s, base) = formation(5);
        let service: Arc<dyn DecisionService> = Arc::new(MockService::with_prb(10));
        let standard = orchestrator(service.clone()).run(&s, &base).await.unwrap();
        let costly = orchestrator(service)
            .with_energy(EnergyModel {
                enb_static_power_w: 500.0,
                ..EnergyModel::default()
            })
            .run(&s, &base)
            .await
            .unwrap();

        assert!(standard.summary.ue_energy_j > 0.0);
        assert!(standard.summary.energy_efficiency_bits_per_j > 0.0);
        assert_eq!(standard.summary.ue_energy_j, costly.summary.ue_energy_j);
        assert!(costly.summary.enb_energy_j > standard.summary.enb_energy_j);
        let m = standard.steps[0].metrics.as_ref().unwrap();
        assert_eq!(m.energy.prb_energy_j, 3.0 * 10.0 * 0.5 * s.interval_s);
    }

    #[tokio::test]
    async fn runs_are_idempotent() {
        let (s, base) = formation(15);
        let orch = orchestrator(Arc::new(RuleBased));
        let first = orch.run(&s, &base).await.unwrap();
        let second = orch.run(&s, &base).await.unwrap();
        assert_ne!(first.run_id, second.run_id);
        assert_eq!(first.summary, second.summary);
        assert_eq!(first.steps, second.steps);
    }

    #[tokio::test]
    async fn delayed_uavs_join_at_launch() {
        let s = scenario::find("2uav_coordination").unwrap().with_steps(15);
        let base = BaseTrajectory::synthetic(s.steps, s.interval_s, 1);
        let svc = Arc::new(MockService::with_prb(10));
        let result = orchestrator(svc.clone()).run(&s, &base).await.unwrap();

        // uav-002 launches after 10 s at 1 s per step.
        for rec in &result.steps[..10] {
            assert_eq!(rec.outcomes.len(), 1, "step {}", rec.step);
        }
        for rec in &result.steps[10..] {
            assert_eq!(rec.outcomes.len(), 2, "step {}", rec.step);
        }
        assert_eq!(svc.calls.load(Ordering::SeqCst), 10 + 2 * 5);
    }

    #[tokio::test]
    async fn insufficient_data_fails_before_any_call() {
        let s = scenario::find("3uav_formation").unwrap().with_steps(10);
        let base = BaseTrajectory::synthetic(5, 1.0, 42);
        let svc = Arc::new(MockService::with_prb(10));
        let err = orchestrator(svc.clone()).run(&s, &base).await.unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientData {
                required: 10,
                available: 5
            }
        ));
        assert_eq!(svc.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn abort_before_start_records_nothing() {
        let (s, base) = formation(10);
        let (handle, signal) = abort_pair();
        handle.abort();
        let result = orchestrator(Arc::new(MockService::with_prb(10)))
            .with_abort(signal)
            .run(&s, &base)
            .await
            .unwrap();
        assert_eq!(result.completion, Completion::Aborted { at_step: 0 });
        assert!(result.steps.is_empty());
    }

    /// Raises the abort handle once it sees `at_step`.
    struct AbortingService {
        at_step: usize,
        handle: Mutex<Option<AbortHandle>>,
    }

    impl DecisionService for AbortingService {
        fn label(&self) -> &str {
            "aborting"
        }

        fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, std::result::Result<Decision, DecisionError>> {
            if report.step == self.at_step {
                if let Some(h) = self.handle.lock().unwrap().as_ref() {
                    h.abort();
                }
            }
            let d = Decision {
                uav_id: report.uav_id.clone(),
                step: report.step,
                time_s: report.time_s,
                serving_cell: report.serving_cell,
                prb_allocated: 10,
                latency_ms: 0.0,
                handover: false,
            };
            futures::future::ready(Ok(d)).boxed()
        }
    }

    #[tokio::test]
    async fn abort_mid_run_keeps_completed_steps() {
        let (s, base) = formation(10);
        let (handle, signal) = abort_pair();
        let svc = AbortingService {
            at_step: 3,
            handle: Mutex::new(Some(handle)),
        };
        let result = orchestrator(Arc::new(svc))
            .with_abort(signal)
            .run(&s, &base)
            .await
            .unwrap();

        // The in-flight step completes; the next one is never dispatched.
        assert_eq!(result.completion, Completion::Aborted { at_step: 4 });
        assert_eq!(result.steps.len(), 4);
        assert!(result.steps.iter().all(|r| r.status.is_collected()));
        assert_eq!(result.summary.total_steps, 4);
    }

    #[tokio::test]
    async fn catalogue_skips_unknown_scenarios() {
        let orch = orchestrator(Arc::new(MockService::with_prb(5)));
        let names = vec![
            "3uav_formation".to_string(),
            "9uav_swarm".to_string(),
            "2uav_coordination".to_string(),
        ];
        let results = orch
            .run_catalogue(&names, &TrajectorySource::Synthetic { seed: 42 }, Some(12))
            .await;
        let ran: Vec<_> = results.iter().map(|r| r.scenario.name.as_str()).collect();
        assert_eq!(ran, vec!["3uav_formation", "2uav_coordination"]);
        assert!(results.iter().all(|r| r.steps.len() == 12));
    }

    #[tokio::test]
    async fn recorded_trajectory_too_short_is_skipped() {
        let orch = orchestrator(Arc::new(MockService::with_prb(5)));
        let source = TrajectorySource::Recorded(BaseTrajectory::synthetic(20, 1.0, 3));
        let names = vec!["3uav_formation".to_string()];
        assert!(orch.run_catalogue(&names, &source, None).await.is_empty());
        assert_eq!(orch.run_catalogue(&names, &source, Some(20)).await.len(), 1);
    }

    #[tokio::test]
    async fn failed_steps_are_recorded_but_not_aggregated() {
        let (s, base) = formation(6);
        let mut svc = MockService::with_prb(10);
        svc.failures.push(("uav-lead".into(), 2));
        svc.failures.push(("uav-wing2".into(), 2));
        let result = orchestrator(Arc::new(svc)).run(&s, &base).await.unwrap();

        let rec = &result.steps[2];
        assert!(!rec.status.is_collected());
        assert!(rec.metrics.is_none());
        assert_eq!(result.summary.failed_steps, 1);
        assert_eq!(result.summary.collected_steps, 5);
        assert_eq!(
            rec.outcomes
                .iter()
                .filter(|o| matches!(o.outcome, DecisionOutcome::Unavailable { .. }))
                .count(),
            2
        );
        assert!((result.summary.failed_step_fraction - 1.0 / 6.0).abs() < 1e-12);
    }
}
