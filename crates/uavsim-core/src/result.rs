use crate::aggregate::StepMetrics;
use crate::energy;
use crate::scenario::ScenarioConfig;
use crate::types::{DecisionOutcome, StepSnapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// StepRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Collected,
    Failed { reason: String },
}

impl StepStatus {
    pub fn is_collected(&self) -> bool {
        matches!(self, StepStatus::Collected)
    }
}

/// What the harness saw for one UAV at one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UavOutcomeRecord {
    pub uav_id: String,
    pub reported_cell: u32,
    pub rsrp_dbm: f64,
    pub sinr_db: f64,
    pub outcome: DecisionOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub time_s: f64,
    #[serde(flatten)]
    pub status: StepStatus,
    pub outcomes: Vec<UavOutcomeRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<StepMetrics>,
}

impl StepRecord {
    fn from_snapshot(snapshot: &StepSnapshot, status: StepStatus, metrics: Option<StepMetrics>) -> Self {
        let outcomes = snapshot
            .entries
            .iter()
            .map(|e| UavOutcomeRecord {
                uav_id: e.point.uav_id.clone(),
                reported_cell: e.point.cell_id,
                rsrp_dbm: e.point.rsrp_dbm,
                sinr_db: e.point.sinr_db,
                outcome: e.outcome.clone(),
            })
            .collect();
        Self {
            step: snapshot.step,
            time_s: snapshot.time_s,
            status,
            outcomes,
            metrics,
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UavSummary {
    pub uav_id: String,
    /// Decided outcomes in collected steps.
    pub samples: usize,
    pub failures: usize,
    pub mean_prb: f64,
    pub mean_rsrp_dbm: f64,
    pub mean_interference: f64,
    pub mean_throughput_mbps: f64,
    pub qos_satisfaction: f64,
    pub handovers: usize,
    pub mean_latency_ms: f64,
    pub mean_tx_power_dbm: f64,
    /// UE-side energy over collected steps (J).
    pub energy_j: f64,
}

/// Cumulative metrics over a run. Failed steps count toward the step and
/// decision totals but never toward the resource metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub total_steps: usize,
    pub collected_steps: usize,
    pub failed_steps: usize,
    pub failed_step_fraction: f64,
    pub total_decisions: usize,
    pub failed_decisions: usize,
    pub failed_decision_fraction: f64,
    pub mean_prb_utilization: f64,
    pub peak_prb_utilization: f64,
    pub overrun_steps: usize,
    pub overrun_rate: f64,
    pub qos_violations: usize,
    pub mean_interference: f64,
    pub interference_events: usize,
    pub mean_system_throughput_mbps: f64,
    pub ue_energy_j: f64,
    pub enb_energy_j: f64,
    /// Bits delivered per joule of UE-side energy over the whole run.
    pub energy_efficiency_bits_per_j: f64,
    pub per_uav: Vec<UavSummary>,
}

impl ScenarioSummary {
    pub fn mean_qos_satisfaction(&self) -> f64 {
        mean(self.per_uav.iter().map(|u| u.qos_satisfaction))
    }

    pub fn total_energy_j(&self) -> f64 {
        self.ue_energy_j + self.enb_energy_j
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Summarize `steps` for the UAVs in `uav_ids`, listed in that order.
pub fn summarize(steps: &[StepRecord], uav_ids: &[String]) -> ScenarioSummary {
    let collected: Vec<&StepMetrics> = steps
        .iter()
        .filter(|s| s.status.is_collected())
        .filter_map(|s| s.metrics.as_ref())
        .collect();
    let collected_steps = steps.iter().filter(|s| s.status.is_collected()).count();
    let failed_steps = steps.len() - collected_steps;

    let total_decisions: usize = steps.iter().map(|s| s.outcomes.len()).sum();
    let failed_decisions: usize = steps
        .iter()
        .flat_map(|s| &s.outcomes)
        .filter(|o| o.outcome.is_failed())
        .count();

    let overrun_steps = collected.iter().filter(|m| m.overrun).count();
    let ue_energy_j: f64 = collected.iter().map(|m| m.energy.ue_energy_j()).sum();
    let bits: f64 = collected.iter().map(|m| m.energy.bits).sum();

    let per_uav = uav_ids
        .iter()
        .map(|id| {
            let rows: Vec<_> = collected
                .iter()
                .flat_map(|m| &m.per_uav)
                .filter(|u| &u.uav_id == id)
                .collect();
            let failures = steps
                .iter()
                .flat_map(|s| &s.outcomes)
                .filter(|o| &o.uav_id == id && o.outcome.is_failed())
                .count();
            UavSummary {
                uav_id: id.clone(),
                samples: rows.len(),
                failures,
                mean_prb: mean(rows.iter().map(|u| f64::from(u.prb_allocated))),
                mean_rsrp_dbm: mean(rows.iter().map(|u| u.rsrp_dbm)),
                mean_interference: mean(rows.iter().map(|u| u.interference)),
                mean_throughput_mbps: mean(rows.iter().map(|u| u.throughput_mbps)),
                qos_satisfaction: ratio(rows.iter().filter(|u| u.qos_met).count(), rows.len()),
                handovers: rows.iter().filter(|u| u.handover).count(),
                mean_latency_ms: mean(rows.iter().map(|u| u.latency_ms)),
                mean_tx_power_dbm: mean(rows.iter().map(|u| u.tx_power_dbm)),
                energy_j: rows.iter().map(|u| u.energy_j).sum(),
            }
        })
        .collect();

    ScenarioSummary {
        total_steps: steps.len(),
        collected_steps,
        failed_steps,
        failed_step_fraction: ratio(failed_steps, steps.len()),
        total_decisions,
        failed_decisions,
        failed_decision_fraction: ratio(failed_decisions, total_decisions),
        mean_prb_utilization: mean(collected.iter().map(|m| m.utilization)),
        peak_prb_utilization: collected
            .iter()
            .map(|m| m.utilization)
            .fold(0.0, f64::max),
        overrun_steps,
        overrun_rate: ratio(overrun_steps, collected_steps),
        qos_violations: collected.iter().map(|m| m.qos_violations()).sum(),
        mean_interference: mean(collected.iter().map(|m| m.interference_sum)),
        interference_events: collected.iter().filter(|m| m.interference_event).count(),
        mean_system_throughput_mbps: mean(collected.iter().map(|m| m.system_throughput_mbps())),
        ue_energy_j,
        enb_energy_j: collected.iter().map(|m| m.energy.enb_energy_j).sum(),
        energy_efficiency_bits_per_j: energy::efficiency(bits, ue_energy_j),
        per_uav,
    }
}

// ---------------------------------------------------------------------------
// ScenarioResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Completion {
    Completed,
    /// Stopped before dispatching `at_step`.
    Aborted { at_step: usize },
}

impl Completion {
    pub fn label(&self) -> String {
        match self {
            Completion::Completed => "completed".to_string(),
            Completion::Aborted { at_step } => format!("aborted@{at_step}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub strategy: String,
    pub scenario: ScenarioConfig,
    pub completion: Completion,
    pub steps: Vec<StepRecord>,
    pub summary: ScenarioSummary,
}

impl ScenarioResult {
    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Completed
    }
}

// ---------------------------------------------------------------------------
// ScenarioAccumulator
// ---------------------------------------------------------------------------

/// Step records for one run. Owned by the task that sequences the steps;
/// nothing else writes to it.
#[derive(Debug)]
pub struct ScenarioAccumulator {
    scenario: ScenarioConfig,
    strategy: String,
    steps: Vec<StepRecord>,
}

impl ScenarioAccumulator {
    pub fn new(scenario: ScenarioConfig, strategy: impl Into<String>) -> Self {
        let capacity = scenario.steps;
        Self {
            scenario,
            strategy: strategy.into(),
            steps: Vec::with_capacity(capacity),
        }
    }

    pub fn push_collected(&mut self, snapshot: &StepSnapshot, metrics: StepMetrics) {
        self.steps.push(StepRecord::from_snapshot(
            snapshot,
            StepStatus::Collected,
            Some(metrics),
        ));
    }

    pub fn push_failed(&mut self, snapshot: &StepSnapshot, reason: impl Into<String>) {
        self.steps.push(StepRecord::from_snapshot(
            snapshot,
            StepStatus::Failed {
                reason: reason.into(),
            },
            None,
        ));
    }

    pub fn recorded_steps(&self) -> usize {
        self.steps.len()
    }

    pub fn finish(self, completion: Completion) -> ScenarioResult {
        let uav_ids: Vec<String> = self.scenario.uavs.iter().map(|u| u.uav_id.clone()).collect();
        let summary = summarize(&self.steps, &uav_ids);
        ScenarioResult {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            strategy: self.strategy,
            scenario: self.scenario,
            completion,
            steps: self.steps,
            summary,
        }
    }
}

// ---------------------------------------------------------------------------
// ComparisonReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    pub scenario: String,
    pub strategy: String,
    pub uavs: usize,
    pub steps: usize,
    pub completion: String,
    pub mean_prb_utilization: f64,
    pub overrun_rate: f64,
    pub mean_system_throughput_mbps: f64,
    pub interference_events: usize,
    pub failed_step_fraction: f64,
    pub failed_decision_fraction: f64,
    pub mean_qos_satisfaction: f64,
    pub total_energy_j: f64,
    pub energy_efficiency_mbits_per_j: f64,
}

impl From<&ScenarioResult> for ComparisonRow {
    fn from(r: &ScenarioResult) -> Self {
        Self {
            scenario: r.scenario.name.clone(),
            strategy: r.strategy.clone(),
            uavs: r.scenario.uav_count(),
            steps: r.summary.total_steps,
            completion: r.completion.label(),
            mean_prb_utilization: r.summary.mean_prb_utilization,
            overrun_rate: r.summary.overrun_rate,
            mean_system_throughput_mbps: r.summary.mean_system_throughput_mbps,
            interference_events: r.summary.interference_events,
            failed_step_fraction: r.summary.failed_step_fraction,
            failed_decision_fraction: r.summary.failed_decision_fraction,
            mean_qos_satisfaction: r.summary.mean_qos_satisfaction(),
            total_energy_j: r.summary.total_energy_j(),
            energy_efficiency_mbits_per_j: r.summary.energy_efficiency_bits_per_j / 1e6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub generated_at: DateTime<Utc>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonReport {
    pub fn new(results: &[ScenarioResult]) -> Self {
        Self {
            generated_at: Utc::now(),
            rows: results.iter().map(ComparisonRow::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{aggregate, InterferenceModel};
    use crate::energy::EnergyModel;
    use crate::scenario;
    use crate::types::{Decision, Position, Priority, Slice, StepEntry, TrajectoryPoint};

    fn entry(id: &str, step: usize, prb: u32, failed: bool) -> StepEntry {
        let point = TrajectoryPoint {
            uav_id: id.into(),
            step,
            time_s: step as f64,
            position: Position::new(0.0, 0.0, 100.0),
            rsrp_dbm: -95.0,
            sinr_db: 12.0,
            cell_id: 1,
            priority: Priority::Medium,
            slice: Slice::Embb,
            active: true,
        };
        let outcome = if failed {
            DecisionOutcome::unavailable("connection refused", 3)
        } else {
            DecisionOutcome::Decided(Decision {
                uav_id: id.into(),
                step,
                time_s: step as f64,
                serving_cell: if step % 2 == 0 { 1 } else { 2 },
                prb_allocated: prb,
                latency_ms: 4.0,
                handover: step % 2 == 1,
            })
        };
        StepEntry { point, outcome }
    }

    fn formation() -> ScenarioConfig {
        scenario::find("3uav_formation").unwrap().with_steps(4)
    }

    fn ids() -> Vec<&'static str> {
        vec!["uav-lead", "uav-wing1", "uav-wing2"]
    }

    #[test]
    fn collected_and_failed_steps_are_counted_apart() {
        let model = InterferenceModel::default();
        let mut acc = ScenarioAccumulator::new(formation(), "mock");
        for step in 0..3 {
            let entries = ids().into_iter().map(|id| entry(id, step, 40, false)).collect();
            let snap = StepSnapshot::new(step, step as f64, entries);
            acc.push_collected(&snap, aggregate(&snap, 100, 1.0, &model, &EnergyModel::default()));
        }
        let entries = ids()
            .into_iter()
            .map(|id| entry(id, 3, 40, id != "uav-lead"))
            .collect();
        let snap = StepSnapshot::new(3, 3.0, entries);
        acc.push_failed(&snap, "2 of 3 decisions failed");
        assert_eq!(acc.recorded_steps(), 4);

        let result = acc.finish(Completion::Completed);
        let s = &result.summary;
        assert_eq!(s.total_steps, 4);
        assert_eq!(s.collected_steps, 3);
        assert_eq!(s.failed_steps, 1);
        assert_eq!(s.failed_step_fraction, 0.25);
        assert_eq!(s.total_decisions, 12);
        assert_eq!(s.failed_decisions, 2);
        assert_eq!(s.overrun_steps, 3);
        assert_eq!(s.overrun_rate, 1.0);
        assert!((s.mean_prb_utilization - 1.2).abs() < 1e-12);
        assert!((s.peak_prb_utilization - 1.2).abs() < 1e-12);

        let wing = &s.per_uav[1];
        assert_eq!(wing.uav_id, "uav-wing1");
        assert_eq!(wing.samples, 3);
        assert_eq!(wing.failures, 1);
        assert_eq!(wing.mean_prb, 40.0);
        assert_eq!(wing.handovers, 1);
        assert_eq!(wing.qos_satisfaction, 1.0);
        assert_eq!(s.per_uav[0].failures, 0);
        assert!(!result.steps[3].status.is_collected());
        assert!(result.steps[3].metrics.is_none());
    }

    #[test]
    fn empty_run_has_zero_fractions() {
        let result = ScenarioAccumulator::new(formation(), "mock").finish(Completion::Aborted { at_step: 0 });
        assert_eq!(result.summary.total_steps, 0);
        assert_eq!(result.summary.failed_step_fraction, 0.0);
        assert_eq!(result.summary.overrun_rate, 0.0);
        assert_eq!(result.summary.per_uav.len(), 3);
        assert!(!result.is_complete());
        assert_eq!(result.completion.label(), "aborted@0");
    }

    #[test]
    fn step_record_json_shape() {
        let snap = StepSnapshot::new(2, 2.0, vec![entry("uav-lead", 2, 10, true)]);
        let rec = StepRecord::from_snapshot(
            &snap,
            StepStatus::Failed {
                reason: "step deadline exceeded".into(),
            },
            None,
        );
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["reason"], "step deadline exceeded");
        assert!(json.get("metrics").is_none());
        let back: StepRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn comparison_rows_follow_results() {
        let model = InterferenceModel::default();
        let mut acc = ScenarioAccumulator::new(formation(), "rule-based");
        let entries = ids().into_iter().map(|id| entry(id, 0, 20, false)).collect();
        let snap = StepSnapshot::new(0, 0.0, entries);
        acc.push_collected(&snap, aggregate(&snap, 100, 1.0, &model, &EnergyModel::default()));
        let result = acc.finish(Completion::Completed);

        let report = ComparisonReport::new(std::slice::from_ref(&result));
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.scenario, "3uav_formation");
        assert_eq!(row.strategy, "rule-based");
        assert_eq!(row.uavs, 3);
        assert_eq!(row.completion, "completed");
        assert_eq!(row.overrun_rate, 0.0);
        assert!((row.mean_prb_utilization - 0.6).abs() < 1e-12);
        assert!((row.total_energy_j - result.summary.total_energy_j()).abs() < 1e-12);
        assert!(row.energy_efficiency_mbits_per_j > 0.0);
    }

    #[test]
    fn energy_rolls_up_over_collected_steps() {
        let model = InterferenceModel::default();
        let energy_model = EnergyModel::default();
        let mut acc = ScenarioAccumulator::new(formation(), "mock");
        let mut expected_ue = 0.0;
        let mut expected_enb = 0.0;
        let mut expected_bits = 0.0;
        for step in 0..2 {
            let entries = ids().into_iter().map(|id| entry(id, step, 10, false)).collect();
            let snap = StepSnapshot::new(step, step as f64, entries);
            let metrics = aggregate(&snap, 100, 1.0, &model, &energy_model);
            expected_ue += metrics.energy.ue_energy_j();
            expected_enb += metrics.energy.enb_energy_j;
            expected_bits += metrics.energy.bits;
            acc.push_collected(&snap, metrics);
        }
        let entries = ids().into_iter().map(|id| entry(id, 2, 10, true)).collect();
        acc.push_failed(&StepSnapshot::new(2, 2.0, entries), "3 of 3 decisions failed");

        let s = acc.finish(Completion::Completed).summary;
        assert!((s.ue_energy_j - expected_ue).abs() < 1e-9);
        assert!((s.enb_energy_j - expected_enb).abs() < 1e-9);
        assert!((s.total_energy_j() - expected_ue - expected_enb).abs() < 1e-9);
        assert!((s.energy_efficiency_bits_per_j - expected_bits / expected_ue).abs() < 1e-3);
        // 10 PRB * 0.5 W * 1 s per collected step, plus transmit energy
        assert!(s.per_uav.iter().all(|u| u.energy_j > 10.0));
    }
}
