//! System-wide resource contention for one step.
//!
//! [`aggregate`] is pure: the same snapshot, capacity and model always give
//! bit-identical metrics. Entries are visited in snapshot order and every sum
//! is accumulated in that order.

use crate::energy::{self, EnergyModel, StepEnergy};
use crate::types::{Priority, StepSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const PRB_BANDWIDTH_HZ: f64 = 180_000.0;

const RSRP_ACCEPTABLE_DBM: f64 = -110.0;
const RSRP_CRITICAL_DBM: f64 = -120.0;
const SINR_ACCEPTABLE_DB: f64 = 5.0;

// ---------------------------------------------------------------------------
// InterferenceModel
// ---------------------------------------------------------------------------

/// Pairwise interference between UAVs as a function of proximity and shared
/// serving cell.
///
/// A pair closer than `distance_threshold_m` contributes
/// `factor * (1 - d / threshold) * weight`, where `weight` is
/// `same_cell_weight` for UAVs on the same cell and `other_cell_weight`
/// otherwise. Each UAV's own level is capped at `per_uav_cap`, and a step
/// whose capped levels add up to more than `event_threshold` is an
/// interference event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterferenceModel {
    #[serde(default = "default_threshold")]
    pub distance_threshold_m: f64,
    #[serde(default = "default_factor")]
    pub factor: f64,
    #[serde(default = "default_same_cell_weight")]
    pub same_cell_weight: f64,
    #[serde(default)]
    pub other_cell_weight: f64,
    #[serde(default = "default_cap")]
    pub per_uav_cap: f64,
    /// Steps whose summed per-UAV levels exceed this count as interference events.
    #[serde(default = "default_event_threshold")]
    pub event_threshold: f64,
}

fn default_threshold() -> f64 {
    100.0
}

fn default_factor() -> f64 {
    0.15
}

fn default_same_cell_weight() -> f64 {
    1.5
}

fn default_cap() -> f64 {
    1.0
}

fn default_event_threshold() -> f64 {
    0.3
}

impl Default for InterferenceModel {
    fn default() -> Self {
        Self {
            distance_threshold_m: default_threshold(),
            factor: default_factor(),
            same_cell_weight: default_same_cell_weight(),
            other_cell_weight: 0.0,
            per_uav_cap: default_cap(),
            event_threshold: default_event_threshold(),
        }
    }
}

impl InterferenceModel {
    pub fn pair_contribution(&self, distance_m: f64, same_cell: bool) -> f64 {
        if distance_m >= self.distance_threshold_m {
            return 0.0;
        }
        let proximity = 1.0 - distance_m / self.distance_threshold_m;
        let weight = if same_cell {
            self.same_cell_weight
        } else {
            self.other_cell_weight
        };
        self.factor * proximity * weight
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairInterference {
    pub a: String,
    pub b: String,
    pub distance_m: f64,
    pub same_cell: bool,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UavStepMetrics {
    pub uav_id: String,
    pub prb_allocated: u32,
    pub serving_cell: u32,
    pub handover: bool,
    pub rsrp_dbm: f64,
    pub sinr_db: f64,
    pub interference: f64,
    pub throughput_mbps: f64,
    pub qos_met: bool,
    pub latency_ms: f64,
    pub tx_power_dbm: f64,
    pub energy_j: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    pub total_prb: u64,
    pub capacity_prb: u32,
    /// `total_prb / capacity_prb`, not clipped: values above 1 are overruns.
    pub utilization: f64,
    pub overrun: bool,
    /// Sum of pair contributions, each pair counted once.
    pub interference_sum: f64,
    /// Sum of the capped per-UAV levels.
    pub interference_total: f64,
    pub interference_event: bool,
    pub pairs: Vec<PairInterference>,
    pub per_uav: Vec<UavStepMetrics>,
    pub energy: StepEnergy,
}

impl StepMetrics {
    pub fn qos_violations(&self) -> usize {
        self.per_uav.iter().filter(|u| !u.qos_met).count()
    }

    pub fn system_throughput_mbps(&self) -> f64 {
        self.per_uav.iter().map(|u| u.throughput_mbps).sum()
    }
}

// ---------------------------------------------------------------------------
// aggregate
// ---------------------------------------------------------------------------

/// Combine every decided entry of `snapshot` into system-level metrics.
///
/// Failed entries contribute nothing. Allocations above `capacity_prb` are
/// reported as an overrun, never clipped. Energy is charged over
/// `interval_s`, the time one step represents.
pub fn aggregate(
    snapshot: &StepSnapshot,
    capacity_prb: u32,
    interval_s: f64,
    model: &InterferenceModel,
    energy_model: &EnergyModel,
) -> StepMetrics {
    let decided: Vec<_> = snapshot.decided().collect();

    let total_prb: u64 = decided.iter().map(|(_, d)| u64::from(d.prb_allocated)).sum();

    let mut pairs = Vec::new();
    let mut levels = vec![0.0f64; decided.len()];
    for i in 0..decided.len() {
        for j in (i + 1)..decided.len() {
            let (pa, da) = decided[i];
            let (pb, db) = decided[j];
            let distance_m = pa.position.distance_to(&pb.position);
            let same_cell = da.serving_cell == db.serving_cell;
            let contribution = model.pair_contribution(distance_m, same_cell);
            if contribution > 0.0 {
                levels[i] += contribution;
                levels[j] += contribution;
                pairs.push(PairInterference {
                    a: da.uav_id.clone(),
                    b: db.uav_id.clone(),
                    distance_m,
                    same_cell,
                    contribution,
                });
            }
        }
    }
    let interference_sum: f64 = pairs.iter().map(|p| p.contribution).sum();

    let mut energy = StepEnergy::default();
    let per_uav: Vec<UavStepMetrics> = decided
        .iter()
        .zip(&levels)
        .map(|((point, decision), level)| {
            let interference = level.min(model.per_uav_cap);
            let throughput = throughput_mbps(point.sinr_db, decision.prb_allocated, interference);
            let spent = energy_model.uav_energy(
                point.rsrp_dbm,
                point.sinr_db,
                decision.prb_allocated,
                interval_s,
            );
            energy.prb_energy_j += spent.prb_energy_j;
            energy.tx_energy_j += spent.tx_energy_j;
            energy.bits += throughput * 1e6 * interval_s;
            UavStepMetrics {
                uav_id: decision.uav_id.clone(),
                prb_allocated: decision.prb_allocated,
                serving_cell: decision.serving_cell,
                handover: decision.handover,
                rsrp_dbm: point.rsrp_dbm,
                sinr_db: point.sinr_db,
                interference,
                throughput_mbps: throughput,
                qos_met: qos_met(point.priority, point.rsrp_dbm, point.sinr_db),
                latency_ms: decision.latency_ms,
                tx_power_dbm: spent.tx_power_dbm,
                energy_j: spent.total_j(),
            }
        })
        .collect();
    let interference_total: f64 = per_uav.iter().map(|u| u.interference).sum();

    let cells: BTreeSet<u32> = decided.iter().map(|(_, d)| d.serving_cell).collect();
    energy.enb_energy_j = energy_model.enb_energy_j(total_prb, cells.len(), interval_s);
    energy.efficiency_bits_per_j = energy::efficiency(energy.bits, energy.ue_energy_j());

    StepMetrics {
        total_prb,
        capacity_prb,
        utilization: total_prb as f64 / f64::from(capacity_prb.max(1)),
        overrun: total_prb > u64::from(capacity_prb),
        interference_sum,
        interference_total,
        interference_event: interference_total > model.event_threshold,
        pairs,
        per_uav,
        energy,
    }
}

/// Shannon-bound throughput for `prb` blocks at `sinr_db`, degraded by the
/// interference level.
pub fn throughput_mbps(sinr_db: f64, prb: u32, interference: f64) -> f64 {
    if prb == 0 {
        return 0.0;
    }
    let sinr_linear = 10f64.powf(sinr_db / 10.0);
    let effective = sinr_linear / (1.0 + interference);
    f64::from(prb) * PRB_BANDWIDTH_HZ * (1.0 + effective).log2() / 1e6
}

/// Priority-dependent service requirement.
pub fn qos_met(priority: Priority, rsrp_dbm: f64, sinr_db: f64) -> bool {
    match priority {
        Priority::High => rsrp_dbm >= RSRP_ACCEPTABLE_DBM && sinr_db >= SINR_ACCEPTABLE_DB,
        Priority::Medium => rsrp_dbm >= RSRP_CRITICAL_DBM && sinr_db >= 0.0,
        Priority::Low => rsrp_dbm >= RSRP_CRITICAL_DBM,
    }
}
