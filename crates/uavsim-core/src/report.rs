use crate::types::{Position, Priority, Slice, TrajectoryPoint};
use serde::{Deserialize, Serialize};

/// Cells visible to every UAV in the simulated deployment.
pub const CELL_IDS: &[u32] = &[1, 2, 3];

pub const MIN_PRB_PER_UAV: u32 = 3;
pub const MAX_PRB_PER_UAV: u32 = 25;

const RSRP_ACCEPTABLE_DBM: f64 = -110.0;
const RSRP_CRITICAL_DBM: f64 = -120.0;

// ---------------------------------------------------------------------------
// MeasurementReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborCell {
    pub cell_id: u32,
    pub rsrp_dbm: f64,
}

/// What a UAV tells the decision service at one step: its trajectory point
/// plus the measurement context derived for that step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReport {
    pub uav_id: String,
    pub step: usize,
    pub time_s: f64,
    pub position: Position,
    pub rsrp_dbm: f64,
    pub sinr_db: f64,
    pub serving_cell: u32,
    pub neighbors: Vec<NeighborCell>,
    pub priority: Priority,
    pub slice: Slice,
    /// Progress along the flight, 0..=1.
    pub path_position: f64,
    /// Estimated serving-cell PRB utilization before this step's allocation.
    pub prb_utilization: f64,
    pub congestion_level: f64,
    pub active_uavs: usize,
    /// PRBs the shared resource pool holds this step.
    pub capacity_prb: u32,
    /// Fair-share PRB allocation for this UAV, used when the service does
    /// not return its own quota.
    pub prb_hint: u32,
}

impl MeasurementReport {
    pub fn best_neighbor(&self) -> Option<&NeighborCell> {
        self.neighbors
            .iter()
            .fold(None, |best: Option<&NeighborCell>, n| match best {
                Some(b) if b.rsrp_dbm >= n.rsrp_dbm => Some(b),
                _ => Some(n),
            })
    }
}

/// Neighbour RSRPs modelled as progressively weaker copies of the serving
/// cell's measurement.
pub fn neighbors_for(serving_cell: u32, rsrp_dbm: f64) -> Vec<NeighborCell> {
    CELL_IDS
        .iter()
        .filter(|&&id| id != serving_cell)
        .map(|&id| NeighborCell {
            cell_id: id,
            rsrp_dbm: rsrp_dbm - 5.0 - f64::from(id) * 2.0,
        })
        .collect()
}

/// Build one report per point in `active`. `duration_s` is the scenario's
/// flight time, used for `path_position`.
pub fn build_reports(
    active: &[&TrajectoryPoint],
    capacity_prb: u32,
    duration_s: f64,
) -> Vec<MeasurementReport> {
    let n = active.len();
    let prb_utilization = 0.3 + n as f64 * 0.1;
    let congestion_level = (prb_utilization * n as f64 / 2.0).min(1.0);
    let hints = fair_share(active, capacity_prb);

    active
        .iter()
        .zip(hints)
        .map(|(p, prb_hint)| MeasurementReport {
            uav_id: p.uav_id.clone(),
            step: p.step,
            time_s: p.time_s,
            position: p.position,
            rsrp_dbm: p.rsrp_dbm,
            sinr_db: p.sinr_db,
            serving_cell: p.cell_id,
            neighbors: neighbors_for(p.cell_id, p.rsrp_dbm),
            priority: p.priority,
            slice: p.slice,
            path_position: if duration_s > 0.0 {
                (p.time_s / duration_s).min(1.0)
            } else {
                1.0
            },
            prb_utilization,
            congestion_level,
            active_uavs: n,
            capacity_prb,
            prb_hint,
        })
        .collect()
}

/// Priority- and channel-weighted split of `capacity_prb`. UAVs with higher
/// priority or weaker signal get a larger share; each share is clamped to
/// `MIN_PRB_PER_UAV..=MAX_PRB_PER_UAV` and never exceeds what is left.
pub fn fair_share(points: &[&TrajectoryPoint], capacity_prb: u32) -> Vec<u32> {
    let weights: Vec<f64> = points
        .iter()
        .map(|p| {
            let channel = if p.rsrp_dbm < RSRP_CRITICAL_DBM {
                2.0
            } else if p.rsrp_dbm < RSRP_ACCEPTABLE_DBM {
                1.5
            } else {
                1.0
            };
            p.priority.share_weight() * channel
        })
        .collect();
    let total: f64 = weights.iter().sum();

    let mut remaining = capacity_prb;
    weights
        .iter()
        .map(|w| {
            let share = (w / total * f64::from(capacity_prb)).floor() as u32;
            let allocated = share.clamp(MIN_PRB_PER_UAV, MAX_PRB_PER_UAV).min(remaining);
            remaining -= allocated;
            allocated
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, rsrp: f64, priority: Priority) -> TrajectoryPoint {
        TrajectoryPoint {
            uav_id: id.into(),
            step: 4,
            time_s: 30.0,
            position: Position::new(1.0, 2.0, 3.0),
            rsrp_dbm: rsrp,
            sinr_db: 8.0,
            cell_id: 2,
            priority,
            slice: Slice::Embb,
            active: true,
        }
    }

    #[test]
    fn neighbors_exclude_serving_cell() {
        let n = neighbors_for(2, -100.0);
        let ids: Vec<_> = n.iter().map(|c| c.cell_id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(n[0].rsrp_dbm, -107.0);
        assert_eq!(n[1].rsrp_dbm, -111.0);
    }

    #[test]
    fn fair_share_favours_priority_and_weak_signal() {
        let a = point("a", -90.0, Priority::High);
        let b = point("b", -90.0, Priority::Low);
        let c = point("c", -115.0, Priority::Low);
        let shares = fair_share(&[&a, &b, &c], 100);
        // weights 3, 1, 1.5 of 5.5
        assert_eq!(shares, vec![25, 18, 25]);
    }

    #[test]
    fn fair_share_never_exceeds_capacity() {
        let pts: Vec<TrajectoryPoint> = (0..6)
            .map(|i| point(&format!("u{i}"), -125.0, Priority::High))
            .collect();
        let refs: Vec<&TrajectoryPoint> = pts.iter().collect();
        let shares = fair_share(&refs, 20);
        assert!(shares.iter().sum::<u32>() <= 20);
        assert_eq!(shares[0], 3);
    }

    #[test]
    fn reports_carry_context() {
        let a = point("a", -90.0, Priority::High);
        let b = point("b", -95.0, Priority::Medium);
        let reports = build_reports(&[&a, &b], 100, 60.0);
        assert_eq!(reports.len(), 2);
        let r = &reports[0];
        assert_eq!(r.active_uavs, 2);
        assert!((r.prb_utilization - 0.5).abs() < 1e-12);
        assert!((r.congestion_level - 0.5).abs() < 1e-12);
        assert_eq!(r.path_position, 0.5);
        assert_eq!(r.best_neighbor().unwrap().cell_id, 1);
    }
}
