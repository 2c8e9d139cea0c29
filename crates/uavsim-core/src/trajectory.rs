//! Per-UAV trajectory generation.
//!
//! A scenario flies several UAVs along one recorded base trajectory. Each UAV
//! is shifted by its spatial offset and delayed by its launch delay, so the
//! timelines are distinct but correlated. All generated timelines share the
//! base's timestamps, which is what lets the runner synchronise them step by
//! step.

use crate::error::{Result, SimError};
use crate::scenario::ScenarioConfig;
use crate::types::{Position, TrajectoryPoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// RSRP loss per metre of horizontal offset from the base path.
const RSRP_LOSS_PER_M: f64 = 0.02;
/// SINR loss per metre of horizontal offset from the base path.
const SINR_LOSS_PER_M: f64 = 0.01;

/// Reference flight plan: (time s, x, y, z).
pub const REFERENCE_WAYPOINTS: &[(f64, f64, f64, f64)] = &[
    (0.0, 100.0, 100.0, 100.0),
    (15.0, 250.0, 250.0, 100.0),
    (30.0, 400.0, 400.0, 100.0),
    (45.0, 550.0, 550.0, 100.0),
    (60.0, 700.0, 350.0, 100.0),
    (75.0, 850.0, 200.0, 100.0),
];

/// Cell sites used by the synthetic radio model: (cell id, antenna position).
pub const CELL_SITES: &[(u32, Position)] = &[
    (1, Position::new(0.0, 0.0, 30.0)),
    (2, Position::new(600.0, 600.0, 30.0)),
    (3, Position::new(900.0, 100.0, 30.0)),
];

// ---------------------------------------------------------------------------
// BaseTrajectory
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSample {
    pub time_s: f64,
    pub position: Position,
    pub rsrp_dbm: f64,
    pub sinr_db: f64,
    pub cell_id: u32,
}

/// The recorded motion every UAV in a scenario is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseTrajectory {
    pub interval_s: f64,
    pub samples: Vec<BaseSample>,
}

impl BaseTrajectory {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Load a recorded trajectory from JSON. Samples must be in strictly
    /// increasing time order.
    pub fn load(path: &Path) -> Result<Self> {
        let base: BaseTrajectory = crate::io::read_json(path)?;
        base.check()?;
        Ok(base)
    }

    fn check(&self) -> Result<()> {
        if !self.interval_s.is_finite() || self.interval_s <= 0.0 {
            return Err(SimError::InvalidTrajectory(format!(
                "interval_s must be positive, got {}",
                self.interval_s
            )));
        }
        for (i, sample) in self.samples.iter().enumerate() {
            let fields = [
                ("time_s", sample.time_s),
                ("rsrp_dbm", sample.rsrp_dbm),
                ("sinr_db", sample.sinr_db),
            ];
            if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
                return Err(SimError::InvalidTrajectory(format!(
                    "sample {i}: {name} must be finite, got {value}"
                )));
            }
        }
        if let Some(w) = self
            .samples
            .windows(2)
            .find(|w| w[1].time_s <= w[0].time_s)
        {
            return Err(SimError::InvalidTrajectory(format!(
                "samples out of order at t={}",
                w[1].time_s
            )));
        }
        Ok(())
    }

    /// Deterministic synthetic trajectory over [`REFERENCE_WAYPOINTS`].
    ///
    /// The serving cell is the nearest of [`CELL_SITES`]; RSRP follows a
    /// log-distance path loss with ±2 dB seeded jitter and SINR is derived
    /// from RSRP. Equal seeds give equal trajectories.
    pub fn synthetic(steps: usize, interval_s: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let samples = (0..steps)
            .map(|i| {
                let time_s = i as f64 * interval_s;
                let position = interpolate(time_s, REFERENCE_WAYPOINTS);
                let (cell_id, distance) = nearest_cell(&position);
                let rsrp_dbm = path_loss_rsrp(distance) + rng.gen_range(-2.0..2.0);
                let sinr_db = ((rsrp_dbm + 110.0) * 0.8 + rng.gen_range(-1.0..1.0)).clamp(-5.0, 30.0);
                BaseSample {
                    time_s,
                    position,
                    rsrp_dbm,
                    sinr_db,
                    cell_id,
                }
            })
            .collect();
        Self {
            interval_s,
            samples,
        }
    }
}

/// Piecewise-linear position along `waypoints`, holding the last one after
/// the plan ends.
pub fn interpolate(time_s: f64, waypoints: &[(f64, f64, f64, f64)]) -> Position {
    for pair in waypoints.windows(2) {
        let (t1, x1, y1, z1) = pair[0];
        let (t2, x2, y2, z2) = pair[1];
        if (t1..=t2).contains(&time_s) {
            let ratio = if t2 > t1 { (time_s - t1) / (t2 - t1) } else { 0.0 };
            return Position::new(
                x1 + ratio * (x2 - x1),
                y1 + ratio * (y2 - y1),
                z1 + ratio * (z2 - z1),
            );
        }
    }
    match (waypoints.first(), waypoints.last()) {
        (Some(&(t0, x, y, z)), _) if time_s < t0 => Position::new(x, y, z),
        (_, Some(&(_, x, y, z))) => Position::new(x, y, z),
        _ => Position::default(),
    }
}

fn nearest_cell(position: &Position) -> (u32, f64) {
    CELL_SITES
        .iter()
        .map(|(id, site)| (*id, position.distance_to(site)))
        .fold((0, f64::INFINITY), |best, cur| {
            if cur.1 < best.1 {
                cur
            } else {
                best
            }
        })
}

fn path_loss_rsrp(distance_m: f64) -> f64 {
    -58.0 - 30.0 * (distance_m.max(10.0) / 10.0).log10()
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct UavTrajectory {
    pub uav_id: String,
    pub points: Vec<TrajectoryPoint>,
}

/// Derive one timeline per UAV profile in `scenario` from `base`.
///
/// Every timeline has exactly `scenario.steps` points, and point `t` of every
/// timeline carries the timestamp of base sample `t`.
pub fn generate(base: &BaseTrajectory, scenario: &ScenarioConfig) -> Result<Vec<UavTrajectory>> {
    if scenario.uavs.is_empty() {
        return Err(SimError::InvalidScenario(format!(
            "'{}' needs at least one UAV",
            scenario.name
        )));
    }
    if scenario.steps == 0 {
        return Err(SimError::InvalidScenario(format!(
            "'{}' needs at least one step",
            scenario.name
        )));
    }
    if base.len() < scenario.steps {
        return Err(SimError::InsufficientData {
            required: scenario.steps,
            available: base.len(),
        });
    }

    let trajectories = scenario
        .uavs
        .iter()
        .map(|profile| {
            let delay_steps = (profile.delay_s / base.interval_s).round() as usize;
            let offset_m = profile.offset.horizontal_norm();
            let points = (0..scenario.steps)
                .map(|step| {
                    let active = step >= delay_steps;
                    // Before launch this resolves to sample 0: the UAV waits at its pad.
                    let source = &base.samples[step.saturating_sub(delay_steps)];
                    TrajectoryPoint {
                        uav_id: profile.uav_id.clone(),
                        step,
                        time_s: base.samples[step].time_s,
                        position: source.position.offset_by(&profile.offset),
                        rsrp_dbm: source.rsrp_dbm - offset_m * RSRP_LOSS_PER_M,
                        sinr_db: source.sinr_db - offset_m * SINR_LOSS_PER_M,
                        cell_id: source.cell_id,
                        priority: profile.priority,
                        slice: profile.slice,
                        active,
                    }
                })
                .collect();
            UavTrajectory {
                uav_id: profile.uav_id.clone(),
                points,
            }
        })
        .collect();

    Ok(trajectories)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario;
    use tempfile::TempDir;

    fn base_for(s: &ScenarioConfig) -> BaseTrajectory {
        BaseTrajectory::synthetic(s.steps, s.interval_s, 42)
    }

    #[test]
    fn interpolate_midpoint_and_hold() {
        let p = interpolate(7.5, REFERENCE_WAYPOINTS);
        assert_eq!(p, Position::new(175.0, 175.0, 100.0));
        let end = interpolate(200.0, REFERENCE_WAYPOINTS);
        assert_eq!(end, Position::new(850.0, 200.0, 100.0));
    }

    #[test]
    fn synthetic_is_seed_deterministic() {
        let a = BaseTrajectory::synthetic(50, 1.0, 7);
        let b = BaseTrajectory::synthetic(50, 1.0, 7);
        let c = BaseTrajectory::synthetic(50, 1.0, 8);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 50);
        assert_eq!(a.samples[3].time_s, 3.0);
    }

    #[test]
    fn all_timelines_have_equal_length_and_aligned_timestamps() {
        let s = scenario::find("5uav_dense").unwrap();
        let base = base_for(&s);
        let trajs = generate(&base, &s).unwrap();
        assert_eq!(trajs.len(), 5);
        for t in &trajs {
            assert_eq!(t.points.len(), s.steps);
        }
        for step in 0..s.steps {
            let ts = trajs[0].points[step].time_s;
            assert!(trajs.iter().all(|t| t.points[step].time_s == ts));
        }
    }

    #[test]
    fn delayed_uav_is_inactive_until_launch() {
        let s = scenario::find("2uav_coordination").unwrap();
        let base = base_for(&s);
        let trajs = generate(&base, &s).unwrap();
        let second = &trajs[1];
        // 10 s delay at 1 s interval
        assert!(second.points[..10].iter().all(|p| !p.active));
        assert!(second.points[10..].iter().all(|p| p.active));
        // At launch it starts where the base started, shifted by its offset.
        let launch = &second.points[10];
        assert_eq!(
            launch.position,
            base.samples[0].position.offset_by(&s.uavs[1].offset)
        );
        assert!(trajs[0].points.iter().all(|p| p.active));
    }

    #[test]
    fn offset_degrades_radio() {
        let s = scenario::find("3uav_formation").unwrap();
        let base = base_for(&s);
        let trajs = generate(&base, &s).unwrap();
        let lead = &trajs[0].points[5];
        let wing = &trajs[1].points[5];
        let offset = (50.0f64 * 50.0 * 2.0).sqrt();
        assert!((lead.rsrp_dbm - wing.rsrp_dbm - offset * RSRP_LOSS_PER_M).abs() < 1e-9);
        assert!((lead.sinr_db - wing.sinr_db - offset * SINR_LOSS_PER_M).abs() < 1e-9);
        assert_eq!(lead.cell_id, wing.cell_id);
    }

    #[test]
    fn short_base_is_insufficient() {
        let s = scenario::find("3uav_formation").unwrap();
        let base = BaseTrajectory::synthetic(10, 1.0, 1);
        let err = generate(&base, &s).unwrap_err();
        assert!(matches!(
            err,
            SimError::InsufficientData {
                required: 76,
                available: 10
            }
        ));
    }

    #[test]
    fn empty_base_is_insufficient() {
        let s = scenario::find("3uav_formation").unwrap().with_steps(1);
        let base = BaseTrajectory {
            interval_s: 1.0,
            samples: vec![],
        };
        assert!(matches!(
            generate(&base, &s),
            Err(SimError::InsufficientData { available: 0, .. })
        ));
    }

    #[test]
    fn zero_uavs_rejected() {
        let mut s = scenario::find("3uav_formation").unwrap();
        s.uavs.clear();
        let base = base_for(&s);
        assert!(matches!(
            generate(&base, &s),
            Err(SimError::InvalidScenario(_))
        ));
    }

    #[test]
    fn load_rejects_unordered_samples() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("base.json");
        let mut base = BaseTrajectory::synthetic(3, 1.0, 1);
        base.samples.swap(0, 2);
        crate::io::write_json(&path, &base).unwrap();
        assert!(matches!(
            BaseTrajectory::load(&path),
            Err(SimError::InvalidTrajectory(_))
        ));
    }

    #[test]
    fn check_rejects_non_finite_samples() {
        let mut base = BaseTrajectory::synthetic(4, 1.0, 1);
        base.samples[1].time_s = f64::NAN;
        match base.check() {
            Err(SimError::InvalidTrajectory(msg)) => assert!(msg.contains("sample 1: time_s"), "got {msg}"),
            other => panic!("expected rejection, got {other:?}"),
        }

        let mut base = BaseTrajectory::synthetic(4, 1.0, 1);
        base.samples[2].rsrp_dbm = f64::NEG_INFINITY;
        assert!(matches!(base.check(), Err(SimError::InvalidTrajectory(_))));

        let mut base = BaseTrajectory::synthetic(4, 1.0, 1);
        base.samples[3].sinr_db = f64::NAN;
        assert!(matches!(base.check(), Err(SimError::InvalidTrajectory(_))));

        let mut base = BaseTrajectory::synthetic(4, 1.0, 1);
        base.interval_s = f64::INFINITY;
        assert!(matches!(base.check(), Err(SimError::InvalidTrajectory(_))));

        assert!(BaseTrajectory::synthetic(4, 1.0, 1).check().is_ok());
    }

    #[test]
    fn load_rejects_null_time() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("base.json");
        let json = r#"{"interval_s":1.0,"samples":[{"time_s":null,"position":{"x":0.0,"y":0.0,"z":100.0},"rsrp_dbm":-90.0,"sinr_db":10.0,"cell_id":1}]}"#;
        std::fs::write(&path, json).unwrap();
        assert!(BaseTrajectory::load(&path).is_err());
    }

    #[test]
    fn load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("base.json");
        let base = BaseTrajectory::synthetic(20, 0.5, 3);
        crate::io::write_json(&path, &base).unwrap();
        let loaded = BaseTrajectory::load(&path).unwrap();
        assert_eq!(loaded.len(), 20);
        assert_eq!(loaded.interval_s, 0.5);
        for (a, b) in loaded.samples.iter().zip(&base.samples) {
            assert_eq!(a.cell_id, b.cell_id);
            assert!((a.rsrp_dbm - b.rsrp_dbm).abs() < 1e-9);
        }
    }
}
