//! The [`DecisionService`] seam and the local baseline strategies the xApp
//! is compared against.

use crate::client::{ClientConfig, XappClient};
use crate::error::DecisionError;
use futures::future::{self, BoxFuture};
use futures::FutureExt;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uavsim_core::config::{EndpointConfig, StrategyKind};
use uavsim_core::report::MeasurementReport;
use uavsim_core::types::Decision;

const RSRP_HANDOVER_THRESHOLD_DBM: f64 = -110.0;
const HYSTERESIS_DB: f64 = 3.0;

const CONSERVATIVE_HYSTERESIS_DB: f64 = 5.0;
const CONSERVATIVE_STREAK: u32 = 3;

const RANDOM_HANDOVER_PROBABILITY: f64 = 0.05;

// ---------------------------------------------------------------------------
// DecisionService
// ---------------------------------------------------------------------------

/// Anything that can turn a measurement report into a decision.
///
/// Implementations are shared across worker tasks, so `decide` takes
/// `&self`; stateful strategies keep their state behind a lock.
pub trait DecisionService: Send + Sync {
    fn label(&self) -> &str;

    /// Called once before the first step of every scenario.
    fn begin_scenario(&self) {}

    fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, Result<Decision, DecisionError>>;
}

/// Build the service selected by `kind`. Only [`StrategyKind::Xapp`] uses
/// `endpoint`; only [`StrategyKind::Random`] uses `seed`.
pub fn build_service(
    kind: StrategyKind,
    endpoint: &EndpointConfig,
    seed: u64,
) -> Result<Arc<dyn DecisionService>, DecisionError> {
    let service: Arc<dyn DecisionService> = match kind {
        StrategyKind::Xapp => Arc::new(XappClient::new(ClientConfig::from(endpoint))?),
        StrategyKind::RuleBased => Arc::new(RuleBased),
        StrategyKind::Greedy => Arc::new(Greedy),
        StrategyKind::Conservative => Arc::new(Conservative::default()),
        StrategyKind::Random => Arc::new(RandomBaseline::new(seed)),
    };
    Ok(service)
}

fn local_decision(report: &MeasurementReport, serving_cell: u32, prb: u32) -> Decision {
    Decision {
        uav_id: report.uav_id.clone(),
        step: report.step,
        time_s: report.time_s,
        serving_cell,
        prb_allocated: prb,
        latency_ms: 0.0,
        handover: serving_cell != report.serving_cell,
    }
}

fn ready<'a>(decision: Decision) -> BoxFuture<'a, Result<Decision, DecisionError>> {
    future::ready(Ok(decision)).boxed()
}

// ---------------------------------------------------------------------------
// RuleBased
// ---------------------------------------------------------------------------

/// Threshold handover with hysteresis; PRB sized from SINR with cell-edge
/// compensation.
#[derive(Debug, Default)]
pub struct RuleBased;

impl RuleBased {
    pub fn decide_now(report: &MeasurementReport) -> Decision {
        let mut target = report.serving_cell;
        if report.rsrp_dbm < RSRP_HANDOVER_THRESHOLD_DBM {
            if let Some(best) = report.best_neighbor() {
                if best.rsrp_dbm > report.rsrp_dbm + HYSTERESIS_DB {
                    target = best.cell_id;
                }
            }
        }

        let base: u32 = match report.sinr_db {
            s if s > 15.0 => 7,
            s if s > 10.0 => 9,
            s if s > 5.0 => 11,
            _ => 14,
        };
        let edge: u32 = match report.rsrp_dbm {
            r if r < -118.0 => 3,
            r if r < -115.0 => 2,
            r if r < -110.0 => 1,
            _ => 0,
        };
        local_decision(report, target, (base + edge).clamp(5, 20))
    }
}

impl DecisionService for RuleBased {
    fn label(&self) -> &str {
        StrategyKind::RuleBased.as_str()
    }

    fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        ready(Self::decide_now(report))
    }
}

// ---------------------------------------------------------------------------
// Greedy
// ---------------------------------------------------------------------------

/// Always the strongest cell, no hysteresis; PRB proportional to SINR.
#[derive(Debug, Default)]
pub struct Greedy;

impl Greedy {
    pub fn decide_now(report: &MeasurementReport) -> Decision {
        let target = match report.best_neighbor() {
            Some(best) if best.rsrp_dbm > report.rsrp_dbm => best.cell_id,
            _ => report.serving_cell,
        };
        let normalized = ((report.sinr_db + 5.0) / 30.0).clamp(0.0, 1.0);
        let prb = (5.0 + normalized * 15.0) as u32;
        local_decision(report, target, prb.clamp(5, 20))
    }
}

impl DecisionService for Greedy {
    fn label(&self) -> &str {
        StrategyKind::Greedy.as_str()
    }

    fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        ready(Self::decide_now(report))
    }
}

// ---------------------------------------------------------------------------
// Conservative
// ---------------------------------------------------------------------------

/// Hands over only after a streak of weak reports and a wide hysteresis;
/// near-fixed PRB. Streaks are tracked per UAV.
#[derive(Debug, Default)]
pub struct Conservative {
    streaks: Mutex<HashMap<String, u32>>,
}

impl Conservative {
    fn decide_now(&self, report: &MeasurementReport) -> Result<Decision, DecisionError> {
        let mut streaks = self
            .streaks
            .lock()
            .map_err(|_| DecisionError::Strategy("conservative streak table poisoned".into()))?;
        let streak = streaks.entry(report.uav_id.clone()).or_insert(0);

        if report.rsrp_dbm < RSRP_HANDOVER_THRESHOLD_DBM {
            *streak += 1;
        } else {
            *streak = 0;
        }

        let mut target = report.serving_cell;
        if *streak >= CONSERVATIVE_STREAK {
            if let Some(best) = report.best_neighbor() {
                if best.rsrp_dbm > report.rsrp_dbm + CONSERVATIVE_HYSTERESIS_DB {
                    target = best.cell_id;
                    *streak = 0;
                }
            }
        }

        let mut prb = 8;
        if report.sinr_db < 5.0 {
            prb += 2;
        }
        if report.rsrp_dbm < -115.0 {
            prb += 2;
        }
        Ok(local_decision(report, target, prb.clamp(5, 15)))
    }
}

impl DecisionService for Conservative {
    fn label(&self) -> &str {
        StrategyKind::Conservative.as_str()
    }

    fn begin_scenario(&self) {
        if let Ok(mut streaks) = self.streaks.lock() {
            streaks.clear();
        }
    }

    fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        future::ready(self.decide_now(report)).boxed()
    }
}

// ---------------------------------------------------------------------------
// RandomBaseline
// ---------------------------------------------------------------------------

/// Occasional handover to a random neighbour, uniform PRB.
///
/// Each decision draws from its own generator seeded by (seed, UAV, step),
/// so the result does not depend on the order worker tasks run in.
#[derive(Debug)]
pub struct RandomBaseline {
    seed: u64,
}

impl RandomBaseline {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    fn rng_for(&self, report: &MeasurementReport) -> StdRng {
        // FNV-1a over the UAV id, mixed with the run seed and step.
        let mut h: u64 = 0xcbf2_9ce4_8422_2325;
        for b in report.uav_id.bytes() {
            h ^= u64::from(b);
            h = h.wrapping_mul(0x0100_0000_01b3);
        }
        h ^= self.seed.rotate_left(17);
        h = h.wrapping_mul(0x0100_0000_01b3);
        h ^= report.step as u64;
        StdRng::seed_from_u64(h)
    }

    pub fn decide_now(&self, report: &MeasurementReport) -> Decision {
        let mut rng = self.rng_for(report);
        let mut target = report.serving_cell;
        if rng.gen_bool(RANDOM_HANDOVER_PROBABILITY) {
            if let Some(n) = report.neighbors.choose(&mut rng) {
                target = n.cell_id;
            }
        }
        let prb = rng.gen_range(5..=15);
        local_decision(report, target, prb)
    }
}

impl DecisionService for RandomBaseline {
    fn label(&self) -> &str {
        StrategyKind::Random.as_str()
    }

    fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        ready(self.decide_now(report))
    }
}
