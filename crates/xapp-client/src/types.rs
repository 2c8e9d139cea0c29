//! Wire format of the xApp's E2 indication endpoint.

use crate::error::DecisionError;
use serde::{Deserialize, Serialize};
use uavsim_core::report::MeasurementReport;
use uavsim_core::types::{Decision, Position};

/// Share of the serving cell's PRB load attributed to the UAV's slice.
const SLICE_LOAD_SHARE: f64 = 0.6;

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioSnapshot {
    pub serving_cell_id: String,
    pub neighbor_cell_ids: Vec<String>,
    pub rsrp_serving: f64,
    pub rsrp_best_neighbor: f64,
    pub sinr_serving: f64,
    pub prb_utilization_serving: f64,
    pub prb_utilization_slice: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiUavContext {
    pub total_uavs: usize,
    pub congestion_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicationPayload {
    pub uav_id: String,
    pub position: Position,
    pub path_position: f64,
    pub slice_id: String,
    pub radio_snapshot: RadioSnapshot,
    pub multi_uav_context: MultiUavContext,
    pub prb_hint: u32,
    pub timestamp: f64,
}

impl From<&MeasurementReport> for IndicationPayload {
    fn from(r: &MeasurementReport) -> Self {
        let rsrp_best_neighbor = r
            .best_neighbor()
            .map(|n| n.rsrp_dbm)
            .unwrap_or(r.rsrp_dbm - 10.0);
        Self {
            uav_id: r.uav_id.clone(),
            position: r.position,
            path_position: r.path_position,
            slice_id: r.slice.as_str().to_string(),
            radio_snapshot: RadioSnapshot {
                serving_cell_id: r.serving_cell.to_string(),
                neighbor_cell_ids: r.neighbors.iter().map(|n| n.cell_id.to_string()).collect(),
                rsrp_serving: r.rsrp_dbm,
                rsrp_best_neighbor,
                sinr_serving: r.sinr_db,
                prb_utilization_serving: r.prb_utilization,
                prb_utilization_slice: r.prb_utilization * SLICE_LOAD_SHARE,
            },
            multi_uav_context: MultiUavContext {
                total_uavs: r.active_uavs,
                congestion_level: r.congestion_level,
            },
            prb_hint: r.prb_hint,
            timestamp: r.time_s,
        }
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// The xApp reports cells either as `"2"` or `2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellRef {
    Number(u32),
    Text(String),
}

impl CellRef {
    pub fn resolve(&self) -> Result<u32, DecisionError> {
        match self {
            CellRef::Number(n) => Ok(*n),
            CellRef::Text(s) => s
                .trim()
                .parse()
                .map_err(|_| DecisionError::Decode(format!("target_cell_id '{s}' is not a cell number"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionResponse {
    #[serde(default)]
    pub target_cell_id: Option<CellRef>,
    #[serde(default, alias = "allocated_prbs")]
    pub prb_quota: Option<u32>,
    #[serde(default)]
    pub latency_ms: Option<f64>,
}

impl DecisionResponse {
    /// Turn the response into a decision for `report`. Missing fields fall
    /// back to the reported serving cell, the fair-share hint and the
    /// measured round trip.
    pub fn into_decision(self, report: &MeasurementReport, round_trip_ms: f64) -> Result<Decision, DecisionError> {
        let serving_cell = match &self.target_cell_id {
            Some(cell) => cell.resolve()?,
            None => report.serving_cell,
        };
        if let Some(quota) = self.prb_quota {
            if quota > report.capacity_prb {
                return Err(DecisionError::Decode(format!(
                    "prb_quota {quota} exceeds the {} PRB capacity",
                    report.capacity_prb
                )));
            }
        }
        Ok(Decision {
            uav_id: report.uav_id.clone(),
            step: report.step,
            time_s: report.time_s,
            serving_cell,
            prb_allocated: self.prb_quota.unwrap_or(report.prb_hint),
            latency_ms: self.latency_ms.unwrap_or(round_trip_ms),
            handover: serving_cell != report.serving_cell,
        })
    }
}
