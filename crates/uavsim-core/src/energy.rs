//! Radio energy spent on a step's allocations.
//!
//! UE transmit power follows simplified open-loop uplink power control:
//! path loss is estimated from RSRP against the eNB transmit power, then
//! adjusted for the PRB allocation, channel quality and cell-edge position,
//! and clamped to the UE power class.

use serde::{Deserialize, Serialize};

/// Allocation the PRB power adjustment is referenced to.
const REFERENCE_PRB: f64 = 10.0;
/// Allocations below this are treated as this many PRBs when adjusting power.
const MIN_PRB_FOR_ADJUSTMENT: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnergyModel {
    /// UE-side power per allocated PRB (W).
    #[serde(default = "default_ue_prb_power_w")]
    pub ue_prb_power_w: f64,
    /// eNB dynamic power per allocated PRB (W).
    #[serde(default = "default_enb_prb_power_w")]
    pub enb_prb_power_w: f64,
    /// eNB baseline power, charged once per serving cell in use (W).
    #[serde(default = "default_enb_static_power_w")]
    pub enb_static_power_w: f64,
    #[serde(default = "default_enb_tx_power_dbm")]
    pub enb_tx_power_dbm: f64,
    #[serde(default = "default_ue_max_tx_power_dbm")]
    pub ue_max_tx_power_dbm: f64,
    #[serde(default = "default_ue_min_tx_power_dbm")]
    pub ue_min_tx_power_dbm: f64,
    /// Nominal power P0 of the power-control loop (dBm).
    #[serde(default = "default_p0_dbm")]
    pub p0_dbm: f64,
    /// Fractional path-loss compensation.
    #[serde(default = "default_alpha")]
    pub alpha: f64,
}

fn default_ue_prb_power_w() -> f64 {
    0.5
}

fn default_enb_prb_power_w() -> f64 {
    1.0
}

fn default_enb_static_power_w() -> f64 {
    50.0
}

fn default_enb_tx_power_dbm() -> f64 {
    46.0
}

fn default_ue_max_tx_power_dbm() -> f64 {
    23.0
}

fn default_ue_min_tx_power_dbm() -> f64 {
    -40.0
}

fn default_p0_dbm() -> f64 {
    -80.0
}

fn default_alpha() -> f64 {
    0.8
}

impl Default for EnergyModel {
    fn default() -> Self {
        Self {
            ue_prb_power_w: default_ue_prb_power_w(),
            enb_prb_power_w: default_enb_prb_power_w(),
            enb_static_power_w: default_enb_static_power_w(),
            enb_tx_power_dbm: default_enb_tx_power_dbm(),
            ue_max_tx_power_dbm: default_ue_max_tx_power_dbm(),
            ue_min_tx_power_dbm: default_ue_min_tx_power_dbm(),
            p0_dbm: default_p0_dbm(),
            alpha: default_alpha(),
        }
    }
}

pub fn dbm_to_watts(power_dbm: f64) -> f64 {
    10f64.powf((power_dbm - 30.0) / 10.0)
}

fn sinr_adjustment_db(sinr_db: f64) -> f64 {
    if sinr_db > 15.0 {
        -2.0
    } else if sinr_db > 10.0 {
        -1.0
    } else if sinr_db > 5.0 {
        0.0
    } else {
        1.0
    }
}

fn edge_adjustment_db(rsrp_dbm: f64) -> f64 {
    if rsrp_dbm < -118.0 {
        2.0
    } else if rsrp_dbm < -115.0 {
        1.0
    } else if rsrp_dbm > -105.0 {
        -1.0
    } else {
        0.0
    }
}

impl EnergyModel {
    /// UE transmit power needed for `prb` blocks at the given channel quality.
    pub fn ue_tx_power_dbm(&self, rsrp_dbm: f64, sinr_db: f64, prb: u32) -> f64 {
        let path_loss_db = self.enb_tx_power_dbm - rsrp_dbm;
        let base = self.p0_dbm + self.alpha * path_loss_db;
        let prb_factor_db = if prb == 0 {
            0.0
        } else {
            10.0 * (REFERENCE_PRB / f64::from(prb.max(MIN_PRB_FOR_ADJUSTMENT))).log10()
        };
        let tx = base + prb_factor_db + sinr_adjustment_db(sinr_db) + edge_adjustment_db(rsrp_dbm);
        tx.max(self.ue_min_tx_power_dbm).min(self.ue_max_tx_power_dbm)
    }

    /// Energy one UAV spends over `duration_s`: allocated PRBs plus transmit power.
    pub fn uav_energy(&self, rsrp_dbm: f64, sinr_db: f64, prb: u32, duration_s: f64) -> UavEnergy {
        let tx_power_dbm = self.ue_tx_power_dbm(rsrp_dbm, sinr_db, prb);
        UavEnergy {
            tx_power_dbm,
            prb_energy_j: f64::from(prb) * self.ue_prb_power_w * duration_s,
            tx_energy_j: dbm_to_watts(tx_power_dbm) * duration_s,
        }
    }

    /// Network-side energy for `total_prb` blocks across `cells` serving cells.
    pub fn enb_energy_j(&self, total_prb: u64, cells: usize, duration_s: f64) -> f64 {
        let static_w = self.enb_static_power_w * cells as f64;
        (static_w + total_prb as f64 * self.enb_prb_power_w) * duration_s
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UavEnergy {
    pub tx_power_dbm: f64,
    pub prb_energy_j: f64,
    pub tx_energy_j: f64,
}

impl UavEnergy {
    pub fn total_j(&self) -> f64 {
        self.prb_energy_j + self.tx_energy_j
    }
}

/// Step-level energy totals.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StepEnergy {
    pub prb_energy_j: f64,
    pub tx_energy_j: f64,
    pub enb_energy_j: f64,
    pub bits: f64,
    /// Bits delivered per joule of UE-side energy (PRB plus transmit).
    pub efficiency_bits_per_j: f64,
}

impl StepEnergy {
    pub fn ue_energy_j(&self) -> f64 {
        self.prb_energy_j + self.tx_energy_j
    }

    pub fn total_j(&self) -> f64 {
        self.ue_energy_j() + self.enb_energy_j
    }
}

/// Bits per joule, zero when nothing was spent.
pub fn efficiency(bits: f64, energy_j: f64) -> f64 {
    if energy_j > 0.0 {
        bits / energy_j
    } else {
        0.0
    }
}
