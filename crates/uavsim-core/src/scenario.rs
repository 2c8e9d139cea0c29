use crate::error::{Result, SimError};
use crate::paths;
use crate::types::{Position, Priority, Slice};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// PRB budget of the shared cell in every catalogue scenario.
pub const DEFAULT_CAPACITY_PRB: u32 = 100;

// ---------------------------------------------------------------------------
// UavProfile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UavProfile {
    pub uav_id: String,
    /// Spatial offset from the base trajectory.
    pub offset: Position,
    /// Seconds after scenario start before the UAV launches.
    #[serde(default)]
    pub delay_s: f64,
    pub priority: Priority,
    #[serde(default)]
    pub slice: Slice,
    #[serde(default)]
    pub description: String,
}

impl UavProfile {
    pub fn new(uav_id: &str, offset: (f64, f64, f64), delay_s: f64, priority: Priority) -> Self {
        Self {
            uav_id: uav_id.to_string(),
            offset: Position::new(offset.0, offset.1, offset.2),
            delay_s,
            priority,
            slice: Slice::Embb,
            description: String::new(),
        }
    }

    pub fn slice(mut self, slice: Slice) -> Self {
        self.slice = slice;
        self
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

// ---------------------------------------------------------------------------
// ScenarioConfig
// ---------------------------------------------------------------------------

/// Everything that defines one run. Immutable once validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub uavs: Vec<UavProfile>,
    pub capacity_prb: u32,
    pub interval_s: f64,
    pub steps: usize,
}

impl ScenarioConfig {
    pub fn uav_count(&self) -> usize {
        self.uavs.len()
    }

    pub fn duration_s(&self) -> f64 {
        self.steps.saturating_sub(1) as f64 * self.interval_s
    }

    /// Same scenario with a different number of steps.
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn validate(&self) -> Result<()> {
        paths::validate_scenario_name(&self.name)?;
        if self.uavs.is_empty() {
            return Err(SimError::InvalidScenario(format!(
                "'{}' has no UAVs",
                self.name
            )));
        }
        if self.steps == 0 {
            return Err(SimError::InvalidScenario(format!(
                "'{}' has zero steps",
                self.name
            )));
        }
        if self.capacity_prb == 0 {
            return Err(SimError::InvalidScenario(format!(
                "'{}' has zero PRB capacity",
                self.name
            )));
        }
        if self.interval_s.is_nan() || self.interval_s <= 0.0 {
            return Err(SimError::InvalidScenario(format!(
                "'{}' has non-positive sample interval {}",
                self.name, self.interval_s
            )));
        }
        let mut seen = HashSet::new();
        for uav in &self.uavs {
            if uav.uav_id.trim().is_empty() {
                return Err(SimError::InvalidScenario(format!(
                    "'{}' has a UAV with an empty id",
                    self.name
                )));
            }
            if !seen.insert(uav.uav_id.as_str()) {
                return Err(SimError::InvalidScenario(format!(
                    "'{}' lists UAV '{}' twice",
                    self.name, uav.uav_id
                )));
            }
            if uav.delay_s < 0.0 {
                return Err(SimError::InvalidScenario(format!(
                    "UAV '{}' has negative launch delay",
                    uav.uav_id
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

pub const CATALOGUE_NAMES: &[&str] = &["2uav_coordination", "3uav_formation", "5uav_dense"];

/// The built-in comparison scenarios, in run order.
pub fn catalogue() -> Vec<ScenarioConfig> {
    vec![two_uav_coordination(), three_uav_formation(), five_uav_dense()]
}

pub fn find(name: &str) -> Result<ScenarioConfig> {
    catalogue()
        .into_iter()
        .find(|s| s.name == name)
        .ok_or_else(|| SimError::ScenarioNotFound(name.to_string()))
}

fn two_uav_coordination() -> ScenarioConfig {
    ScenarioConfig {
        name: "2uav_coordination".into(),
        description: "2 UAV coordination - different trajectories, shared resources".into(),
        uavs: vec![
            UavProfile::new("uav-001", (0.0, 0.0, 0.0), 0.0, Priority::High)
                .describe("Primary UAV - base trajectory"),
            UavProfile::new("uav-002", (150.0, -100.0, 20.0), 10.0, Priority::Medium)
                .describe("Secondary UAV - offset trajectory, delayed start"),
        ],
        capacity_prb: DEFAULT_CAPACITY_PRB,
        interval_s: 1.0,
        steps: 76,
    }
}

fn three_uav_formation() -> ScenarioConfig {
    ScenarioConfig {
        name: "3uav_formation".into(),
        description: "3 UAV formation flight - triangle formation, centralized load".into(),
        uavs: vec![
            UavProfile::new("uav-lead", (0.0, 0.0, 0.0), 0.0, Priority::High)
                .describe("Formation leader"),
            UavProfile::new("uav-wing1", (-50.0, -50.0, 10.0), 0.0, Priority::Medium)
                .describe("Left wing UAV"),
            UavProfile::new("uav-wing2", (50.0, -50.0, 10.0), 0.0, Priority::Medium)
                .describe("Right wing UAV"),
        ],
        capacity_prb: DEFAULT_CAPACITY_PRB,
        interval_s: 1.0,
        steps: 76,
    }
}

fn five_uav_dense() -> ScenarioConfig {
    ScenarioConfig {
        name: "5uav_dense".into(),
        description: "5 UAV dense deployment - resource competition, congestion testing".into(),
        uavs: vec![
            UavProfile::new("uav-alpha", (0.0, 0.0, 0.0), 0.0, Priority::High)
                .describe("High priority surveillance UAV"),
            UavProfile::new("uav-beta", (80.0, 60.0, 15.0), 5.0, Priority::Medium)
                .describe("Medium priority delivery UAV 1"),
            UavProfile::new("uav-gamma", (-80.0, 60.0, 15.0), 10.0, Priority::Medium)
                .slice(Slice::Urllc)
                .describe("Medium priority delivery UAV 2"),
            UavProfile::new("uav-delta", (40.0, -80.0, 20.0), 15.0, Priority::Low)
                .describe("Low priority inspection UAV 1"),
            UavProfile::new("uav-epsilon", (-40.0, -80.0, 20.0), 20.0, Priority::Low)
                .slice(Slice::Miot)
                .describe("Low priority inspection UAV 2"),
        ],
        capacity_prb: DEFAULT_CAPACITY_PRB,
        interval_s: 0.5,
        steps: 151,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_is_valid_and_named() {
        let all = catalogue();
        let names: Vec<_> = all.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, CATALOGUE_NAMES);
        for s in &all {
            s.validate().unwrap();
        }
    }

    #[test]
    fn catalogue_uav_counts() {
        assert_eq!(find("2uav_coordination").unwrap().uav_count(), 2);
        assert_eq!(find("3uav_formation").unwrap().uav_count(), 3);
        assert_eq!(find("5uav_dense").unwrap().uav_count(), 5);
    }

    #[test]
    fn dense_scenario_samples_twice_as_often() {
        let dense = find("5uav_dense").unwrap();
        assert_eq!(dense.interval_s, 0.5);
        assert_eq!(dense.duration_s(), 75.0);
        assert_eq!(find("3uav_formation").unwrap().duration_s(), 75.0);
    }

    #[test]
    fn unknown_scenario() {
        assert!(matches!(
            find("9uav_swarm"),
            Err(SimError::ScenarioNotFound(_))
        ));
    }

    #[test]
    fn validate_rejects_empty_and_duplicates() {
        let mut s = find("3uav_formation").unwrap();
        s.uavs.clear();
        assert!(matches!(s.validate(), Err(SimError::InvalidScenario(_))));

        let mut s = find("3uav_formation").unwrap();
        s.uavs[1].uav_id = "uav-lead".into();
        let err = s.validate().unwrap_err().to_string();
        assert!(err.contains("twice"), "got: {err}");

        let s = find("3uav_formation").unwrap().with_steps(0);
        assert!(s.validate().is_err());

        let mut s = find("3uav_formation").unwrap();
        s.capacity_prb = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn scenario_yaml_roundtrip() {
        let s = find("5uav_dense").unwrap();
        let yaml = serde_yaml::to_string(&s).unwrap();
        assert!(yaml.contains("slice: urllc"));
        let parsed: ScenarioConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, s);
    }
}
