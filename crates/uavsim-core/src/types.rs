use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// A point in the simulation frame, metres. `z` is altitude.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance_to(&self, other: &Position) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2))
            .sqrt()
    }

    pub fn offset_by(&self, offset: &Position) -> Position {
        Position::new(self.x + offset.x, self.y + offset.y, self.z + offset.z)
    }

    /// Length of the horizontal component.
    pub fn horizontal_norm(&self) -> f64 {
        (self.x.powi(2) + self.y.powi(2)).sqrt()
    }
}

// ---------------------------------------------------------------------------
// Priority
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Share weight used by the fair-share PRB hint. Higher priority gets more.
    pub fn share_weight(self) -> f64 {
        match self {
            Priority::High => 3.0,
            Priority::Medium => 2.0,
            Priority::Low => 1.0,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Slice
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slice {
    #[default]
    Embb,
    Urllc,
    Miot,
}

impl Slice {
    pub fn as_str(self) -> &'static str {
        match self {
            Slice::Embb => "embb",
            Slice::Urllc => "urllc",
            Slice::Miot => "miot",
        }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TrajectoryPoint
// ---------------------------------------------------------------------------

/// One UAV's state at one simulation step. Immutable once generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub uav_id: String,
    pub step: usize,
    pub time_s: f64,
    pub position: Position,
    pub rsrp_dbm: f64,
    pub sinr_db: f64,
    pub cell_id: u32,
    pub priority: Priority,
    pub slice: Slice,
    /// `false` until the UAV's launch delay has elapsed. Inactive points are
    /// never dispatched.
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub uav_id: String,
    pub step: usize,
    pub time_s: f64,
    pub serving_cell: u32,
    pub prb_allocated: u32,
    pub latency_ms: f64,
    /// The chosen cell differs from the cell the UAV reported.
    pub handover: bool,
}

/// A decision or the per-UAV failure marker that stands in for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecisionOutcome {
    Decided(Decision),
    Unavailable { reason: String, attempts: u32 },
}

impl DecisionOutcome {
    pub fn unavailable(reason: impl Into<String>, attempts: u32) -> Self {
        DecisionOutcome::Unavailable {
            reason: reason.into(),
            attempts,
        }
    }

    pub fn decision(&self) -> Option<&Decision> {
        match self {
            DecisionOutcome::Decided(d) => Some(d),
            DecisionOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, DecisionOutcome::Unavailable { .. })
    }
}

// ---------------------------------------------------------------------------
// StepSnapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StepEntry {
    pub point: TrajectoryPoint,
    pub outcome: DecisionOutcome,
}

/// Every active UAV's outcome at one step, in scenario profile order.
#[derive(Debug, Clone, PartialEq)]
pub struct StepSnapshot {
    pub step: usize,
    pub time_s: f64,
    pub entries: Vec<StepEntry>,
}

impl StepSnapshot {
    pub fn new(step: usize, time_s: f64, entries: Vec<StepEntry>) -> Self {
        Self {
            step,
            time_s,
            entries,
        }
    }

    pub fn decided(&self) -> impl Iterator<Item = (&TrajectoryPoint, &Decision)> {
        self.entries
            .iter()
            .filter_map(|e| e.outcome.decision().map(|d| (&e.point, d)))
    }

    pub fn failed_count(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.is_failed()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean_in_3d() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 4.0, 12.0);
        assert_eq!(a.distance_to(&b), 13.0);
        assert_eq!(b.distance_to(&a), 13.0);
    }

    #[test]
    fn horizontal_norm_ignores_altitude() {
        let p = Position::new(150.0, -100.0, 20.0);
        assert!((p.horizontal_norm() - 180.277_563_773_199_46).abs() < 1e-9);
    }

    #[test]
    fn outcome_json_tagged() {
        let out = DecisionOutcome::unavailable("connection refused", 3);
        let json = serde_json::to_string(&out).unwrap();
        assert!(json.contains("\"kind\":\"unavailable\""));
        let back: DecisionOutcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, out);
    }

    #[test]
    fn snapshot_decided_skips_failures() {
        let point = TrajectoryPoint {
            uav_id: "uav-001".into(),
            step: 0,
            time_s: 0.0,
            position: Position::default(),
            rsrp_dbm: -90.0,
            sinr_db: 10.0,
            cell_id: 1,
            priority: Priority::High,
            slice: Slice::Embb,
            active: true,
        };
        let decided = StepEntry {
            point: point.clone(),
            outcome: DecisionOutcome::Decided(Decision {
                uav_id: "uav-001".into(),
                step: 0,
                time_s: 0.0,
                serving_cell: 1,
                prb_allocated: 10,
                latency_ms: 2.0,
                handover: false,
            }),
        };
        let failed = StepEntry {
            point: TrajectoryPoint {
                uav_id: "uav-002".into(),
                ..point
            },
            outcome: DecisionOutcome::unavailable("timeout", 1),
        };
        let snap = StepSnapshot::new(0, 0.0, vec![decided, failed]);
        assert_eq!(snap.decided().count(), 1);
        assert_eq!(snap.failed_count(), 1);
    }

    #[test]
    fn slice_and_priority_strings() {
        assert_eq!(Slice::Urllc.to_string(), "urllc");
        assert_eq!(Priority::Low.to_string(), "low");
        assert!(Priority::High.share_weight() > Priority::Low.share_weight());
    }
}
