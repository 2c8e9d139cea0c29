use crate::error::{Result, SimError};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory / file constants
// ---------------------------------------------------------------------------

pub const DEFAULT_RESULTS_DIR: &str = "results/multi_uav";
pub const DEFAULT_CONFIG_FILE: &str = "uavsim.yaml";

pub const COMPARISON_PREFIX: &str = "multi_uav_comparison_";
pub const RESULT_EXT: &str = "json";

const STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn file_stamp(at: DateTime<Utc>) -> String {
    at.format(STAMP_FORMAT).to_string()
}

pub fn result_path(dir: &Path, scenario: &str, stamp: &str) -> PathBuf {
    dir.join(format!("{scenario}_{stamp}.{RESULT_EXT}"))
}

pub fn comparison_path(dir: &Path, stamp: &str) -> PathBuf {
    dir.join(format!("{COMPARISON_PREFIX}{stamp}.{RESULT_EXT}"))
}

/// True for per-scenario result files, false for comparison reports and
/// anything that is not JSON.
pub fn is_result_file(path: &Path) -> bool {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some(RESULT_EXT);
    let is_comparison = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with(COMPARISON_PREFIX));
    is_json && !is_comparison
}

// ---------------------------------------------------------------------------
// Scenario name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").unwrap())
}

/// Scenario names end up in file names, so keep them to a safe alphabet.
pub fn validate_scenario_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(SimError::InvalidScenarioName(name.to_string()));
    }
    Ok(())
}
