use crate::aggregate::InterferenceModel;
use crate::energy::EnergyModel;
use crate::error::{Result, SimError};
use crate::paths;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// StrategyKind
// ---------------------------------------------------------------------------

/// Which decision service answers the measurement reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    /// The external xApp over HTTP.
    #[default]
    Xapp,
    RuleBased,
    Greedy,
    Conservative,
    Random,
}

impl StrategyKind {
    pub fn all() -> &'static [StrategyKind] {
        &[
            StrategyKind::Xapp,
            StrategyKind::RuleBased,
            StrategyKind::Greedy,
            StrategyKind::Conservative,
            StrategyKind::Random,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Xapp => "xapp",
            StrategyKind::RuleBased => "rule-based",
            StrategyKind::Greedy => "greedy",
            StrategyKind::Conservative => "conservative",
            StrategyKind::Random => "random",
        }
    }

    /// True when decisions need the network.
    pub fn is_remote(self) -> bool {
        self == StrategyKind::Xapp
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        StrategyKind::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| {
                let valid: Vec<_> = StrategyKind::all().iter().map(|k| k.as_str()).collect();
                SimError::InvalidConfig(format!(
                    "unknown strategy '{s}' (expected one of: {})",
                    valid.join(", ")
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// EndpointConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Per-attempt HTTP timeout.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// First retry delay; doubles on every further attempt.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    2
}

fn default_backoff_ms() -> u64 {
    100
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_ms: default_timeout_ms(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunnerConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Maximum decision calls in flight at once.
    #[serde(default = "default_workers")]
    pub workers: usize,
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    /// A step whose failed-decision share exceeds this is marked failed.
    #[serde(default = "default_max_failed_fraction")]
    pub max_failed_fraction: f64,
}

fn default_workers() -> usize {
    8
}

fn default_step_timeout_ms() -> u64 {
    10_000
}

fn default_max_failed_fraction() -> f64 {
    0.5
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            step_timeout_ms: default_step_timeout_ms(),
            max_failed_fraction: default_max_failed_fraction(),
        }
    }
}

// ---------------------------------------------------------------------------
// HarnessConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub interference: InterferenceModel,
    #[serde(default)]
    pub energy: EnergyModel,
    #[serde(default)]
    pub strategy: StrategyKind,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_seed() -> u64 {
    42
}

fn default_results_dir() -> PathBuf {
    PathBuf::from(paths::DEFAULT_RESULTS_DIR)
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            runner: RunnerConfig::default(),
            interference: InterferenceModel::default(),
            energy: EnergyModel::default(),
            strategy: StrategyKind::default(),
            seed: default_seed(),
            results_dir: default_results_dir(),
        }
    }
}

impl HarnessConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: HarnessConfig = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` when given. Without one, `uavsim.yaml` in the working
    /// directory is used if present, defaults otherwise.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let fallback = Path::new(paths::DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut error = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message,
            })
        };

        let url = self.endpoint.url.trim();
        if url.is_empty() {
            error("endpoint.url is empty".to_string());
        } else if !(url.starts_with("http://") || url.starts_with("https://")) {
            error(format!("endpoint.url '{url}' must start with http:// or https://"));
        }
        if self.endpoint.timeout_ms == 0 {
            error("endpoint.timeout_ms must be greater than zero".to_string());
        }
        if self.runner.workers == 0 {
            error("runner.workers must be at least 1".to_string());
        }
        if self.runner.step_timeout_ms == 0 {
            error("runner.step_timeout_ms must be greater than zero".to_string());
        }
        let fraction = self.runner.max_failed_fraction;
        if !(0.0..=1.0).contains(&fraction) {
            error(format!(
                "runner.max_failed_fraction {fraction} is outside 0..=1"
            ));
        }
        let threshold = self.interference.distance_threshold_m;
        if threshold.is_nan() || threshold <= 0.0 {
            error(format!(
                "interference.distance_threshold_m {threshold} must be positive"
            ));
        }
        let energy = &self.energy;
        let (min_tx, max_tx) = (energy.ue_min_tx_power_dbm, energy.ue_max_tx_power_dbm);
        if min_tx.is_nan() || max_tx.is_nan() || min_tx > max_tx {
            error(format!(
                "energy.ue_min_tx_power_dbm {min_tx} exceeds ue_max_tx_power_dbm {max_tx}"
            ));
        }
        for (name, watts) in [
            ("ue_prb_power_w", energy.ue_prb_power_w),
            ("enb_prb_power_w", energy.enb_prb_power_w),
            ("enb_static_power_w", energy.enb_static_power_w),
        ] {
            if watts.is_nan() || watts < 0.0 {
                error(format!("energy.{name} {watts} must not be negative"));
            }
        }

        let mut warn = |message: String| {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message,
            })
        };

        if self.endpoint.max_retries > 5 {
            warn(format!(
                "endpoint.max_retries is {}; high retry counts stretch every failed step",
                self.endpoint.max_retries
            ));
        }
        if self.runner.step_timeout_ms > 0 && self.runner.step_timeout_ms < self.endpoint.timeout_ms {
            warn(format!(
                "runner.step_timeout_ms ({}) is shorter than one call attempt ({} ms); slow steps will be cut off",
                self.runner.step_timeout_ms, self.endpoint.timeout_ms
            ));
        }
        if self.runner.workers > 64 {
            warn(format!(
                "runner.workers is {}; the endpoint may throttle this many concurrent calls",
                self.runner.workers
            ));
        }
        if self.interference.other_cell_weight > self.interference.same_cell_weight {
            warn("interference.other_cell_weight exceeds same_cell_weight".to_string());
        }

        warnings
    }

    pub fn has_errors(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.level == WarnLevel::Error)
    }
}
