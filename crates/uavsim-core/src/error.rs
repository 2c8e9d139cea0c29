use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("insufficient trajectory data: need {required} samples, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("invalid trajectory: {0}")]
    InvalidTrajectory(String),

    #[error("invalid scenario: {0}")]
    InvalidScenario(String),

    #[error("scenario not found: {0}")]
    ScenarioNotFound(String),

    #[error("invalid scenario name '{0}': must be lowercase alphanumeric with '_' or '-'")]
    InvalidScenarioName(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("scenario '{scenario}' aborted after {completed_steps} step(s)")]
    ScenarioAborted {
        scenario: String,
        completed_steps: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
