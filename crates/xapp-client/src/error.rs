use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecisionError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("xApp returned HTTP {code}: {body}")]
    Status { code: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),

    #[error("decision unavailable after {attempts} attempt(s): {last}")]
    Unavailable { attempts: u32, last: String },

    #[error("strategy error: {0}")]
    Strategy(String),
}

impl DecisionError {
    /// Transport failures, timeouts and 5xx responses may succeed on a
    /// later attempt. Everything else is permanent.
    pub fn is_retryable(&self) -> bool {
        match self {
            DecisionError::Transport(_) | DecisionError::Timeout(_) => true,
            DecisionError::Status { code, .. } => *code >= 500,
            _ => false,
        }
    }

    /// Attempts spent before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            DecisionError::Unavailable { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}
