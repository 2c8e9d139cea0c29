use crate::error::DecisionError;
use crate::strategy::DecisionService;
use crate::types::{DecisionResponse, IndicationPayload};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::time::{Duration, Instant};
use uavsim_core::config::EndpointConfig;
use uavsim_core::report::MeasurementReport;
use uavsim_core::types::Decision;

const INDICATION_PATH: &str = "/e2/indication";
const HEALTH_PATH: &str = "/health";
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// ClientConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub endpoint: String,
    /// Per-attempt timeout covering connect, send and body read.
    pub timeout: Duration,
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each one after.
    pub backoff: Duration,
}

impl From<&EndpointConfig> for ClientConfig {
    fn from(cfg: &EndpointConfig) -> Self {
        Self {
            endpoint: cfg.url.clone(),
            timeout: Duration::from_millis(cfg.timeout_ms),
            max_retries: cfg.max_retries,
            backoff: Duration::from_millis(cfg.backoff_ms),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::from(&EndpointConfig::default())
    }
}

impl ClientConfig {
    /// Wait before attempt `attempt` (1-based). Nothing before the first.
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.backoff.saturating_mul(1u32 << (attempt - 2).min(16))
    }
}

/// Cut `text` to at most `max` bytes without splitting a character.
fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let cut = (0..=max).rev().find(|&i| text.is_char_boundary(i)).unwrap_or(0);
    text.truncate(cut);
}

// ---------------------------------------------------------------------------
// XappClient
// ---------------------------------------------------------------------------

/// HTTP client for the xApp's decision API. Cheap to share: one instance
/// serves every UAV of a run.
#[derive(Debug, Clone)]
pub struct XappClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl XappClient {
    pub fn new(config: ClientConfig) -> Result<Self, DecisionError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DecisionError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.endpoint.trim_end_matches('/'))
    }

    fn classify(&self, e: reqwest::Error) -> DecisionError {
        if e.is_timeout() {
            DecisionError::Timeout(self.config.timeout)
        } else {
            DecisionError::Transport(e.to_string())
        }
    }

    /// `true` when `GET /health` answers 200 within the per-attempt timeout.
    pub async fn health(&self) -> bool {
        match self.http.get(self.url(HEALTH_PATH)).send().await {
            Ok(resp) => resp.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::debug!(error = %e, "health check failed");
                false
            }
        }
    }

    async fn attempt(&self, payload: &IndicationPayload) -> Result<DecisionResponse, DecisionError> {
        let resp = self
            .http
            .post(self.url(INDICATION_PATH))
            .json(payload)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.bytes().await.map_err(|e| self.classify(e))?;
        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            truncate_at_char_boundary(&mut text, MAX_ERROR_BODY);
            return Err(DecisionError::Status {
                code: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_slice(&body).map_err(|e| DecisionError::Decode(e.to_string()))
    }

    /// Ask the xApp for a decision, retrying transient failures with
    /// exponential backoff. The final failure is always
    /// [`DecisionError::Unavailable`].
    pub async fn request_decision(&self, report: &MeasurementReport) -> Result<Decision, DecisionError> {
        let payload = IndicationPayload::from(report);
        let max_attempts = self.config.max_retries + 1;

        let mut attempt = 1;
        loop {
            let started = Instant::now();
            let outcome = self.attempt(&payload).await;
            let round_trip_ms = started.elapsed().as_secs_f64() * 1000.0;

            let err = match outcome.and_then(|resp| resp.into_decision(report, round_trip_ms)) {
                Ok(decision) => {
                    tracing::debug!(
                        uav = %report.uav_id,
                        step = report.step,
                        cell = decision.serving_cell,
                        prb = decision.prb_allocated,
                        attempt,
                        "xApp decision"
                    );
                    return Ok(decision);
                }
                Err(e) => e,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(DecisionError::Unavailable {
                    attempts: attempt,
                    last: err.to_string(),
                });
            }

            attempt += 1;
            let wait = self.config.backoff_before(attempt);
            tracing::warn!(
                uav = %report.uav_id,
                step = report.step,
                attempt,
                max_attempts,
                wait_ms = wait.as_millis() as u64,
                error = %err,
                "retrying xApp call"
            );
            tokio::time::sleep(wait).await;
        }
    }
}

impl DecisionService for XappClient {
    fn label(&self) -> &str {
        "xapp"
    }

    fn decide<'a>(&'a self, report: &'a MeasurementReport) -> BoxFuture<'a, Result<Decision, DecisionError>> {
        self.request_decision(report).boxed()
    }
}
