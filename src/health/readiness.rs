//! Startup readiness probing.
//!
//! # Responsibilities
//! - Probe the backend's `version` endpoint
//! - Block startup until a probe succeeds or the attempt budget runs out

use std::time::Duration;

use thiserror::Error;
use tokio::time;

use crate::config::ReadinessConfig;
use crate::http::forward::Forwarder;

/// Endpoint used to decide whether the engine is up.
pub const PROBE_PATH: &str = "version";

#[derive(Debug, Error)]
pub enum ReadinessError {
    #[error("engine did not become ready after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Polls the backend until it answers.
pub struct ReadinessProber {
    forwarder: Forwarder,
    config: ReadinessConfig,
}

impl ReadinessProber {
    pub fn new(forwarder: Forwarder, config: ReadinessConfig) -> Self {
        Self { forwarder, config }
    }

    /// Single probe, no retry. True when the backend answered at all.
    ///
    /// Any HTTP status counts: an engine that rejects `version` is still up.
    pub async fn probe_once(&self) -> bool {
        let timeout = Duration::from_millis(self.config.probe_timeout_ms);

        match time::timeout(timeout, self.forwarder.get(PROBE_PATH)).await {
            Ok(Ok(response)) => {
                if !response.status().is_success() {
                    tracing::debug!(status = %response.status(), "Readiness probe: non-success status");
                }
                true
            }
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Readiness probe: connection error");
                false
            }
            Err(_) => {
                tracing::debug!("Readiness probe: timeout");
                false
            }
        }
    }

    /// Probe until the backend answers, sleeping `interval_ms` between failures.
    pub async fn wait_ready(&self) -> Result<u32, ReadinessError> {
        let interval = Duration::from_millis(self.config.interval_ms);
        let max_attempts = self.config.max_attempts;

        tracing::info!(
            backend = %self.forwarder.authority(),
            max_attempts,
            "Waiting for engine"
        );

        for attempt in 1..=max_attempts {
            if self.probe_once().await {
                tracing::info!(attempt, "Engine is ready");
                return Ok(attempt);
            }
            if attempt < max_attempts {
                time::sleep(interval).await;
            }
        }

        Err(ReadinessError::Exhausted {
            attempts: max_attempts,
        })
    }
}
