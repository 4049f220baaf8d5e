//! Outbound webhook client.
//!
//! One fire-and-forget POST per submission: JSON body, no auth, no retries.
//! The transport's default timeout applies; nothing is configured explicitly.

use crate::model::{SubmissionPayload, WorkflowConfig};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use thiserror::Error;

/// Why a submission did not succeed. Presentation layers collapse both cases
/// into the same `Error` status and retry hint.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The request failed before a response was obtained (DNS, connect,
    /// timeout, TLS).
    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The webhook answered outside the 2xx range.
    #[error("webhook rejected submission: HTTP {0}")]
    Rejected(StatusCode),
    /// The submission task died before yielding a result.
    #[error("submission interrupted before a response was obtained")]
    Interrupted,
}

/// Thin wrapper around a configured `reqwest::Client` bound to one endpoint.
#[derive(Debug, Clone)]
pub struct SubmissionClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SubmissionClient {
    pub fn new(cfg: &WorkflowConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send one submission. Success iff the webhook answers 2xx; the response
    /// body is never read.
    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<(), SubmissionError> {
        let resp = self.http.post(&self.endpoint).json(payload).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(SubmissionError::Rejected(resp.status()))
        }
    }
}

/// Client environment string sent as `deviceInfo` on claim submissions, the
/// closest terminal equivalent of a browser user-agent.
pub fn device_info() -> String {
    format!(
        "{}/{} ({} {})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}

/// User-agent header for the webhook calls.
pub fn user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_info_names_crate_and_platform() {
        let info = device_info();
        assert!(info.starts_with("chasse-tresor-cli/"));
        assert!(info.contains(std::env::consts::OS));
    }

    #[test]
    fn rejected_error_displays_status() {
        let err = SubmissionError::Rejected(StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().contains("500"));
    }
}
