//! Error types for the progressive page generation pipeline.
//!
//! Nothing in the pipeline itself is fatal: stream failures are folded into per-entity
//! or planner status. These errors surface from the edges (provider transport, payload
//! decoding, configuration) and from the blocking helpers on [`crate::pipeline::PageView`].

use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Invalid stream payload: {0}")]
    InvalidPayload(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timed out after {0:?} waiting for the pipeline to settle")]
    Timeout(Duration),

    #[error("No async runtime available: {0}")]
    RuntimeUnavailable(String),
}

impl From<config::ConfigError> for PipelineError {
    fn from(err: config::ConfigError) -> Self {
        PipelineError::ConfigError(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::InvalidPayload(err.to_string())
    }
}
