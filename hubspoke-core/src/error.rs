//! Error types for the provisioning sequence

use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors that stop a provisioning step
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The request envelope could not be interpreted
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A control plane call failed
    #[error("{step} failed: {source}")]
    Provider {
        step: String,
        #[source]
        source: ProviderError,
    },

    /// A resource did not become available in time
    #[error("Timed out after {}s waiting for {kind} {id} to become available", .waited.as_secs())]
    Timeout {
        kind: &'static str,
        id: String,
        waited: Duration,
    },

    /// A resource reached a state it cannot recover from
    #[error("{kind} {id} entered state '{state}'")]
    ResourceFailed {
        kind: &'static str,
        id: String,
        state: String,
    },

    /// A resource disappeared while waiting for it
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },
}

impl ProvisionError {
    /// Wrap a provider error with the step that issued the call
    pub fn provider(step: impl Into<String>, source: ProviderError) -> Self {
        Self::Provider {
            step: step.into(),
            source,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

/// Result type for provisioning steps
pub type ProvisionResult<T> = Result<T, ProvisionError>;
