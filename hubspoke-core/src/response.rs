//! Response sent back to CloudFormation through the pre-signed URL

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::request::RequestEnvelope;

/// Terminal status of an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Body of the callback PUT
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallbackResponse {
    #[serde(rename = "Status")]
    pub status: ResponseStatus,
    #[serde(rename = "Reason")]
    pub reason: String,
    #[serde(rename = "PhysicalResourceId")]
    pub physical_resource_id: String,
    #[serde(rename = "StackId")]
    pub stack_id: String,
    #[serde(rename = "RequestId")]
    pub request_id: String,
    #[serde(rename = "LogicalResourceId")]
    pub logical_resource_id: String,
    #[serde(rename = "NoEcho")]
    pub no_echo: bool,
    #[serde(rename = "Data")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl CallbackResponse {
    /// Build a response for `envelope`
    ///
    /// Without an explicit reason the response points at the log stream; the
    /// physical ID is carried over from the request when CloudFormation sent
    /// one, otherwise the log stream name is used.
    pub fn for_request(
        envelope: &RequestEnvelope,
        status: ResponseStatus,
        reason: Option<String>,
        log_stream: &str,
    ) -> Self {
        Self {
            status,
            reason: reason.unwrap_or_else(|| {
                format!("See the details in CloudWatch Log Stream: {}", log_stream)
            }),
            physical_resource_id: envelope
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| log_stream.to_string()),
            stack_id: envelope.stack_id.clone(),
            request_id: envelope.request_id.clone(),
            logical_resource_id: envelope.logical_resource_id.clone(),
            no_echo: false,
            data: serde_json::Map::new(),
        }
    }

    pub fn with_data(mut self, data: serde_json::Map<String, serde_json::Value>) -> Self {
        self.data = data;
        self
    }

    /// JSON body as sent on the wire
    pub fn to_body(&self) -> Result<String, ResponseError> {
        serde_json::to_string(self).map_err(|e| ResponseError::Serialization(e.to_string()))
    }
}

/// Errors delivering a callback
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Callback rejected with HTTP status {0}")]
    Rejected(u16),
}

/// Delivers a callback to the orchestration framework
#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send(&self, url: &str, response: &CallbackResponse) -> Result<(), ResponseError>;
}
