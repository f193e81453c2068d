//! HTTP delivery of custom resource callbacks

use async_trait::async_trait;
use hubspoke_core::response::{CallbackResponse, ResponseError, ResponseSender};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

/// Sends callbacks with an HTTP PUT to the pre-signed response URL
pub struct HttpResponseSender {
    client: Client,
}

impl HttpResponseSender {
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpResponseSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSender for HttpResponseSender {
    async fn send(&self, url: &str, response: &CallbackResponse) -> Result<(), ResponseError> {
        let body = response.to_body()?;
        log::debug!("Callback body: {}", body);

        // The pre-signed URL is computed without a content type. reqwest sets
        // content-length from the body.
        let result = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .body(body)
            .send()
            .await
            .map_err(|e| ResponseError::Transport(e.to_string()))?;

        let status = result.status();
        if !status.is_success() {
            return Err(ResponseError::Rejected(status.as_u16()));
        }

        log::info!(
            "Sent {:?} callback for {} (HTTP {})",
            response.status,
            response.logical_resource_id,
            status.as_u16()
        );
        Ok(())
    }
}
