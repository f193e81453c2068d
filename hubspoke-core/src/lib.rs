//! Hubspoke Core
//!
//! Builds a hub-and-spoke transit gateway topology in response to a
//! CloudFormation custom resource request.
//!
//! # Overview
//!
//! - **Handler**: turns one request envelope into provider calls and exactly
//!   one callback to CloudFormation
//! - **NetworkProvider**: the control plane calls the handler needs
//! - **Topology**: hub attachments, route tables, spoke attachment and routing
//! - **discovery**: finds spoke VPCs by tag value
//!
//! # Example
//!
//! ```ignore
//! use hubspoke_core::{Handler, RequestEnvelope, Settings};
//!
//! let handler = Handler::new(provider, Settings::from_env()?);
//! let envelope: RequestEnvelope = serde_json::from_value(event)?;
//! let response = handler.handle(&envelope, &sender, &log_stream).await;
//! ```

pub mod config;
pub mod discovery;
pub mod error;
pub mod handler;
pub mod provider;
pub mod request;
pub mod resource;
pub mod response;
pub mod topology;
pub mod wait;

#[cfg(test)]
pub(crate) mod fake;

pub use config::{ConfigError, LogLevel, Settings};
pub use error::{ProvisionError, ProvisionResult};
pub use handler::Handler;
pub use provider::{NetworkProvider, ProviderError, ProviderResult};
pub use request::{RequestEnvelope, RequestType, ResourceProperties};
pub use response::{CallbackResponse, ResponseError, ResponseSender, ResponseStatus};
