//! Hubspoke Lambda - custom resource entry point

mod callback;
mod logging;

use std::sync::Arc;

use hubspoke_core::config::{LogLevel, Settings};
use hubspoke_core::{Handler, RequestEnvelope};
use hubspoke_provider_aws::Ec2NetworkProvider;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::Value;

use crate::callback::HttpResponseSender;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init(LogLevel::Error, &[]);
            log::error!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };
    logging::init(settings.log_level, &settings.notices);

    let provider = Ec2NetworkProvider::new(None).await;
    let handler = Arc::new(Handler::new(provider, settings));
    let sender = Arc::new(HttpResponseSender::new());

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        let sender = Arc::clone(&sender);
        async move { invoke(&handler, sender.as_ref(), event).await }
    }))
    .await
}

async fn invoke(
    handler: &Handler<Ec2NetworkProvider>,
    sender: &HttpResponseSender,
    event: LambdaEvent<Value>,
) -> Result<Value, Error> {
    let (payload, context) = event.into_parts();

    let envelope: RequestEnvelope = serde_json::from_value(payload).map_err(|e| {
        log::error!("Malformed custom resource request: {}", e);
        e
    })?;

    let response = handler
        .handle(&envelope, sender, &context.env_config.log_stream)
        .await;

    Ok(serde_json::to_value(&response)?)
}
