//! Handler - One custom resource invocation from request to callback

use crate::config::Settings;
use crate::discovery::discover_spokes;
use crate::error::{ProvisionError, ProvisionResult};
use crate::provider::NetworkProvider;
use crate::request::{RequestEnvelope, RequestType};
use crate::resource::ProvisioningReport;
use crate::response::{CallbackResponse, ResponseSender, ResponseStatus};
use crate::topology::Topology;

/// Provisioning handler, built once per process
pub struct Handler<P> {
    provider: P,
    settings: Settings,
}

impl<P> Handler<P>
where
    P: NetworkProvider,
{
    pub fn new(provider: P, settings: Settings) -> Self {
        Self { provider, settings }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Handle one request and report the outcome through `sender`
    ///
    /// Always sends exactly one callback. Delivery failures are logged and do
    /// not change the returned response.
    pub async fn handle(
        &self,
        envelope: &RequestEnvelope,
        sender: &dyn ResponseSender,
        log_stream: &str,
    ) -> CallbackResponse {
        log::info!(
            "Received {} request {} for {}",
            envelope.request_type,
            envelope.request_id,
            envelope.logical_resource_id
        );

        let response = match envelope.kind() {
            Some(RequestType::Create) | Some(RequestType::Update) => {
                match self.provision(envelope).await {
                    Ok(report) => {
                        let failures = report.failures();
                        let response = if failures.is_empty() {
                            log::info!(
                                "Provisioned topology, {} spoke route table(s) rewritten",
                                report.routes_rewritten
                            );
                            CallbackResponse::for_request(
                                envelope,
                                ResponseStatus::Success,
                                None,
                                log_stream,
                            )
                        } else {
                            let reason = failures
                                .iter()
                                .map(|(vpc, error)| format!("{}: {}", vpc, error))
                                .collect::<Vec<_>>()
                                .join("; ");
                            CallbackResponse::for_request(
                                envelope,
                                ResponseStatus::Failed,
                                Some(format!(
                                    "{} spoke VPC(s) failed: {}",
                                    failures.len(),
                                    reason
                                )),
                                log_stream,
                            )
                        };
                        response.with_data(report.to_data())
                    }
                    Err(e) => {
                        log::error!("Provisioning failed: {}", e);
                        CallbackResponse::for_request(
                            envelope,
                            ResponseStatus::Failed,
                            Some(e.to_string()),
                            log_stream,
                        )
                    }
                }
            }
            Some(RequestType::Delete) => {
                log::info!("Delete leaves the transit gateway topology in place");
                CallbackResponse::for_request(envelope, ResponseStatus::Success, None, log_stream)
            }
            None => {
                log::error!("Unsupported request type: {}", envelope.request_type);
                CallbackResponse::for_request(
                    envelope,
                    ResponseStatus::Failed,
                    Some(format!("Unsupported request type: {}", envelope.request_type)),
                    log_stream,
                )
            }
        };

        if let Err(e) = sender.send(&envelope.response_url, &response).await {
            log::error!("Failed to deliver callback to CloudFormation: {}", e);
        }

        response
    }

    /// Run the Create/Update sequence
    pub async fn provision(&self, envelope: &RequestEnvelope) -> ProvisionResult<ProvisioningReport> {
        let props = envelope.properties()?;
        let tag_values = props.tag_values();
        if tag_values.is_empty() {
            log::warn!("Vpc_Tags is empty; no spoke VPCs will be attached");
        }

        if self.settings.ensure_service_linked_role {
            let created = self
                .provider
                .ensure_service_linked_role()
                .await
                .map_err(|e| ProvisionError::provider("ensure service-linked role", e))?;
            if created {
                log::info!("Created the transit gateway service-linked role");
            }
        }

        let topology = Topology::new(&self.provider, self.settings.wait);
        let hubs = topology.build_hubs(&props).await?;

        let spokes = discover_spokes(
            &self.provider,
            &props.account,
            &props.region,
            &tag_values,
            &[props.security_vpc_id.as_str(), props.internet_vpc_id.as_str()],
            &props.cidr,
        )
        .await?;

        let mut results = topology
            .attach_spokes(
                &spokes,
                &props.transit_gateway_id,
                &hubs.egress_route_table_id,
                &hubs.ingress_route_table_id,
            )
            .await;
        let routes_rewritten = topology
            .rewrite_spoke_routes(&mut results, &props.transit_gateway_id, &props.cidr)
            .await;

        Ok(ProvisioningReport {
            hubs,
            spokes: results,
            routes_rewritten,
        })
    }
}
