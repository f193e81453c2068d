//! Topology - Hub attachments, route tables and spoke wiring
//!
//! Each step returns a `ProvisionResult`; an ID only flows into the next call
//! once the step that produced it has succeeded and the resource is available.

use crate::discovery::remove_route_if_present;
use crate::error::{ProvisionError, ProvisionResult};
use crate::provider::{AttachmentRequest, NetworkProvider};
use crate::request::ResourceProperties;
use crate::resource::{
    DEFAULT_ROUTE_CIDR, HubTopology, INTERNET_ATTACHMENT_NAME, RouteTableRole,
    SECURITY_ATTACHMENT_NAME, SpokeNetwork, SpokeOutcome, SpokeResult,
};
use crate::wait::{WaitPolicy, wait_for_attachment, wait_for_route_table};

/// Issues topology calls against a provider
pub struct Topology<'a, P: ?Sized> {
    provider: &'a P,
    wait: WaitPolicy,
}

impl<'a, P> Topology<'a, P>
where
    P: NetworkProvider + ?Sized,
{
    pub fn new(provider: &'a P, wait: WaitPolicy) -> Self {
        Self { provider, wait }
    }

    /// Attach a VPC and wait until the attachment is available
    pub async fn create_attachment(&self, request: AttachmentRequest) -> ProvisionResult<String> {
        let step = format!("create attachment {} for {}", request.name, request.vpc_id);
        let attachment_id = self
            .provider
            .create_vpc_attachment(&request)
            .await
            .map_err(|e| ProvisionError::provider(step, e))?;

        log::info!(
            "Created transit gateway attachment {} for VPC {}",
            attachment_id,
            request.vpc_id
        );

        wait_for_attachment(self.provider, &attachment_id, self.wait).await?;
        Ok(attachment_id)
    }

    /// Attach one of the hub VPCs
    pub async fn create_hub_attachment(
        &self,
        transit_gateway_id: &str,
        vpc_id: &str,
        subnet_ids: &[String],
        appliance_mode: bool,
        name: &str,
    ) -> ProvisionResult<String> {
        self.create_attachment(AttachmentRequest {
            transit_gateway_id: transit_gateway_id.to_string(),
            vpc_id: vpc_id.to_string(),
            subnet_ids: subnet_ids.to_vec(),
            appliance_mode,
            name: name.to_string(),
        })
        .await
    }

    /// Create a transit gateway route table and wait until it is available
    pub async fn create_route_table(
        &self,
        transit_gateway_id: &str,
        name: &str,
    ) -> ProvisionResult<String> {
        let route_table_id = self
            .provider
            .create_route_table(transit_gateway_id, name)
            .await
            .map_err(|e| ProvisionError::provider(format!("create route table {}", name), e))?;

        log::info!("Created transit gateway route table {} ({})", name, route_table_id);

        wait_for_route_table(self.provider, &route_table_id, self.wait).await?;
        Ok(route_table_id)
    }

    pub async fn create_default_route(
        &self,
        route_table_id: &str,
        cidr: &str,
        attachment_id: &str,
    ) -> ProvisionResult<()> {
        self.provider
            .create_transit_gateway_route(route_table_id, cidr, attachment_id)
            .await
            .map_err(|e| {
                ProvisionError::provider(
                    format!("create route {} in {} via {}", cidr, route_table_id, attachment_id),
                    e,
                )
            })?;
        log::info!(
            "Created route {} in {} via {}",
            cidr,
            route_table_id,
            attachment_id
        );
        Ok(())
    }

    pub async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProvisionResult<()> {
        self.provider
            .enable_propagation(route_table_id, attachment_id)
            .await
            .map_err(|e| {
                ProvisionError::provider(
                    format!("enable propagation of {} into {}", attachment_id, route_table_id),
                    e,
                )
            })?;
        log::info!("Propagating {} into {}", attachment_id, route_table_id);
        Ok(())
    }

    pub async fn associate(&self, route_table_id: &str, attachment_id: &str) -> ProvisionResult<()> {
        self.provider
            .associate_route_table(route_table_id, attachment_id)
            .await
            .map_err(|e| {
                ProvisionError::provider(
                    format!("associate {} with {}", attachment_id, route_table_id),
                    e,
                )
            })?;
        log::info!("Associated {} with {}", attachment_id, route_table_id);
        Ok(())
    }

    /// Build the security and internet hubs and the two route tables
    ///
    /// Traffic entering through the ingress table goes to the security hub;
    /// inspected traffic leaving the security hub uses the egress table, which
    /// points at the internet hub.
    pub async fn build_hubs(&self, props: &ResourceProperties) -> ProvisionResult<HubTopology> {
        let tgw = &props.transit_gateway_id;

        let security_attachment_id = self
            .create_hub_attachment(
                tgw,
                &props.security_vpc_id,
                &props.security_subnets,
                true,
                SECURITY_ATTACHMENT_NAME,
            )
            .await?;
        let internet_attachment_id = self
            .create_hub_attachment(
                tgw,
                &props.internet_vpc_id,
                &props.internet_subnets,
                false,
                INTERNET_ATTACHMENT_NAME,
            )
            .await?;

        let egress_route_table_id = self
            .create_route_table(tgw, RouteTableRole::Egress.name())
            .await?;
        let ingress_route_table_id = self
            .create_route_table(tgw, RouteTableRole::Ingress.name())
            .await?;

        self.create_default_route(
            &ingress_route_table_id,
            DEFAULT_ROUTE_CIDR,
            &security_attachment_id,
        )
        .await?;
        self.enable_propagation(&egress_route_table_id, &internet_attachment_id)
            .await?;
        self.create_default_route(
            &egress_route_table_id,
            DEFAULT_ROUTE_CIDR,
            &internet_attachment_id,
        )
        .await?;

        self.associate(&egress_route_table_id, &security_attachment_id)
            .await?;
        self.associate(&ingress_route_table_id, &internet_attachment_id)
            .await?;

        Ok(HubTopology {
            security_attachment_id,
            internet_attachment_id,
            egress_route_table_id,
            ingress_route_table_id,
        })
    }

    async fn attach_spoke(
        &self,
        spoke: &SpokeNetwork,
        transit_gateway_id: &str,
        egress_route_table_id: &str,
        ingress_route_table_id: &str,
    ) -> ProvisionResult<String> {
        let attachment_id = self
            .create_attachment(AttachmentRequest {
                transit_gateway_id: transit_gateway_id.to_string(),
                vpc_id: spoke.vpc_id.clone(),
                subnet_ids: spoke.subnet_ids.clone(),
                appliance_mode: false,
                name: spoke.attachment_name(),
            })
            .await?;

        self.enable_propagation(egress_route_table_id, &attachment_id)
            .await?;
        self.associate(ingress_route_table_id, &attachment_id)
            .await?;

        log::info!(
            "Attached spoke VPC {} as {}; traffic is forced through the security VPC",
            spoke.vpc_id,
            attachment_id
        );
        Ok(attachment_id)
    }

    /// Attach every spoke that has subnets
    ///
    /// A failing spoke does not stop the others.
    pub async fn attach_spokes(
        &self,
        spokes: &[SpokeNetwork],
        transit_gateway_id: &str,
        egress_route_table_id: &str,
        ingress_route_table_id: &str,
    ) -> Vec<SpokeResult> {
        let mut results = Vec::with_capacity(spokes.len());

        for spoke in spokes {
            let outcome = if !spoke.is_attachable() {
                log::warn!("No subnets in VPC {}, unable to attach VPC", spoke.vpc_id);
                SpokeOutcome::Skipped {
                    reason: "no subnets".to_string(),
                }
            } else {
                match self
                    .attach_spoke(
                        spoke,
                        transit_gateway_id,
                        egress_route_table_id,
                        ingress_route_table_id,
                    )
                    .await
                {
                    Ok(attachment_id) => SpokeOutcome::Attached { attachment_id },
                    Err(e) => {
                        log::error!("Failed to attach spoke VPC {}: {}", spoke.vpc_id, e);
                        SpokeOutcome::Failed {
                            attachment_id: None,
                            error: e.to_string(),
                        }
                    }
                }
            };

            results.push(SpokeResult {
                spoke: spoke.clone(),
                outcome,
            });
        }

        results
    }

    /// Point `cidr` in a spoke's main route table at the transit gateway
    pub async fn rewrite_spoke_route(
        &self,
        spoke: &SpokeNetwork,
        transit_gateway_id: &str,
        cidr: &str,
    ) -> ProvisionResult<()> {
        let route_table_id =
            spoke
                .main_route_table_id
                .as_deref()
                .ok_or_else(|| ProvisionError::NotFound {
                    kind: "main route table of",
                    id: spoke.vpc_id.clone(),
                })?;

        remove_route_if_present(self.provider, route_table_id, cidr).await?;

        self.provider
            .create_route_to_transit_gateway(route_table_id, cidr, transit_gateway_id)
            .await
            .map_err(|e| {
                ProvisionError::provider(
                    format!("create route {} in {} via {}", cidr, route_table_id, transit_gateway_id),
                    e,
                )
            })?;

        log::info!(
            "Created route to {} for {} with a destination of {}",
            cidr,
            route_table_id,
            transit_gateway_id
        );
        Ok(())
    }

    /// Rewrite the main route table of every attached spoke
    ///
    /// Spokes that were skipped or failed to attach keep their routes. A
    /// failed rewrite turns the spoke's outcome into a failure. Returns the
    /// number of route tables rewritten.
    pub async fn rewrite_spoke_routes(
        &self,
        results: &mut [SpokeResult],
        transit_gateway_id: &str,
        cidr: &str,
    ) -> usize {
        let mut rewritten = 0;

        for result in results.iter_mut() {
            if !result.spoke.is_attachable() || !result.is_attached() {
                continue;
            }
            match self
                .rewrite_spoke_route(&result.spoke, transit_gateway_id, cidr)
                .await
            {
                Ok(()) => rewritten += 1,
                Err(e) => {
                    log::error!(
                        "Failed to route {} for spoke VPC {}: {}",
                        cidr,
                        result.spoke.vpc_id,
                        e
                    );
                    result.outcome = SpokeOutcome::Failed {
                        attachment_id: result.attachment_id().map(String::from),
                        error: e.to_string(),
                    };
                }
            }
        }

        rewritten
    }
}
