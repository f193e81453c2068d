//! Hubspoke AWS Provider
//!
//! `NetworkProvider` implementation backed by the EC2 and IAM APIs

use async_trait::async_trait;
use aws_config::{Region, SdkConfig};
use aws_sdk_ec2::Client as Ec2Client;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_ec2::types::{
    ApplianceModeSupportValue, CreateTransitGatewayVpcAttachmentRequestOptions, Filter,
    ResourceType, Subnet, Tag, TagSpecification, Vpc,
};
use aws_sdk_iam::Client as IamClient;
use hubspoke_core::provider::{
    AttachmentRequest, NetworkProvider, ProviderError, ProviderResult, ResourceState,
    SubnetSummary, VpcSummary,
};

/// Role AWS creates for transit gateway attachments
pub const SERVICE_LINKED_ROLE_NAME: &str = "AWSServiceRoleForVPCTransitGateway";
const TRANSIT_GATEWAY_SERVICE: &str = "transitgateway.amazonaws.com";

/// AWS network provider
pub struct Ec2NetworkProvider {
    ec2_client: Ec2Client,
    iam_client: IamClient,
}

impl Ec2NetworkProvider {
    /// Create a provider from the default credential chain
    ///
    /// `region` overrides the region resolved from the environment.
    pub async fn new(region: Option<&str>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        let config = loader.load().await;
        Self::from_config(&config)
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            ec2_client: Ec2Client::new(config),
            iam_client: IamClient::new(config),
        }
    }

    fn name_tag(resource_type: ResourceType, name: &str) -> TagSpecification {
        TagSpecification::builder()
            .resource_type(resource_type)
            .tags(Tag::builder().key("Name").value(name).build())
            .build()
    }

    async fn role_exists(&self) -> ProviderResult<bool> {
        let mut marker: Option<String> = None;

        loop {
            let result = self
                .iam_client
                .list_roles()
                .path_prefix("/aws-service-role/")
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| sdk_error("Failed to list IAM roles", e))?;

            if result
                .roles()
                .iter()
                .any(|role| role.role_name() == SERVICE_LINKED_ROLE_NAME)
            {
                return Ok(true);
            }

            match result.marker() {
                Some(next) if result.is_truncated() => marker = Some(next.to_string()),
                _ => return Ok(false),
            }
        }
    }
}

#[async_trait]
impl NetworkProvider for Ec2NetworkProvider {
    // ========== Transit Gateway Attachment Operations ==========

    async fn create_vpc_attachment(&self, request: &AttachmentRequest) -> ProviderResult<String> {
        let mut req = self
            .ec2_client
            .create_transit_gateway_vpc_attachment()
            .transit_gateway_id(&request.transit_gateway_id)
            .vpc_id(&request.vpc_id)
            .set_subnet_ids(Some(request.subnet_ids.clone()))
            .tag_specifications(Self::name_tag(
                ResourceType::TransitGatewayAttachment,
                &request.name,
            ));

        if request.appliance_mode {
            req = req.options(
                CreateTransitGatewayVpcAttachmentRequestOptions::builder()
                    .appliance_mode_support(ApplianceModeSupportValue::Enable)
                    .build(),
            );
        }

        let result = req.send().await.map_err(|e| {
            sdk_error("Failed to create transit gateway attachment", e)
                .for_resource(request.vpc_id.clone())
        })?;

        result
            .transit_gateway_vpc_attachment()
            .and_then(|a| a.transit_gateway_attachment_id())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::new("Attachment created but no ID returned")
                    .for_resource(request.vpc_id.clone())
            })
    }

    async fn attachment_state(
        &self,
        attachment_id: &str,
    ) -> ProviderResult<Option<ResourceState>> {
        let result = self
            .ec2_client
            .describe_transit_gateway_vpc_attachments()
            .transit_gateway_attachment_ids(attachment_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .transit_gateway_vpc_attachments()
                .first()
                .and_then(|a| a.state())
                .map(|state| attachment_state_from_str(state.as_str()))),
            Err(e) if is_not_found(&e) => {
                log::debug!("Transit gateway attachment {} not found", attachment_id);
                Ok(None)
            }
            Err(e) => Err(sdk_error("Failed to describe transit gateway attachment", e)
                .for_resource(attachment_id)),
        }
    }

    // ========== Transit Gateway Route Table Operations ==========

    async fn create_route_table(
        &self,
        transit_gateway_id: &str,
        name: &str,
    ) -> ProviderResult<String> {
        let result = self
            .ec2_client
            .create_transit_gateway_route_table()
            .transit_gateway_id(transit_gateway_id)
            .tag_specifications(Self::name_tag(
                ResourceType::TransitGatewayRouteTable,
                name,
            ))
            .send()
            .await
            .map_err(|e| {
                sdk_error("Failed to create transit gateway route table", e)
                    .for_resource(transit_gateway_id)
            })?;

        result
            .transit_gateway_route_table()
            .and_then(|rt| rt.transit_gateway_route_table_id())
            .map(String::from)
            .ok_or_else(|| {
                ProviderError::new("Route table created but no ID returned")
                    .for_resource(transit_gateway_id)
            })
    }

    async fn route_table_state(
        &self,
        route_table_id: &str,
    ) -> ProviderResult<Option<ResourceState>> {
        let result = self
            .ec2_client
            .describe_transit_gateway_route_tables()
            .transit_gateway_route_table_ids(route_table_id)
            .send()
            .await;

        match result {
            Ok(output) => Ok(output
                .transit_gateway_route_tables()
                .first()
                .and_then(|rt| rt.state())
                .map(|state| route_table_state_from_str(state.as_str()))),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(sdk_error("Failed to describe transit gateway route table", e)
                .for_resource(route_table_id)),
        }
    }

    async fn create_transit_gateway_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        attachment_id: &str,
    ) -> ProviderResult<()> {
        self.ec2_client
            .create_transit_gateway_route()
            .transit_gateway_route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .transit_gateway_attachment_id(attachment_id)
            .send()
            .await
            .map_err(|e| {
                sdk_error("Failed to create transit gateway route", e).for_resource(route_table_id)
            })?;

        Ok(())
    }

    async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProviderResult<()> {
        self.ec2_client
            .enable_transit_gateway_route_table_propagation()
            .transit_gateway_route_table_id(route_table_id)
            .transit_gateway_attachment_id(attachment_id)
            .send()
            .await
            .map_err(|e| {
                sdk_error("Failed to enable route propagation", e).for_resource(attachment_id)
            })?;

        Ok(())
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProviderResult<()> {
        self.ec2_client
            .associate_transit_gateway_route_table()
            .transit_gateway_route_table_id(route_table_id)
            .transit_gateway_attachment_id(attachment_id)
            .send()
            .await
            .map_err(|e| {
                sdk_error("Failed to associate route table", e).for_resource(attachment_id)
            })?;

        Ok(())
    }

    // ========== VPC Discovery Operations ==========

    async fn describe_vpcs(&self) -> ProviderResult<Vec<VpcSummary>> {
        let mut vpcs = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let result = self
                .ec2_client
                .describe_vpcs()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("Failed to describe VPCs", e))?;

            vpcs.extend(result.vpcs().iter().filter_map(vpc_summary));

            match result.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => return Ok(vpcs),
            }
        }
    }

    async fn describe_subnets(&self, vpc_id: &str) -> ProviderResult<Vec<SubnetSummary>> {
        let filter = Filter::builder().name("vpc-id").values(vpc_id).build();
        let mut subnets = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let result = self
                .ec2_client
                .describe_subnets()
                .filters(filter.clone())
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error("Failed to describe subnets", e).for_resource(vpc_id))?;

            subnets.extend(result.subnets().iter().filter_map(subnet_summary));

            match result.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => return Ok(subnets),
            }
        }
    }

    // ========== VPC Route Table Operations ==========

    async fn find_main_route_table(&self, vpc_id: &str) -> ProviderResult<Option<String>> {
        let vpc_filter = Filter::builder().name("vpc-id").values(vpc_id).build();
        let main_filter = Filter::builder()
            .name("association.main")
            .values("true")
            .build();

        let result = self
            .ec2_client
            .describe_route_tables()
            .filters(vpc_filter)
            .filters(main_filter)
            .send()
            .await
            .map_err(|e| sdk_error("Failed to describe route tables", e).for_resource(vpc_id))?;

        Ok(result
            .route_tables()
            .first()
            .and_then(|rt| rt.route_table_id().map(String::from)))
    }

    async fn route_destinations(&self, route_table_id: &str) -> ProviderResult<Vec<String>> {
        let result = self
            .ec2_client
            .describe_route_tables()
            .route_table_ids(route_table_id)
            .send()
            .await
            .map_err(|e| {
                sdk_error("Failed to describe route table", e).for_resource(route_table_id)
            })?;

        Ok(result
            .route_tables()
            .first()
            .map(|rt| {
                rt.routes()
                    .iter()
                    .filter_map(|route| route.destination_cidr_block().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
    ) -> ProviderResult<()> {
        self.ec2_client
            .delete_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .send()
            .await
            .map_err(|e| sdk_error("Failed to delete route", e).for_resource(route_table_id))?;

        Ok(())
    }

    async fn create_route_to_transit_gateway(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        transit_gateway_id: &str,
    ) -> ProviderResult<()> {
        self.ec2_client
            .create_route()
            .route_table_id(route_table_id)
            .destination_cidr_block(destination_cidr)
            .transit_gateway_id(transit_gateway_id)
            .send()
            .await
            .map_err(|e| sdk_error("Failed to create route", e).for_resource(route_table_id))?;

        Ok(())
    }

    // ========== IAM Operations ==========

    async fn ensure_service_linked_role(&self) -> ProviderResult<bool> {
        if self.role_exists().await? {
            log::debug!("Service-linked role {} already exists", SERVICE_LINKED_ROLE_NAME);
            return Ok(false);
        }

        self.iam_client
            .create_service_linked_role()
            .aws_service_name(TRANSIT_GATEWAY_SERVICE)
            .send()
            .await
            .map_err(|e| {
                sdk_error("Failed to create service-linked role", e)
                    .for_resource(SERVICE_LINKED_ROLE_NAME)
            })?;

        log::info!("Created service-linked role {}", SERVICE_LINKED_ROLE_NAME);
        Ok(true)
    }
}

/// Build a ProviderError from an SDK error, keeping the service error chain
fn sdk_error<E>(context: &str, err: E) -> ProviderError
where
    E: std::error::Error + Send + Sync + 'static,
{
    ProviderError::new(format!("{}: {}", context, DisplayErrorContext(&err))).with_cause(err)
}

/// Check if an EC2 error is a "not found" error (e.g. InvalidTransitGatewayAttachmentID.NotFound)
fn is_not_found<E>(err: &SdkError<E>) -> bool
where
    E: ProvideErrorMetadata,
{
    err.code().is_some_and(|code| code.ends_with(".NotFound"))
}

/// Map a transit gateway attachment state to a waiter state
///
/// See `TransitGatewayAttachmentState`; anything not known to be terminal
/// counts as pending.
fn attachment_state_from_str(state: &str) -> ResourceState {
    match state {
        "available" => ResourceState::Available,
        "failed" | "failing" | "rejected" | "rejecting" | "deleted" | "deleting"
        | "rollingBack" => ResourceState::Unusable(state.to_string()),
        other => ResourceState::Pending(other.to_string()),
    }
}

/// Map a transit gateway route table state to a waiter state
fn route_table_state_from_str(state: &str) -> ResourceState {
    match state {
        "available" => ResourceState::Available,
        "deleted" | "deleting" => ResourceState::Unusable(state.to_string()),
        other => ResourceState::Pending(other.to_string()),
    }
}

fn vpc_summary(vpc: &Vpc) -> Option<VpcSummary> {
    Some(VpcSummary {
        vpc_id: vpc.vpc_id()?.to_string(),
        cidr_block: vpc.cidr_block().map(String::from),
        tags: vpc
            .tags()
            .iter()
            .map(|tag| {
                hubspoke_core::provider::Tag::new(
                    tag.key().unwrap_or_default(),
                    tag.value().unwrap_or_default(),
                )
            })
            .collect(),
    })
}

fn subnet_summary(subnet: &Subnet) -> Option<SubnetSummary> {
    Some(SubnetSummary {
        subnet_id: subnet.subnet_id()?.to_string(),
        availability_zone: subnet.availability_zone()?.to_string(),
    })
}
