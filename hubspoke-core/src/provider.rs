//! Provider - Trait abstracting the network control plane
//!
//! A NetworkProvider exposes the handful of transit-gateway and VPC calls the
//! provisioning sequence needs. The AWS implementation lives in
//! `hubspoke-provider-aws`; tests use an in-memory fake.

use async_trait::async_trait;

/// Error type for Provider operations
#[derive(Debug)]
pub struct ProviderError {
    pub message: String,
    /// Remote identifier the call was about (e.g., vpc-xxx, tgw-attach-xxx)
    pub resource_id: Option<String>,
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.resource_id {
            write!(f, "[{}] {}", id, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ProviderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause
            .as_ref()
            .map(|e| e.as_ref() as &dyn std::error::Error)
    }
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            resource_id: None,
            cause: None,
        }
    }

    pub fn for_resource(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn with_cause(mut self, cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// Parameters for a transit gateway VPC attachment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRequest {
    pub transit_gateway_id: String,
    pub vpc_id: String,
    pub subnet_ids: Vec<String>,
    /// Keep flows symmetric through one AZ (inspection appliances)
    pub appliance_mode: bool,
    /// Value of the Name tag
    pub name: String,
}

/// Lifecycle state of an attachment or transit gateway route table,
/// collapsed to what the waiter needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceState {
    Available,
    Pending(String),
    /// Terminal state that will never become available (failed, rejected, deleted...)
    Unusable(String),
}

/// Key/value tag on a VPC
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// VPC as returned by a describe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpcSummary {
    pub vpc_id: String,
    pub cidr_block: Option<String>,
    pub tags: Vec<Tag>,
}

/// Subnet as returned by a describe call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetSummary {
    pub subnet_id: String,
    pub availability_zone: String,
}

/// Main Provider trait
///
/// All operations are async and involve remote side effects. Implementations
/// return errors rather than sentinel values; callers decide whether a failure
/// aborts the sequence.
#[async_trait]
pub trait NetworkProvider: Send + Sync {
    /// Create a transit gateway VPC attachment and return its attachment ID
    async fn create_vpc_attachment(&self, request: &AttachmentRequest) -> ProviderResult<String>;

    /// Current state of an attachment, `None` if it does not exist
    async fn attachment_state(&self, attachment_id: &str)
    -> ProviderResult<Option<ResourceState>>;

    /// Create a transit gateway route table tagged with `name`
    async fn create_route_table(
        &self,
        transit_gateway_id: &str,
        name: &str,
    ) -> ProviderResult<String>;

    /// Current state of a transit gateway route table, `None` if it does not exist
    async fn route_table_state(
        &self,
        route_table_id: &str,
    ) -> ProviderResult<Option<ResourceState>>;

    /// Add a static route to a transit gateway route table
    async fn create_transit_gateway_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        attachment_id: &str,
    ) -> ProviderResult<()>;

    /// Propagate an attachment's routes into a transit gateway route table
    async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProviderResult<()>;

    /// Associate an attachment with a transit gateway route table
    async fn associate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProviderResult<()>;

    /// All VPCs visible to the caller
    async fn describe_vpcs(&self) -> ProviderResult<Vec<VpcSummary>>;

    /// Subnets of a VPC, in the order the control plane returns them
    async fn describe_subnets(&self, vpc_id: &str) -> ProviderResult<Vec<SubnetSummary>>;

    /// ID of the VPC's main route table
    async fn find_main_route_table(&self, vpc_id: &str) -> ProviderResult<Option<String>>;

    /// Destination CIDR blocks currently routed by a VPC route table
    async fn route_destinations(&self, route_table_id: &str) -> ProviderResult<Vec<String>>;

    /// Delete a VPC route
    async fn delete_route(&self, route_table_id: &str, destination_cidr: &str)
    -> ProviderResult<()>;

    /// Create a VPC route targeting a transit gateway
    async fn create_route_to_transit_gateway(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        transit_gateway_id: &str,
    ) -> ProviderResult<()>;

    /// Make sure the transit gateway service-linked role exists
    ///
    /// Returns true if the role had to be created.
    async fn ensure_service_linked_role(&self) -> ProviderResult<bool>;
}
