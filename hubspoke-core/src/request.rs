//! CloudFormation custom resource request envelope

use serde::Deserialize;

use crate::error::{ProvisionError, ProvisionResult};

/// Lifecycle event CloudFormation is asking the handler to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

impl RequestType {
    /// Parse the raw `RequestType` field; unknown values yield `None`
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Create" => Some(Self::Create),
            "Update" => Some(Self::Update),
            "Delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One custom resource invocation
#[derive(Debug, Clone, Deserialize)]
pub struct RequestEnvelope {
    #[serde(rename = "RequestType")]
    pub request_type: String,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    #[serde(rename = "StackId")]
    pub stack_id: String,
    #[serde(rename = "RequestId")]
    pub request_id: String,
    #[serde(rename = "LogicalResourceId")]
    pub logical_resource_id: String,
    /// Present on Update and Delete
    #[serde(rename = "PhysicalResourceId", default)]
    pub physical_resource_id: Option<String>,
    /// Kept raw so Delete and unknown request types never fail on them
    #[serde(rename = "ResourceProperties", default)]
    pub resource_properties: serde_json::Value,
}

impl RequestEnvelope {
    pub fn kind(&self) -> Option<RequestType> {
        RequestType::parse(&self.request_type)
    }

    /// Decode the provisioning properties
    pub fn properties(&self) -> ProvisionResult<ResourceProperties> {
        serde_json::from_value(self.resource_properties.clone())
            .map_err(|e| ProvisionError::invalid_request(format!("ResourceProperties: {}", e)))
    }
}

/// Properties supplied by the template
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceProperties {
    #[serde(rename = "Account")]
    pub account: String,
    #[serde(rename = "Region")]
    pub region: String,
    /// Comma-separated tag values identifying spoke VPCs
    #[serde(rename = "Vpc_Tags")]
    pub vpc_tags: String,
    /// Destination routed from spokes through the transit gateway
    #[serde(rename = "CIDR")]
    pub cidr: String,
    #[serde(rename = "tgw_id")]
    pub transit_gateway_id: String,
    #[serde(rename = "sec_vpc_id")]
    pub security_vpc_id: String,
    #[serde(rename = "inet_vpc_id")]
    pub internet_vpc_id: String,
    #[serde(rename = "sec_subnets")]
    pub security_subnets: Vec<String>,
    #[serde(rename = "inet_subnets")]
    pub internet_subnets: Vec<String>,
}

impl ResourceProperties {
    pub fn tag_values(&self) -> Vec<String> {
        parse_tag_values(&self.vpc_tags)
    }
}

/// Split a comma-separated tag list, dropping all whitespace and empty entries
pub fn parse_tag_values(raw: &str) -> Vec<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    compact
        .split(',')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
