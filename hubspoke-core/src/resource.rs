//! Resource - The topology pieces created or discovered during one invocation

use serde_json::{Map, Value};

/// Name tags and fixed destinations of the hub topology
pub const SECURITY_ATTACHMENT_NAME: &str = "SecurityVPCAttachment";
pub const INTERNET_ATTACHMENT_NAME: &str = "InternetVPCAttachment";
pub const DEFAULT_ROUTE_CIDR: &str = "0.0.0.0/0";

/// Role of a transit gateway route table in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteTableRole {
    /// Associated with the security hub; sends inspected traffic to the internet hub
    Egress,
    /// Associated with the internet hub and spokes; sends everything to inspection
    Ingress,
}

impl RouteTableRole {
    /// Name tag of the route table
    pub fn name(&self) -> &'static str {
        match self {
            Self::Egress => "tgw-egress",
            Self::Ingress => "tgw-ingress",
        }
    }
}

/// Spoke VPC found by tag, ready to be attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokeNetwork {
    pub vpc_id: String,
    /// At most one subnet per availability zone, in discovery order
    pub subnet_ids: Vec<String>,
    pub main_route_table_id: Option<String>,
    pub cidr_block: Option<String>,
}

impl SpokeNetwork {
    /// A spoke needs at least one subnet to be attached
    pub fn is_attachable(&self) -> bool {
        !self.subnet_ids.is_empty()
    }

    /// Name tag for the spoke's attachment
    pub fn attachment_name(&self) -> String {
        format!("{}Attachment", self.vpc_id)
    }
}

/// IDs created for the two hubs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubTopology {
    pub security_attachment_id: String,
    pub internet_attachment_id: String,
    pub egress_route_table_id: String,
    pub ingress_route_table_id: String,
}

/// What happened to one spoke
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpokeOutcome {
    Attached { attachment_id: String },
    Skipped { reason: String },
    /// `attachment_id` is set when the attachment exists but a later step failed
    Failed {
        attachment_id: Option<String>,
        error: String,
    },
}

/// A spoke together with its outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpokeResult {
    pub spoke: SpokeNetwork,
    pub outcome: SpokeOutcome,
}

impl SpokeResult {
    pub fn is_attached(&self) -> bool {
        matches!(self.outcome, SpokeOutcome::Attached { .. })
    }

    /// Transit gateway attachment created for this spoke, if any
    pub fn attachment_id(&self) -> Option<&str> {
        match &self.outcome {
            SpokeOutcome::Attached { attachment_id } => Some(attachment_id.as_str()),
            SpokeOutcome::Failed {
                attachment_id: Some(attachment_id),
                ..
            } => Some(attachment_id.as_str()),
            _ => None,
        }
    }
}

/// Summary of a Create/Update invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningReport {
    pub hubs: HubTopology,
    pub spokes: Vec<SpokeResult>,
    pub routes_rewritten: usize,
}

impl ProvisioningReport {
    /// Spokes whose attachment or route rewrite failed
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.spokes
            .iter()
            .filter_map(|r| match &r.outcome {
                SpokeOutcome::Failed { error, .. } => Some((r.spoke.vpc_id.as_str(), error.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Attribute map returned to the stack (readable with Fn::GetAtt)
    ///
    /// Spoke lists are parallel and include every spoke that has an
    /// attachment, even when a later step for it failed.
    pub fn to_data(&self) -> Map<String, Value> {
        let (vpc_ids, attachment_ids): (Vec<&str>, Vec<&str>) = self
            .spokes
            .iter()
            .filter_map(|r| r.attachment_id().map(|id| (r.spoke.vpc_id.as_str(), id)))
            .unzip();

        let mut data = Map::new();
        data.insert(
            "SecurityAttachmentId".to_string(),
            Value::String(self.hubs.security_attachment_id.clone()),
        );
        data.insert(
            "InternetAttachmentId".to_string(),
            Value::String(self.hubs.internet_attachment_id.clone()),
        );
        data.insert(
            "EgressRouteTableId".to_string(),
            Value::String(self.hubs.egress_route_table_id.clone()),
        );
        data.insert(
            "IngressRouteTableId".to_string(),
            Value::String(self.hubs.ingress_route_table_id.clone()),
        );
        data.insert(
            "SpokeVpcIds".to_string(),
            Value::String(vpc_ids.join(",")),
        );
        data.insert(
            "SpokeAttachmentIds".to_string(),
            Value::String(attachment_ids.join(",")),
        );
        data
    }
}
