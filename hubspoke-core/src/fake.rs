//! In-memory network used by the unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::provider::{
    AttachmentRequest, NetworkProvider, ProviderError, ProviderResult, ResourceState,
    SubnetSummary, Tag, VpcSummary,
};
use crate::response::{CallbackResponse, ResponseError, ResponseSender};

#[derive(Default)]
struct FakeState {
    vpcs: Vec<VpcSummary>,
    subnets: HashMap<String, Vec<SubnetSummary>>,
    main_route_tables: HashMap<String, String>,
    /// VPC route table -> (destination, target)
    routes: HashMap<String, Vec<(String, String)>>,
    attachments: HashMap<String, AttachmentRequest>,
    /// transit gateway route table -> name
    route_tables: HashMap<String, String>,
    polls: HashMap<String, usize>,
    mutations: Vec<String>,
    next_id: usize,
    role_exists: bool,
}

/// Fake control plane with call recording and fault injection
#[derive(Default)]
pub(crate) struct FakeNetwork {
    state: Mutex<FakeState>,
    pending_polls: usize,
    unusable_state: Option<String>,
    failing: HashSet<&'static str>,
    failing_vpcs: HashSet<String>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut FakeState {
        self.state.get_mut().unwrap()
    }

    pub fn with_vpc(mut self, vpc_id: &str, tags: &[(&str, &str)]) -> Self {
        self.state_mut().vpcs.push(VpcSummary {
            vpc_id: vpc_id.to_string(),
            cidr_block: Some("10.0.0.0/16".to_string()),
            tags: tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect(),
        });
        self
    }

    pub fn with_subnet(mut self, vpc_id: &str, subnet_id: &str, az: &str) -> Self {
        self.state_mut()
            .subnets
            .entry(vpc_id.to_string())
            .or_default()
            .push(SubnetSummary {
                subnet_id: subnet_id.to_string(),
                availability_zone: az.to_string(),
            });
        self
    }

    pub fn with_main_route_table(
        mut self,
        vpc_id: &str,
        route_table_id: &str,
        routes: &[(&str, &str)],
    ) -> Self {
        let state = self.state_mut();
        state
            .main_route_tables
            .insert(vpc_id.to_string(), route_table_id.to_string());
        state.routes.insert(
            route_table_id.to_string(),
            routes
                .iter()
                .map(|(d, t)| (d.to_string(), t.to_string()))
                .collect(),
        );
        self
    }

    /// Report "pending" for the first `polls` state queries of each resource
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// Report every attachment in a terminal `state`
    pub fn with_unusable_attachments(mut self, state: &str) -> Self {
        self.unusable_state = Some(state.to_string());
        self
    }

    pub fn with_service_linked_role(mut self) -> Self {
        self.state_mut().role_exists = true;
        self
    }

    /// Fail every call to `operation`
    pub fn failing_on(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Fail attachment creation for one VPC only
    pub fn failing_attachment_for(mut self, vpc_id: &str) -> Self {
        self.failing_vpcs.insert(vpc_id.to_string());
        self
    }

    /// Mutating calls in issue order
    pub fn mutations(&self) -> Vec<String> {
        self.state.lock().unwrap().mutations.clone()
    }

    pub fn routes(&self, route_table_id: &str) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .routes
            .get(route_table_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn attachment(&self, attachment_id: &str) -> Option<AttachmentRequest> {
        self.state
            .lock()
            .unwrap()
            .attachments
            .get(attachment_id)
            .cloned()
    }

    pub fn state_polls(&self, id: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(id)
            .copied()
            .unwrap_or(0)
    }

    fn check(&self, operation: &'static str, resource: &str) -> ProviderResult<()> {
        if self.failing.contains(operation) {
            Err(ProviderError::new(format!("{} failed", operation)).for_resource(resource))
        } else {
            Ok(())
        }
    }

    fn poll(&self, id: &str, exists: bool, unusable: Option<&String>) -> Option<ResourceState> {
        let mut state = self.state.lock().unwrap();
        if !exists {
            return None;
        }
        let polls = state.polls.entry(id.to_string()).or_insert(0);
        *polls += 1;
        if let Some(terminal) = unusable {
            Some(ResourceState::Unusable(terminal.clone()))
        } else if *polls <= self.pending_polls {
            Some(ResourceState::Pending("pending".to_string()))
        } else {
            Some(ResourceState::Available)
        }
    }

    fn require_pair(&self, route_table_id: &str, attachment_id: &str) -> ProviderResult<()> {
        let state = self.state.lock().unwrap();
        if !state.route_tables.contains_key(route_table_id) {
            return Err(ProviderError::new("InvalidRouteTableID.NotFound").for_resource(route_table_id));
        }
        if !state.attachments.contains_key(attachment_id) {
            return Err(ProviderError::new("InvalidTransitGatewayAttachmentID.NotFound")
                .for_resource(attachment_id));
        }
        Ok(())
    }
}

#[async_trait]
impl NetworkProvider for FakeNetwork {
    async fn create_vpc_attachment(&self, request: &AttachmentRequest) -> ProviderResult<String> {
        self.check("create_vpc_attachment", &request.vpc_id)?;
        if self.failing_vpcs.contains(&request.vpc_id) {
            return Err(ProviderError::new("DuplicateTransitGatewayAttachment")
                .for_resource(request.vpc_id.clone()));
        }
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("tgw-attach-{}", state.next_id);
        state.attachments.insert(id.clone(), request.clone());
        state
            .mutations
            .push(format!("create_vpc_attachment {}", request.vpc_id));
        Ok(id)
    }

    async fn attachment_state(
        &self,
        attachment_id: &str,
    ) -> ProviderResult<Option<ResourceState>> {
        self.check("attachment_state", attachment_id)?;
        let exists = self
            .state
            .lock()
            .unwrap()
            .attachments
            .contains_key(attachment_id);
        Ok(self.poll(attachment_id, exists, self.unusable_state.as_ref()))
    }

    async fn create_route_table(
        &self,
        transit_gateway_id: &str,
        name: &str,
    ) -> ProviderResult<String> {
        self.check("create_route_table", transit_gateway_id)?;
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("tgw-rtb-{}", state.next_id);
        state.route_tables.insert(id.clone(), name.to_string());
        state.mutations.push(format!("create_route_table {}", name));
        Ok(id)
    }

    async fn route_table_state(
        &self,
        route_table_id: &str,
    ) -> ProviderResult<Option<ResourceState>> {
        self.check("route_table_state", route_table_id)?;
        let exists = self
            .state
            .lock()
            .unwrap()
            .route_tables
            .contains_key(route_table_id);
        Ok(self.poll(route_table_id, exists, None))
    }

    async fn create_transit_gateway_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        attachment_id: &str,
    ) -> ProviderResult<()> {
        self.check("create_transit_gateway_route", route_table_id)?;
        self.require_pair(route_table_id, attachment_id)?;
        self.state.lock().unwrap().mutations.push(format!(
            "create_transit_gateway_route {} {} {}",
            route_table_id, destination_cidr, attachment_id
        ));
        Ok(())
    }

    async fn enable_propagation(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProviderResult<()> {
        self.check("enable_propagation", route_table_id)?;
        self.require_pair(route_table_id, attachment_id)?;
        self.state
            .lock()
            .unwrap()
            .mutations
            .push(format!("enable_propagation {} {}", route_table_id, attachment_id));
        Ok(())
    }

    async fn associate_route_table(
        &self,
        route_table_id: &str,
        attachment_id: &str,
    ) -> ProviderResult<()> {
        self.check("associate_route_table", route_table_id)?;
        self.require_pair(route_table_id, attachment_id)?;
        self.state
            .lock()
            .unwrap()
            .mutations
            .push(format!("associate_route_table {} {}", route_table_id, attachment_id));
        Ok(())
    }

    async fn describe_vpcs(&self) -> ProviderResult<Vec<VpcSummary>> {
        self.check("describe_vpcs", "vpcs")?;
        Ok(self.state.lock().unwrap().vpcs.clone())
    }

    async fn describe_subnets(&self, vpc_id: &str) -> ProviderResult<Vec<SubnetSummary>> {
        self.check("describe_subnets", vpc_id)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .subnets
            .get(vpc_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_main_route_table(&self, vpc_id: &str) -> ProviderResult<Option<String>> {
        self.check("find_main_route_table", vpc_id)?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .main_route_tables
            .get(vpc_id)
            .cloned())
    }

    async fn route_destinations(&self, route_table_id: &str) -> ProviderResult<Vec<String>> {
        self.check("route_destinations", route_table_id)?;
        Ok(self
            .routes(route_table_id)
            .into_iter()
            .map(|(destination, _)| destination)
            .collect())
    }

    async fn delete_route(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
    ) -> ProviderResult<()> {
        self.check("delete_route", route_table_id)?;
        let mut state = self.state.lock().unwrap();
        let routes = state.routes.entry(route_table_id.to_string()).or_default();
        let before = routes.len();
        routes.retain(|(d, _)| d != destination_cidr);
        if routes.len() == before {
            return Err(ProviderError::new("InvalidRoute.NotFound").for_resource(route_table_id));
        }
        state
            .mutations
            .push(format!("delete_route {} {}", route_table_id, destination_cidr));
        Ok(())
    }

    async fn create_route_to_transit_gateway(
        &self,
        route_table_id: &str,
        destination_cidr: &str,
        transit_gateway_id: &str,
    ) -> ProviderResult<()> {
        self.check("create_route_to_transit_gateway", route_table_id)?;
        let mut state = self.state.lock().unwrap();
        let routes = state.routes.entry(route_table_id.to_string()).or_default();
        if routes.iter().any(|(d, _)| d == destination_cidr) {
            return Err(ProviderError::new("RouteAlreadyExists").for_resource(route_table_id));
        }
        routes.push((destination_cidr.to_string(), transit_gateway_id.to_string()));
        state.mutations.push(format!(
            "create_route {} {} {}",
            route_table_id, destination_cidr, transit_gateway_id
        ));
        Ok(())
    }

    async fn ensure_service_linked_role(&self) -> ProviderResult<bool> {
        self.check("ensure_service_linked_role", "AWSServiceRoleForVPCTransitGateway")?;
        let mut state = self.state.lock().unwrap();
        if state.role_exists {
            return Ok(false);
        }
        state.role_exists = true;
        state
            .mutations
            .push("create_service_linked_role".to_string());
        Ok(true)
    }
}

/// Sender that keeps every callback instead of delivering it
#[derive(Default)]
pub(crate) struct RecordingSender {
    sent: Mutex<Vec<(String, CallbackResponse)>>,
    fail: bool,
}

impl RecordingSender {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, CallbackResponse)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponseSender for RecordingSender {
    async fn send(&self, url: &str, response: &CallbackResponse) -> Result<(), ResponseError> {
        self.sent
            .lock()
            .unwrap()
            .push((url.to_string(), response.clone()));
        if self.fail {
            Err(ResponseError::Transport("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}
