//! Spoke discovery - find tagged VPCs and prepare them for attachment

use std::collections::HashSet;

use crate::error::{ProvisionError, ProvisionResult};
use crate::provider::{NetworkProvider, SubnetSummary, VpcSummary};
use crate::resource::SpokeNetwork;

/// VPCs carrying any tag whose value equals one of `tag_values`
///
/// The tag key is ignored. Each VPC is returned once, at the position of its
/// first match (tag-value order first, then VPC order).
pub fn match_tagged_vpcs<'a>(vpcs: &'a [VpcSummary], tag_values: &[String]) -> Vec<&'a VpcSummary> {
    let mut seen = HashSet::new();
    let mut matched = Vec::new();

    for wanted in tag_values {
        for vpc in vpcs {
            if vpc.tags.iter().any(|tag| &tag.value == wanted) && seen.insert(vpc.vpc_id.as_str()) {
                matched.push(vpc);
            }
        }
    }

    matched
}

/// Keep the first subnet seen in each availability zone
pub fn one_subnet_per_zone(subnets: &[SubnetSummary]) -> Vec<String> {
    let mut zones = HashSet::new();
    subnets
        .iter()
        .filter(|s| zones.insert(s.availability_zone.as_str()))
        .map(|s| s.subnet_id.clone())
        .collect()
}

/// Delete the route for `cidr` from a VPC route table if one exists
///
/// Returns true if a route was removed.
pub async fn remove_route_if_present<P>(
    provider: &P,
    route_table_id: &str,
    cidr: &str,
) -> ProvisionResult<bool>
where
    P: NetworkProvider + ?Sized,
{
    let destinations = provider
        .route_destinations(route_table_id)
        .await
        .map_err(|e| ProvisionError::provider(format!("describe routes of {}", route_table_id), e))?;

    if !destinations.iter().any(|d| d == cidr) {
        return Ok(false);
    }

    provider
        .delete_route(route_table_id, cidr)
        .await
        .map_err(|e| {
            ProvisionError::provider(format!("delete route {} from {}", cidr, route_table_id), e)
        })?;
    log::info!("Deleted existing route {} from {}", cidr, route_table_id);
    Ok(true)
}

/// Discover spoke VPCs by tag value
///
/// For every match the subnets are reduced to one per availability zone and
/// any route for `cidr` is cleared from the main route table, ahead of the
/// rewrite toward the transit gateway. VPCs listed in `hub_vpc_ids` are never
/// treated as spokes, even when tagged. `account` and `region` identify the
/// scope the provider was built for and are only logged.
pub async fn discover_spokes<P>(
    provider: &P,
    account: &str,
    region: &str,
    tag_values: &[String],
    hub_vpc_ids: &[&str],
    cidr: &str,
) -> ProvisionResult<Vec<SpokeNetwork>>
where
    P: NetworkProvider + ?Sized,
{
    log::info!(
        "Discovering spoke VPCs in {}/{} tagged with {:?}",
        account,
        region,
        tag_values
    );

    let vpcs = provider
        .describe_vpcs()
        .await
        .map_err(|e| ProvisionError::provider("describe VPCs", e))?;

    let mut spokes = Vec::new();
    for vpc in match_tagged_vpcs(&vpcs, tag_values) {
        if hub_vpc_ids.contains(&vpc.vpc_id.as_str()) {
            log::warn!("Hub VPC {} carries a spoke tag, skipping it", vpc.vpc_id);
            continue;
        }

        let subnets = provider
            .describe_subnets(&vpc.vpc_id)
            .await
            .map_err(|e| ProvisionError::provider(format!("describe subnets of {}", vpc.vpc_id), e))?;
        let subnet_ids = one_subnet_per_zone(&subnets);

        let main_route_table_id = provider
            .find_main_route_table(&vpc.vpc_id)
            .await
            .map_err(|e| {
                ProvisionError::provider(format!("find main route table of {}", vpc.vpc_id), e)
            })?;

        match &main_route_table_id {
            Some(rt_id) => {
                remove_route_if_present(provider, rt_id, cidr).await?;
            }
            None => log::warn!("VPC {} has no main route table", vpc.vpc_id),
        }

        log::info!(
            "Found spoke VPC {} with subnets {:?}",
            vpc.vpc_id,
            subnet_ids
        );

        spokes.push(SpokeNetwork {
            vpc_id: vpc.vpc_id.clone(),
            subnet_ids,
            main_route_table_id,
            cidr_block: vpc.cidr_block.clone(),
        });
    }

    Ok(spokes)
}
