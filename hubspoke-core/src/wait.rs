//! Wait for transit gateway resources to become usable

use std::time::Duration;

use tokio::time::Instant;

use crate::error::{ProvisionError, ProvisionResult};
use crate::provider::{NetworkProvider, ProviderResult, ResourceState};

/// How often and how long to poll a resource's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl WaitPolicy {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Block until an attachment is available
pub async fn wait_for_attachment<P>(
    provider: &P,
    attachment_id: &str,
    policy: WaitPolicy,
) -> ProvisionResult<()>
where
    P: NetworkProvider + ?Sized,
{
    wait_until_available("attachment", attachment_id, policy, move || {
        provider.attachment_state(attachment_id)
    })
    .await
}

/// Block until a transit gateway route table is available
pub async fn wait_for_route_table<P>(
    provider: &P,
    route_table_id: &str,
    policy: WaitPolicy,
) -> ProvisionResult<()>
where
    P: NetworkProvider + ?Sized,
{
    wait_until_available("route table", route_table_id, policy, move || {
        provider.route_table_state(route_table_id)
    })
    .await
}

async fn wait_until_available<F, Fut>(
    kind: &'static str,
    id: &str,
    policy: WaitPolicy,
    mut poll: F,
) -> ProvisionResult<()>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = ProviderResult<Option<ResourceState>>>,
{
    let started = Instant::now();
    let mut missing;

    loop {
        let state = poll()
            .await
            .map_err(|e| ProvisionError::provider(format!("describe {} {}", kind, id), e))?;

        match state {
            Some(ResourceState::Available) => {
                log::info!(
                    "{} {} available after {}s",
                    kind,
                    id,
                    started.elapsed().as_secs()
                );
                return Ok(());
            }
            Some(ResourceState::Unusable(state)) => {
                return Err(ProvisionError::ResourceFailed {
                    kind,
                    id: id.to_string(),
                    state,
                });
            }
            Some(ResourceState::Pending(state)) => {
                log::info!("{} {} is {}, waiting", kind, id, state);
                missing = false;
            }
            // Describe calls are eventually consistent; a new resource may not be listed yet
            None => {
                log::info!("{} {} not visible yet, waiting", kind, id);
                missing = true;
            }
        }

        let elapsed = started.elapsed();
        if elapsed + policy.interval > policy.timeout {
            if missing {
                return Err(ProvisionError::NotFound {
                    kind,
                    id: id.to_string(),
                });
            }
            return Err(ProvisionError::Timeout {
                kind,
                id: id.to_string(),
                waited: elapsed,
            });
        }
        tokio::time::sleep(policy.interval).await;
    }
}
