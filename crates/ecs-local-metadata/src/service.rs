use ecs_local_common::{EndpointError, Result, Settings};
use futures::future::join_all;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use crate::record::{ContainerMetadata, MetadataBuilder, TaskMetadata};
use crate::runtime::ContainerRuntime;
use crate::snapshot::ContainerSnapshot;

/// Answers metadata queries from a fresh runtime listing on every call.
#[derive(Clone)]
pub struct MetadataService {
    runtime: Arc<dyn ContainerRuntime>,
    builder: MetadataBuilder,
    settings: Settings,
}

impl MetadataService {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, settings: Settings) -> Self {
        Self {
            runtime,
            builder: MetadataBuilder::new(settings.clone()),
            settings,
        }
    }

    /// Verifies the runtime is reachable before any request is served.
    pub async fn check_runtime(&self) -> Result<()> {
        self.runtime.ping().await?;
        debug!("Container runtime is reachable");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn task_metadata(&self) -> Result<TaskMetadata> {
        let containers = self.runtime.list_containers().await?;
        let instance_tags = self.settings.container_instance_tags();
        let task_tags = self.settings.task_tags();

        Ok(self
            .builder
            .build_task_metadata(&containers, &instance_tags, &task_tags))
    }

    /// Metadata for the container whose id, id prefix or name is `identifier`.
    #[instrument(skip(self))]
    pub async fn container_metadata(&self, identifier: &str) -> Result<ContainerMetadata> {
        let containers = self.runtime.list_containers().await?;
        let container = find_container(&containers, identifier)
            .ok_or_else(|| EndpointError::NotFound(format!("container {identifier}")))?;

        Ok(self.builder.build_container_metadata(container))
    }

    /// Metadata for the container that owns `address` on one of its networks.
    /// This is how a bare `/v3` request identifies its caller.
    #[instrument(skip(self))]
    pub async fn container_by_address(&self, address: IpAddr) -> Result<ContainerMetadata> {
        let containers = self.runtime.list_containers().await?;
        let address = address.to_canonical().to_string();
        let container = containers
            .iter()
            .find(|container| container.has_address(&address))
            .ok_or_else(|| EndpointError::NotFound(format!("container with address {address}")))?;

        debug!("Request from {address} resolved to container {}", container.id);
        Ok(self.builder.build_container_metadata(container))
    }

    /// Stats for every running container, keyed by container id. A container
    /// whose sample fails (typically one that exited after the listing) is
    /// left out rather than failing the whole document.
    #[instrument(skip(self))]
    pub async fn task_stats(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        let containers = self.runtime.list_containers().await?;
        let samples = join_all(
            containers
                .iter()
                .map(|container| self.runtime.container_stats(&container.id)),
        )
        .await;

        Ok(containers
            .into_iter()
            .zip(samples)
            .filter_map(|(container, sample)| match sample {
                Ok(sample) => Some((container.id, sample)),
                Err(e) => {
                    warn!("Skipping stats for container {}: {e}", container.id);
                    None
                }
            })
            .collect())
    }

    #[instrument(skip(self))]
    pub async fn container_stats(&self, identifier: &str) -> Result<serde_json::Value> {
        let containers = self.runtime.list_containers().await?;
        let container = find_container(&containers, identifier)
            .ok_or_else(|| EndpointError::NotFound(format!("container {identifier}")))?;

        Ok(self.runtime.container_stats(&container.id).await?)
    }
}

/// Exact id or name wins over an id prefix; ties go to runtime order.
fn find_container<'a>(
    containers: &'a [ContainerSnapshot],
    identifier: &str,
) -> Option<&'a ContainerSnapshot> {
    if identifier.is_empty() {
        return None;
    }
    containers
        .iter()
        .find(|c| c.id == identifier || c.has_name(identifier))
        .or_else(|| containers.iter().find(|c| c.id.starts_with(identifier)))
}
