//! Version-agnostic task and container records.
//!
//! [`MetadataBuilder`] turns container snapshots plus configuration into a
//! [`TaskMetadata`]. The v2 and v3 modules only reshape these records into
//! their JSON envelopes.

use chrono::{DateTime, TimeZone, Utc};
use ecs_local_common::{Settings, Tags, STATUS_RUNNING};
use std::collections::BTreeMap;
use tracing::{instrument, warn};

use crate::snapshot::ContainerSnapshot;

#[derive(Debug, Clone, PartialEq)]
pub struct TaskMetadata {
    pub cluster: String,
    pub task_arn: String,
    pub family: String,
    pub revision: String,
    pub desired_status: String,
    pub known_status: String,
    pub containers: Vec<ContainerMetadata>,
    pub task_tags: Tags,
    pub container_instance_tags: Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerMetadata {
    pub id: String,
    pub name: String,
    pub docker_name: String,
    pub image: String,
    pub image_id: String,
    pub desired_status: String,
    pub known_status: String,
    pub container_type: String,
    pub ports: Vec<PortRecord>,
    pub labels: BTreeMap<String, String>,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub networks: Vec<NetworkRecord>,
    pub volumes: Vec<VolumeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortRecord {
    pub container_port: u16,
    pub host_port: Option<u16>,
    pub protocol: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkRecord {
    pub network_mode: String,
    pub ipv4_addresses: Vec<String>,
    pub ipv6_addresses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VolumeRecord {
    pub docker_name: String,
    pub source: String,
    pub destination: String,
}

/// Builds metadata records, reading task identity from configuration on
/// every call.
#[derive(Debug, Clone)]
pub struct MetadataBuilder {
    settings: Settings,
}

impl MetadataBuilder {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    #[instrument(skip_all, fields(containers = containers.len()))]
    pub fn build_task_metadata(
        &self,
        containers: &[ContainerSnapshot],
        instance_tags: &Tags,
        task_tags: &Tags,
    ) -> TaskMetadata {
        TaskMetadata {
            cluster: self.settings.cluster(),
            task_arn: self.settings.task_arn(),
            family: self.settings.family(),
            revision: self.settings.revision(),
            desired_status: STATUS_RUNNING.to_string(),
            known_status: STATUS_RUNNING.to_string(),
            containers: containers
                .iter()
                .map(|container| self.build_container_metadata(container))
                .collect(),
            task_tags: task_tags.clone(),
            container_instance_tags: instance_tags.clone(),
        }
    }

    pub fn build_container_metadata(&self, container: &ContainerSnapshot) -> ContainerMetadata {
        let name = container.display_name();
        // The runtime only reports creation, so it doubles as the start time.
        let created_at = container.created.and_then(|secs| {
            let timestamp = Utc.timestamp_opt(secs, 0).single();
            if timestamp.is_none() {
                warn!("Container {} reported an invalid creation time: {secs}", container.id);
            }
            timestamp
        });

        ContainerMetadata {
            id: container.id.clone(),
            docker_name: name.clone(),
            name,
            image: container.image.clone(),
            image_id: container.image_id.clone(),
            desired_status: STATUS_RUNNING.to_string(),
            known_status: STATUS_RUNNING.to_string(),
            container_type: self.settings.container_type(),
            ports: container
                .ports
                .iter()
                .map(|port| PortRecord {
                    container_port: port.container_port,
                    host_port: port.host_port,
                    protocol: port.protocol.clone(),
                })
                .collect(),
            labels: container.labels.clone(),
            created_at,
            started_at: created_at,
            networks: container
                .networks
                .iter()
                .map(|network| NetworkRecord {
                    network_mode: network.name.clone(),
                    ipv4_addresses: network.ipv4_address.iter().cloned().collect(),
                    ipv6_addresses: network.ipv6_address.iter().cloned().collect(),
                })
                .collect(),
            volumes: container
                .mounts
                .iter()
                .map(|mount| VolumeRecord {
                    docker_name: mount.name.clone(),
                    source: mount.source.clone(),
                    destination: mount.destination.clone(),
                })
                .collect(),
        }
    }
}
