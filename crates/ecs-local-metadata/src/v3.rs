//! Task metadata endpoint version 3 response shapes.
//!
//! v3 shares the v2 envelope but reports both address families per network,
//! and only includes tags when they were explicitly asked for.

use chrono::{DateTime, Utc};
use ecs_local_common::Tags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::{ContainerMetadata, TaskMetadata};
use crate::v2::{LimitsResponse, PortResponse, VolumeResponse};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TaskResponse {
    pub cluster: String,
    #[serde(rename = "TaskARN")]
    pub task_arn: String,
    pub family: String,
    pub revision: String,
    pub desired_status: String,
    pub known_status: String,
    pub containers: Vec<ContainerResponse>,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub task_tags: Tags,
    #[serde(default, skip_serializing_if = "Tags::is_empty")]
    pub container_instance_tags: Tags,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerResponse {
    #[serde(rename = "DockerId")]
    pub id: String,
    pub name: String,
    pub docker_name: String,
    pub image: String,
    #[serde(rename = "ImageID")]
    pub image_id: String,
    pub ports: Vec<PortResponse>,
    pub labels: BTreeMap<String, String>,
    pub desired_status: String,
    pub known_status: String,
    pub limits: LimitsResponse,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "Type")]
    pub container_type: String,
    pub networks: Vec<NetworkResponse>,
    pub volumes: Vec<VolumeResponse>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkResponse {
    #[serde(rename = "NetworkMode")]
    pub network_mode: String,
    #[serde(rename = "IPv4Addresses")]
    pub ipv4_addresses: Vec<String>,
    #[serde(rename = "IPv6Addresses")]
    pub ipv6_addresses: Vec<String>,
}

impl From<&ContainerMetadata> for ContainerResponse {
    fn from(container: &ContainerMetadata) -> Self {
        Self {
            id: container.id.clone(),
            name: container.name.clone(),
            docker_name: container.docker_name.clone(),
            image: container.image.clone(),
            image_id: container.image_id.clone(),
            ports: container.ports.iter().map(PortResponse::from).collect(),
            labels: container.labels.clone(),
            desired_status: container.desired_status.clone(),
            known_status: container.known_status.clone(),
            limits: LimitsResponse::default(),
            created_at: container.created_at,
            started_at: container.started_at,
            container_type: container.container_type.clone(),
            networks: container
                .networks
                .iter()
                .map(|network| NetworkResponse {
                    network_mode: network.network_mode.clone(),
                    ipv4_addresses: network.ipv4_addresses.clone(),
                    ipv6_addresses: network.ipv6_addresses.clone(),
                })
                .collect(),
            volumes: container.volumes.iter().map(VolumeResponse::from).collect(),
        }
    }
}

impl TaskResponse {
    /// The `task` document: tags are left out even when configured.
    pub fn without_tags(task: &TaskMetadata) -> Self {
        Self {
            task_tags: Tags::new(),
            container_instance_tags: Tags::new(),
            ..Self::with_tags(task)
        }
    }

    /// The `taskWithTags` document.
    pub fn with_tags(task: &TaskMetadata) -> Self {
        Self {
            cluster: task.cluster.clone(),
            task_arn: task.task_arn.clone(),
            family: task.family.clone(),
            revision: task.revision.clone(),
            desired_status: task.desired_status.clone(),
            known_status: task.known_status.clone(),
            containers: task.containers.iter().map(ContainerResponse::from).collect(),
            task_tags: task.task_tags.clone(),
            container_instance_tags: task.container_instance_tags.clone(),
        }
    }
}
