//! Task metadata endpoint version 2 response shapes.

use chrono::{DateTime, Utc};
use ecs_local_common::Tags;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::record::{ContainerMetadata, PortRecord, TaskMetadata, VolumeRecord};

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
#[serde(rename_all = "PascalCase")]
pub struct PortResponse {
    pub container_port: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeResponse {
    pub docker_name: String,
    pub source: String,
    pub destination: String,
}

/// Resource limits. Local containers carry no task-level limits, so both
/// fields are always absent and this serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LimitsResponse {
    #[serde(rename = "CPU", default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    #[serde(rename = "Memory", default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkResponse {
    #[serde(rename = "NetworkMode")]
    pub network_mode: String,
    #[serde(rename = "IPv4Addresses")]
    pub ipv4_addresses: Vec<String>,
}

impl From<&PortRecord> for PortResponse {
    fn from(port: &PortRecord) -> Self {
        Self {
            container_port: port.container_port,
            protocol: port.protocol.clone(),
            host_port: port.host_port,
        }
    }
}

impl From<&VolumeRecord> for VolumeResponse {
    fn from(volume: &VolumeRecord) -> Self {
        Self {
            docker_name: volume.docker_name.clone(),
            source: volume.source.clone(),
            destination: volume.destination.clone(),
        }
    }
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
                })
                .collect(),
            volumes: container.volumes.iter().map(VolumeResponse::from).collect(),
        }
    }
}

impl From<&TaskMetadata> for TaskResponse {
    fn from(task: &TaskMetadata) -> Self {
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

impl TaskResponse {
    /// `/v2/metadata` never carries tags; only `metadataWithTags` does.
    pub fn without_tags(task: &TaskMetadata) -> Self {
        Self {
            task_tags: Tags::new(),
            container_instance_tags: Tags::new(),
            ..Self::from(task)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NetworkRecord;
    use chrono::TimeZone;
    use serde_json::json;

    fn container() -> ContainerMetadata {
        let created = Utc.timestamp_opt(1552368275, 0).unwrap();
        ContainerMetadata {
            id: "c3439823c17d".to_string(),
            name: "shell".to_string(),
            docker_name: "shell".to_string(),
            image: "ecs-local-metadata_shell".to_string(),
            image_id: "sha256:11edcbc4".to_string(),
            desired_status: "RUNNING".to_string(),
            known_status: "RUNNING".to_string(),
            container_type: "NORMAL".to_string(),
            ports: vec![PortRecord {
                container_port: 80,
                host_port: Some(8000),
                protocol: "tcp".to_string(),
            }],
            labels: BTreeMap::new(),
            created_at: Some(created),
            started_at: Some(created),
            networks: vec![NetworkRecord {
                network_mode: "bridge".to_string(),
                ipv4_addresses: vec!["172.17.0.2".to_string()],
                ipv6_addresses: vec!["2001:db8::2".to_string()],
            }],
            volumes: vec![],
        }
    }

    #[test]
    fn test_container_json_shape() {
        let value = serde_json::to_value(ContainerResponse::from(&container())).unwrap();

        assert_eq!(
            value,
            json!({
                "DockerId": "c3439823c17d",
                "Name": "shell",
                "DockerName": "shell",
                "Image": "ecs-local-metadata_shell",
                "ImageID": "sha256:11edcbc4",
                "Ports": [{"ContainerPort": 80, "Protocol": "tcp", "HostPort": 8000}],
                "Labels": {},
                "DesiredStatus": "RUNNING",
                "KnownStatus": "RUNNING",
                "Limits": {},
                "CreatedAt": "2019-03-12T05:24:35Z",
                "StartedAt": "2019-03-12T05:24:35Z",
                "Type": "NORMAL",
                "Networks": [{"NetworkMode": "bridge", "IPv4Addresses": ["172.17.0.2"]}],
                "Volumes": []
            })
        );
    }

    #[test]
    fn test_tags_omitted_when_empty() {
        let task = TaskMetadata {
            cluster: "ecs-local-cluster".to_string(),
            task_arn: "arn".to_string(),
            family: "family".to_string(),
            revision: "1".to_string(),
            desired_status: "RUNNING".to_string(),
            known_status: "RUNNING".to_string(),
            containers: vec![],
            task_tags: Tags::new(),
            container_instance_tags: Tags::from([("env".to_string(), "dev".to_string())]),
        };

        let value = serde_json::to_value(TaskResponse::from(&task)).unwrap();
        let object = value.as_object().unwrap();

        assert!(!object.contains_key("TaskTags"));
        assert_eq!(value["ContainerInstanceTags"]["env"], "dev");
        assert_eq!(value["Containers"], json!([]));
        assert_eq!(value["TaskARN"], "arn");

        let value = serde_json::to_value(TaskResponse::without_tags(&task)).unwrap();
        assert!(value.get("ContainerInstanceTags").is_none());
        assert_eq!(value["Cluster"], "ecs-local-cluster");
    }
}
