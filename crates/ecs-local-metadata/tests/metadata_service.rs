//! Metadata service behaviour against a scripted container runtime.

use async_trait::async_trait;
use bollard::errors::Error as BollardError;
use ecs_local_common::config::{defaults, keys};
use ecs_local_common::{EndpointError, MapConfig, Settings};
use ecs_local_metadata::runtime::{ContainerRuntime, Result as RuntimeResult, RuntimeError};
use ecs_local_metadata::snapshot::{NetworkAttachment, PortMapping, VolumeMount};
use ecs_local_metadata::{v2, v3, ContainerSnapshot, MetadataService};
use serde_json::json;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Runtime that replays a fixed container list, or fails every query.
struct MockRuntime {
    containers: Vec<ContainerSnapshot>,
    fail: bool,
    list_calls: AtomicUsize,
}

impl MockRuntime {
    fn with_containers(containers: Vec<ContainerSnapshot>) -> Self {
        Self {
            containers,
            fail: false,
            list_calls: AtomicUsize::new(0),
        }
    }

    fn failing() -> Self {
        Self {
            containers: vec![],
            fail: true,
            list_calls: AtomicUsize::new(0),
        }
    }
}

fn daemon_error() -> BollardError {
    BollardError::DockerResponseServerError {
        status_code: 500,
        message: "daemon is restarting".to_string(),
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn ping(&self) -> RuntimeResult<()> {
        if self.fail {
            return Err(RuntimeError::ConnectFailed(daemon_error()));
        }
        Ok(())
    }

    async fn list_containers(&self) -> RuntimeResult<Vec<ContainerSnapshot>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(RuntimeError::ListFailed(daemon_error()));
        }
        Ok(self.containers.clone())
    }

    async fn container_stats(&self, id: &str) -> RuntimeResult<serde_json::Value> {
        // Containers named "exited" disappear between listing and sampling.
        let exited = self
            .containers
            .iter()
            .any(|container| container.id == id && container.has_name("exited"));
        if exited {
            return Err(RuntimeError::NoStats(id.to_string()));
        }
        Ok(json!({ "id": id, "num_procs": 1 }))
    }
}

fn shell_container() -> ContainerSnapshot {
    ContainerSnapshot {
        id: "c3439823c17dc7a35c7e272b7dc51cb2dcdedcef428242fcd0f5473d2c724d0".to_string(),
        names: vec!["/ecs-local-metadata_shell_1".to_string()],
        image: "ecs-local-metadata_shell".to_string(),
        image_id: "sha256:11edcbc416845013254cbab0726bb65abcc6eea1981254a888659381a630aa20"
            .to_string(),
        ports: vec![PortMapping {
            container_port: 80,
            host_port: Some(8000),
            protocol: "tcp".to_string(),
        }],
        labels: BTreeMap::from([
            ("com.docker.compose.oneoff".to_string(), "False".to_string()),
            ("com.docker.compose.project".to_string(), "ecs-local-metadata".to_string()),
            ("com.docker.compose.service".to_string(), "ecs-local".to_string()),
        ]),
        created: Some(1552368275),
        networks: vec![NetworkAttachment {
            name: "bridge".to_string(),
            ipv4_address: Some("172.17.0.2".to_string()),
            ipv6_address: None,
        }],
        mounts: vec![VolumeMount {
            name: "volume0".to_string(),
            source: "/var/run".to_string(),
            destination: "/run".to_string(),
        }],
    }
}

fn bare_container() -> ContainerSnapshot {
    ContainerSnapshot {
        id: "9f86d081884c7d659a2feaa0c55ad015".to_string(),
        names: vec!["/sidecar".to_string()],
        image: "busybox".to_string(),
        ..Default::default()
    }
}

fn service(runtime: MockRuntime, config: MapConfig) -> MetadataService {
    MetadataService::new(Arc::new(runtime), Settings::new(Arc::new(config)))
}

#[tokio::test]
async fn test_task_metadata_matches_agent_shape() {
    let config = MapConfig::new()
        .with(keys::TASK_TAGS, "task=tags")
        .with(keys::CONTAINER_INSTANCE_TAGS, "containerInstance=tags");
    let service = service(MockRuntime::with_containers(vec![shell_container()]), config);

    let task = service.task_metadata().await.unwrap();
    let value = serde_json::to_value(v2::TaskResponse::from(&task)).unwrap();

    assert_eq!(value["Cluster"], defaults::CLUSTER_NAME);
    assert_eq!(value["TaskARN"], defaults::TASK_ARN);
    assert_eq!(value["Family"], defaults::TASK_DEFINITION_FAMILY);
    assert_eq!(value["Revision"], defaults::TASK_DEFINITION_REVISION);
    assert_eq!(value["DesiredStatus"], "RUNNING");
    assert_eq!(value["KnownStatus"], "RUNNING");
    assert_eq!(value["TaskTags"], json!({"task": "tags"}));
    assert_eq!(value["ContainerInstanceTags"], json!({"containerInstance": "tags"}));

    let container = &value["Containers"][0];
    assert_eq!(container["Name"], "ecs-local-metadata_shell_1");
    assert_eq!(container["DockerName"], "ecs-local-metadata_shell_1");
    assert_eq!(container["Type"], "NORMAL");
    assert_eq!(
        container["Ports"],
        json!([{"ContainerPort": 80, "Protocol": "tcp", "HostPort": 8000}])
    );
    assert_eq!(container["CreatedAt"], "2019-03-12T05:24:35Z");
    assert_eq!(container["StartedAt"], container["CreatedAt"]);
    assert_eq!(
        container["Networks"],
        json!([{"NetworkMode": "bridge", "IPv4Addresses": ["172.17.0.2"]}])
    );
    assert_eq!(
        container["Volumes"],
        json!([{"DockerName": "volume0", "Source": "/var/run", "Destination": "/run"}])
    );
    assert_eq!(container["Labels"]["com.docker.compose.service"], "ecs-local");
}

#[tokio::test]
async fn test_task_metadata_is_deterministic() {
    let service = service(
        MockRuntime::with_containers(vec![shell_container(), bare_container()]),
        MapConfig::new().with(keys::TASK_TAGS, "b=2,a=1,c=3"),
    );

    let first = serde_json::to_string(&v2::TaskResponse::from(&service.task_metadata().await.unwrap())).unwrap();
    let second = serde_json::to_string(&v2::TaskResponse::from(&service.task_metadata().await.unwrap())).unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_runtime_is_queried_per_request() {
    let runtime = Arc::new(MockRuntime::with_containers(vec![shell_container()]));
    let service = MetadataService::new(runtime.clone(), Settings::new(Arc::new(MapConfig::new())));

    service.task_metadata().await.unwrap();
    service.task_metadata().await.unwrap();

    assert_eq!(runtime.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_empty_fields_are_lists() {
    let service = service(MockRuntime::with_containers(vec![bare_container()]), MapConfig::new());

    let task = service.task_metadata().await.unwrap();
    let value = serde_json::to_value(v3::TaskResponse::with_tags(&task)).unwrap();
    let container = &value["Containers"][0];

    assert_eq!(container["Ports"], json!([]));
    assert_eq!(container["Networks"], json!([]));
    assert_eq!(container["Volumes"], json!([]));
    assert!(value.get("TaskTags").is_none());
}

#[tokio::test]
async fn test_container_lookup() {
    let service = service(
        MockRuntime::with_containers(vec![shell_container(), bare_container()]),
        MapConfig::new(),
    );

    let by_name = service.container_metadata("sidecar").await.unwrap();
    assert_eq!(by_name.id, "9f86d081884c7d659a2feaa0c55ad015");

    let by_prefix = service.container_metadata("c3439823c17d").await.unwrap();
    assert_eq!(by_prefix.name, "ecs-local-metadata_shell_1");

    let missing = service.container_metadata("nope").await;
    assert!(matches!(missing, Err(EndpointError::NotFound(_))));
}

#[tokio::test]
async fn test_container_by_address() {
    let service = service(
        MockRuntime::with_containers(vec![bare_container(), shell_container()]),
        MapConfig::new(),
    );

    let caller = service
        .container_by_address(IpAddr::V4(Ipv4Addr::new(172, 17, 0, 2)))
        .await
        .unwrap();
    assert_eq!(caller.name, "ecs-local-metadata_shell_1");

    let stranger = service
        .container_by_address(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9)))
        .await;
    assert!(matches!(stranger, Err(EndpointError::NotFound(_))));
}

#[tokio::test]
async fn test_runtime_failure_fails_whole_request() {
    let service = service(MockRuntime::failing(), MapConfig::new());

    assert!(matches!(service.task_metadata().await, Err(EndpointError::Runtime(_))));
    assert!(matches!(service.check_runtime().await, Err(EndpointError::Runtime(_))));
}

#[tokio::test]
async fn test_task_stats_keyed_by_id() {
    let service = service(
        MockRuntime::with_containers(vec![shell_container(), bare_container()]),
        MapConfig::new(),
    );

    let stats = service.task_stats().await.unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(
        stats["9f86d081884c7d659a2feaa0c55ad015"]["id"],
        "9f86d081884c7d659a2feaa0c55ad015"
    );

    let single = service.container_stats("sidecar").await.unwrap();
    assert_eq!(single["num_procs"], 1);
}

#[tokio::test]
async fn test_task_stats_skips_exited_container() {
    let exited = ContainerSnapshot {
        id: "5d41402abc4b2a76b9719d911017c592".to_string(),
        names: vec!["/exited".to_string()],
        ..Default::default()
    };
    let service = service(
        MockRuntime::with_containers(vec![shell_container(), exited, bare_container()]),
        MapConfig::new(),
    );

    let stats = service.task_stats().await.unwrap();

    assert_eq!(stats.len(), 2);
    assert!(!stats.contains_key("5d41402abc4b2a76b9719d911017c592"));
    assert!(stats.contains_key("9f86d081884c7d659a2feaa0c55ad015"));
    assert!(matches!(
        service.container_stats("exited").await,
        Err(EndpointError::Runtime(_))
    ));
}
