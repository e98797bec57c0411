//! Container runtime access. The metadata service only ever reads from the
//! runtime; everything it needs is behind [`ContainerRuntime`].

use async_trait::async_trait;
use bollard::container::{ListContainersOptions, StatsOptions};
use bollard::errors::Error as BollardError;
use bollard::Docker;
use ecs_local_common::EndpointError;
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::snapshot::ContainerSnapshot;

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("Docker connection failed: {0}")]
    ConnectFailed(#[source] BollardError),
    #[error("Container listing failed: {0}")]
    ListFailed(#[source] BollardError),
    #[error("Stats retrieval failed for {id}: {source}")]
    StatsFailed {
        id: String,
        #[source]
        source: BollardError,
    },
    #[error("No stats reported for container {0}")]
    NoStats(String),
    #[error("Stats encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl From<RuntimeError> for EndpointError {
    fn from(err: RuntimeError) -> Self {
        EndpointError::Runtime(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Checks that the runtime is reachable.
    async fn ping(&self) -> Result<()>;

    /// Running containers, in the order the runtime returns them.
    async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>>;

    /// One sample of resource usage for a container, in the runtime's own
    /// stats format.
    async fn container_stats(&self, id: &str) -> Result<serde_json::Value>;
}

/// [`ContainerRuntime`] backed by the local Docker daemon.
#[derive(Clone)]
pub struct DockerRuntime {
    docker: Arc<Docker>,
}

impl DockerRuntime {
    pub fn new(docker: Arc<Docker>) -> Self {
        Self { docker }
    }

    /// Connects using `DOCKER_HOST` or the platform's default socket.
    pub fn connect_with_local_defaults() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults().map_err(RuntimeError::ConnectFailed)?;
        Ok(Self::new(Arc::new(docker)))
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn ping(&self) -> Result<()> {
        self.docker.ping().await.map_err(RuntimeError::ConnectFailed)?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_containers(&self) -> Result<Vec<ContainerSnapshot>> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(RuntimeError::ListFailed)?;
        debug!("Docker reported {} running containers", summaries.len());

        Ok(summaries.into_iter().map(ContainerSnapshot::from).collect())
    }

    #[instrument(skip(self))]
    async fn container_stats(&self, id: &str) -> Result<serde_json::Value> {
        let options = StatsOptions {
            stream: false,
            one_shot: false,
        };
        let mut stream = self.docker.stats(id, Some(options));
        let stats = stream
            .next()
            .await
            .ok_or_else(|| RuntimeError::NoStats(id.to_string()))?
            .map_err(|source| RuntimeError::StatsFailed {
                id: id.to_string(),
                source,
            })?;

        Ok(serde_json::to_value(stats)?)
    }
}
