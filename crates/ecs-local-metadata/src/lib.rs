//! Metadata engine: converts live container runtime state into the task
//! metadata documents served under `/v2` and `/v3`.

pub mod record;
pub mod runtime;
pub mod service;
pub mod snapshot;
pub mod v2;
pub mod v3;

pub use record::{ContainerMetadata, MetadataBuilder, TaskMetadata};
pub use runtime::{ContainerRuntime, DockerRuntime, RuntimeError};
pub use service::MetadataService;
pub use snapshot::ContainerSnapshot;

// Re-export so consumers share the same Docker client version
pub use bollard;
