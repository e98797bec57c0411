// Shared configuration and error types for the local ECS endpoints

use thiserror::Error;

pub mod config;
pub mod tags;

pub use config::{ConfigSource, EnvConfig, MapConfig, Settings};
pub use tags::{parse_tags, Tags};

#[derive(Error, Debug)]
pub enum EndpointError {
    #[error("Container Runtime Error: {0}")]
    Runtime(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, EndpointError>;

/// Status reported for every task and container. There is no task lifecycle
/// to track locally, so the emulation always answers `RUNNING`.
pub const STATUS_RUNNING: &str = "RUNNING";
