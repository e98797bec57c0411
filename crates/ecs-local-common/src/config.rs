//! Configuration resolution.
//!
//! Every value is looked up through a [`ConfigSource`] at the moment it is
//! needed and falls back to a documented default when unset. Nothing is
//! cached, so a changed environment is picked up by the next request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::tags::{parse_tags, Tags};
use crate::{EndpointError, Result};

/// Environment variable names.
pub mod keys {
    pub const CLUSTER_ARN: &str = "CLUSTER_ARN";
    pub const TASK_ARN: &str = "TASK_ARN";
    pub const TASK_DEFINITION_FAMILY: &str = "TASK_DEFINITION_FAMILY";
    pub const TASK_DEFINITION_REVISION: &str = "TASK_DEFINITION_REVISION";
    pub const CONTAINER_TYPE: &str = "CONTAINER_TYPE";
    pub const TASK_TAGS: &str = "TASK_TAGS";
    pub const CONTAINER_INSTANCE_TAGS: &str = "CONTAINER_INSTANCE_TAGS";
    pub const PORT: &str = "ECS_LOCAL_METADATA_PORT";
    pub const CREDENTIALS_UPSTREAM_URL: &str = "CREDENTIALS_UPSTREAM_URL";
    pub const CREDENTIALS_UPSTREAM_TOKEN: &str = "CREDENTIALS_UPSTREAM_TOKEN";
    pub const CREDENTIALS_UPSTREAM_TOKEN_URL: &str = "CREDENTIALS_UPSTREAM_TOKEN_URL";
    pub const CREDENTIALS_UPSTREAM_TOKEN_HEADER: &str = "CREDENTIALS_UPSTREAM_TOKEN_HEADER";
    pub const CREDENTIALS_ROLE_HEADER: &str = "CREDENTIALS_ROLE_HEADER";
}

/// Values used when the matching variable is unset or empty.
pub mod defaults {
    pub const CLUSTER_NAME: &str = "ecs-local-cluster";
    pub const TASK_ARN: &str =
        "arn:aws:ecs:us-west-2:111111111111:task/ecs-local-cluster/37e873f6-37b4-42a7-af47-eac7275c6152";
    pub const TASK_DEFINITION_FAMILY: &str = "ecs-local-task-definition";
    pub const TASK_DEFINITION_REVISION: &str = "1";
    pub const CONTAINER_TYPE: &str = "NORMAL";
    pub const PORT: &str = "80";
    pub const CREDENTIALS_UPSTREAM_URL: &str =
        "http://169.254.169.254/latest/meta-data/iam/security-credentials/";
    /// Path of the session token endpoint, joined onto the upstream's origin
    /// when no token URL is configured.
    pub const CREDENTIALS_UPSTREAM_TOKEN_PATH: &str = "/latest/api/token";
    pub const CREDENTIALS_UPSTREAM_TOKEN_HEADER: &str = "X-aws-ec2-metadata-token";
    pub const CREDENTIALS_UPSTREAM_TOKEN_TTL_SECONDS: &str = "21600";
    pub const CREDENTIALS_ROLE_HEADER: &str = "X-Ecs-Local-Role";
}

/// A read-only lookup of named configuration values.
pub trait ConfigSource: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// Reads values from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// Fixed in-memory values, used where a deterministic configuration is needed.
#[derive(Debug, Clone, Default)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl ConfigSource for MapConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Typed access to the configuration shared by both engines.
#[derive(Clone)]
pub struct Settings {
    source: Arc<dyn ConfigSource>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings").finish_non_exhaustive()
    }
}

impl Settings {
    pub fn new(source: Arc<dyn ConfigSource>) -> Self {
        Self { source }
    }

    pub fn from_env() -> Self {
        Self::new(Arc::new(EnvConfig))
    }

    /// Returns the configured value for `key`, or `default` when it is unset
    /// or empty.
    pub fn resolve_with_default(&self, key: &str, default: &str) -> String {
        match self.source.lookup(key) {
            Some(value) if !value.is_empty() => value,
            _ => default.to_string(),
        }
    }

    /// Returns the configured value for `key` when it is set and non-empty.
    pub fn resolve(&self, key: &str) -> Option<String> {
        self.source.lookup(key).filter(|value| !value.is_empty())
    }

    pub fn cluster(&self) -> String {
        self.resolve_with_default(keys::CLUSTER_ARN, defaults::CLUSTER_NAME)
    }

    pub fn task_arn(&self) -> String {
        self.resolve_with_default(keys::TASK_ARN, defaults::TASK_ARN)
    }

    pub fn family(&self) -> String {
        self.resolve_with_default(keys::TASK_DEFINITION_FAMILY, defaults::TASK_DEFINITION_FAMILY)
    }

    pub fn revision(&self) -> String {
        self.resolve_with_default(
            keys::TASK_DEFINITION_REVISION,
            defaults::TASK_DEFINITION_REVISION,
        )
    }

    pub fn container_type(&self) -> String {
        self.resolve_with_default(keys::CONTAINER_TYPE, defaults::CONTAINER_TYPE)
    }

    pub fn task_tags(&self) -> Tags {
        self.resolve(keys::TASK_TAGS)
            .map(|raw| parse_tags(&raw))
            .unwrap_or_default()
    }

    pub fn container_instance_tags(&self) -> Tags {
        self.resolve(keys::CONTAINER_INSTANCE_TAGS)
            .map(|raw| parse_tags(&raw))
            .unwrap_or_default()
    }

    pub fn port(&self) -> Result<u16> {
        let raw = self.resolve_with_default(keys::PORT, defaults::PORT);
        raw.parse().map_err(|_| {
            EndpointError::Config(format!("{} is not a valid port: {raw}", keys::PORT))
        })
    }

    pub fn credentials_upstream_url(&self) -> String {
        self.resolve_with_default(
            keys::CREDENTIALS_UPSTREAM_URL,
            defaults::CREDENTIALS_UPSTREAM_URL,
        )
    }

    /// A fixed upstream token. When set, no session token is requested.
    pub fn credentials_upstream_token(&self) -> Option<String> {
        self.resolve(keys::CREDENTIALS_UPSTREAM_TOKEN)
    }

    pub fn credentials_upstream_token_url(&self) -> Option<String> {
        self.resolve(keys::CREDENTIALS_UPSTREAM_TOKEN_URL)
    }

    pub fn credentials_upstream_token_header(&self) -> String {
        self.resolve_with_default(
            keys::CREDENTIALS_UPSTREAM_TOKEN_HEADER,
            defaults::CREDENTIALS_UPSTREAM_TOKEN_HEADER,
        )
    }

    pub fn credentials_role_header(&self) -> String {
        self.resolve_with_default(
            keys::CREDENTIALS_ROLE_HEADER,
            defaults::CREDENTIALS_ROLE_HEADER,
        )
    }
}
