use chrono::{DateTime, SecondsFormat, Utc};
use ecs_local_common::Settings;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::provider::{CredentialProvider, UpstreamCredentials};
use crate::{CredentialsError, Result};

/// Which identity a credentials request is for. `None` asks the upstream
/// source for its default identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialsRequest {
    pub role: Option<String>,
}

impl CredentialsRequest {
    pub fn for_role(role: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
        }
    }
}

/// Body of a successful credentials response, as the ECS agent serves it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsResponse {
    #[serde(rename = "RoleArn", default, skip_serializing_if = "Option::is_none")]
    pub role_arn: Option<String>,
    #[serde(rename = "AccessKeyId")]
    pub access_key_id: String,
    #[serde(rename = "SecretAccessKey")]
    pub secret_access_key: String,
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "Expiration")]
    pub expiration: String,
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CredentialsError::Malformed(format!("missing {field}")))
}

impl CredentialsResponse {
    /// Reshapes an upstream payload, refusing anything that is not a complete
    /// credential set.
    pub fn from_upstream(upstream: UpstreamCredentials, requested_role: Option<&str>) -> Result<Self> {
        if let Some(code) = upstream.code.as_deref() {
            if code != "Success" {
                let message = upstream.message.unwrap_or_else(|| code.to_string());
                return Err(CredentialsError::AccessDenied(message));
            }
        }

        let expiration = required(upstream.expiration, "Expiration")?;
        let expiration: DateTime<Utc> = DateTime::parse_from_rfc3339(&expiration)
            .map_err(|e| CredentialsError::Malformed(format!("Expiration {expiration:?}: {e}")))?
            .with_timezone(&Utc);

        let role_arn = requested_role
            .filter(|role| role.starts_with("arn:"))
            .map(str::to_string)
            .or(upstream.role_arn);

        Ok(Self {
            role_arn,
            access_key_id: required(upstream.access_key_id, "AccessKeyId")?,
            secret_access_key: required(upstream.secret_access_key, "SecretAccessKey")?,
            token: required(upstream.token, "Token")?,
            expiration: expiration.to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }
}

/// Vends credentials. Holds no state between requests: every call makes one
/// upstream fetch and either returns a full credential set or an error.
#[derive(Clone)]
pub struct CredentialsService {
    provider: Arc<dyn CredentialProvider>,
    settings: Settings,
}

impl CredentialsService {
    pub fn new(provider: Arc<dyn CredentialProvider>, settings: Settings) -> Self {
        Self { provider, settings }
    }

    /// The role comes from the path token when there is one, otherwise from
    /// the configured role header.
    pub fn resolve_request(&self, path_token: Option<&str>, headers: &HeaderMap) -> CredentialsRequest {
        let from_path = path_token
            .map(|token| token.trim_matches('/'))
            .filter(|token| !token.is_empty());
        if let Some(role) = from_path {
            return CredentialsRequest::for_role(role);
        }

        let header = self.settings.credentials_role_header();
        let role = headers
            .get(header.as_str())
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        CredentialsRequest { role }
    }

    #[instrument(skip(self))]
    pub async fn get_credentials(&self, request: &CredentialsRequest) -> Result<CredentialsResponse> {
        let upstream = match self.provider.fetch(request.role.as_deref()).await {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!("Credential fetch failed: {e}");
                return Err(e);
            }
        };

        let response = CredentialsResponse::from_upstream(upstream, request.role.as_deref())?;
        info!(
            expiration = %response.expiration,
            "Vended credentials for {}",
            request.role.as_deref().unwrap_or("default identity")
        );
        Ok(response)
    }
}
