//! Upstream credential sources.

use async_trait::async_trait;
use ecs_local_common::config::defaults;
use ecs_local_common::Settings;
use reqwest::{Response, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::{CredentialsError, Result};

/// Header that asks the token endpoint for a session of a given length.
const TOKEN_TTL_HEADER: &str = "X-aws-ec2-metadata-token-ttl-seconds";

/// Credential payload as returned by the upstream issuer. Every field is
/// optional here; completeness is checked before anything is vended.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpstreamCredentials {
    pub code: Option<String>,
    pub message: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub token: Option<String>,
    pub expiration: Option<String>,
    pub role_arn: Option<String>,
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Fetches credentials for `role`, or for the source's default identity
    /// when no role is given. Called exactly once per vended response.
    async fn fetch(&self, role: Option<&str>) -> Result<UpstreamCredentials>;
}

/// Fetches credentials from an instance-metadata style endpoint.
///
/// `GET <base>` lists the attached role names one per line and
/// `GET <base>/<role>` returns that role's credential document. Without a
/// role, the first listed role is the default identity. Requests carry a
/// session token taken from `CREDENTIALS_UPSTREAM_TOKEN` or, when that is
/// unset, obtained with `PUT` on the token endpoint.
pub struct HttpCredentialProvider {
    client: reqwest::Client,
    settings: Settings,
}

impl HttpCredentialProvider {
    /// Builds the HTTP client and validates the configured upstream URLs.
    pub fn new(settings: Settings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| CredentialsError::Config(format!("HTTP client: {e}")))?;
        let provider = Self { client, settings };
        let base = provider.base_url()?;
        provider.token_url(&base)?;
        Ok(provider)
    }

    fn base_url(&self) -> Result<Url> {
        let base = self.settings.credentials_upstream_url();
        let url = Url::parse(&base)
            .map_err(|e| CredentialsError::Config(format!("{base} is not a valid URL: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(CredentialsError::Config(format!(
                "{base} cannot carry a role path"
            )));
        }
        Ok(url)
    }

    fn role_url(base: &Url, role: &str) -> Result<Url> {
        let mut url = base.clone();
        // Pushed as a single segment, so ARNs keep their '/' escaped.
        url.path_segments_mut()
            .map_err(|_| CredentialsError::Config(format!("{base} cannot carry a role path")))?
            .pop_if_empty()
            .push(role);
        Ok(url)
    }

    fn token_url(&self, base: &Url) -> Result<Url> {
        match self.settings.credentials_upstream_token_url() {
            Some(configured) => Url::parse(&configured).map_err(|e| {
                CredentialsError::Config(format!("{configured} is not a valid URL: {e}"))
            }),
            None => base
                .join(defaults::CREDENTIALS_UPSTREAM_TOKEN_PATH)
                .map_err(|e| CredentialsError::Config(format!("token endpoint for {base}: {e}"))),
        }
    }

    /// Token for this fetch. `None` when the upstream has no token endpoint,
    /// in which case requests go out without one.
    async fn session_token(&self, base: &Url) -> Result<Option<String>> {
        if let Some(token) = self.settings.credentials_upstream_token() {
            return Ok(Some(token));
        }

        let url = self.token_url(base)?;
        let response = self
            .client
            .put(url.clone())
            .header(TOKEN_TTL_HEADER, defaults::CREDENTIALS_UPSTREAM_TOKEN_TTL_SECONDS)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::FORBIDDEN => {
                debug!("No session token from {url} ({status}), continuing without one");
                Ok(None)
            }
            _ if status.is_success() => {
                let token = response.text().await?.trim().to_string();
                Ok((!token.is_empty()).then_some(token))
            }
            _ => Err(CredentialsError::UpstreamStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }

    async fn get(&self, url: Url, token: Option<&str>) -> Result<Response> {
        debug!("Requesting {url}");
        let mut request = self.client.get(url);
        if let Some(token) = token {
            request = request.header(self.settings.credentials_upstream_token_header(), token);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::AccessDenied(format!("{status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CredentialsError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// First role named in the listing at `base`.
    async fn default_role(&self, base: &Url, token: Option<&str>) -> Result<String> {
        let listing = self.get(base.clone(), token).await?.text().await?;
        first_role(&listing)
            .map(str::to_string)
            .ok_or_else(|| CredentialsError::Malformed(format!("no role listed at {base}")))
    }
}

fn first_role(listing: &str) -> Option<&str> {
    listing
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
}

#[async_trait]
impl CredentialProvider for HttpCredentialProvider {
    #[instrument(skip(self))]
    async fn fetch(&self, role: Option<&str>) -> Result<UpstreamCredentials> {
        let base = self.base_url()?;
        let token = self.session_token(&base).await?;

        let role = match role {
            Some(role) => role.to_string(),
            None => self.default_role(&base, token.as_deref()).await?,
        };

        let url = Self::role_url(&base, &role)?;
        let body = self.get(url, token.as_deref()).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| CredentialsError::Malformed(e.to_string()))
    }
}
