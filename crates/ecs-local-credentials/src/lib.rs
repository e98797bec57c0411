//! Credentials engine: vends temporary credentials in the format of the ECS
//! agent's credentials endpoint, fetched from an upstream source on every
//! request.

use thiserror::Error;

pub mod provider;
pub mod service;

pub use provider::{CredentialProvider, HttpCredentialProvider, UpstreamCredentials};
pub use service::{CredentialsRequest, CredentialsResponse, CredentialsService};

#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Upstream rejected the credential request: {0}")]
    AccessDenied(String),
    #[error("Upstream credential source unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),
    #[error("Upstream credential source returned status {status}: {body}")]
    UpstreamStatus { status: u16, body: String },
    #[error("Malformed credential payload: {0}")]
    Malformed(String),
    #[error("Invalid credential source configuration: {0}")]
    Config(String),
}

impl CredentialsError {
    /// Short machine-readable code carried in error responses.
    pub fn code(&self) -> &'static str {
        match self {
            CredentialsError::AccessDenied(_) => "AccessDenied",
            CredentialsError::Unavailable(_) => "UpstreamUnavailable",
            CredentialsError::UpstreamStatus { .. } => "UpstreamError",
            CredentialsError::Malformed(_) => "MalformedResponse",
            CredentialsError::Config(_) => "InvalidConfiguration",
        }
    }
}

pub type Result<T> = std::result::Result<T, CredentialsError>;
