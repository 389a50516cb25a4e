use crate::Platform;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("failed to parse URL: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("malformed URL: {0}")]
    MalformedUrl(String),

    #[error("failed to fetch content: {0}")]
    Fetch(String),

    #[error("invalid resolver payload: {0}")]
    InvalidPayload(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("link resolution is disabled")]
    Disabled,

    #[error("duplicate resolver registration for platform: {0}")]
    DuplicateResolver(Platform),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ResolveError {
    pub fn log(&self) {
        match self {
            ResolveError::UrlParse(e) => {
                warn!(error = %e, "URL parsing failed");
            }
            ResolveError::MalformedUrl(e) => {
                warn!(error = %e, "Rejected malformed URL");
            }
            ResolveError::Fetch(e) => {
                error!(error = %e, "Content fetch failed");
            }
            ResolveError::InvalidPayload(e) => {
                error!(error = %e, "Resolver returned invalid payload");
            }
            ResolveError::Timeout(e) => {
                warn!(error = %e, "Resolution timed out");
            }
            ResolveError::Disabled => {
                warn!("Resolution requested while disabled");
            }
            ResolveError::DuplicateResolver(platform) => {
                error!(platform = %platform, "Duplicate resolver registration");
            }
            ResolveError::InvalidConfig(e) => {
                error!(error = %e, "Invalid configuration");
            }
        }
    }
}
