use async_trait::async_trait;
use std::time::SystemTime;

mod cache;
mod canonical;
mod error;
mod executor;
mod extract;
mod fetcher;
mod logging;
mod metadata;
mod platform;
mod registry;
pub mod resolvers;
mod service;
mod utils;

pub use cache::{CachePolicy, ResolutionCache};
pub use canonical::canonicalize;
pub use error::ResolveError;
pub use extract::{extract_urls, CandidateUrl};
pub use fetcher::Fetcher;
pub use logging::{log_outcome_card, setup_logging, LogConfig};
pub use metadata::PageMetadata;
pub use platform::{Platform, UrlPattern};
pub use registry::{RegistryBuilder, ResolverRegistry, ResolverSpec};
pub use resolvers::builtin_registry;
pub use service::{
    ChatContext, LinkResolverService, ResolvedLink, ResolverConfig, MAX_CONCURRENT_RESOLUTIONS,
};

/// Normalized preview of one resolved link.
///
/// `title` and `description` are always present (possibly empty) after
/// normalization; only `thumbnail` stays optional.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PreviewResult {
    /// URL as it appeared in the source text.
    pub url: String,
    /// Canonical form used as the cache identity.
    pub canonical_url: String,
    pub platform: Platform,
    pub title: String,
    pub description: String,
    pub thumbnail: Option<String>,
    pub resolved_at: SystemTime,
}

/// Why a resolution ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedUrl,
    Network,
    InvalidPayload,
    Panicked,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::MalformedUrl => "malformed-url",
            FailureKind::Network => "network",
            FailureKind::InvalidPayload => "invalid-payload",
            FailureKind::Panicked => "panicked",
        };
        f.write_str(s)
    }
}

/// Terminal outcome of dispatching one URL. Exactly one per dispatched URL;
/// per-link failures are carried here instead of propagating as errors.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum ResolutionOutcome {
    Success(PreviewResult),
    Unsupported(Platform),
    Failed { kind: FailureKind, message: String },
    TimedOut,
}

impl ResolutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ResolutionOutcome::Success(_))
    }

    pub fn preview(&self) -> Option<&PreviewResult> {
        match self {
            ResolutionOutcome::Success(preview) => Some(preview),
            _ => None,
        }
    }
}

/// Raw, untrusted output of a platform resolver, before the executor
/// normalizes it into a [`PreviewResult`].
#[derive(Debug, Clone, Default)]
pub struct RawPreview {
    /// Canonical URL claimed by the resolver; falls back to the source URL
    /// when empty. Rejected (downgraded to `Failed`) when not well-formed.
    pub canonical_url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

/// Platform-specific metadata fetcher. Implementations perform network I/O
/// and are treated as opaque: the executor supervises every call with a
/// timeout and converts errors and panics into outcome variants.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, url: &str) -> Result<RawPreview, ResolveError>;
}
