use crate::registry::ResolverSpec;
use crate::utils::{compact_whitespace, truncate_display};
use crate::{FailureKind, Platform, PreviewResult, RawPreview, ResolutionOutcome, ResolveError};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};
use url::Url;

/// Display-width caps applied to resolver output during normalization.
pub(crate) const MAX_TITLE_WIDTH: usize = 120;
pub(crate) const MAX_DESCRIPTION_WIDTH: usize = 500;

/// Run one resolver for one URL under its configured timeout and convert
/// every way it can misbehave into a terminal outcome. The resolver future
/// runs on its own task, so a panic surfaces as a `JoinError` instead of
/// unwinding into the dispatch engine, and a timeout aborts only this task.
pub(crate) async fn execute(spec: &ResolverSpec, url: &str) -> ResolutionOutcome {
    let resolver = Arc::clone(&spec.resolver);
    let owned_url = url.to_string();
    let mut task = AbortOnDrop(tokio::spawn(async move { resolver.resolve(&owned_url).await }));

    match tokio::time::timeout(spec.timeout, &mut task.0).await {
        Ok(Ok(Ok(raw))) => normalize(spec.platform, url, raw),
        Ok(Ok(Err(err))) => {
            err.log();
            ResolutionOutcome::Failed {
                kind: failure_kind(&err),
                message: err.to_string(),
            }
        }
        Ok(Err(join_err)) => {
            warn!(url = %url, platform = %spec.platform, error = %join_err, "Resolver task aborted");
            ResolutionOutcome::Failed {
                kind: FailureKind::Panicked,
                message: format!("resolver task failed: {join_err}"),
            }
        }
        Err(_) => {
            debug!(url = %url, platform = %spec.platform, timeout = ?spec.timeout, "Resolver timed out");
            ResolutionOutcome::TimedOut
        }
    }
}

/// Cancels the resolver task when the supervising future goes away, whether
/// through the per-call timeout or the caller dropping the whole dispatch.
struct AbortOnDrop<T>(tokio::task::JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn failure_kind(err: &ResolveError) -> FailureKind {
    match err {
        ResolveError::UrlParse(_) | ResolveError::MalformedUrl(_) => FailureKind::MalformedUrl,
        ResolveError::Fetch(_) | ResolveError::Timeout(_) => FailureKind::Network,
        _ => FailureKind::InvalidPayload,
    }
}

/// Turn a raw resolver success into a `PreviewResult` with every field
/// present-or-empty: missing strings coerce to empty, title and description
/// are whitespace-compacted and width-capped, and the claimed canonical URL
/// must be well-formed http(s) or the whole result downgrades to `Failed`.
fn normalize(platform: Platform, source_url: &str, raw: RawPreview) -> ResolutionOutcome {
    let canonical = if raw.canonical_url.is_empty() {
        source_url
    } else {
        raw.canonical_url.as_str()
    };

    let canonical_url = match Url::parse(canonical) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed.to_string(),
        Ok(parsed) => {
            return ResolutionOutcome::Failed {
                kind: FailureKind::InvalidPayload,
                message: format!("resolver returned non-http URL: {}", parsed.scheme()),
            }
        }
        Err(e) => {
            return ResolutionOutcome::Failed {
                kind: FailureKind::InvalidPayload,
                message: format!("resolver returned malformed URL {canonical:?}: {e}"),
            }
        }
    };

    let title = truncate_display(
        &compact_whitespace(raw.title.as_deref().unwrap_or("")),
        MAX_TITLE_WIDTH,
    );
    let description = truncate_display(
        raw.description.as_deref().unwrap_or("").trim(),
        MAX_DESCRIPTION_WIDTH,
    );
    let thumbnail = raw.thumbnail.filter(|t| {
        Url::parse(t)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false)
    });

    ResolutionOutcome::Success(PreviewResult {
        url: source_url.to_string(),
        canonical_url,
        platform,
        title,
        description,
        thumbnail,
        resolved_at: SystemTime::now(),
    })
}
