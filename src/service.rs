use crate::executor;
use crate::{
    canonicalize, extract_urls, log_outcome_card, CachePolicy, FailureKind, Platform,
    ResolutionCache, ResolutionOutcome, ResolveError, ResolverRegistry,
};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{debug, instrument};

/// Service-wide cap on resolutions in flight, across all messages.
pub const MAX_CONCURRENT_RESOLUTIONS: usize = 64;

/// Where a message came from. Auto-parse runs only for subscribed contexts;
/// private chats have their own subscription list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatContext {
    Group(String),
    Private(String),
}

/// Externally-owned configuration snapshot the dispatch engine consumes.
/// Mutating it goes through [`LinkResolverService::reload_config`], never
/// through ambient shared state.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub enabled: bool,
    pub auto_parse: bool,
    pub supported_platforms: HashSet<Platform>,
    pub subscribed_groups: HashSet<String>,
    pub subscribed_users: HashSet<String>,
    /// Surface unsupported/unknown links as `Unsupported` outcomes instead
    /// of dropping them before dispatch.
    pub surface_unknown: bool,
    pub max_links_per_message: usize,
    /// Per-message bound on resolutions in flight.
    pub max_concurrency: usize,
    /// Upper bound on one whole dispatch; URLs still pending at expiry
    /// report `TimedOut`.
    pub dispatch_deadline: Duration,
    pub success_ttl: Duration,
    pub failure_ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_parse: true,
            supported_platforms: [Platform::Bilibili, Platform::Douyin, Platform::Twitter]
                .into_iter()
                .collect(),
            subscribed_groups: HashSet::new(),
            subscribed_users: HashSet::new(),
            surface_unknown: false,
            max_links_per_message: 5,
            max_concurrency: 4,
            dispatch_deadline: Duration::from_secs(30),
            success_ttl: Duration::from_secs(600),
            failure_ttl: Duration::from_secs(30),
        }
    }
}

impl ResolverConfig {
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_auto_parse(mut self, auto_parse: bool) -> Self {
        self.auto_parse = auto_parse;
        self
    }

    pub fn with_supported_platforms(
        mut self,
        platforms: impl IntoIterator<Item = Platform>,
    ) -> Self {
        self.supported_platforms = platforms.into_iter().collect();
        self
    }

    pub fn with_subscribed_groups(mut self, groups: impl IntoIterator<Item = String>) -> Self {
        self.subscribed_groups = groups.into_iter().collect();
        self
    }

    pub fn with_subscribed_users(mut self, users: impl IntoIterator<Item = String>) -> Self {
        self.subscribed_users = users.into_iter().collect();
        self
    }

    pub fn with_surface_unknown(mut self, surface: bool) -> Self {
        self.surface_unknown = surface;
        self
    }

    pub fn with_max_links_per_message(mut self, max: usize) -> Self {
        self.max_links_per_message = max;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_dispatch_deadline(mut self, deadline: Duration) -> Self {
        self.dispatch_deadline = deadline;
        self
    }

    pub fn with_ttls(mut self, success: Duration, failure: Duration) -> Self {
        self.success_ttl = success;
        self.failure_ttl = failure;
        self
    }

    pub fn is_subscribed(&self, ctx: &ChatContext) -> bool {
        match ctx {
            ChatContext::Group(id) => self.subscribed_groups.contains(id),
            ChatContext::Private(id) => self.subscribed_users.contains(id),
        }
    }

    fn validate(&self, registry: &ResolverRegistry) -> Result<(), ResolveError> {
        if self.max_concurrency == 0 {
            return Err(ResolveError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.max_links_per_message == 0 {
            return Err(ResolveError::InvalidConfig(
                "max_links_per_message must be at least 1".into(),
            ));
        }
        if self.dispatch_deadline.is_zero() {
            return Err(ResolveError::InvalidConfig(
                "dispatch_deadline must be non-zero".into(),
            ));
        }
        for platform in &self.supported_platforms {
            if *platform == Platform::Unknown {
                return Err(ResolveError::InvalidConfig(
                    "unknown cannot be a supported platform".into(),
                ));
            }
            if !registry.is_registered(*platform) {
                return Err(ResolveError::InvalidConfig(format!(
                    "supported platform {platform} has no registered resolver"
                )));
            }
        }
        Ok(())
    }
}

/// One entry in a dispatch result: the URL as it appeared in the message and
/// its terminal outcome. Order follows first appearance in the source text.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ResolvedLink {
    pub url: String,
    pub outcome: ResolutionOutcome,
}

struct Target {
    source: String,
    canonical: String,
    platform: Platform,
}

/// Orchestrates extraction, platform matching, and bounded concurrent
/// resolution for chat messages. The registry is frozen at construction; the
/// config snapshot is replaced wholesale via `reload_config`.
pub struct LinkResolverService {
    registry: ResolverRegistry,
    cache: ResolutionCache,
    config: ResolverConfig,
    semaphore: Arc<Semaphore>,
}

impl LinkResolverService {
    pub fn new(registry: ResolverRegistry, config: ResolverConfig) -> Result<Self, ResolveError> {
        config.validate(&registry)?;
        let cache = ResolutionCache::new(CachePolicy {
            success_ttl: config.success_ttl,
            failure_ttl: config.failure_ttl,
        });
        debug!(
            platforms = ?registry.platforms().collect::<Vec<_>>(),
            "Link resolver service initialized"
        );
        Ok(Self {
            registry,
            cache,
            config,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_RESOLUTIONS)),
        })
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Swap in a fresh configuration snapshot. TTLs live in the cache, so a
    /// reload rebuilds it; cached outcomes from the old snapshot are dropped.
    pub fn reload_config(&mut self, config: ResolverConfig) -> Result<(), ResolveError> {
        config.validate(&self.registry)?;
        self.cache = ResolutionCache::new(CachePolicy {
            success_ttl: config.success_ttl,
            failure_ttl: config.failure_ttl,
        });
        self.config = config;
        Ok(())
    }

    /// Automatic resolution path for an inbound message. Runs only when
    /// enabled, auto-parse is on, and the context is subscribed; command
    /// messages (leading `/`) belong to the transport layer and are skipped.
    /// Returns an empty vec, never an error, when there is nothing to do.
    #[instrument(level = "debug", skip(self, text))]
    pub async fn resolve_message(&self, text: &str, ctx: &ChatContext) -> Vec<ResolvedLink> {
        if !self.config.enabled || !self.config.auto_parse {
            return Vec::new();
        }
        if !self.config.is_subscribed(ctx) {
            debug!(?ctx, "Context not subscribed, skipping auto-parse");
            return Vec::new();
        }
        if text.trim_start().starts_with('/') {
            return Vec::new();
        }
        self.dispatch(text).await
    }

    /// Manual resolution of a single explicit URL (command invocation). Skips
    /// the subscription check but still honors `enabled` and the supported
    /// platform set.
    #[instrument(level = "debug", skip(self))]
    pub async fn resolve_one(&self, url: &str) -> Result<ResolutionOutcome, ResolveError> {
        if !self.config.enabled {
            return Err(ResolveError::Disabled);
        }
        let canonical = match canonicalize(url) {
            Ok(c) => c,
            Err(e) => {
                return Ok(ResolutionOutcome::Failed {
                    kind: FailureKind::MalformedUrl,
                    message: e.to_string(),
                })
            }
        };
        let target = Target {
            source: url.to_string(),
            canonical,
            platform: self.registry.match_url(url),
        };
        let outcome = self.outcome_for(&target).await;
        log_outcome_card(url, &outcome);
        Ok(outcome)
    }

    async fn dispatch(&self, text: &str) -> Vec<ResolvedLink> {
        let candidates = extract_urls(text);
        if candidates.is_empty() {
            return Vec::new();
        }

        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for candidate in candidates {
            if targets.len() == self.config.max_links_per_message {
                break;
            }
            let Ok(canonical) = canonicalize(&candidate.raw) else {
                continue;
            };
            if !seen.insert(canonical.clone()) {
                continue;
            }
            let platform = self.registry.match_url(&candidate.raw);
            let supported = platform != Platform::Unknown
                && self.config.supported_platforms.contains(&platform);
            if !supported && !self.config.surface_unknown {
                continue;
            }
            targets.push(Target {
                source: candidate.raw,
                canonical,
                platform,
            });
        }
        if targets.is_empty() {
            return Vec::new();
        }

        debug!(count = targets.len(), "Dispatching link resolutions");
        let deadline = Instant::now() + self.config.dispatch_deadline;
        let sources: Vec<String> = targets.iter().map(|t| t.source.clone()).collect();

        // buffered(n) keeps at most n resolutions in flight and yields in
        // input order, which is the ordering guarantee callers rely on.
        let stream = stream::iter(targets.into_iter().map(|t| self.resolve_target(t)))
            .buffered(self.config.max_concurrency);
        futures::pin_mut!(stream);

        let mut results: Vec<ResolvedLink> = Vec::new();
        loop {
            match tokio::time::timeout_at(deadline, stream.next()).await {
                Ok(Some(link)) => results.push(link),
                Ok(None) => break,
                Err(_) => {
                    debug!(
                        completed = results.len(),
                        total = sources.len(),
                        "Dispatch deadline expired"
                    );
                    for source in sources.iter().skip(results.len()) {
                        results.push(ResolvedLink {
                            url: source.clone(),
                            outcome: ResolutionOutcome::TimedOut,
                        });
                    }
                    break;
                }
            }
        }
        results
    }

    async fn resolve_target(&self, target: Target) -> ResolvedLink {
        let outcome = self.outcome_for(&target).await;
        log_outcome_card(&target.source, &outcome);
        ResolvedLink {
            url: target.source,
            outcome,
        }
    }

    async fn outcome_for(&self, target: &Target) -> ResolutionOutcome {
        if target.platform == Platform::Unknown
            || !self.config.supported_platforms.contains(&target.platform)
        {
            return ResolutionOutcome::Unsupported(target.platform);
        }
        let Some(spec) = self.registry.lookup(target.platform) else {
            return ResolutionOutcome::Unsupported(target.platform);
        };

        self.cache
            .get_or_resolve(&target.canonical, || async {
                let _permit = match self.semaphore.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ResolutionOutcome::Failed {
                            kind: FailureKind::Network,
                            message: "resolver slots unavailable".into(),
                        }
                    }
                };
                executor::execute(spec, &target.source).await
            })
            .await
    }
}
