use crate::{Platform, ResolveError, Resolver, UrlPattern};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Everything the engine needs to dispatch one platform: the classification
/// pattern, the resolver capability, and its per-call deadline.
#[derive(Clone)]
pub struct ResolverSpec {
    pub platform: Platform,
    pub pattern: UrlPattern,
    pub resolver: Arc<dyn Resolver>,
    pub timeout: Duration,
}

impl ResolverSpec {
    pub fn new(
        platform: Platform,
        pattern: UrlPattern,
        resolver: Arc<dyn Resolver>,
        timeout: Duration,
    ) -> Self {
        Self {
            platform,
            pattern,
            resolver,
            timeout,
        }
    }
}

/// Builds a [`ResolverRegistry`] during initialization. Registering two specs
/// for the same platform, or anything for `Unknown`, fails fast here; after
/// `build` the registry is immutable and safe to read concurrently.
#[derive(Default)]
pub struct RegistryBuilder {
    specs: Vec<ResolverSpec>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, spec: ResolverSpec) -> Result<Self, ResolveError> {
        if spec.platform == Platform::Unknown {
            return Err(ResolveError::InvalidConfig(
                "cannot register a resolver for the unknown platform".into(),
            ));
        }
        if self.specs.iter().any(|s| s.platform == spec.platform) {
            return Err(ResolveError::DuplicateResolver(spec.platform));
        }
        self.specs.push(spec);
        Ok(self)
    }

    pub fn build(self) -> ResolverRegistry {
        ResolverRegistry { specs: self.specs }
    }
}

/// Immutable platform → resolver table. Pattern precedence is registration
/// order, so classification is deterministic.
pub struct ResolverRegistry {
    specs: Vec<ResolverSpec>,
}

impl ResolverRegistry {
    pub fn lookup(&self, platform: Platform) -> Option<&ResolverSpec> {
        self.specs.iter().find(|s| s.platform == platform)
    }

    /// Classify a URL against the registered patterns, first match wins.
    /// Unparseable URLs and URLs no pattern claims are `Unknown`.
    pub fn match_url(&self, url: &str) -> Platform {
        let Ok(parsed) = Url::parse(url) else {
            return Platform::Unknown;
        };
        self.specs
            .iter()
            .find(|s| s.pattern.matches(&parsed))
            .map(|s| s.platform)
            .unwrap_or(Platform::Unknown)
    }

    pub fn is_registered(&self, platform: Platform) -> bool {
        self.specs.iter().any(|s| s.platform == platform)
    }

    pub fn platforms(&self) -> impl Iterator<Item = Platform> + '_ {
        self.specs.iter().map(|s| s.platform)
    }
}
