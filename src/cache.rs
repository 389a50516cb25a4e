use crate::ResolutionOutcome;
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::debug;

/// TTLs applied per outcome class. Failures and timeouts expire sooner so a
/// transient error does not pin a link dead for the full success window.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub success_ttl: Duration,
    pub failure_ttl: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            success_ttl: Duration::from_secs(600),
            failure_ttl: Duration::from_secs(30),
        }
    }
}

struct CacheEntry {
    outcome: ResolutionOutcome,
    expires_at: Instant,
}

/// Short-lived memoization of resolution outcomes keyed by canonical URL,
/// with single-flight semantics: concurrent callers for the same key share
/// one underlying resolution instead of fetching in parallel.
pub struct ResolutionCache {
    entries: DashMap<String, CacheEntry>,
    inflight: DashMap<String, Arc<OnceCell<ResolutionOutcome>>>,
    policy: CachePolicy,
}

impl ResolutionCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            entries: DashMap::new(),
            inflight: DashMap::new(),
            policy,
        }
    }

    /// Return the cached outcome for `key`, or run `resolve` to produce one.
    ///
    /// Expired entries are evicted lazily here. When several callers miss on
    /// the same key at once, exactly one `resolve` future runs; the rest wait
    /// on it and clone its outcome.
    pub async fn get_or_resolve<F, Fut>(&self, key: &str, resolve: F) -> ResolutionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ResolutionOutcome>,
    {
        if let Some(hit) = self.lookup(key) {
            debug!(key = %key, "Cache hit");
            return hit;
        }

        let cell = {
            let entry = self
                .inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            Arc::clone(entry.value())
        };

        // The guard removes the marker whether we finish or our future is
        // dropped mid-resolution; without it a cancelled dispatch would leave
        // the entry in the map forever.
        let _guard = InflightGuard {
            cache: self,
            key,
            cell: &cell,
        };

        cell.get_or_init(|| async {
            let outcome = resolve().await;
            self.store(key, outcome.clone());
            outcome
        })
        .await
        .clone()
    }

    fn lookup(&self, key: &str) -> Option<ResolutionOutcome> {
        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > Instant::now() {
                return Some(entry.outcome.clone());
            }
        } else {
            return None;
        }
        self.entries
            .remove_if(key, |_, e| e.expires_at <= Instant::now());
        None
    }

    fn store(&self, key: &str, outcome: ResolutionOutcome) {
        let ttl = match &outcome {
            ResolutionOutcome::Success(_) => self.policy.success_ttl,
            _ => self.policy.failure_ttl,
        };
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                outcome,
                expires_at: Instant::now() + ttl,
            },
        );
    }
}

/// Removes this caller's generation of the in-flight marker on drop. The
/// `Arc::ptr_eq` check keeps a later entry for the same key, inserted after
/// expiry, from being removed out from under its own waiters.
struct InflightGuard<'a> {
    cache: &'a ResolutionCache,
    key: &'a str,
    cell: &'a Arc<OnceCell<ResolutionOutcome>>,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        self.cache
            .inflight
            .remove_if(self.key, |_, v| Arc::ptr_eq(v, self.cell));
    }
}
