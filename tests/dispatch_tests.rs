use async_trait::async_trait;
use link_resolver::{
    ChatContext, FailureKind, LinkResolverService, Platform, RawPreview, RegistryBuilder,
    ResolutionOutcome, ResolveError, Resolver, ResolverConfig, ResolverSpec, UrlPattern,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

struct MockResolver {
    title: String,
    delay: Option<Duration>,
    panics: bool,
    fails: bool,
    calls: Arc<AtomicUsize>,
}

impl MockResolver {
    fn ok(title: &str) -> Self {
        Self {
            title: title.to_string(),
            delay: None,
            panics: false,
            fails: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn slow(title: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::ok(title)
        }
    }

    fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::ok("boom")
        }
    }

    fn failing() -> Self {
        Self {
            fails: true,
            ..Self::ok("down")
        }
    }
}

#[async_trait]
impl Resolver for MockResolver {
    async fn resolve(&self, url: &str) -> Result<RawPreview, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("mock resolver bug");
        }
        if self.fails {
            return Err(ResolveError::Fetch("mock network down".into()));
        }
        Ok(RawPreview {
            canonical_url: String::new(),
            title: Some(self.title.clone()),
            description: Some(format!("description for {url}")),
            thumbnail: None,
        })
    }
}

fn spec(
    platform: Platform,
    hosts: &[&str],
    resolver: impl Resolver + 'static,
    timeout: Duration,
) -> ResolverSpec {
    ResolverSpec::new(platform, UrlPattern::hosts(hosts), Arc::new(resolver), timeout)
}

fn bilibili_spec(resolver: MockResolver) -> ResolverSpec {
    spec(
        Platform::Bilibili,
        &["bilibili.com", "b23.tv"],
        resolver,
        Duration::from_secs(5),
    )
}

fn twitter_spec(resolver: MockResolver) -> ResolverSpec {
    spec(
        Platform::Twitter,
        &["twitter.com", "x.com"],
        resolver,
        Duration::from_secs(5),
    )
}

fn service_with(specs: Vec<ResolverSpec>, config: ResolverConfig) -> LinkResolverService {
    let mut builder = RegistryBuilder::new();
    for s in specs {
        builder = builder.register(s).unwrap();
    }
    LinkResolverService::new(builder.build(), config).unwrap()
}

fn subscribed_config() -> ResolverConfig {
    ResolverConfig::default().with_subscribed_groups(["g1".to_string()])
}

fn group() -> ChatContext {
    ChatContext::Group("g1".into())
}

const BILI_URL: &str = "https://www.bilibili.com/video/BV1xx411c7mD";
const TWEET_URL: &str = "https://twitter.com/someone/status/123";

#[tokio::test]
async fn bilibili_url_in_chat_text_resolves() {
    let config = subscribed_config().with_supported_platforms([Platform::Bilibili]);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    let results = service
        .resolve_message(&format!("check this out {BILI_URL} thanks"), &group())
        .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, BILI_URL);
    let preview = results[0].outcome.preview().expect("expected success");
    assert_eq!(preview.platform, Platform::Bilibili);
    assert!(!preview.title.is_empty());
    assert!(!preview.description.is_empty());
    assert_eq!(preview.canonical_url, BILI_URL);
}

#[tokio::test]
async fn unknown_platform_dropped_by_default() {
    let config = subscribed_config().with_supported_platforms([Platform::Twitter]);
    let service = service_with(vec![twitter_spec(MockResolver::ok("tweet"))], config);

    let text = format!("https://example.com/article then {TWEET_URL}");
    let results = service.resolve_message(&text, &group()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, TWEET_URL);
    assert!(results[0].outcome.is_success());
}

#[tokio::test]
async fn unknown_platform_surfaced_when_configured() {
    let config = subscribed_config()
        .with_supported_platforms([Platform::Twitter])
        .with_surface_unknown(true);
    let service = service_with(vec![twitter_spec(MockResolver::ok("tweet"))], config);

    let text = format!("https://example.com/article then {TWEET_URL}");
    let results = service.resolve_message(&text, &group()).await;

    // Original left-to-right order is preserved.
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "https://example.com/article");
    assert_eq!(
        results[0].outcome,
        ResolutionOutcome::Unsupported(Platform::Unknown)
    );
    assert!(results[1].outcome.is_success());
}

#[tokio::test(start_paused = true)]
async fn slow_resolver_times_out_without_blocking_siblings() {
    let douyin = spec(
        Platform::Douyin,
        &["douyin.com"],
        MockResolver::slow("never seen", Duration::from_secs(120)),
        Duration::from_secs(1),
    );
    let config = subscribed_config()
        .with_supported_platforms([Platform::Douyin, Platform::Bilibili]);
    let service = service_with(
        vec![douyin, bilibili_spec(MockResolver::ok("Video title"))],
        config,
    );

    let text = format!("https://www.douyin.com/video/712345 and {BILI_URL}");
    let results = service.resolve_message(&text, &group()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].outcome, ResolutionOutcome::TimedOut);
    assert!(results[1].outcome.is_success());
}

#[tokio::test]
async fn auto_parse_off_manual_resolution_still_works() {
    let config = subscribed_config()
        .with_supported_platforms([Platform::Bilibili])
        .with_auto_parse(false);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    let results = service
        .resolve_message(&format!("look {BILI_URL}"), &group())
        .await;
    assert!(results.is_empty());

    let outcome = service.resolve_one(BILI_URL).await.unwrap();
    assert!(outcome.is_success());
}

#[tokio::test]
async fn unsubscribed_contexts_are_skipped() {
    let config = subscribed_config()
        .with_supported_platforms([Platform::Bilibili])
        .with_subscribed_users(["alice".to_string()]);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);
    let text = format!("look {BILI_URL}");

    let other_group = ChatContext::Group("g2".into());
    assert!(service.resolve_message(&text, &other_group).await.is_empty());

    let stranger = ChatContext::Private("bob".into());
    assert!(service.resolve_message(&text, &stranger).await.is_empty());

    let subscriber = ChatContext::Private("alice".into());
    assert_eq!(service.resolve_message(&text, &subscriber).await.len(), 1);
}

#[tokio::test]
async fn command_messages_are_not_auto_parsed() {
    let config = subscribed_config().with_supported_platforms([Platform::Bilibili]);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    let results = service
        .resolve_message(&format!("/link parse {BILI_URL}"), &group())
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn disabled_service_rejects_manual_resolution() {
    let config = subscribed_config()
        .with_supported_platforms([Platform::Bilibili])
        .with_enabled(false);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    assert!(service
        .resolve_message(&format!("look {BILI_URL}"), &group())
        .await
        .is_empty());
    assert!(matches!(
        service.resolve_one(BILI_URL).await,
        Err(ResolveError::Disabled)
    ));
}

#[tokio::test]
async fn manual_resolution_respects_supported_platforms() {
    // Bilibili is registered but not in the supported set.
    let config = subscribed_config().with_supported_platforms([Platform::Twitter]);
    let service = service_with(
        vec![
            bilibili_spec(MockResolver::ok("Video title")),
            twitter_spec(MockResolver::ok("tweet")),
        ],
        config,
    );

    let outcome = service.resolve_one(BILI_URL).await.unwrap();
    assert_eq!(outcome, ResolutionOutcome::Unsupported(Platform::Bilibili));
}

#[tokio::test]
async fn manual_resolution_of_malformed_url_fails_cleanly() {
    let config = subscribed_config().with_supported_platforms([Platform::Bilibili]);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    let outcome = service.resolve_one("not a url at all").await.unwrap();
    assert!(matches!(
        outcome,
        ResolutionOutcome::Failed {
            kind: FailureKind::MalformedUrl,
            ..
        }
    ));
}

#[tokio::test]
async fn result_count_capped_per_message() {
    let config = subscribed_config()
        .with_supported_platforms([Platform::Bilibili])
        .with_max_links_per_message(2);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    let text = "https://www.bilibili.com/video/BV1aaa \
                https://www.bilibili.com/video/BV2bbb \
                https://www.bilibili.com/video/BV3ccc";
    let results = service.resolve_message(text, &group()).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "https://www.bilibili.com/video/BV1aaa");
    assert_eq!(results[1].url, "https://www.bilibili.com/video/BV2bbb");
}

#[tokio::test]
async fn repeated_urls_deduplicated_by_canonical_form() {
    let resolver = MockResolver::ok("Video title");
    let calls = Arc::clone(&resolver.calls);
    let config = subscribed_config().with_supported_platforms([Platform::Bilibili]);
    let service = service_with(vec![bilibili_spec(resolver)], config);

    // Same video three times: verbatim, with a fragment, with tracking query.
    let text = format!("{BILI_URL} again {BILI_URL}#t=10 and {BILI_URL}?spm_id_from=333");
    let results = service.resolve_message(&text, &group()).await;

    assert_eq!(results.len(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn panicking_resolver_does_not_abort_siblings() {
    let douyin = spec(
        Platform::Douyin,
        &["douyin.com"],
        MockResolver::panicking(),
        Duration::from_secs(5),
    );
    let config = subscribed_config()
        .with_supported_platforms([Platform::Douyin, Platform::Bilibili]);
    let service = service_with(
        vec![douyin, bilibili_spec(MockResolver::ok("Video title"))],
        config,
    );

    let text = format!("https://www.douyin.com/video/712345 and {BILI_URL}");
    let results = service.resolve_message(&text, &group()).await;

    assert_eq!(results.len(), 2);
    assert!(matches!(
        results[0].outcome,
        ResolutionOutcome::Failed {
            kind: FailureKind::Panicked,
            ..
        }
    ));
    assert!(results[1].outcome.is_success());
}

#[tokio::test]
async fn failing_resolver_reports_network_failure() {
    let config = subscribed_config().with_supported_platforms([Platform::Bilibili]);
    let service = service_with(vec![bilibili_spec(MockResolver::failing())], config);

    let outcome = service.resolve_one(BILI_URL).await.unwrap();
    assert!(matches!(
        outcome,
        ResolutionOutcome::Failed {
            kind: FailureKind::Network,
            ..
        }
    ));
}

#[tokio::test]
async fn text_without_urls_yields_empty_result() {
    let config = subscribed_config().with_supported_platforms([Platform::Bilibili]);
    let service = service_with(vec![bilibili_spec(MockResolver::ok("Video title"))], config);

    assert!(service.resolve_message("", &group()).await.is_empty());
    assert!(service
        .resolve_message("no links, just chatter", &group())
        .await
        .is_empty());
}

struct GaugedResolver {
    current: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[async_trait]
impl Resolver for GaugedResolver {
    async fn resolve(&self, _url: &str) -> Result<RawPreview, ResolveError> {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.current.fetch_sub(1, Ordering::SeqCst);
        Ok(RawPreview {
            title: Some("gauged".into()),
            ..RawPreview::default()
        })
    }
}

#[tokio::test(start_paused = true)]
async fn in_flight_resolutions_bounded_by_max_concurrency() {
    let current = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let gauged = spec(
        Platform::Bilibili,
        &["bilibili.com"],
        GaugedResolver {
            current: Arc::clone(&current),
            peak: Arc::clone(&peak),
        },
        Duration::from_secs(5),
    );
    let config = subscribed_config()
        .with_supported_platforms([Platform::Bilibili])
        .with_max_concurrency(2);
    let service = service_with(vec![gauged], config);

    let text = "https://www.bilibili.com/video/BV1aaa \
                https://www.bilibili.com/video/BV2bbb \
                https://www.bilibili.com/video/BV3ccc \
                https://www.bilibili.com/video/BV4ddd";
    let results = service.resolve_message(text, &group()).await;

    assert_eq!(results.len(), 4);
    assert!(results.iter().all(|r| r.outcome.is_success()));
    assert!(peak.load(Ordering::SeqCst) <= 2);
}

#[tokio::test(start_paused = true)]
async fn dispatch_deadline_bounds_whole_message() {
    // Per-call timeout is far beyond the dispatch deadline, so the deadline
    // is what fires.
    let slow = spec(
        Platform::Bilibili,
        &["bilibili.com"],
        MockResolver::slow("never seen", Duration::from_secs(300)),
        Duration::from_secs(600),
    );
    let config = subscribed_config()
        .with_supported_platforms([Platform::Bilibili])
        .with_dispatch_deadline(Duration::from_secs(5));
    let service = service_with(vec![slow], config);

    let text = "https://www.bilibili.com/video/BV1aaa https://www.bilibili.com/video/BV2bbb";
    let results = service.resolve_message(text, &group()).await;

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.outcome == ResolutionOutcome::TimedOut));
}

#[tokio::test]
async fn invalid_configuration_fails_construction() {
    let registry = RegistryBuilder::new()
        .register(bilibili_spec(MockResolver::ok("x")))
        .unwrap()
        .build();

    let zero_concurrency = ResolverConfig::default()
        .with_supported_platforms([Platform::Bilibili])
        .with_max_concurrency(0);
    assert!(matches!(
        LinkResolverService::new(registry, zero_concurrency),
        Err(ResolveError::InvalidConfig(_))
    ));

    let registry = RegistryBuilder::new()
        .register(bilibili_spec(MockResolver::ok("x")))
        .unwrap()
        .build();
    let unregistered_supported =
        ResolverConfig::default().with_supported_platforms([Platform::Twitter]);
    assert!(matches!(
        LinkResolverService::new(registry, unregistered_supported),
        Err(ResolveError::InvalidConfig(_))
    ));
}
