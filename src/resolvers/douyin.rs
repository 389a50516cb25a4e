use crate::{
    Fetcher, PageMetadata, Platform, RawPreview, ResolveError, Resolver, ResolverSpec, UrlPattern,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Resolves douyin share links. Share messages carry `v.douyin.com` short
/// links, which redirect to the full video page; metadata comes from the
/// page's Open Graph tags.
pub struct DouyinResolver {
    fetcher: Fetcher,
}

impl DouyinResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_browser_client(),
        }
    }
}

impl Default for DouyinResolver {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spec() -> ResolverSpec {
    ResolverSpec::new(
        Platform::Douyin,
        UrlPattern::hosts(&["douyin.com", "iesdouyin.com"]),
        Arc::new(DouyinResolver::new()),
        Duration::from_secs(10),
    )
}

#[async_trait]
impl Resolver for DouyinResolver {
    async fn resolve(&self, url: &str) -> Result<RawPreview, ResolveError> {
        let expanded = if url.contains("v.douyin.com") {
            self.fetcher.expand_short_url(url).await
        } else {
            url.to_string()
        };

        let html = self.fetcher.get_text(&expanded).await?;
        preview_from_page(&html, &expanded)
    }
}

fn preview_from_page(html: &str, page_url: &str) -> Result<RawPreview, ResolveError> {
    let meta = PageMetadata::from_html(html, page_url);
    if meta.title.is_none() && meta.description.is_none() {
        return Err(ResolveError::InvalidPayload(
            "douyin page carries no preview metadata".into(),
        ));
    }
    Ok(RawPreview {
        canonical_url: page_url.to_string(),
        title: meta.title,
        description: meta.description,
        thumbnail: meta.image,
    })
}
