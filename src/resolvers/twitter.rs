use crate::{Fetcher, Platform, RawPreview, ResolveError, Resolver, ResolverSpec, UrlPattern};
use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Resolves tweet links through the public oEmbed endpoint, which works
/// without authentication and returns the tweet as an HTML blockquote.
pub struct TwitterResolver {
    fetcher: Fetcher,
}

impl TwitterResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_browser_client(),
        }
    }
}

impl Default for TwitterResolver {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spec() -> ResolverSpec {
    ResolverSpec::new(
        Platform::Twitter,
        UrlPattern::hosts(&["twitter.com", "x.com"]),
        Arc::new(TwitterResolver::new()),
        Duration::from_secs(10),
    )
}

#[derive(Debug, Deserialize)]
struct OEmbedResponse {
    html: String,
    #[serde(default)]
    author_name: String,
}

/// Build the oEmbed endpoint for a tweet URL. The tweet URL goes in encoded,
/// so its own query string (`?s=20` share suffixes) survives as part of the
/// `url` parameter instead of splitting ours.
fn oembed_endpoint(url: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("url", url)
        .append_pair("omit_script", "1")
        .append_pair("lang", "en")
        .finish();
    format!("https://publish.twitter.com/oembed?{query}")
}

#[async_trait]
impl Resolver for TwitterResolver {
    async fn resolve(&self, url: &str) -> Result<RawPreview, ResolveError> {
        let oembed: OEmbedResponse = self.fetcher.get_json(&oembed_endpoint(url)).await?;

        let tweet = TweetFragment::parse(&oembed.html);
        let text = tweet
            .text
            .ok_or_else(|| ResolveError::InvalidPayload("oEmbed HTML without tweet text".into()))?;

        let description = match tweet.posted {
            Some(posted) => format!("{text} (Posted: {posted})"),
            None => text.clone(),
        };

        Ok(RawPreview {
            // Empty: the engine keeps the caller's URL; oEmbed does not
            // return a cleaner form.
            canonical_url: String::new(),
            title: Some(if oembed.author_name.is_empty() {
                text
            } else {
                format!("{}: {}", oembed.author_name, text)
            }),
            description: Some(description),
            thumbnail: None,
        })
    }
}

#[derive(Debug, Default)]
struct TweetFragment {
    text: Option<String>,
    posted: Option<String>,
}

impl TweetFragment {
    /// Pick the tweet body and timestamp out of the oEmbed blockquote. The
    /// body is the first `<p>`; the timestamp is the text of the trailing
    /// permalink anchor.
    fn parse(html: &str) -> Self {
        let document = Html::parse_fragment(html);
        let Ok(p_selector) = Selector::parse("p") else {
            return Self::default();
        };
        let Ok(a_selector) = Selector::parse("a") else {
            return Self::default();
        };

        let text = document
            .select(&p_selector)
            .next()
            .map(|el| el.text().collect::<String>())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let posted = document
            .select(&a_selector)
            .last()
            .map(|el| el.text().collect::<String>())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        Self { text, posted }
    }
}
