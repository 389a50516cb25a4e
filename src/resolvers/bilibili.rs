use crate::{Fetcher, Platform, RawPreview, ResolveError, Resolver, ResolverSpec, UrlPattern};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Resolves bilibili video links through the public view API. Handles both
/// full `bilibili.com/video/BV…` URLs and `b23.tv` short links, which are
/// expanded by following redirects before the BV id is extracted.
pub struct BilibiliResolver {
    fetcher: Fetcher,
}

impl BilibiliResolver {
    pub fn new() -> Self {
        Self {
            fetcher: Fetcher::new_bilibili_client(),
        }
    }
}

impl Default for BilibiliResolver {
    fn default() -> Self {
        Self::new()
    }
}

pub fn spec() -> ResolverSpec {
    ResolverSpec::new(
        Platform::Bilibili,
        UrlPattern::hosts(&["bilibili.com", "b23.tv"]),
        Arc::new(BilibiliResolver::new()),
        Duration::from_secs(10),
    )
}

#[derive(Debug, Deserialize)]
struct ViewResponse {
    code: i64,
    #[serde(default)]
    message: String,
    data: Option<ViewData>,
}

#[derive(Debug, Deserialize)]
struct ViewData {
    bvid: String,
    title: String,
    #[serde(default)]
    desc: String,
    #[serde(default)]
    pic: String,
    #[serde(default)]
    owner: Owner,
    #[serde(default)]
    stat: Stat,
}

#[derive(Debug, Default, Deserialize)]
struct Owner {
    #[serde(default)]
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct Stat {
    #[serde(default)]
    view: u64,
    #[serde(default)]
    like: u64,
    #[serde(default)]
    coin: u64,
    #[serde(default)]
    favorite: u64,
    #[serde(default)]
    danmaku: u64,
}

#[async_trait]
impl Resolver for BilibiliResolver {
    async fn resolve(&self, url: &str) -> Result<RawPreview, ResolveError> {
        let expanded = if url.contains("b23.tv") {
            self.fetcher.expand_short_url(url).await
        } else {
            url.to_string()
        };

        let bvid = extract_bvid(&expanded)
            .ok_or_else(|| ResolveError::InvalidPayload(format!("no BV id in {expanded}")))?;

        let api_url = format!("https://api.bilibili.com/x/web-interface/view?bvid={bvid}");
        let response: ViewResponse = self.fetcher.get_json(&api_url).await?;

        if response.code != 0 {
            return Err(ResolveError::InvalidPayload(format!(
                "bilibili API error {}: {}",
                response.code, response.message
            )));
        }
        let data = response
            .data
            .ok_or_else(|| ResolveError::InvalidPayload("bilibili API returned no data".into()))?;

        Ok(RawPreview {
            canonical_url: format!("https://www.bilibili.com/video/{}", data.bvid),
            title: Some(data.title.clone()),
            description: Some(fold_description(&data)),
            thumbnail: (!data.pic.is_empty()).then(|| data.pic.clone()),
        })
    }
}

/// Pull the `BV…` video id out of a URL. Ids are ASCII alphanumeric runs
/// directly after the `BV` marker.
fn extract_bvid(url: &str) -> Option<String> {
    let start = url.find("BV")?;
    let id: String = url[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect();
    (id.len() > 2).then_some(id)
}

/// Fold uploader and engagement counts into the description line, with the
/// video's own description below.
fn fold_description(data: &ViewData) -> String {
    let stat = &data.stat;
    let mut out = format!(
        "UP {} · {} views · {} likes · {} coins · {} favs · {} danmaku",
        data.owner.name,
        group_thousands(stat.view),
        group_thousands(stat.like),
        group_thousands(stat.coin),
        group_thousands(stat.favorite),
        group_thousands(stat.danmaku),
    );
    let desc = data.desc.trim();
    if !desc.is_empty() {
        out.push('\n');
        out.push_str(desc);
    }
    out
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
