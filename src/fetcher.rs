use crate::ResolveError;
use reqwest::{header::HeaderMap, Client};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_USER_AGENT: &str = "link-resolver/0.1.0";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";

/// Thin wrapper over a shared `reqwest::Client`. Platform resolvers hold a
/// `Fetcher` built with the header profile their platform expects.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn send_error(e: reqwest::Error) -> ResolveError {
    if e.is_timeout() {
        ResolveError::Timeout(e.to_string())
    } else {
        ResolveError::Fetch(e.to_string())
    }
}

impl Fetcher {
    pub fn new() -> Self {
        Self::new_with_custom_config(Duration::from_secs(10), DEFAULT_USER_AGENT, HeaderMap::new())
    }

    pub fn new_with_custom_config(timeout: Duration, user_agent: &str, headers: HeaderMap) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|e| {
                error!(error = %e, "Failed to create HTTP client");
                panic!("Failed to initialize HTTP client: {e}");
            });
        Fetcher { client }
    }

    /// Client profile for bilibili API and image hosts, which reject
    /// requests without a site Referer.
    pub fn new_bilibili_client() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Referer", "https://www.bilibili.com/".parse().unwrap());
        Self::new_with_custom_config(Duration::from_secs(10), BROWSER_USER_AGENT, headers)
    }

    /// Browser-like client profile for hosts that vary responses on
    /// navigation headers (douyin share pages, twitter).
    pub fn new_browser_client() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert("Accept-Language", "en-US,en;q=0.9".parse().unwrap());
        headers.insert(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8"
                .parse()
                .unwrap(),
        );
        headers.insert("Upgrade-Insecure-Requests", "1".parse().unwrap());
        Self::new_with_custom_config(Duration::from_secs(10), BROWSER_USER_AGENT, headers)
    }

    pub async fn get_text(&self, url: &str) -> Result<String, ResolveError> {
        debug!(url = %url, "Fetching page body");
        let response = self.client.get(url).send().await.map_err(send_error)?;

        if !response.status().is_success() {
            return Err(ResolveError::Fetch(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ResolveError::Fetch(format!("failed to read body: {e}")))
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ResolveError> {
        debug!(url = %url, "Fetching JSON");
        let response = self.client.get(url).send().await.map_err(send_error)?;

        if !response.status().is_success() {
            return Err(ResolveError::Fetch(format!(
                "HTTP {} from {url}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ResolveError::InvalidPayload(format!("bad JSON from {url}: {e}")))
    }

    /// Follow redirects on a short link (b23.tv, v.douyin.com) and return the
    /// final URL. Returns the original on any error, matching the behavior a
    /// caller wants when expansion is best-effort.
    pub async fn expand_short_url(&self, url: &str) -> String {
        match self.client.get(url).send().await {
            Ok(response) => {
                let expanded = response.url().to_string();
                debug!(short = %url, expanded = %expanded, "Expanded short link");
                expanded
            }
            Err(e) => {
                debug!(url = %url, error = %e, "Short link expansion failed, keeping original");
                url.to_string()
            }
        }
    }
}
