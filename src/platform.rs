use serde::{Deserialize, Serialize};
use url::Url;

/// Closed set of content platforms the engine knows about. Classification
/// assigns exactly one of these to every candidate URL; `Unknown` is the
/// fallback and never has a registered resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Bilibili,
    Douyin,
    Twitter,
    Unknown,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Bilibili => "bilibili",
            Platform::Douyin => "douyin",
            Platform::Twitter => "twitter",
            Platform::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = crate::ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bilibili" => Ok(Platform::Bilibili),
            "douyin" => Ok(Platform::Douyin),
            "twitter" | "x" => Ok(Platform::Twitter),
            other => Err(crate::ResolveError::InvalidConfig(format!(
                "unrecognized platform name: {other}"
            ))),
        }
    }
}

/// Host/path signature a platform claims. A URL matches when its host equals
/// one of the suffixes or is a subdomain of one, and (when set) its path
/// starts with the prefix.
#[derive(Debug, Clone)]
pub struct UrlPattern {
    host_suffixes: Vec<String>,
    path_prefix: Option<String>,
}

impl UrlPattern {
    pub fn hosts(suffixes: &[&str]) -> Self {
        Self {
            host_suffixes: suffixes.iter().map(|s| s.to_string()).collect(),
            path_prefix: None,
        }
    }

    pub fn with_path_prefix(mut self, prefix: &str) -> Self {
        self.path_prefix = Some(prefix.to_string());
        self
    }

    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host_ok = self
            .host_suffixes
            .iter()
            .any(|s| host == s || host.ends_with(&format!(".{s}")));
        if !host_ok {
            return false;
        }
        match &self.path_prefix {
            Some(prefix) => url.path().starts_with(prefix.as_str()),
            None => true,
        }
    }
}
