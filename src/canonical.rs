use crate::ResolveError;
use url::Url;

/// Query parameters that carry tracking/session state and never affect the
/// content a link points at. Stripped when computing the canonical form.
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "igshid",
    "msclkid",
    "spm_id_from",
    "vd_source",
    "share_source",
    "share_medium",
    "share_plat",
    "share_session_id",
    "share_tag",
    "share_from",
    "from_source",
    "from_spmid",
    "ref_src",
    "ref_url",
    "buvid",
    "is_story_h5",
    "plat_id",
    "unique_k",
];

/// Compute the canonical form of a URL: the stable identity used as the
/// cache/dedup key. Lowercased host and dropped default ports come from URL
/// parsing itself; on top of that the fragment and tracking query parameters
/// are removed.
pub fn canonicalize(raw: &str) -> Result<String, ResolveError> {
    let mut url = Url::parse(raw)?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(ResolveError::MalformedUrl(format!(
                "unsupported scheme: {other}"
            )))
        }
    }
    if url.host_str().is_none() {
        return Err(ResolveError::MalformedUrl("missing host".into()));
    }

    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| !is_tracking_param(k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept.iter());
    }

    Ok(url.to_string())
}

fn is_tracking_param(key: &str) -> bool {
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key)
}
