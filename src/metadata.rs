use scraper::{Html, Selector};
use url::Url;

/// Structured metadata pulled out of an HTML document: Open Graph tags with
/// plain `<title>` / `<meta name=description>` fallbacks.
#[derive(Debug, Clone, Default)]
pub struct PageMetadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

impl PageMetadata {
    /// Extract metadata from a page. `base_url` anchors relative image URLs.
    pub fn from_html(html: &str, base_url: &str) -> Self {
        let document = Html::parse_document(html);

        let title = meta_content(&document, "meta[property='og:title']")
            .or_else(|| {
                Selector::parse("title").ok().and_then(|sel| {
                    document
                        .select(&sel)
                        .next()
                        .map(|el| el.text().collect::<String>())
                })
            })
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let description = meta_content(&document, "meta[property='og:description']")
            .or_else(|| meta_content(&document, "meta[name='description']"))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let image = meta_content(&document, "meta[property='og:image']")
            .or_else(|| meta_content(&document, "meta[name='twitter:image']"))
            .and_then(|img| absolutize(&img, base_url));

        Self {
            title,
            description,
            image,
        }
    }
}

fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let sel = Selector::parse(selector).ok()?;
    document
        .select(&sel)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
}

/// Resolve a possibly-relative or protocol-relative image URL against the
/// page it came from.
fn absolutize(img: &str, base_url: &str) -> Option<String> {
    if img.starts_with("http://") || img.starts_with("https://") {
        return Some(img.to_string());
    }
    if let Some(rest) = img.strip_prefix("//") {
        return Some(format!("https://{rest}"));
    }
    Url::parse(base_url)
        .ok()?
        .join(img)
        .ok()
        .map(|u| u.to_string())
}
