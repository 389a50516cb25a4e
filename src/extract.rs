use url::Url;

/// One URL-shaped token found in free text. Duplicates are preserved here;
/// the dispatch engine deduplicates by canonical form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub raw: String,
    /// Byte offset of the URL start in the source text.
    pub offset: usize,
}

/// Scan free text for http/https URLs, in order of first appearance.
///
/// This is a lexical pass, not markup parsing: it tokenizes on whitespace,
/// peels wrapping brackets and quotes, trims trailing punctuation, and
/// accepts a token only if the remainder parses as an http(s) URL. URLs glued
/// to surrounding prose without whitespace (common in CJK chat text) are
/// found by locating the scheme inside the token. Empty or URL-free text
/// yields an empty vec, never an error.
pub fn extract_urls(text: &str) -> Vec<CandidateUrl> {
    let mut out = Vec::new();
    let mut rest = text;
    let mut base = 0;

    while let Some(start) = find_scheme(rest) {
        let tail = &rest[start..];
        let token_end = tail
            .char_indices()
            .find(|(_, c)| !is_url_char(*c))
            .map(|(i, _)| i)
            .unwrap_or(tail.len());
        let trimmed = trim_token(&tail[..token_end]);

        if !trimmed.is_empty() && Url::parse(trimmed).is_ok() {
            out.push(CandidateUrl {
                raw: trimmed.to_string(),
                offset: base + start,
            });
        }

        base += start + token_end.max(1);
        rest = &rest[start + token_end.max(1)..];
    }

    out
}

fn find_scheme(s: &str) -> Option<usize> {
    let http = s.find("http://");
    let https = s.find("https://");
    match (http, https) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    }
}

/// Characters a URL token may span, per RFC 3986 plus '%'. Anything else
/// (whitespace, CJK prose, closing guillemets) terminates the token.
fn is_url_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '-' | '.'
                | '_'
                | '~'
                | ':'
                | '/'
                | '?'
                | '#'
                | '['
                | ']'
                | '@'
                | '!'
                | '$'
                | '&'
                | '\''
                | '('
                | ')'
                | '*'
                | '+'
                | ','
                | ';'
                | '='
                | '%'
        )
}

fn trim_token(token: &str) -> &str {
    // Closers only: characters before the scheme never make it into the token.
    let mut s = token;
    loop {
        let trimmed = s
            .trim_end_matches(['.', ',', ';', ':', '!', '?'])
            .trim_end_matches([')', ']', '"', '\''])
            .trim_end_matches('\\');
        if trimmed.len() == s.len() {
            return trimmed;
        }
        s = trimmed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_url_with_surrounding_text() {
        let urls = extract_urls("check this out https://www.bilibili.com/video/BV1xx411c7mD thanks");
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].raw, "https://www.bilibili.com/video/BV1xx411c7mD");
        assert_eq!(urls[0].offset, 15);
    }

    #[test]
    fn multiple_urls_in_order() {
        let urls = extract_urls("see https://a.com/x and http://b.org/y today");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].raw, "https://a.com/x");
        assert_eq!(urls[1].raw, "http://b.org/y");
        assert!(urls[0].offset < urls[1].offset);
    }

    #[test]
    fn duplicates_preserved() {
        let urls = extract_urls("https://a.com https://a.com");
        assert_eq!(urls.len(), 2);
    }

    #[test]
    fn trailing_punctuation_trimmed() {
        let urls = extract_urls("go to https://example.com/page.");
        assert_eq!(urls[0].raw, "https://example.com/page");

        let urls = extract_urls("is it https://example.com?");
        assert_eq!(urls[0].raw, "https://example.com");
    }

    #[test]
    fn wrapping_brackets_and_quotes_trimmed() {
        let urls = extract_urls("(https://example.com/path), <https://example.com/other>");
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0].raw, "https://example.com/path");
        assert_eq!(urls[1].raw, "https://example.com/other");
    }

    #[test]
    fn url_glued_to_cjk_text() {
        let urls = extract_urls("快看这个https://b23.tv/abc123！超好笑");
        assert_eq!(urls.len(), 1);
        assert_eq!(urls[0].raw, "https://b23.tv/abc123");
    }

    #[test]
    fn empty_and_plain_text() {
        assert!(extract_urls("").is_empty());
        assert!(extract_urls("no links here, just chatter").is_empty());
    }

    #[test]
    fn non_http_schemes_ignored() {
        assert!(extract_urls("ftp://files.example.com mailto:x@example.com").is_empty());
    }

    #[test]
    fn bare_scheme_rejected() {
        assert!(extract_urls("https:// is how URLs start").is_empty());
    }

    #[test]
    fn query_and_fragment_survive() {
        let urls = extract_urls("https://example.com/search?q=test#results");
        assert_eq!(urls[0].raw, "https://example.com/search?q=test#results");
    }

    #[test]
    fn count_bounded_by_scheme_occurrences() {
        let text = "https://a.com text https://b.com more https://c.com";
        let occurrences = text.matches("://").count();
        assert!(extract_urls(text).len() <= occurrences);
    }
}
