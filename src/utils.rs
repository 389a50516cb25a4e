use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Truncate a string to a maximum display width, appending an ellipsis.
///
/// Width is measured in terminal columns so CJK text and emoji are never cut
/// mid-character and never overflow the cap.
pub fn truncate_display(s: &str, max_width: usize) -> String {
    if s.width() <= max_width {
        return s.to_string();
    }

    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(1);
        if used + w + 3 > max_width {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push_str("...");
    out
}

/// Collapse runs of whitespace (including newlines) into single spaces.
/// Titles coming back from page metadata often embed layout whitespace.
pub fn compact_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
