//! HTML sanitization for bookmark text fields.
//!
//! Policy: strip to plain text. `script` and `style` elements are removed
//! together with their content, HTML comments are dropped, every other tag
//! is stripped leaving its text behind. The crate never stores or returns
//! markup, so rendering a stored title cannot execute anything.

/// Elements whose entire content is dropped, not just the markup.
const DROP_CONTENT_TAGS: [&str; 2] = ["script", "style"];

/// Strips markup from `input` per the module policy.
pub fn sanitize_html(input: &str) -> String {
    let mut text = input.to_string();
    for tag in DROP_CONTENT_TAGS {
        text = strip_element(&text, tag);
    }
    text = strip_comments(&text);
    strip_tags(&text)
}

/// Sanitizes a title. A title that strips down to whitespace is invalid.
pub fn sanitize_title(input: &str) -> Option<String> {
    let clean = sanitize_html(input);
    let trimmed = clean.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Removes every `<tag ...>...</tag>` block, content included. An unclosed
/// opening tag swallows the rest of the string.
fn strip_element(input: &str, tag: &str) -> String {
    let open = format!("<{}", tag);
    let close = format!("</{}", tag);
    // ASCII-lowered copy keeps byte offsets aligned with the original.
    let lower = input.to_ascii_lowercase();
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(start) = lower[pos..].find(&open) {
        let start = pos + start;
        result.push_str(&input[pos..start]);
        let Some(close_start) = lower[start..].find(&close) else {
            return result;
        };
        let close_start = start + close_start;
        let Some(close_end) = lower[close_start..].find('>') else {
            return result;
        };
        pos = close_start + close_end + 1;
    }
    result.push_str(&input[pos..]);
    result
}

/// Removes `<!-- ... -->` comments. An unterminated comment swallows the
/// rest of the string.
fn strip_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut pos = 0;
    while let Some(start) = input[pos..].find("<!--") {
        let start = pos + start;
        result.push_str(&input[pos..start]);
        let Some(end) = input[start..].find("-->") else {
            return result;
        };
        pos = start + end + 3;
    }
    result.push_str(&input[pos..]);
    result
}

/// Strips remaining tags, keeping the text between them.
fn strip_tags(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut in_tag = false;
    for ch in input.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
}
