//! Origin-relative URL normalization.
//!
//! Bookmark URLs are stored origin-relative: scheme and host stripped,
//! always a leading `/`, query and fragment preserved. Anything resolving
//! to a different origin than the page is rejected.

use url::Url;

/// Reduces `input` to origin-relative form against `origin`.
///
/// Relative inputs are resolved against the origin first; absolute inputs
/// must share the origin or they are rejected. Returns `None` for empty,
/// unparseable, or foreign-origin input.
pub fn to_relative_url(input: &str, origin: &Url) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    let resolved = origin.join(trimmed).ok()?;
    if resolved.origin() != origin.origin() {
        return None;
    }
    let mut relative = resolved.path().to_string();
    if !relative.starts_with('/') {
        relative.insert(0, '/');
    }
    if let Some(query) = resolved.query() {
        relative.push('?');
        relative.push_str(query);
    }
    if let Some(fragment) = resolved.fragment() {
        relative.push('#');
        relative.push_str(fragment);
    }
    Some(relative)
}

/// Image links are optional: anything that fails normalization becomes the
/// empty string instead of invalidating the bookmark.
pub fn normalize_image_link(input: &str, origin: &Url) -> String {
    if input.trim().is_empty() {
        return String::new();
    }
    to_relative_url(input, origin).unwrap_or_default()
}

/// Resolves a stored relative link (e.g. the share link) back to an
/// absolute URL on the page origin. Empty in, empty out.
pub fn to_absolute_url(link: &str, origin: &Url) -> String {
    let trimmed = link.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    origin
        .join(trimmed)
        .map(|resolved| resolved.to_string())
        .unwrap_or_default()
}
