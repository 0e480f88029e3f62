use serde::{Deserialize, Serialize};

/// A saved page reference.
///
/// The serialized shape is fixed by the server wire contract and must
/// round-trip exactly:
///
/// ```json
/// { "url": "/path?q=1", "title": "…", "imagelink": "", "description": "", "ts": 1234567890 }
/// ```
///
/// `url` is the primary key within a bookmark list and is always stored in
/// origin-relative form (leading `/`). `ts` is epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub url: String,
    pub title: String,
    #[serde(default)]
    pub imagelink: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ts: i64,
}

/// Incoming bookmark data to be merged into the canonical list.
///
/// Produced by both server sync responses and the one-shot share-import slot;
/// every field is optional because either side may omit it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MergePayload {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "shareLink")]
    pub share_link: Option<String>,
    #[serde(default)]
    pub bookmarks: Option<Vec<Bookmark>>,
}
