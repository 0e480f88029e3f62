use serde::{Deserialize, Serialize};

use super::bookmark::{Bookmark, MergePayload};

/// Event kinds the widget reports to the server.
pub const EVENT_ADDED: &str = "added";
pub const EVENT_REMOVED: &str = "removed";
pub const EVENT_REORDERED: &str = "reordered";

/// Response envelope shared by the bookmarks and events endpoints.
///
/// Anything other than `status == "success"` means the caller must not merge
/// the payload and must not trust `numberOfBookmarks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub status: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, rename = "shareLink")]
    pub share_link: Option<String>,
    #[serde(default)]
    pub bookmarks: Option<Vec<Bookmark>>,
    #[serde(default, rename = "numberOfBookmarks")]
    pub number_of_bookmarks: Option<i64>,
}

impl SyncEnvelope {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }

    /// Reduces the envelope to the fields the merge layer consumes.
    pub fn to_merge_payload(&self) -> MergePayload {
        MergePayload {
            code: self.code.clone(),
            share_link: self.share_link.clone(),
            bookmarks: self.bookmarks.clone(),
        }
    }
}

/// Outcome of a transport call. Transports never return `Err` or panic past
/// their boundary; failures surface here as `ok: false` plus an `error`
/// message, with `status == 0` for transport-level failures.
#[derive(Debug, Clone)]
pub struct ApiResult {
    pub ok: bool,
    pub status: u16,
    pub data: Option<SyncEnvelope>,
    pub error: Option<String>,
}

impl ApiResult {
    /// A transport-level failure (no HTTP status available).
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            status: 0,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Returns the envelope only when the call succeeded end to end:
    /// transport ok and `status: "success"` in the body.
    pub fn success_envelope(&self) -> Option<&SyncEnvelope> {
        match &self.data {
            Some(envelope) if self.ok && envelope.is_success() => Some(envelope),
            _ => None,
        }
    }
}

/// Body of `POST {bookmarksEndpoint}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostBookmarksBody {
    pub code: String,
    pub bookmarks: Vec<Bookmark>,
}

/// Body of `POST {eventsEndpoint}`. `at` is epoch milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostEventBody {
    pub code: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: serde_json::Value,
    pub at: i64,
}
