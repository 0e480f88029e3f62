//! Widget core for pagefaves.
//!
//! [`PageFaves`] is the instance the embedding page drives: current-page
//! bookmark operations, server sync with drift detection, share-link
//! plumbing. No ambient global — multi-tab wiring happens through an
//! explicitly shared [`NotificationHub`].
//!
//! The presentation layer (hearts, overlay, hotkeys) is an external
//! collaborator: it calls these methods and re-renders from
//! [`state`](PageFaves::state) change notifications.

use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;
use url::form_urlencoded;

use crate::managers::state_manager::{ClearOptions, StateManager, StateManagerTrait};
use crate::platform;
use crate::services::sync_client::SyncTransport;
use crate::services::url_normalizer::{to_absolute_url, to_relative_url};
use crate::store::hub::NotificationHub;
use crate::store::{Store, StoreConfig};
use crate::types::api::{EVENT_ADDED, EVENT_REMOVED, EVENT_REORDERED};
use crate::types::bookmark::Bookmark;
use crate::types::options::Options;

/// Sync status of the whole widget relative to the server.
///
/// `Unknown` until the first server round-trip; local mutations and count
/// mismatches flip it to `OutOfSync`; a successful full sync restores
/// `InSync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    Unknown,
    InSync,
    OutOfSync,
}

/// One widget instance.
///
/// Generic over the sync transport so tests (and serverless embeddings) can
/// substitute their own; `net: None` disables every server interaction while
/// keeping the widget fully usable offline.
pub struct PageFaves<T: SyncTransport> {
    opts: Options,
    state: StateManager,
    net: Option<T>,
    sync_status: SyncStatus,
}

impl<T: SyncTransport> PageFaves<T> {
    /// Builds a widget with a private notification hub (single-tab usage).
    pub fn new(opts: Options, net: Option<T>) -> Self {
        Self::with_hub(opts, net, None)
    }

    /// Builds a widget attached to a shared hub so several instances
    /// ("tabs") converge on the same data.
    pub fn with_hub(opts: Options, net: Option<T>, hub: Option<NotificationHub>) -> Self {
        let data_dir = opts
            .data_dir
            .clone()
            .unwrap_or_else(platform::get_data_dir);
        let config = StoreConfig {
            mode: opts.storage,
            namespace: opts.storage_key.clone(),
            temp_shared_key: Some(opts.name_of_temporary_shared_store.clone()),
            data_dir,
            broadcast_enabled: opts.broadcast_enabled,
        };
        let store = Store::open(config, hub);
        let state = StateManager::new(store, &opts.origin, &opts.storage_key);
        Self {
            opts,
            state,
            net,
            sync_status: SyncStatus::Unknown,
        }
    }

    /// Startup flow: consume a pending share import, then sync per the
    /// configured toggles. Returns whether a share import occurred (the
    /// embedder typically opens the overlay in that case).
    pub async fn mount(&mut self) -> bool {
        let imported = self.state.merge_from_share_if_available();
        if self.opts.sync_on_load && self.opts.user_is_logged_in {
            self.sync_from_server(true, true).await;
        } else if self.opts.merge_on_load {
            self.sync_from_server(false, false).await;
        }
        imported
    }

    /// The underlying state manager, for listener registration and direct
    /// state queries.
    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    pub fn sync_status(&self) -> SyncStatus {
        self.sync_status
    }

    fn can_server(&self) -> bool {
        self.net.is_some() && !self.opts.base_url.trim().is_empty()
    }

    fn current_page_url(&self) -> String {
        self.opts
            .current_page_url
            .clone()
            .unwrap_or_else(|| format!("{}/", self.opts.origin.trim_end_matches('/')))
    }

    /// Adds a bookmark and reports the event. Returns whether the local add
    /// happened; a failed ping never undoes it.
    pub async fn add(
        &mut self,
        url: &str,
        title: &str,
        imagelink: &str,
        description: &str,
    ) -> bool {
        let ok = self.state.add(url, title, imagelink, description);
        if ok {
            let relative =
                to_relative_url(url, self.state.origin()).unwrap_or_else(|| url.to_string());
            self.ping(
                EVENT_ADDED,
                json!({
                    "url": relative,
                    "title": title,
                    "imagelink": imagelink,
                    "description": description,
                }),
            )
            .await;
        }
        ok
    }

    /// Removes a bookmark (with positional fallback) and reports the event.
    pub async fn remove(&mut self, url: &str, index: Option<usize>) -> bool {
        let ok = self.state.remove(url, index);
        if ok {
            let relative =
                to_relative_url(url, self.state.origin()).unwrap_or_else(|| url.to_string());
            self.ping(EVENT_REMOVED, json!({ "url": relative })).await;
        }
        ok
    }

    /// Moves a bookmark and reports the event.
    pub async fn reorder(&mut self, from: isize, to: isize) {
        self.state.reorder(from, to);
        self.ping(EVENT_REORDERED, json!({ "from": from, "to": to }))
            .await;
    }

    /// Bookmarks the current page using the configured page metadata.
    pub async fn add_current(&mut self) -> bool {
        let url = self.current_page_url();
        let title = self.opts.current_page_title.clone().unwrap_or_default();
        let imagelink = self.opts.current_page_imagelink.clone().unwrap_or_default();
        let description = self
            .opts
            .current_page_description
            .clone()
            .unwrap_or_default();
        self.add(&url, &title, &imagelink, &description).await
    }

    pub async fn remove_current(&mut self) -> bool {
        let url = self.current_page_url();
        self.remove(&url, None).await
    }

    /// Hearts or un-hearts the current page.
    pub async fn toggle_current(&mut self) -> bool {
        if self.is_bookmarked(None) {
            self.remove_current().await
        } else {
            self.add_current().await
        }
    }

    /// Whether `url` (or the current page, when `None`) is bookmarked.
    pub fn is_bookmarked(&self, url: Option<&str>) -> bool {
        match url {
            Some(url) => self.state.has(url),
            None => self.state.has(&self.current_page_url()),
        }
    }

    pub fn list(&self) -> Vec<Bookmark> {
        self.state.list()
    }

    pub fn local_bookmark_count(&self) -> usize {
        self.state.list().len()
    }

    pub fn clear(&mut self, options: ClearOptions) -> bool {
        self.state.clear(options)
    }

    /// Pushes local state and merges the authoritative response. Skipped
    /// when already in sync and not forced. Any failure leaves the local
    /// list untouched and the widget usable offline.
    pub async fn sync_from_server(&mut self, force: bool, full_server_replace: bool) {
        if !self.can_server() {
            return;
        }
        if !force && self.sync_status == SyncStatus::InSync {
            return;
        }
        let bookmarks = if full_server_replace {
            Vec::new()
        } else {
            self.state.list()
        };
        let code = self.state.get_code();
        let Some(net) = &self.net else {
            return;
        };
        let result = net.post_bookmarks(&code, &bookmarks).await;
        match result.success_envelope() {
            Some(envelope) => {
                self.state
                    .set_code_and_share_link(envelope.code.as_deref(), envelope.share_link.as_deref());
                self.state
                    .merge_from_server(&envelope.to_merge_payload(), full_server_replace);
                self.sync_status = SyncStatus::InSync;
            }
            None => {
                tracing::warn!("bookmark sync not ok: {:?}", result.error);
                self.sync_status = SyncStatus::OutOfSync;
            }
        }
    }

    /// Fire-and-forget telemetry that doubles as a drift check: the response
    /// carries the server's authoritative bookmark count, and a mismatch
    /// with the local count triggers a full re-sync.
    async fn ping(&mut self, event_type: &str, payload: serde_json::Value) {
        if !self.can_server() {
            return;
        }
        // A local mutation just happened; until the server confirms the
        // count we are out of sync.
        self.sync_status = SyncStatus::OutOfSync;
        let code = self.state.get_code();
        let Some(net) = &self.net else {
            return;
        };
        let result = net.post_event(&code, event_type, payload, now_ms()).await;
        let envelope = match result.success_envelope() {
            Some(envelope) => envelope.clone(),
            None => {
                tracing::warn!("event ping not ok: {} {:?}", event_type, result.error);
                self.sync_status = SyncStatus::OutOfSync;
                return;
            }
        };
        self.state
            .set_code_and_share_link(envelope.code.as_deref(), envelope.share_link.as_deref());
        let local = self.local_bookmark_count() as i64;
        match envelope.number_of_bookmarks {
            Some(server_count) if server_count != local => {
                tracing::debug!(
                    "bookmark count drift: local {} vs server {}",
                    local,
                    server_count
                );
                self.sync_status = SyncStatus::OutOfSync;
                self.sync_from_server(false, false).await;
            }
            _ => self.sync_status = SyncStatus::InSync,
        }
    }

    /// The share link resolved to an absolute URL on the page origin;
    /// empty string when no share link is available.
    pub fn share_link_absolute(&self) -> String {
        let link = self.state.get_share_link();
        to_absolute_url(&link, self.state.origin())
    }

    /// A `mailto:` link carrying the share link; empty string when no share
    /// link is available.
    pub fn email_link(&self) -> String {
        let absolute = self.share_link_absolute();
        if absolute.is_empty() {
            return String::new();
        }
        let query: String = form_urlencoded::Serializer::new(String::new())
            .append_pair("subject", &format!("Favourites: {}", absolute))
            .append_pair("body", &absolute)
            .finish();
        format!("mailto:?{}", query)
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
