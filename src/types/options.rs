use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which physical store backs the widget's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageMode {
    /// High-capacity durable storage with a cookie-like mirror.
    Local,
    /// Instance-scoped storage that vanishes with the widget; no mirroring.
    Session,
}

/// Whether the sync transport sends ambient credentials (cookies) with
/// requests. Mirrors the fetch credentials modes embedders already know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialsMode {
    Omit,
    SameOrigin,
    Include,
}

/// Endpoint paths, resolved against [`Options::base_url`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub events: String,
    pub bookmarks: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            events: "events".to_string(),
            bookmarks: "bookmarks".to_string(),
        }
    }
}

/// Embedder-facing configuration.
///
/// Keys deserialize from camelCase so a JSON config written for the widget
/// works unchanged (`{"storageKey": "...", "baseUrl": "...", ...}`). Unknown
/// keys are ignored. Layering follows `defaults < site-wide < page`, see
/// [`Options::layered`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    // storage
    pub storage: StorageMode,
    pub storage_key: String,
    pub name_of_temporary_shared_store: String,
    /// Directory for the store's files. `None` selects the platform default.
    pub data_dir: Option<PathBuf>,
    /// Whether the low-latency broadcast channel is available. Disabled, the
    /// store degrades to storage-event signaling alone.
    pub broadcast_enabled: bool,

    // current page
    /// Origin the widget runs under, e.g. `https://example.com`. Bookmark
    /// URLs resolving to any other origin are rejected.
    pub origin: String,
    pub current_page_url: Option<String>,
    pub current_page_title: Option<String>,
    pub current_page_imagelink: Option<String>,
    pub current_page_description: Option<String>,

    // server
    pub base_url: String,
    pub endpoints: Endpoints,
    /// Request timeout in milliseconds; `None` means no explicit timeout.
    #[serde(rename = "timeout")]
    pub timeout_ms: Option<u64>,
    pub credentials: CredentialsMode,

    // sync toggles
    pub sync_on_load: bool,
    pub user_is_logged_in: bool,
    pub merge_on_load: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            storage: StorageMode::Local,
            storage_key: "pf_store".to_string(),
            name_of_temporary_shared_store: "pf_store_share_bookmark_list".to_string(),
            data_dir: None,
            broadcast_enabled: true,
            origin: "http://localhost".to_string(),
            current_page_url: None,
            current_page_title: None,
            current_page_imagelink: None,
            current_page_description: None,
            base_url: String::new(),
            endpoints: Endpoints::default(),
            timeout_ms: None,
            credentials: CredentialsMode::SameOrigin,
            sync_on_load: true,
            user_is_logged_in: false,
            merge_on_load: false,
        }
    }
}

impl Options {
    /// Builds options from layered JSON fragments with the precedence
    /// `defaults < site_wide < page`. A fragment that fails to deserialize
    /// after merging is discarded in favor of the defaults (configuration
    /// mistakes must not take the widget down).
    pub fn layered(site_wide: Value, page: Value) -> Options {
        let defaults = serde_json::to_value(Options::default())
            .expect("default options always serialize");
        let merged = deep_merge(deep_merge(defaults, site_wide), page);
        match serde_json::from_value(merged) {
            Ok(opts) => opts,
            Err(e) => {
                tracing::warn!("invalid layered options, using defaults: {}", e);
                Options::default()
            }
        }
    }

    /// Storage key holding the JSON bookmark array.
    pub fn bookmarks_key(&self) -> String {
        self.storage_key.clone()
    }

    /// Storage key holding the session code.
    pub fn code_key(&self) -> String {
        format!("{}_code", self.storage_key)
    }

    /// Storage key holding the share link.
    pub fn share_link_key(&self) -> String {
        format!("{}_share_link", self.storage_key)
    }
}

/// Recursively merges `overlay` onto `base`. Objects merge key-by-key;
/// everything else (arrays included) is overwritten by the overlay value.
/// `Null` in the overlay is treated as "not provided" and keeps the base.
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged);
            }
            Value::Object(base_map)
        }
        (base, Value::Null) => base,
        (_, overlay) => overlay,
    }
}
