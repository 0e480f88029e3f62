//! Cookie-like fallback backend.
//!
//! A small-capacity mirror with cookie semantics: bounded value size, long
//! expiry, survives even when the high-capacity backend is unavailable.
//! Entries live in one JSON file; values are base64-encoded so the file
//! stays separator-safe the way real cookie values must be. Each operation
//! is a read-modify-write of the whole file — concurrent writers race and
//! the last write wins, which is the accepted consistency model.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::types::errors::StoreError;

use super::backend::StorageBackend;

/// Per-value capacity, matching the ~4KB a cookie may carry.
pub const MAX_VALUE_BYTES: usize = 4096;

/// Default entry lifetime: ten years, in seconds.
const DEFAULT_TTL_SECS: i64 = 3650 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct JarEntry {
    /// Base64 of the stored value.
    value: String,
    /// Epoch seconds after which the entry is treated as gone.
    expires_at: i64,
}

/// File-backed cookie jar.
#[derive(Clone)]
pub struct CookieJarBackend {
    path: Arc<PathBuf>,
    ttl_secs: i64,
}

impl CookieJarBackend {
    pub fn new(path: PathBuf) -> Self {
        Self::with_ttl(path, DEFAULT_TTL_SECS)
    }

    /// Jar with a custom entry lifetime in seconds.
    pub fn with_ttl(path: PathBuf, ttl_secs: i64) -> Self {
        Self {
            path: Arc::new(path),
            ttl_secs,
        }
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }

    /// Loads the jar, dropping entries that have expired. A missing file is
    /// an empty jar; an unreadable or corrupt file is treated as empty too
    /// (a broken jar must not take the widget down).
    fn load(&self) -> HashMap<String, JarEntry> {
        let raw = match fs::read_to_string(self.path.as_ref()) {
            Ok(raw) => raw,
            Err(_) => return HashMap::new(),
        };
        let mut entries: HashMap<String, JarEntry> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!("cookie jar corrupt, starting empty: {}", e);
                return HashMap::new();
            }
        };
        let now = Self::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries
    }

    fn save(&self, entries: &HashMap<String, JarEntry>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let raw = serde_json::to_string(entries)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::write(self.path.as_ref(), raw).map_err(|e| StoreError::Io(e.to_string()))
    }
}

impl StorageBackend for CookieJarBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.load();
        let Some(entry) = entries.get(key) else {
            return Ok(None);
        };
        let bytes = BASE64
            .decode(&entry.value)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if value.len() > MAX_VALUE_BYTES {
            return Err(StoreError::ValueTooLarge {
                key: key.to_string(),
                size: value.len(),
            });
        }
        let mut entries = self.load();
        entries.insert(
            key.to_string(),
            JarEntry {
                value: BASE64.encode(value),
                expires_at: Self::now() + self.ttl_secs,
            },
        );
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.load();
        if entries.remove(key).is_some() || !entries.is_empty() {
            return self.save(&entries);
        }
        // Nothing stored and nothing removed; avoid creating an empty file.
        Ok(())
    }
}
