//! pagefaves storage layer.
//!
//! A [`Store`] is durable, namespaced key-value storage with JSON helpers,
//! automatic backend selection, cross-context change notification, and a
//! one-shot shared-data slot for share-link imports.
//!
//! Backend selection happens once, at open: the high-capacity SQLite backend
//! is probed with a write-read-delete round-trip and, if it misbehaves, the
//! store falls back permanently to the cookie jar. In `Local` mode with a
//! healthy primary, every write is also mirrored into the jar so that the
//! data survives the high-capacity backend becoming unavailable later.
//!
//! Every backend failure is swallowed here: reads degrade to `None`, writes
//! to no-ops. A storage problem must never crash the embedding page.

pub mod backend;
pub mod cookie_jar;
pub mod hub;

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::types::options::StorageMode;

use backend::{MemoryBackend, SqliteBackend, StorageBackend};
use cookie_jar::CookieJarBackend;
use hub::{ChangeNotice, ChannelKind, NotificationHub};

/// Which backend ended up as the primary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryKind {
    /// The high-capacity SQLite backend, mirrored into the cookie jar.
    HighCapacity,
    /// The cookie jar, after the high-capacity probe failed. Permanent for
    /// this store's lifetime; no re-probing.
    CookieFallback,
    /// The instance-scoped memory backend (session mode). No mirroring.
    SessionMemory,
}

/// Configuration for opening a [`Store`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub mode: StorageMode,
    /// Namespace for keys, file names, and change notices.
    pub namespace: String,
    /// Well-known key of the one-shot shared-data slot. Defaults to
    /// `{namespace}_share_bookmark_list`.
    pub temp_shared_key: Option<String>,
    /// Directory holding the SQLite file and the cookie jar.
    pub data_dir: PathBuf,
    /// Whether the low-latency broadcast channel is available.
    pub broadcast_enabled: bool,
}

impl StoreConfig {
    pub fn new(namespace: impl Into<String>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            mode: StorageMode::Local,
            namespace: namespace.into(),
            temp_shared_key: None,
            data_dir: data_dir.into(),
            broadcast_enabled: true,
        }
    }
}

/// Listener registered with [`Store::on_change`].
type StoreCallback = Arc<dyn Fn(&str) + Send + Sync>;

struct StoreInner {
    namespace: String,
    temp_shared_key: String,
    primary_kind: PrimaryKind,
    primary: Box<dyn StorageBackend>,
    /// Read path falls through to the jar in `Local` mode.
    read_fallback: Option<CookieJarBackend>,
    /// Write path mirrors into the jar only while the primary is the
    /// high-capacity backend.
    write_mirror: Option<CookieJarBackend>,
    /// High-capacity handle for the shared-data slot, kept even in session
    /// mode; `None` when the backend is unusable.
    share_slot: Option<SqliteBackend>,
    listeners: Mutex<Vec<(u64, StoreCallback)>>,
    next_listener_id: Mutex<u64>,
    hub: Option<NotificationHub>,
    hub_subscriber: Mutex<u64>,
    broadcast_enabled: bool,
}

impl Drop for StoreInner {
    fn drop(&mut self) {
        if let Some(hub) = &self.hub {
            let id = match self.hub_subscriber.lock() {
                Ok(guard) => *guard,
                Err(poisoned) => *poisoned.into_inner(),
            };
            if id != 0 {
                hub.unsubscribe(id);
            }
        }
    }
}

/// Hybrid key-value store. Cheap to clone; clones share the same backends
/// and listener set.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

/// Non-owning store handle for listener closures.
pub struct WeakStore {
    inner: Weak<StoreInner>,
}

impl WeakStore {
    pub fn upgrade(&self) -> Option<Store> {
        self.inner.upgrade().map(|inner| Store { inner })
    }
}

impl Store {
    /// Opens a store. Never fails: an unusable high-capacity backend selects
    /// the cookie fallback, and an unusable directory degrades to warn-and-
    /// no-op semantics on every operation.
    pub fn open(config: StoreConfig, hub: Option<NotificationHub>) -> Store {
        if let Err(e) = fs::create_dir_all(&config.data_dir) {
            tracing::warn!("store data dir unavailable: {}", e);
        }

        let db_path = config.data_dir.join(format!("{}.db", config.namespace));
        let jar = CookieJarBackend::new(
            config.data_dir.join(format!("{}_cookies.json", config.namespace)),
        );

        let high_capacity = match SqliteBackend::open(&db_path) {
            Ok(backend) if Self::probe(&backend, &config.namespace) => Some(backend),
            Ok(_) => {
                tracing::warn!("high-capacity backend failed probe, using cookie fallback");
                None
            }
            Err(e) => {
                tracing::warn!("high-capacity backend unavailable: {}", e);
                None
            }
        };

        let (primary_kind, primary, read_fallback, write_mirror): (
            PrimaryKind,
            Box<dyn StorageBackend>,
            Option<CookieJarBackend>,
            Option<CookieJarBackend>,
        ) = match config.mode {
            StorageMode::Session => (
                PrimaryKind::SessionMemory,
                Box::new(MemoryBackend::new()) as Box<dyn StorageBackend>,
                None,
                None,
            ),
            StorageMode::Local => match &high_capacity {
                Some(backend) => (
                    PrimaryKind::HighCapacity,
                    Box::new(backend.clone()) as Box<dyn StorageBackend>,
                    Some(jar.clone()),
                    Some(jar.clone()),
                ),
                None => (
                    PrimaryKind::CookieFallback,
                    Box::new(jar.clone()) as Box<dyn StorageBackend>,
                    Some(jar.clone()),
                    None,
                ),
            },
        };

        let temp_shared_key = config
            .temp_shared_key
            .unwrap_or_else(|| format!("{}_share_bookmark_list", config.namespace));

        let store = Store {
            inner: Arc::new(StoreInner {
                namespace: config.namespace,
                temp_shared_key,
                primary_kind,
                primary,
                read_fallback,
                write_mirror,
                share_slot: high_capacity,
                listeners: Mutex::new(Vec::new()),
                next_listener_id: Mutex::new(0),
                hub: hub.clone(),
                hub_subscriber: Mutex::new(0),
                broadcast_enabled: config.broadcast_enabled,
            }),
        };

        if let Some(hub) = &hub {
            let weak = store.downgrade();
            let namespace = store.inner.namespace.clone();
            let id = hub.subscribe(move |notice: &ChangeNotice| {
                if notice.namespace != namespace {
                    return;
                }
                if let Some(store) = weak.upgrade() {
                    store.emit(&notice.key);
                }
            });
            if let Ok(mut guard) = store.inner.hub_subscriber.lock() {
                *guard = id;
            }
        }

        store
    }

    /// Write-read-delete round-trip of a throwaway key. A backend that does
    /// not return the exact value it was given is treated as unusable.
    fn probe(backend: &SqliteBackend, namespace: &str) -> bool {
        let key = format!("__{}_probe_{}", namespace, Uuid::new_v4().simple());
        if backend.set(&key, "1").is_err() {
            return false;
        }
        let ok = matches!(backend.get(&key), Ok(Some(value)) if value == "1");
        let _ = backend.remove(&key);
        ok
    }

    pub fn downgrade(&self) -> WeakStore {
        WeakStore {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn primary_kind(&self) -> PrimaryKind {
        self.inner.primary_kind
    }

    /// Reads a key from the primary backend, falling through to the cookie
    /// mirror in `Local` mode. Failures degrade to `None`.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.inner.primary.get(key) {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(e) => tracing::warn!("store get('{}') failed: {}", key, e),
        }
        let fallback = self.inner.read_fallback.as_ref()?;
        match fallback.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("store fallback get('{}') failed: {}", key, e);
                None
            }
        }
    }

    /// Writes a key to the primary backend, mirrors it when mirroring is
    /// active, then notifies the other tabs and this store's own listeners.
    pub fn set(&self, key: &str, value: &str) {
        if let Err(e) = self.inner.primary.set(key, value) {
            tracing::warn!("store set('{}') failed: {}", key, e);
        }
        if let Some(mirror) = &self.inner.write_mirror {
            if let Err(e) = mirror.set(key, value) {
                tracing::warn!("cookie mirror set('{}') failed: {}", key, e);
            }
        }
        self.publish(key);
        self.emit(key);
    }

    /// Removes a key from the primary backend and the mirror, then notifies.
    pub fn remove(&self, key: &str) {
        if let Err(e) = self.inner.primary.remove(key) {
            tracing::warn!("store remove('{}') failed: {}", key, e);
        }
        if let Some(mirror) = &self.inner.write_mirror {
            if let Err(e) = mirror.remove(key) {
                tracing::warn!("cookie mirror remove('{}') failed: {}", key, e);
            }
        }
        self.publish(key);
        self.emit(key);
    }

    /// JSON read. A missing key or a value that fails to decode both come
    /// back as `None`; decode failure never propagates.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        serde_json::from_str(&raw).ok()
    }

    /// JSON write. An unserializable value degrades to a warned no-op.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        match serde_json::to_string(value) {
            Ok(raw) => self.set(key, &raw),
            Err(e) => tracing::warn!("store set_json('{}') failed to encode: {}", key, e),
        }
    }

    /// Reads the one-shot shared-data slot. The slot always lives in the
    /// high-capacity backend and is never cookie-mirrored; when that backend
    /// is unusable there is no slot and this returns `None`.
    pub fn get_temporary_shared_data<T: DeserializeOwned>(&self) -> Option<T> {
        let slot = self.inner.share_slot.as_ref()?;
        let raw = match slot.get(&self.inner.temp_shared_key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!("shared slot read failed: {}", e);
                return None;
            }
        };
        serde_json::from_str(&raw).ok()
    }

    /// Stages data in the shared slot for one-time consumption by the next
    /// state-manager initialization (the share-link landing write). Returns
    /// whether the write went through.
    pub fn set_temporary_shared_data<T: Serialize>(&self, value: &T) -> bool {
        let Some(slot) = self.inner.share_slot.as_ref() else {
            return false;
        };
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("shared slot encode failed: {}", e);
                return false;
            }
        };
        if let Err(e) = slot.set(&self.inner.temp_shared_key, &raw) {
            tracing::warn!("shared slot write failed: {}", e);
            return false;
        }
        let key = self.inner.temp_shared_key.clone();
        self.publish(&key);
        self.emit(&key);
        true
    }

    /// Clears the shared slot. Idempotent: clearing an absent slot is a
    /// no-op that still reports `true` and still notifies listeners.
    pub fn remove_temporary_shared_data(&self) -> bool {
        if let Some(slot) = self.inner.share_slot.as_ref() {
            if let Err(e) = slot.remove(&self.inner.temp_shared_key) {
                tracing::warn!("shared slot remove failed: {}", e);
            }
        }
        let key = self.inner.temp_shared_key.clone();
        self.publish(&key);
        self.emit(&key);
        true
    }

    /// Registers a change listener. Listeners are invoked with the changed
    /// key for this store's own mutations and for notices from other tabs.
    pub fn on_change<F>(&self, callback: F) -> u64
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        let mut next = match self.inner.next_listener_id.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *next += 1;
        let id = *next;
        drop(next);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push((id, Arc::new(callback)));
        }
        id
    }

    /// Removes a listener. Returns whether anything was removed.
    pub fn off_change(&self, id: u64) -> bool {
        let Ok(mut listeners) = self.inner.listeners.lock() else {
            return false;
        };
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    /// Posts the change on both cross-tab channels. The broadcast goes out
    /// whenever broadcasting is enabled; the storage-event signal only fires
    /// while the primary is the high-capacity backend, which is when native
    /// storage events would actually fire.
    fn publish(&self, key: &str) {
        let Some(hub) = &self.inner.hub else {
            return;
        };
        let sender = match self.inner.hub_subscriber.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        };
        if self.inner.broadcast_enabled {
            hub.publish(&ChangeNotice {
                namespace: self.inner.namespace.clone(),
                key: key.to_string(),
                channel: ChannelKind::Broadcast,
                sender,
            });
        }
        if self.inner.primary_kind == PrimaryKind::HighCapacity {
            hub.publish(&ChangeNotice {
                namespace: self.inner.namespace.clone(),
                key: key.to_string(),
                channel: ChannelKind::StorageEvent,
                sender,
            });
        }
    }

    /// Invokes this store's own listeners. Callbacks run outside the
    /// listener lock so they may call back into the store.
    fn emit(&self, key: &str) {
        let callbacks: Vec<StoreCallback> = {
            let Ok(listeners) = self.inner.listeners.lock() else {
                return;
            };
            listeners.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback(key);
        }
    }
}
