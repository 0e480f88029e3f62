//! Bookmark State Manager.
//!
//! Owns the canonical in-memory bookmark list plus the session code and
//! share link; implements validated mutations, merge logic, and change
//! notification, persisting through the [`Store`] after every mutation.
//!
//! Every public operation returns a value — nothing here throws across the
//! boundary. Invalid input is an expected condition and answers `false`.
//!
//! Cross-tab updates arrive as store change notices; the manager re-reads
//! the affected key and adopts the value only when it actually differs from
//! the in-memory snapshot, so redundant self-notifications from this tab's
//! own writes never re-render anything.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{SystemTime, UNIX_EPOCH};

use ring::rand::{SecureRandom, SystemRandom};
use url::Url;

use crate::services::sanitizer::{sanitize_html, sanitize_title};
use crate::services::url_normalizer::{normalize_image_link, to_relative_url};
use crate::store::Store;
use crate::types::bookmark::{Bookmark, MergePayload};

/// Length of the generated session code.
const CODE_LENGTH: usize = 12;

const CODE_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// What `clear` keeps. Defaults to wiping everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClearOptions {
    pub keep_code: bool,
    pub keep_share_link: bool,
    pub keep_bookmarks: bool,
}

/// Trait defining the bookmark state operations.
pub trait StateManagerTrait {
    /// Snapshot of the list; never the live array.
    fn list(&self) -> Vec<Bookmark>;
    /// Membership test after normalizing `url`. Invalid input is `false`.
    fn has(&self, url: &str) -> bool;
    /// Validates, appends, persists. `false` without mutation on invalid
    /// input or duplicate URL.
    fn add(&self, url: &str, title: &str, imagelink: &str, description: &str) -> bool;
    /// Removes by URL, falling back to `index` when no URL match is found
    /// (stale UI references). Persists only when something was removed.
    fn remove(&self, url: &str, index: Option<usize>) -> bool;
    /// Single-element move. Out-of-range or equal indices are a silent no-op.
    fn reorder(&self, from: isize, to: isize);
    /// Selective reset. Always persists, always `true`.
    fn clear(&self, options: ClearOptions) -> bool;
    /// Overlays (or replaces with) incoming entries, URL-keyed, incoming
    /// wins. Invalid incoming entries are skipped silently.
    fn merge_from_server(&self, payload: &MergePayload, full_replace: bool);
    /// Consumes the one-shot share slot: full-replace merge, then clears the
    /// slot. Returns whether a merge occurred.
    fn merge_from_share_if_available(&self) -> bool;
    /// The session code, generated lazily on first access if absent.
    fn get_code(&self) -> String;
    /// The share link; empty string means "no share link available".
    fn get_share_link(&self) -> String;
    /// Adopts a server-issued code and share link. An empty code is ignored
    /// unless no code exists yet, in which case a fresh one is generated —
    /// the code is never left unset by this call.
    fn set_code_and_share_link(&self, code: Option<&str>, share_link: Option<&str>);
}

struct StateInner {
    bookmarks: Vec<Bookmark>,
    code: String,
    share_link: String,
}

type StateCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone, Default)]
struct ListenerSet {
    entries: Arc<Mutex<Vec<(u64, StateCallback)>>>,
    next_id: Arc<Mutex<u64>>,
}

impl ListenerSet {
    fn add<F: Fn() + Send + Sync + 'static>(&self, callback: F) -> u64 {
        let mut next = match self.next_id.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *next += 1;
        let id = *next;
        drop(next);
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((id, Arc::new(callback)));
        }
        id
    }

    fn remove(&self, id: u64) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        entries.len() != before
    }

    /// Invokes all listeners outside the lock.
    fn emit(&self) {
        let callbacks: Vec<StateCallback> = {
            let Ok(entries) = self.entries.lock() else {
                return;
            };
            entries.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };
        for callback in callbacks {
            callback();
        }
    }
}

/// Canonical bookmark state, persisted through a [`Store`].
pub struct StateManager {
    store: Store,
    origin: Url,
    bookmarks_key: String,
    code_key: String,
    share_link_key: String,
    inner: Arc<Mutex<StateInner>>,
    listeners: ListenerSet,
    store_listener: u64,
}

impl StateManager {
    /// Creates a manager over `store`, loading any previously persisted
    /// state. `origin` anchors URL normalization; an unparseable origin
    /// falls back to `http://localhost` rather than failing construction.
    pub fn new(store: Store, origin: &str, storage_key: &str) -> StateManager {
        let origin = Url::parse(origin).unwrap_or_else(|e| {
            tracing::warn!("invalid origin '{}', using localhost: {}", origin, e);
            Url::parse("http://localhost").expect("static origin parses")
        });

        let bookmarks_key = storage_key.to_string();
        let code_key = format!("{}_code", storage_key);
        let share_link_key = format!("{}_share_link", storage_key);

        let inner = Arc::new(Mutex::new(StateInner {
            bookmarks: store.get_json(&bookmarks_key).unwrap_or_default(),
            code: store.get(&code_key).unwrap_or_default(),
            share_link: store.get(&share_link_key).unwrap_or_default(),
        }));
        let listeners = ListenerSet::default();

        // Cross-tab and external updates: re-read the changed key and adopt
        // the value only if it differs from the in-memory snapshot.
        let store_listener = {
            let weak_inner: Weak<Mutex<StateInner>> = Arc::downgrade(&inner);
            let weak_store = store.downgrade();
            let listeners = listeners.clone();
            let bookmarks_key = bookmarks_key.clone();
            let code_key = code_key.clone();
            store.on_change(move |key: &str| {
                if key != bookmarks_key && key != code_key {
                    return;
                }
                let (Some(inner), Some(store)) = (weak_inner.upgrade(), weak_store.upgrade())
                else {
                    return;
                };
                let mut changed = false;
                if let Ok(mut guard) = inner.lock() {
                    if key == bookmarks_key {
                        let next: Vec<Bookmark> = store.get_json(key).unwrap_or_default();
                        if next != guard.bookmarks {
                            guard.bookmarks = next;
                            changed = true;
                        }
                    } else {
                        let next = store.get(key).unwrap_or_default();
                        if !next.is_empty() && next != guard.code {
                            guard.code = next;
                            changed = true;
                        }
                    }
                }
                if changed {
                    listeners.emit();
                }
            })
        };

        StateManager {
            store,
            origin,
            bookmarks_key,
            code_key,
            share_link_key,
            inner,
            listeners,
            store_listener,
        }
    }

    /// The origin bookmark URLs are normalized against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    /// Registers a listener fired on every successful persist and on adopted
    /// cross-tab changes. Returns an id for [`off_change`](Self::off_change).
    pub fn on_change<F: Fn() + Send + Sync + 'static>(&self, callback: F) -> u64 {
        self.listeners.add(callback)
    }

    pub fn off_change(&self, id: u64) -> bool {
        self.listeners.remove(id)
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Writes the whole state through the store, then notifies listeners.
    /// Runs after every mutation; each mutation is visible before the
    /// mutating call returns.
    fn persist(&self) {
        let (bookmarks, code, share_link) = {
            let guard = self.lock();
            (
                guard.bookmarks.clone(),
                guard.code.clone(),
                guard.share_link.clone(),
            )
        };
        self.store.set_json(&self.bookmarks_key, &bookmarks);
        self.store.set(&self.code_key, &code);
        self.store.set(&self.share_link_key, &share_link);
        self.listeners.emit();
    }

    /// Validates one incoming entry through the same pipeline as `add`.
    /// `None` means the entry is skipped.
    fn validate_entry(&self, entry: &Bookmark) -> Option<Bookmark> {
        let url = to_relative_url(&entry.url, &self.origin)?;
        let title = sanitize_title(&entry.title)?;
        Some(Bookmark {
            url,
            title,
            imagelink: normalize_image_link(&entry.imagelink, &self.origin),
            description: sanitize_html(&entry.description),
            ts: if entry.ts > 0 { entry.ts } else { now_ms() },
        })
    }
}

impl StateManagerTrait for StateManager {
    fn list(&self) -> Vec<Bookmark> {
        self.lock().bookmarks.clone()
    }

    fn has(&self, url: &str) -> bool {
        let Some(relative) = to_relative_url(url, &self.origin) else {
            return false;
        };
        self.lock().bookmarks.iter().any(|b| b.url == relative)
    }

    fn add(&self, url: &str, title: &str, imagelink: &str, description: &str) -> bool {
        let Some(relative) = to_relative_url(url, &self.origin) else {
            return false;
        };
        let Some(clean_title) = sanitize_title(title) else {
            return false;
        };
        {
            let mut guard = self.lock();
            if guard.bookmarks.iter().any(|b| b.url == relative) {
                return false;
            }
            guard.bookmarks.push(Bookmark {
                url: relative,
                title: clean_title,
                imagelink: normalize_image_link(imagelink, &self.origin),
                description: sanitize_html(description),
                ts: now_ms(),
            });
        }
        self.persist();
        true
    }

    fn remove(&self, url: &str, index: Option<usize>) -> bool {
        let relative = to_relative_url(url, &self.origin);
        let removed = {
            let mut guard = self.lock();
            let position = relative
                .as_ref()
                .and_then(|rel| guard.bookmarks.iter().position(|b| &b.url == rel));
            match position {
                Some(i) => {
                    guard.bookmarks.remove(i);
                    true
                }
                None => match index {
                    Some(i) if i < guard.bookmarks.len() => {
                        guard.bookmarks.remove(i);
                        true
                    }
                    _ => false,
                },
            }
        };
        if removed {
            self.persist();
        }
        removed
    }

    fn reorder(&self, from: isize, to: isize) {
        {
            let mut guard = self.lock();
            let len = guard.bookmarks.len() as isize;
            if from == to || from < 0 || to < 0 || from >= len || to >= len {
                return;
            }
            let entry = guard.bookmarks.remove(from as usize);
            guard.bookmarks.insert(to as usize, entry);
        }
        self.persist();
    }

    fn clear(&self, options: ClearOptions) -> bool {
        {
            let mut guard = self.lock();
            if !options.keep_bookmarks {
                guard.bookmarks.clear();
            }
            if !options.keep_code {
                guard.code.clear();
            }
            if !options.keep_share_link {
                guard.share_link.clear();
            }
        }
        self.persist();
        true
    }

    fn merge_from_server(&self, payload: &MergePayload, full_replace: bool) {
        {
            let mut guard = self.lock();
            if let Some(code) = payload.code.as_deref() {
                let trimmed = code.trim();
                if !trimmed.is_empty() {
                    guard.code = trimmed.to_string();
                }
            }

            let mut merged: Vec<Bookmark> = if full_replace {
                Vec::new()
            } else {
                guard.bookmarks.clone()
            };
            if let Some(incoming) = &payload.bookmarks {
                for entry in incoming {
                    let Some(candidate) = self.validate_entry(entry) else {
                        continue;
                    };
                    // URL-keyed overlay: collisions keep their position,
                    // new entries append in incoming order.
                    match merged.iter().position(|b| b.url == candidate.url) {
                        Some(i) => merged[i] = candidate,
                        None => merged.push(candidate),
                    }
                }
            }
            guard.bookmarks = merged;
        }
        self.persist();
    }

    fn merge_from_share_if_available(&self) -> bool {
        let Some(payload) = self.store.get_temporary_shared_data::<MergePayload>() else {
            return false;
        };
        self.merge_from_server(&payload, true);
        self.store.remove_temporary_shared_data();
        true
    }

    fn get_code(&self) -> String {
        {
            let guard = self.lock();
            if !guard.code.is_empty() {
                return guard.code.clone();
            }
        }
        // Defensive re-read: a cross-tab write may not be adopted yet.
        if let Some(stored) = self.store.get(&self.code_key) {
            if !stored.is_empty() {
                self.lock().code = stored.clone();
                return stored;
            }
        }
        let fresh = make_alphanum_code(CODE_LENGTH);
        self.lock().code = fresh.clone();
        self.store.set(&self.code_key, &fresh);
        fresh
    }

    fn get_share_link(&self) -> String {
        {
            let guard = self.lock();
            if !guard.share_link.is_empty() {
                return guard.share_link.clone();
            }
        }
        self.store.get(&self.share_link_key).unwrap_or_default()
    }

    fn set_code_and_share_link(&self, code: Option<&str>, share_link: Option<&str>) {
        let (code_out, share_out) = {
            let mut guard = self.lock();
            match code.map(str::trim).filter(|c| !c.is_empty()) {
                Some(c) => guard.code = c.to_string(),
                None => {
                    if guard.code.is_empty() {
                        guard.code = make_alphanum_code(CODE_LENGTH);
                    }
                }
            }
            if let Some(link) = share_link.map(str::trim).filter(|s| !s.is_empty()) {
                guard.share_link = link.to_string();
            }
            (guard.code.clone(), guard.share_link.clone())
        };
        self.store.set(&self.code_key, &code_out);
        self.store.set(&self.share_link_key, &share_out);
    }
}

impl Drop for StateManager {
    fn drop(&mut self) {
        self.store.off_change(self.store_listener);
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Pseudo-random alphanumeric code. Not a secret — it correlates an
/// anonymous browser with its server-side records — so the slight modulo
/// bias is acceptable.
fn make_alphanum_code(length: usize) -> String {
    let mut bytes = vec![0u8; length];
    if SystemRandom::new().fill(&mut bytes).is_err() {
        // SystemRandom exhausting is effectively unreachable; derive a
        // last-resort seed from the clock so the code is still non-empty.
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .subsec_nanos();
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = (seed.wrapping_mul(2654435761).wrapping_add(i as u32) >> 8) as u8;
        }
    }
    bytes
        .iter()
        .map(|b| CODE_CHARSET[*b as usize % CODE_CHARSET.len()] as char)
        .collect()
}
