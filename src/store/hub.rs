//! Cross-context change notification fabric.
//!
//! A [`NotificationHub`] stands in for the same-origin signaling a browser
//! provides between tabs: every `Store` attached to the same hub hears about
//! every other store's mutations. Two redundant channels feed the same
//! subscriber set — a low-latency broadcast message posted by the writer and
//! a storage-event signal emitted when the durable backend changes. Neither
//! channel delivers back to the writer; writers notify their own listeners
//! directly.

use std::sync::{Arc, Mutex};

use serde_json::Value;

/// Which of the two redundant channels carried a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Explicit broadcast posted by the writer right after a mutation.
    /// The primary, low-latency channel.
    Broadcast,
    /// Native change signal from the durable backend. The safety net.
    StorageEvent,
}

/// A single change notification.
#[derive(Debug, Clone)]
pub struct ChangeNotice {
    /// Store namespace the change belongs to. Subscribers ignore foreign
    /// namespaces.
    pub namespace: String,
    /// The key that changed.
    pub key: String,
    pub channel: ChannelKind,
    /// Hub subscriber id of the writer; `0` for external messages.
    pub sender: u64,
}

type HubCallback = Arc<dyn Fn(&ChangeNotice) + Send + Sync>;

struct HubSubscriber {
    id: u64,
    callback: HubCallback,
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    subscribers: Vec<HubSubscriber>,
}

/// Shared notification fabric. Cloning yields another handle to the same
/// fabric; all stores of one "origin" must share one hub to see each other.
#[derive(Clone, Default)]
pub struct NotificationHub {
    inner: Arc<Mutex<HubInner>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber. The returned id identifies the subscriber in
    /// [`publish`](Self::publish) (senders never hear their own notices) and
    /// in [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, callback: F) -> u64
    where
        F: Fn(&ChangeNotice) + Send + Sync + 'static,
    {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(HubSubscriber {
            id,
            callback: Arc::new(callback),
        });
        id
    }

    /// Removes a subscriber. Returns whether anything was removed.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let before = inner.subscribers.len();
        inner.subscribers.retain(|s| s.id != id);
        inner.subscribers.len() != before
    }

    /// Fans the notice out to every subscriber except the sender.
    ///
    /// Callbacks run outside the hub lock, so a subscriber may publish again
    /// (e.g. a store reacting to a change by writing) without deadlocking.
    pub fn publish(&self, notice: &ChangeNotice) {
        let callbacks: Vec<HubCallback> = {
            let inner = match self.inner.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            inner
                .subscribers
                .iter()
                .filter(|s| s.id != notice.sender)
                .map(|s| Arc::clone(&s.callback))
                .collect()
        };
        for callback in callbacks {
            callback(notice);
        }
    }

    /// Accepts a wire-shaped broadcast message, `{"type": "<namespace>-changed",
    /// "key": "..."}`, and fans it out as an external broadcast notice.
    ///
    /// Malformed messages are dropped silently; one bad message must never
    /// crash a listener or unsubscribe the others.
    pub fn publish_raw(&self, message: &Value) {
        let Some(kind) = message.get("type").and_then(Value::as_str) else {
            return;
        };
        let Some(namespace) = kind.strip_suffix("-changed") else {
            return;
        };
        let Some(key) = message.get("key").and_then(Value::as_str) else {
            return;
        };
        self.publish(&ChangeNotice {
            namespace: namespace.to_string(),
            key: key.to_string(),
            channel: ChannelKind::Broadcast,
            sender: 0,
        });
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        match self.inner.lock() {
            Ok(guard) => guard.subscribers.len(),
            Err(poisoned) => poisoned.into_inner().subscribers.len(),
        }
    }
}
