//! Cross-tab convergence tests.
//!
//! Two stores (and state managers) on the same directory, joined by a
//! shared NotificationHub, stand in for two tabs of the same origin. A
//! mutation in tab A must be visible in tab B without any call into tab B's
//! mutation API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use pagefaves::managers::state_manager::{StateManager, StateManagerTrait};
use pagefaves::store::hub::NotificationHub;
use pagefaves::store::{Store, StoreConfig};
use tempfile::TempDir;

const ORIGIN: &str = "https://example.com";

fn two_tabs(broadcast_enabled: bool) -> (TempDir, StateManager, StateManager) {
    let dir = TempDir::new().expect("tempdir");
    let hub = NotificationHub::new();
    let mut config = StoreConfig::new("pf_store", dir.path());
    config.broadcast_enabled = broadcast_enabled;

    let store_a = Store::open(config.clone(), Some(hub.clone()));
    let store_b = Store::open(config, Some(hub));
    let tab_a = StateManager::new(store_a, ORIGIN, "pf_store");
    let tab_b = StateManager::new(store_b, ORIGIN, "pf_store");
    (dir, tab_a, tab_b)
}

/// An add in tab A shows up in tab B's list through notification alone.
#[test]
fn test_add_converges_across_tabs() {
    let (_dir, tab_a, tab_b) = two_tabs(true);

    assert!(tab_a.add("/x", "X", "", ""));

    let urls: Vec<String> = tab_b.list().into_iter().map(|b| b.url).collect();
    assert_eq!(urls, vec!["/x"]);
    assert!(tab_b.has("/x"));
}

/// Removals and reorders converge the same way.
#[test]
fn test_remove_and_reorder_converge() {
    let (_dir, tab_a, tab_b) = two_tabs(true);
    tab_a.add("/a", "A", "", "");
    tab_a.add("/b", "B", "", "");
    tab_a.add("/c", "C", "", "");

    tab_a.reorder(0, 2);
    let urls: Vec<String> = tab_b.list().into_iter().map(|b| b.url).collect();
    assert_eq!(urls, vec!["/b", "/c", "/a"]);

    tab_a.remove("/c", None);
    let urls: Vec<String> = tab_b.list().into_iter().map(|b| b.url).collect();
    assert_eq!(urls, vec!["/b", "/a"]);
}

/// With the broadcast channel unavailable, the storage-event safety net
/// still converges the tabs.
#[test]
fn test_convergence_without_broadcast_channel() {
    let (_dir, tab_a, tab_b) = two_tabs(false);

    assert!(tab_a.add("/x", "X", "", ""));
    assert!(tab_b.has("/x"));
}

/// The receiving tab notifies its listeners exactly once per adopted
/// change, and the writing tab's listeners are not double-fired by its own
/// notices echoing back.
#[test]
fn test_listener_counts_under_redundant_delivery() {
    let (_dir, tab_a, tab_b) = two_tabs(true);

    let a_hits = Arc::new(AtomicUsize::new(0));
    let b_hits = Arc::new(AtomicUsize::new(0));
    {
        let hits = Arc::clone(&a_hits);
        tab_a.on_change(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
    }
    {
        let hits = Arc::clone(&b_hits);
        tab_b.on_change(move || {
            hits.fetch_add(1, Ordering::SeqCst);
        });
    }

    tab_a.add("/x", "X", "", "");

    // Writer: one notification from its own persist, none from echoes.
    assert_eq!(a_hits.load(Ordering::SeqCst), 1);
    // Receiver: both channels delivered, but the value-diff collapses the
    // redundant notice into a single adoption.
    assert_eq!(b_hits.load(Ordering::SeqCst), 1);
}

/// Tabs converge on a code generated in another tab rather than minting
/// their own.
#[test]
fn test_code_converges_across_tabs() {
    let (_dir, tab_a, tab_b) = two_tabs(true);

    let code = tab_a.get_code();
    assert_eq!(tab_b.get_code(), code);
}

/// Wire-shaped raw messages reach store listeners; malformed ones are
/// dropped without disturbing anyone.
#[test]
fn test_raw_messages_and_garbage() {
    let dir = TempDir::new().expect("tempdir");
    let hub = NotificationHub::new();
    let store = Store::open(StoreConfig::new("pf_store", dir.path()), Some(hub.clone()));

    let hits = Arc::new(AtomicUsize::new(0));
    {
        let hits = Arc::clone(&hits);
        store.on_change(move |key| {
            assert_eq!(key, "pf_store");
            hits.fetch_add(1, Ordering::SeqCst);
        });
    }

    // Garbage in every shape: ignored.
    hub.publish_raw(&serde_json::json!(null));
    hub.publish_raw(&serde_json::json!("pf_store-changed"));
    hub.publish_raw(&serde_json::json!({"type": 42, "key": "pf_store"}));
    hub.publish_raw(&serde_json::json!({"type": "pf_store-changed"}));
    hub.publish_raw(&serde_json::json!({"type": "pf_store-renamed", "key": "k"}));
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    // A well-formed message for this namespace is delivered.
    hub.publish_raw(&serde_json::json!({"type": "pf_store-changed", "key": "pf_store"}));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // Messages for other namespaces are filtered out.
    hub.publish_raw(&serde_json::json!({"type": "other_ns-changed", "key": "pf_store"}));
    assert_eq!(hits.load(Ordering::SeqCst), 1);

    // The listener set survived all of the above.
    store.set("pf_store", "[]");
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

/// A dropped tab unsubscribes from the hub; later mutations do not touch it.
#[test]
fn test_dropped_store_unsubscribes() {
    let dir = TempDir::new().expect("tempdir");
    let hub = NotificationHub::new();
    let store_a = Store::open(StoreConfig::new("pf_store", dir.path()), Some(hub.clone()));
    let store_b = Store::open(StoreConfig::new("pf_store", dir.path()), Some(hub.clone()));
    assert_eq!(hub.subscriber_count(), 2);

    drop(store_b);
    assert_eq!(hub.subscriber_count(), 1);

    // Still deliverable to the survivor's listeners.
    let hits = Arc::new(AtomicUsize::new(0));
    {
        let hits = Arc::clone(&hits);
        store_a.on_change(move |_| {
            hits.fetch_add(1, Ordering::SeqCst);
        });
    }
    store_a.set("k", "v");
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}
