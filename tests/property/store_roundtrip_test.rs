//! Property-based tests for the storage layer.
//!
//! Whatever gets stored must come back byte-identical, through the
//! high-capacity primary, the cookie-jar fallback, and the JSON helpers.

use pagefaves::store::backend::StorageBackend;
use pagefaves::store::cookie_jar::CookieJarBackend;
use pagefaves::store::{PrimaryKind, Store, StoreConfig};
use pagefaves::types::bookmark::Bookmark;
use proptest::prelude::*;
use tempfile::TempDir;

/// Keys the widget would realistically use.
fn arb_key() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,20}"
}

/// Arbitrary printable values, including characters that need escaping in
/// JSON, cookies, and SQL.
fn arb_value() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[ -~]{0,200}").expect("value regex")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // set/get round-trips through the high-capacity primary.
    #[test]
    fn sqlite_primary_round_trips(key in arb_key(), value in arb_value()) {
        let dir = TempDir::new().expect("tempdir");
        let store = Store::open(StoreConfig::new("pf_store", dir.path()), None);
        prop_assert_eq!(store.primary_kind(), PrimaryKind::HighCapacity);

        store.set(&key, &value);
        let got = store.get(&key);
        prop_assert_eq!(got.as_deref(), Some(value.as_str()));

        store.remove(&key);
        prop_assert_eq!(store.get(&key), None);
    }

    // The cookie jar round-trips any value within its capacity, across
    // separate jar instances on the same file.
    #[test]
    fn cookie_jar_round_trips(key in arb_key(), value in arb_value()) {
        let dir = TempDir::new().expect("tempdir");
        let jar = CookieJarBackend::new(dir.path().join("jar.json"));

        jar.set(&key, &value).expect("jar write");
        let reopened = CookieJarBackend::new(dir.path().join("jar.json"));
        let got = reopened.get(&key).expect("jar read");
        prop_assert_eq!(got.as_deref(), Some(value.as_str()));
    }

    // JSON helpers round-trip whole bookmark lists.
    #[test]
    fn json_round_trips_bookmark_lists(
        urls in proptest::collection::hash_set("/[a-z0-9]{1,10}", 0..5),
        title in "[a-zA-Z][a-zA-Z0-9 ]{0,20}",
    ) {
        let dir = TempDir::new().expect("tempdir");
        let store = Store::open(StoreConfig::new("pf_store", dir.path()), None);

        let bookmarks: Vec<Bookmark> = urls
            .iter()
            .map(|url| Bookmark {
                url: url.clone(),
                title: title.clone(),
                imagelink: String::new(),
                description: String::new(),
                ts: 1,
            })
            .collect();

        store.set_json("pf_store", &bookmarks);
        let back: Vec<Bookmark> = store.get_json("pf_store").unwrap_or_default();
        prop_assert_eq!(back, bookmarks);
    }

    // Fallback mode round-trips too: the store works the same through the
    // cookie jar when the high-capacity backend is unusable.
    #[test]
    fn fallback_round_trips(key in arb_key(), value in arb_value()) {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path().join("pf_store.db")).expect("squat db path");

        let store = Store::open(StoreConfig::new("pf_store", dir.path()), None);
        prop_assert_eq!(store.primary_kind(), PrimaryKind::CookieFallback);

        store.set(&key, &value);
        let got = store.get(&key);
        prop_assert_eq!(got.as_deref(), Some(value.as_str()));
    }
}
