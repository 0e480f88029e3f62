//! Unit tests for the sync client contract types.
//!
//! The wire shapes must round-trip exactly (server interop), and transport
//! construction must reject misconfiguration without ever panicking.

use pagefaves::types::api::{ApiResult, PostBookmarksBody, PostEventBody, SyncEnvelope};
use pagefaves::types::bookmark::{Bookmark, MergePayload};
use rstest::rstest;

/// The bookmark wire shape round-trips exactly, lowercase `imagelink` and
/// `ts` included.
#[test]
fn test_bookmark_wire_shape_round_trips() {
    let raw = r#"{"url":"/path?q=1","title":"A title","imagelink":"","description":"","ts":1234567890}"#;
    let bookmark: Bookmark = serde_json::from_str(raw).expect("decode bookmark");
    assert_eq!(bookmark.url, "/path?q=1");
    assert_eq!(bookmark.ts, 1234567890);

    let encoded = serde_json::to_value(&bookmark).expect("encode bookmark");
    assert_eq!(
        encoded,
        serde_json::json!({
            "url": "/path?q=1",
            "title": "A title",
            "imagelink": "",
            "description": "",
            "ts": 1234567890u32,
        })
    );
}

/// Optional bookmark fields default rather than failing the decode.
#[test]
fn test_bookmark_optional_fields_default() {
    let bookmark: Bookmark =
        serde_json::from_str(r#"{"url":"/a","title":"T"}"#).expect("decode bookmark");
    assert_eq!(bookmark.imagelink, "");
    assert_eq!(bookmark.description, "");
    assert_eq!(bookmark.ts, 0);
}

/// The response envelope decodes with its camelCase field names.
#[test]
fn test_envelope_decodes_camel_case() {
    let raw = r#"{
        "status": "success",
        "code": "abc123def456",
        "shareLink": "/faves/abc123def456",
        "bookmarks": [{"url":"/a","title":"A","imagelink":"","description":"","ts":1}],
        "numberOfBookmarks": 1
    }"#;
    let envelope: SyncEnvelope = serde_json::from_str(raw).expect("decode envelope");
    assert!(envelope.is_success());
    assert_eq!(envelope.code.as_deref(), Some("abc123def456"));
    assert_eq!(envelope.share_link.as_deref(), Some("/faves/abc123def456"));
    assert_eq!(envelope.number_of_bookmarks, Some(1));
    assert_eq!(envelope.bookmarks.as_ref().map(Vec::len), Some(1));
}

/// A minimal envelope (status only) still decodes.
#[test]
fn test_envelope_minimal() {
    let envelope: SyncEnvelope =
        serde_json::from_str(r#"{"status":"error"}"#).expect("decode envelope");
    assert!(!envelope.is_success());
    assert_eq!(envelope.bookmarks, None);
    assert_eq!(envelope.number_of_bookmarks, None);
}

#[rstest]
#[case("success", true)]
#[case("error", false)]
#[case("SUCCESS", false)]
#[case("", false)]
fn test_envelope_status_strings(#[case] status: &str, #[case] expected: bool) {
    let envelope = SyncEnvelope {
        status: status.to_string(),
        code: None,
        share_link: None,
        bookmarks: None,
        number_of_bookmarks: None,
    };
    assert_eq!(envelope.is_success(), expected);
}

/// success_envelope() demands both transport success and a success status.
#[test]
fn test_api_result_success_envelope() {
    let success = SyncEnvelope {
        status: "success".to_string(),
        code: None,
        share_link: None,
        bookmarks: None,
        number_of_bookmarks: None,
    };
    let error = SyncEnvelope {
        status: "error".to_string(),
        ..success.clone()
    };

    let ok = ApiResult {
        ok: true,
        status: 200,
        data: Some(success.clone()),
        error: None,
    };
    assert!(ok.success_envelope().is_some());

    let ok_but_error_status = ApiResult {
        ok: true,
        status: 200,
        data: Some(error),
        error: None,
    };
    assert!(ok_but_error_status.success_envelope().is_none());

    let transport_ok_http_fail = ApiResult {
        ok: false,
        status: 500,
        data: Some(success),
        error: Some("HTTP 500".to_string()),
    };
    assert!(transport_ok_http_fail.success_envelope().is_none());

    let failed = ApiResult::failure("connection refused");
    assert!(!failed.ok);
    assert_eq!(failed.status, 0);
    assert!(failed.success_envelope().is_none());
}

/// Request bodies serialize to the documented wire contract (`type`, `at`).
#[test]
fn test_request_body_shapes() {
    let event = PostEventBody {
        code: "abc".to_string(),
        event_type: "added".to_string(),
        payload: serde_json::json!({"url": "/a"}),
        at: 1700000000000,
    };
    let encoded = serde_json::to_value(&event).expect("encode event body");
    assert_eq!(
        encoded,
        serde_json::json!({
            "code": "abc",
            "type": "added",
            "payload": {"url": "/a"},
            "at": 1700000000000i64,
        })
    );

    let push = PostBookmarksBody {
        code: "abc".to_string(),
        bookmarks: vec![],
    };
    let encoded = serde_json::to_value(&push).expect("encode bookmarks body");
    assert_eq!(encoded, serde_json::json!({"code": "abc", "bookmarks": []}));
}

/// MergePayload tolerates every field being absent.
#[test]
fn test_merge_payload_defaults() {
    let payload: MergePayload = serde_json::from_str("{}").expect("decode payload");
    assert_eq!(payload.code, None);
    assert_eq!(payload.share_link, None);
    assert!(payload.bookmarks.is_none());
}

#[cfg(feature = "network")]
mod http {
    use pagefaves::services::sync_client::HttpSyncTransport;
    use pagefaves::types::options::Options;

    /// An empty base URL is a configuration error, not a runtime panic.
    #[test]
    fn test_transport_rejects_missing_base_url() {
        let opts = Options::default();
        assert!(HttpSyncTransport::from_options(&opts).is_err());

        let mut opts = Options::default();
        opts.base_url = "   ".to_string();
        assert!(HttpSyncTransport::from_options(&opts).is_err());

        let mut opts = Options::default();
        opts.base_url = "not a url at all".to_string();
        assert!(HttpSyncTransport::from_options(&opts).is_err());
    }

    /// A well-formed base URL builds, trailing slashes and all.
    #[test]
    fn test_transport_accepts_base_url() {
        let mut opts = Options::default();
        opts.base_url = "https://api.example.com/widget///".to_string();
        opts.timeout_ms = Some(2500);
        assert!(HttpSyncTransport::from_options(&opts).is_ok());
    }
}
