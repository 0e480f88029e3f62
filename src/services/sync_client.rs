//! Remote sync client.
//!
//! The state layer depends only on the [`SyncTransport`] contract: push the
//! bookmark list, fire telemetry events, always resolve to an [`ApiResult`]
//! — network and decode failures surface as `ok: false`, never as a panic
//! or an `Err` past this boundary.
//!
//! [`HttpSyncTransport`] is the production implementation (cargo feature
//! `network`); tests substitute their own transport.

use crate::types::api::ApiResult;
use crate::types::bookmark::Bookmark;

/// Contract the state manager and orchestrator depend on.
///
/// `at` is epoch milliseconds. Event kinds are free-form strings; the
/// well-known ones are in [`crate::types::api`].
pub trait SyncTransport {
    fn post_bookmarks(
        &self,
        code: &str,
        bookmarks: &[Bookmark],
    ) -> impl std::future::Future<Output = ApiResult> + Send;

    fn post_event(
        &self,
        code: &str,
        event_type: &str,
        payload: serde_json::Value,
        at: i64,
    ) -> impl std::future::Future<Output = ApiResult> + Send;
}

#[cfg(feature = "network")]
pub use http::HttpSyncTransport;

#[cfg(feature = "network")]
mod http {
    use std::time::Duration;

    use serde::Serialize;
    use url::Url;

    use crate::types::api::{ApiResult, PostBookmarksBody, PostEventBody, SyncEnvelope};
    use crate::types::bookmark::Bookmark;
    use crate::types::errors::SyncError;
    use crate::types::options::{CredentialsMode, Endpoints, Options};

    use super::SyncTransport;

    /// JSON-over-HTTP transport backed by `reqwest`.
    pub struct HttpSyncTransport {
        client: reqwest::Client,
        base_url: Url,
        endpoints: Endpoints,
    }

    impl HttpSyncTransport {
        /// Builds the transport from widget options. Fails only on a missing
        /// or unparseable base URL — a misconfiguration, not a runtime
        /// condition.
        pub fn from_options(opts: &Options) -> Result<Self, SyncError> {
            let trimmed = opts.base_url.trim().trim_end_matches('/');
            if trimmed.is_empty() {
                return Err(SyncError::InvalidBaseUrl(opts.base_url.clone()));
            }
            // Trailing slash so Url::join appends instead of replacing.
            let base_url = Url::parse(&format!("{}/", trimmed))
                .map_err(|_| SyncError::InvalidBaseUrl(opts.base_url.clone()))?;

            let mut builder = reqwest::Client::builder()
                .cookie_store(!matches!(opts.credentials, CredentialsMode::Omit));
            if let Some(ms) = opts.timeout_ms {
                builder = builder.timeout(Duration::from_millis(ms));
            }
            let client = builder
                .build()
                .map_err(|e| SyncError::Network(e.to_string()))?;

            Ok(Self {
                client,
                base_url,
                endpoints: opts.endpoints.clone(),
            })
        }

        /// Resolves an endpoint path against the base URL.
        fn endpoint_url(&self, path: &str) -> Result<Url, SyncError> {
            self.base_url
                .join(path.trim_start_matches('/'))
                .map_err(|e| SyncError::InvalidBaseUrl(e.to_string()))
        }

        async fn post_json<B: Serialize>(&self, path: &str, body: &B) -> ApiResult {
            let url = match self.endpoint_url(path) {
                Ok(url) => url,
                Err(e) => return ApiResult::failure(e.to_string()),
            };
            let response = match self
                .client
                .post(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("sync request failed: {}", e);
                    return ApiResult::failure(e.to_string());
                }
            };

            let status = response.status().as_u16();
            let ok = response.status().is_success();
            match response.json::<SyncEnvelope>().await {
                Ok(envelope) => ApiResult {
                    ok,
                    status,
                    data: Some(envelope),
                    error: if ok { None } else { Some(format!("HTTP {}", status)) },
                },
                Err(e) => {
                    tracing::warn!("sync response decode failed: {}", e);
                    ApiResult {
                        ok: false,
                        status,
                        data: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
    }

    impl SyncTransport for HttpSyncTransport {
        async fn post_bookmarks(&self, code: &str, bookmarks: &[Bookmark]) -> ApiResult {
            let body = PostBookmarksBody {
                code: code.to_string(),
                bookmarks: bookmarks.to_vec(),
            };
            self.post_json(&self.endpoints.bookmarks, &body).await
        }

        async fn post_event(
            &self,
            code: &str,
            event_type: &str,
            payload: serde_json::Value,
            at: i64,
        ) -> ApiResult {
            let body = PostEventBody {
                code: code.to_string(),
                event_type: event_type.to_string(),
                payload,
                at,
            };
            self.post_json(&self.endpoints.events, &body).await
        }
    }
}
