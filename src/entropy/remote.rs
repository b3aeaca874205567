//! Remote quantum random number client.
//!
//! Requests a single `uint8` from a QRNG JSON API and reduces it to a
//! bit. Every failure mode maps to a [`FetchError`]; the caller always
//! has the local source to fall back on, so nothing here retries.

use super::Bit;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Notify;

/// ANU QRNG endpoint requesting one unsigned byte.
pub const DEFAULT_QRNG_ENDPOINT: &str = "https://qrng.anu.edu.au/API/jsonI.php?length=1&type=uint8";

/// Errors that can occur while fetching remote randomness.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status: {0}")]
    Status(u16),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote source unavailable")]
    Unavailable,
}

/// Trait for remote randomness providers.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Makes one attempt to fetch a bit, giving up after `timeout`.
    async fn fetch(&self, timeout: Duration) -> Result<Bit, FetchError>;
}

#[derive(Debug, Deserialize)]
struct QrngResponse {
    data: Vec<u8>,
    #[serde(default)]
    success: Option<bool>,
}

/// Parses a QRNG JSON body into a bit.
pub(crate) fn parse_payload(body: &[u8]) -> Result<Bit, FetchError> {
    let response: QrngResponse =
        serde_json::from_slice(body).map_err(|e| FetchError::Malformed(e.to_string()))?;

    if response.success == Some(false) {
        return Err(FetchError::Malformed("service reported failure".into()));
    }

    response
        .data
        .first()
        .map(|&byte| Bit::from_byte(byte))
        .ok_or_else(|| FetchError::Malformed("empty data array".into()))
}

/// HTTP client for a QRNG JSON endpoint.
#[derive(Debug, Clone)]
pub struct QrngClient {
    client: reqwest::Client,
    endpoint: String,
}

impl QrngClient {
    /// Creates a client for the given endpoint URL.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("unlock-wallpaper/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Returns the configured endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn request(&self, timeout: Duration) -> Result<Bit, FetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| classify(e, timeout))?;
        parse_payload(&body)
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Http(err)
    }
}

#[async_trait]
impl RemoteSource for QrngClient {
    async fn fetch(&self, timeout: Duration) -> Result<Bit, FetchError> {
        tracing::debug!(endpoint = %self.endpoint, ?timeout, "Requesting remote random byte");

        match tokio::time::timeout(timeout, self.request(timeout)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(timeout)),
        }
    }
}

/// Scripted reply for [`MockRemoteSource`].
#[derive(Debug, Clone, Copy)]
pub enum MockReply {
    /// Return this byte reduced to a bit.
    Byte(u8),
    /// Fail with [`FetchError::Unavailable`].
    Fail,
    /// Never resolve; the caller's timeout has to fire.
    Hang,
}

/// Mock remote source for testing.
///
/// Clones share the reply queue and call counter. An optional gate
/// holds every reply until it is notified.
#[derive(Debug, Clone, Default)]
pub struct MockRemoteSource {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    calls: Arc<AtomicU64>,
    gate: Option<Arc<Notify>>,
}

impl MockRemoteSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues replies; an empty queue fails.
    pub fn push_replies(&self, replies: impl IntoIterator<Item = MockReply>) -> &Self {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(replies);
        self
    }

    /// Holds replies until the returned gate is notified.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    /// Number of fetch calls made.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteSource for MockRemoteSource {
    async fn fetch(&self, _timeout: Duration) -> Result<Bit, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .unwrap_or(MockReply::Fail);

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        match reply {
            MockReply::Byte(byte) => Ok(Bit::from_byte(byte)),
            MockReply::Fail => Err(FetchError::Unavailable),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get, Router};
    use std::net::SocketAddr;

    async fn serve(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_parse_odd_byte() {
        let body = br#"{"type":"uint8","length":1,"data":[3],"success":true}"#;
        assert_eq!(parse_payload(body).unwrap(), Bit::One);
    }

    #[test]
    fn test_parse_without_success_field() {
        assert_eq!(parse_payload(br#"{"data":[200]}"#).unwrap(), Bit::Zero);
    }

    #[test]
    fn test_parse_rejects_bad_payloads() {
        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{"data":[]}"#,
            br#"{"data":[256]}"#,
            br#"{"values":[1]}"#,
            br#"{"data":[1],"success":false}"#,
        ];

        for body in cases {
            assert!(
                matches!(parse_payload(body), Err(FetchError::Malformed(_))),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[tokio::test]
    async fn test_client_fetches_bit() {
        let router = Router::new().route(
            "/API/jsonI.php",
            get(|| async { r#"{"type":"uint8","length":1,"data":[3],"success":true}"# }),
        );
        let addr = serve(router).await;

        let client =
            QrngClient::new(format!("http://{addr}/API/jsonI.php?length=1&type=uint8")).unwrap();
        let bit = client.fetch(Duration::from_secs(2)).await.unwrap();

        assert_eq!(bit, Bit::One);
    }

    #[tokio::test]
    async fn test_client_reports_status() {
        let router = Router::new().route(
            "/",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "busy") }),
        );
        let addr = serve(router).await;

        let client = QrngClient::new(format!("http://{addr}/")).unwrap();
        let result = client.fetch(Duration::from_secs(2)).await;

        assert!(matches!(result, Err(FetchError::Status(503))));
    }

    #[tokio::test]
    async fn test_client_times_out() {
        let router = Router::new().route(
            "/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                r#"{"data":[1]}"#
            }),
        );
        let addr = serve(router).await;

        let client = QrngClient::new(format!("http://{addr}/")).unwrap();
        let result = client.fetch(Duration::from_millis(100)).await;

        assert!(matches!(result, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_client_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = QrngClient::new(format!("http://{addr}/")).unwrap();
        let result = client.fetch(Duration::from_secs(2)).await;

        assert!(matches!(result, Err(FetchError::Http(_))));
    }

    #[tokio::test]
    async fn test_mock_replies_in_order() {
        let remote = MockRemoteSource::new();
        remote.push_replies([MockReply::Byte(3), MockReply::Fail]);

        let timeout = Duration::from_millis(10);
        assert_eq!(remote.fetch(timeout).await.unwrap(), Bit::One);
        assert!(remote.fetch(timeout).await.is_err());
        assert!(remote.fetch(timeout).await.is_err());
        assert_eq!(remote.calls(), 3);
    }
}
