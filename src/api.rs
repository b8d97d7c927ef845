//! News search API client.
//!
//! This module talks to an Alpaca-style news endpoint: a date-windowed search
//! that returns one page of articles per request plus an optional
//! continuation token.
//!
//! # Architecture
//!
//! - [`NewsSource`]: Trait for anything that can fetch one page for a window
//! - [`NewsClient`]: The `reqwest`-backed production implementation
//! - [`FetchError`]: Failure taxonomy, classified for the retry policy
//!
//! # Request Shape
//!
//! ```text
//! GET {base}/v1beta1/news?start=2024-01-01&end=2024-01-31&include_content=true&limit=30[&page_token=...]
//! APCA-API-KEY-ID: ...
//! APCA-API-SECRET-KEY: ...
//! ```

use crate::models::{NewsPage, PageCursor};
use crate::retry::Retryable;
use crate::utils::truncate_for_log;
use crate::window::DateWindow;
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, instrument, warn};
use url::Url;

/// Production API host.
pub const DEFAULT_BASE_URL: &str = "https://data.alpaca.markets";

/// Path of the news search endpoint, relative to the base URL.
pub const NEWS_PATH: &str = "v1beta1/news";

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const KEY_ID_HEADER: &str = "APCA-API-KEY-ID";
const SECRET_KEY_HEADER: &str = "APCA-API-SECRET-KEY";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Ways a page request can fail.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout and the like.
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The API rejected the request parameters.
    #[error("bad request (HTTP 400): {body}")]
    BadRequest { body: String },

    /// Any other non-200 response.
    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// A 200 response whose body does not match the expected schema.
    #[error("malformed response body: {source}")]
    Malformed {
        #[source]
        source: serde_json::Error,
    },
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Transport(_) | FetchError::Status { .. })
    }
}

/// Parameters of a single page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRequest {
    pub window: DateWindow,
    pub cursor: Option<PageCursor>,
    pub limit: u32,
}

impl PageRequest {
    /// Query string pairs in the order they are sent.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("start", self.window.start().format(DATE_FORMAT).to_string()),
            ("end", self.window.end().format(DATE_FORMAT).to_string()),
            ("include_content", "true".to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(cursor) = &self.cursor {
            query.push(("page_token", cursor.as_str().to_string()));
        }
        query
    }
}

/// Anything that can fetch one page of news for a window.
pub trait NewsSource {
    async fn fetch_page(&self, request: &PageRequest) -> Result<NewsPage, FetchError>;
}

impl<S: NewsSource> NewsSource for &S {
    async fn fetch_page(&self, request: &PageRequest) -> Result<NewsPage, FetchError> {
        (**self).fetch_page(request).await
    }
}

/// API key pair sent with every request.
#[derive(Clone)]
pub struct Credentials {
    pub key_id: String,
    pub secret_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("key_id", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// `reqwest`-backed news client.
#[derive(Debug, Clone)]
pub struct NewsClient {
    client: Client,
    endpoint: Url,
    credentials: Credentials,
    timeout: Duration,
}

impl NewsClient {
    /// Build a client for `base_url` (e.g. [`DEFAULT_BASE_URL`]).
    ///
    /// # Arguments
    ///
    /// * `base_url` - API host, optionally with a path prefix
    /// * `credentials` - Key pair sent as headers on every request
    ///
    /// # Errors
    ///
    /// Returns [`url::ParseError`] if `base_url` is not an absolute URL.
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self, url::ParseError> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base.join(NEWS_PATH)?;
        Ok(Self {
            client: Client::new(),
            endpoint,
            credentials,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl NewsSource for NewsClient {
    #[instrument(level = "debug", skip_all, fields(window = %request.window, cursor = ?request.cursor))]
    async fn fetch_page(&self, request: &PageRequest) -> Result<NewsPage, FetchError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(KEY_ID_HEADER, &self.credentials.key_id)
            .header(SECRET_KEY_HEADER, &self.credentials.secret_key)
            .query(&request.query())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(FetchError::Transport)?;
        debug!(
            %status,
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "News API responded"
        );

        if status == StatusCode::OK {
            serde_json::from_str::<NewsPage>(&body).map_err(|source| {
                warn!(
                    error = %source,
                    body_preview = %truncate_for_log(&body, 300),
                    "News API returned a body that does not match the expected schema"
                );
                FetchError::Malformed { source }
            })
        } else if status == StatusCode::BAD_REQUEST {
            Err(FetchError::BadRequest {
                body: truncate_for_log(&body, 300),
            })
        } else {
            Err(FetchError::Status {
                status,
                body: truncate_for_log(&body, 300),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use httpmock::prelude::*;
    use serde_json::json;

    fn creds() -> Credentials {
        Credentials {
            key_id: "key".to_string(),
            secret_key: "secret".to_string(),
        }
    }

    fn request(cursor: Option<&str>) -> PageRequest {
        PageRequest {
            window: DateWindow::new(
                NaiveDate::from_ymd_opt(2023, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 5, 31).unwrap(),
            )
            .unwrap(),
            cursor: cursor.map(PageCursor::new),
            limit: 30,
        }
    }

    #[test]
    fn test_query_parameters() {
        let q = request(None).query();
        assert_eq!(
            q,
            vec![
                ("start", "2023-05-01".to_string()),
                ("end", "2023-05-31".to_string()),
                ("include_content", "true".to_string()),
                ("limit", "30".to_string()),
            ]
        );

        let q = request(Some("tok")).query();
        assert_eq!(q.last(), Some(&("page_token", "tok".to_string())));
    }

    #[test]
    fn test_endpoint_join() {
        let client = NewsClient::new("https://data.alpaca.markets", creds()).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://data.alpaca.markets/v1beta1/news"
        );

        let client = NewsClient::new("http://127.0.0.1:9000/proxy", creds()).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://127.0.0.1:9000/proxy/v1beta1/news"
        );
    }

    #[test]
    fn test_error_classification() {
        assert!(
            !FetchError::BadRequest {
                body: String::new()
            }
            .is_retryable()
        );
        assert!(
            FetchError::Status {
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: String::new()
            }
            .is_retryable()
        );
        let malformed = serde_json::from_str::<NewsPage>("{}").unwrap_err();
        assert!(!FetchError::Malformed { source: malformed }.is_retryable());
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let shown = format!("{:?}", creds());
        assert!(!shown.contains("\"secret\""));
        assert!(!shown.contains("\"key\""));
        assert!(shown.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_fetch_page_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v1beta1/news")
                    .header("APCA-API-KEY-ID", "key")
                    .header("APCA-API-SECRET-KEY", "secret")
                    .query_param("start", "2023-05-01")
                    .query_param("end", "2023-05-31")
                    .query_param("include_content", "true")
                    .query_param("limit", "30")
                    .query_param("page_token", "p2");
                then.status(200).json_body(json!({
                    "news": [{
                        "created_at": "2023-05-14T10:00:00Z",
                        "headline": "GDP beats",
                        "summary": "Growth accelerated"
                    }],
                    "next_page_token": null
                }));
            })
            .await;

        let client = NewsClient::new(&server.base_url(), creds()).unwrap();
        let page = client.fetch_page(&request(Some("p2"))).await.unwrap();

        mock.assert_async().await;
        assert_eq!(page.news.len(), 1);
        assert_eq!(page.news[0].headline, "GDP beats");
        assert!(page.next_cursor().is_none());
    }

    #[tokio::test]
    async fn test_fetch_page_status_mapping() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1beta1/news").query_param("limit", "30");
                then.status(400).body("invalid date");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1beta1/news").query_param("limit", "31");
                then.status(503).body("try later");
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1beta1/news").query_param("limit", "32");
                then.status(200).body("{\"news\": 7}");
            })
            .await;

        let client = NewsClient::new(&server.base_url(), creds()).unwrap();

        let err = client.fetch_page(&request(None)).await.unwrap_err();
        assert!(matches!(err, FetchError::BadRequest { ref body } if body == "invalid date"));

        let mut req = request(None);
        req.limit = 31;
        let err = client.fetch_page(&req).await.unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE));

        req.limit = 32;
        let err = client.fetch_page(&req).await.unwrap_err();
        assert!(matches!(err, FetchError::Malformed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_page_timeout_is_retryable_transport_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v1beta1/news");
                then.status(200)
                    .delay(Duration::from_millis(1500))
                    .json_body(json!({"news": [], "next_page_token": null}));
            })
            .await;

        let client = NewsClient::new(&server.base_url(), creds())
            .unwrap()
            .with_timeout(Duration::from_millis(200));
        let started = Instant::now();
        let err = client.fetch_page(&request(None)).await.unwrap_err();

        assert!(started.elapsed() < Duration::from_millis(1500));
        match &err {
            FetchError::Transport(e) => assert!(e.is_timeout(), "{}", e),
            other => panic!("expected transport timeout, got {:?}", other),
        }
        assert!(err.is_retryable());
    }

    #[test]
    fn test_default_timeout() {
        let client = NewsClient::new(DEFAULT_BASE_URL, creds()).unwrap();
        assert_eq!(client.timeout, REQUEST_TIMEOUT);
        assert_eq!(REQUEST_TIMEOUT, Duration::from_secs(10));
        let client = client.with_timeout(Duration::from_secs(3));
        assert_eq!(client.timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_fetch_page_connection_error() {
        // Nothing listens on port 9 locally; the connection is refused.
        let client = NewsClient::new("http://127.0.0.1:9", creds())
            .unwrap()
            .with_timeout(Duration::from_secs(2));
        let err = client.fetch_page(&request(None)).await.unwrap_err();
        assert!(matches!(err, FetchError::Transport(_)));
        assert!(err.is_retryable());
    }
}
