//! Request and response values exchanged with an [`Executor`](super::Executor).

use anyhow::{Context, Result};
use log::debug;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::error::TransportError;

/// Most bytes of a drained body kept for the retry log line.
pub const DRAIN_LOG_LIMIT: usize = 1024;

/// A prepared request. Immutable once built and re-sent verbatim on every attempt.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: Url) -> Self {
        Self::new(Method::POST, url)
    }

    /// Appends query parameters, percent-encoding keys and values.
    pub fn with_query(mut self, pairs: &[(&str, &str)]) -> Self {
        {
            let mut query = self.url.query_pairs_mut();
            for (key, value) in pairs {
                query.append_pair(key, value);
            }
        }
        self
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body and sets the content type.
    pub fn with_json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).context("Failed to serialize request body")?;
        Ok(self
            .with_header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/json; charset=utf-8"),
            )
            .with_body(body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }
}

enum Body {
    Buffered(Vec<u8>),
    Streaming(reqwest::Response),
}

/// A response returned by an executor.
///
/// The body is either already in memory or still attached to the connection.
/// Consuming methods take `self`, so a response can only be read or drained once.
pub struct HttpResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Body,
}

impl HttpResponse {
    /// Builds a response with an in-memory body.
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Body::Buffered(body.into()),
        }
    }

    pub(crate) fn from_reqwest(response: reqwest::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            body: Body::Streaming(response),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Reads the whole body.
    pub async fn bytes(self) -> Result<Vec<u8>, TransportError> {
        match self.body {
            Body::Buffered(bytes) => Ok(bytes),
            Body::Streaming(response) => Ok(response.bytes().await?.to_vec()),
        }
    }

    /// Reads the whole body as text, replacing invalid UTF-8.
    pub async fn text(self) -> Result<String, TransportError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let bytes = self.bytes().await.context("Failed to read response body")?;
        serde_json::from_slice(&bytes).context("Failed to parse JSON response")
    }

    /// Consumes the rest of the body so the connection is released, and
    /// returns at most [`DRAIN_LOG_LIMIT`] bytes of it for logging. Read
    /// errors end the drain early; the connection is then dropped instead
    /// of reused.
    pub async fn drain(self) -> String {
        let mut preview = Vec::new();
        match self.body {
            Body::Buffered(bytes) => keep_prefix(&mut preview, &bytes),
            Body::Streaming(mut response) => loop {
                match response.chunk().await {
                    Ok(Some(chunk)) => keep_prefix(&mut preview, &chunk),
                    Ok(None) => break,
                    Err(e) => {
                        debug!("Failed to drain response body: {}", e);
                        break;
                    }
                }
            },
        }
        String::from_utf8_lossy(&preview).into_owned()
    }
}

fn keep_prefix(preview: &mut Vec<u8>, chunk: &[u8]) {
    let room = DRAIN_LOG_LIMIT.saturating_sub(preview.len());
    preview.extend_from_slice(&chunk[..chunk.len().min(room)]);
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_with_query_encodes_values() {
        let request = HttpRequest::post(url("https://example.com/incrementView"))
            .with_query(&[("url", "https://a.example/?x=1&y=2"), ("action", "view")]);

        assert_eq!(
            request.url().as_str(),
            "https://example.com/incrementView?url=https%3A%2F%2Fa.example%2F%3Fx%3D1%26y%3D2&action=view"
        );
        assert_eq!(request.method(), Method::POST);
        assert!(request.body().is_none());
    }

    #[test]
    fn test_with_json_sets_body_and_content_type() {
        #[derive(Serialize)]
        struct Payload {
            name: &'static str,
        }

        let request = HttpRequest::post(url("https://example.com/addLink"))
            .with_json(&Payload { name: "demo" })
            .unwrap();

        assert_eq!(request.body(), Some(br#"{"name":"demo"}"#.as_slice()));
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_buffered_response_reads() {
        let response = HttpResponse::new(StatusCode::OK, r#"{"ok": true}"#);
        assert!(response.is_success());

        let value: serde_json::Value = response.json().await.unwrap();
        assert_eq!(value["ok"], true);
    }

    #[tokio::test]
    async fn test_drain_returns_body_text() {
        let response = HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, "try later");
        assert!(!response.is_success());
        assert_eq!(response.drain().await, "try later");
    }

    #[tokio::test]
    async fn test_streaming_response_drain() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/busy")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let raw = reqwest::get(format!("{}/busy", server.url())).await.unwrap();
        let response = HttpResponse::from_reqwest(raw);

        mock.assert_async().await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.drain().await, "overloaded");
    }

    #[tokio::test]
    async fn test_drain_keeps_bounded_prefix_of_buffered_body() {
        let response = HttpResponse::new(StatusCode::BAD_GATEWAY, vec![b'a'; 4 * DRAIN_LOG_LIMIT]);
        let preview = response.drain().await;
        assert_eq!(preview.len(), DRAIN_LOG_LIMIT);
        assert!(preview.bytes().all(|b| b == b'a'));
    }

    #[tokio::test]
    async fn test_drain_reads_large_streaming_body_but_keeps_prefix() {
        let mut body = vec![b'<'; DRAIN_LOG_LIMIT];
        body.extend(std::iter::repeat_n(b'x', 512 * 1024));
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/error-page")
            .with_status(500)
            .with_body(body)
            .create_async()
            .await;

        let raw = reqwest::get(format!("{}/error-page", server.url())).await.unwrap();
        let preview = HttpResponse::from_reqwest(raw).drain().await;

        mock.assert_async().await;
        assert_eq!(preview, "<".repeat(DRAIN_LOG_LIMIT));
    }
}
