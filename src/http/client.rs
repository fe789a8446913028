//! Single-shot request execution.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;

use super::error::TransportError;
use super::message::{HttpRequest, HttpResponse};

/// Executes one request with no retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Executor`] backed by a reqwest [`Client`].
#[derive(Clone)]
pub struct ReqwestExecutor {
    client: Client,
}

impl ReqwestExecutor {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Executor for ReqwestExecutor {
    #[tracing::instrument(skip(self, request))]
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!("{} {}", request.method(), request.url());

        let mut builder = self
            .client
            .request(request.method().clone(), request.url().clone())
            .headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send().await?;
        debug!("{} {} -> {}", request.method(), request.url(), response.status());

        Ok(HttpResponse::from_reqwest(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;
    use reqwest::header::{HeaderName, HeaderValue};

    #[tokio::test]
    async fn test_execute_get() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/getLinks?platform=mobile")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"name": "a"}]"#)
            .create_async()
            .await;

        let executor = ReqwestExecutor::new(Client::new());
        let url = Url::parse(&format!("{}/getLinks", server.url())).unwrap();
        let request = HttpRequest::get(url).with_query(&[("platform", "mobile")]);

        let response = executor.execute(&request).await.unwrap();

        mock.assert_async().await;
        assert!(response.is_success());
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
        assert_eq!(response.text().await.unwrap(), r#"[{"name": "a"}]"#);
    }

    #[tokio::test]
    async fn test_execute_post_sends_headers_and_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/addLink")
            .match_header("x-client", "test")
            .match_body(r#"{"name":"demo"}"#)
            .with_status(201)
            .create_async()
            .await;

        let executor = ReqwestExecutor::new(Client::new());
        let url = Url::parse(&format!("{}/addLink", server.url())).unwrap();
        let request = HttpRequest::post(url)
            .with_header(
                HeaderName::from_static("x-client"),
                HeaderValue::from_static("test"),
            )
            .with_body(r#"{"name":"demo"}"#);

        let response = executor.execute(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(response.status(), 201);
    }

    #[tokio::test]
    async fn test_execute_error_status_is_a_response() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let executor = ReqwestExecutor::new(Client::new());
        let url = Url::parse(&format!("{}/missing", server.url())).unwrap();

        let response = executor.execute(&HttpRequest::get(url)).await.unwrap();
        assert_eq!(response.status(), 404);
    }

    #[tokio::test]
    async fn test_execute_connection_refused() {
        let executor = ReqwestExecutor::new(Client::new());
        let url = Url::parse("http://127.0.0.1:1/").unwrap();

        let result = executor.execute(&HttpRequest::get(url)).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
