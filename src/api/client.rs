use anyhow::{Context, Result};
use log::{debug, info, warn};
use reqwest::{StatusCode, Url};

use super::config::ApiConfig;
use super::link::{Link, LinkError, ViewAction};
use crate::http::{
    CancellationToken, Executor, HttpRequest, HttpResponse, ReqwestExecutor, RetryingTransport,
};

/// Result of submitting a new link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddLinkOutcome {
    Added,
    /// The backend already knows this URL (HTTP 409)
    Duplicate,
    /// Any other non-success response
    Rejected { status: StatusCode, message: String },
}

/// Client for the Discover backend. Every call goes through the retrying transport.
pub struct DiscoverClient<E: Executor = ReqwestExecutor> {
    transport: RetryingTransport<E>,
    base_url: String,
    platform: String,
    cancel: CancellationToken,
}

impl DiscoverClient<ReqwestExecutor> {
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let executor = ReqwestExecutor::new(config.build_client()?);
        let transport = RetryingTransport::new(executor, config.retry.clone())
            .context("Invalid retry configuration")?;
        Self::new(transport, &config.base_url, &config.platform)
    }
}

impl<E: Executor> DiscoverClient<E> {
    pub fn new(transport: RetryingTransport<E>, base_url: &str, platform: &str) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).with_context(|| format!("Invalid API URL: {}", base_url))?;

        Ok(Self {
            transport,
            base_url,
            platform: platform.to_string(),
            cancel: CancellationToken::new(),
        })
    }

    /// Uses `cancel` to abort retry waits of every call made by this client.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let url = format!("{}/{}", self.base_url, path);
        Url::parse(&url).with_context(|| format!("Invalid endpoint URL: {}", url))
    }

    async fn send(&self, request: HttpRequest, operation: &str) -> Result<HttpResponse> {
        let response = self
            .transport
            .send_cancellable(&request, &self.cancel)
            .await
            .with_context(|| format!("{}: request to {} failed", operation, request.url()))?;
        debug!(
            "{} | Response code: {} for URL: {}",
            operation,
            response.status().as_u16(),
            request.url()
        );
        Ok(response)
    }

    /// Fetches all links for the configured platform. Entries missing a
    /// required field are skipped.
    #[tracing::instrument(skip(self))]
    pub async fn get_links(&self) -> Result<Vec<Link>> {
        let request = HttpRequest::get(self.endpoint("getLinks")?)
            .with_query(&[("platform", self.platform.as_str())]);

        let response = self.send(request, "getLinks").await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.drain().await;
            anyhow::bail!("getLinks failed with HTTP {}: {}", status.as_u16(), body);
        }

        let links: Vec<Link> = response.json().await?;
        let total = links.len();
        let valid: Vec<Link> = links
            .into_iter()
            .filter(|link| match link.validate() {
                Ok(()) => true,
                Err(e) => {
                    warn!("getLinks | Skipping link {:?}: {}", link.url, e);
                    false
                }
            })
            .collect();

        debug!("getLinks | Parsed {} of {} links.", valid.len(), total);
        Ok(valid)
    }

    /// Updates a view/like/dislike counter. Returns whether the backend accepted it.
    #[tracing::instrument(skip(self))]
    pub async fn increment_view(&self, url: &str, action: ViewAction) -> Result<bool> {
        if url.trim().is_empty() {
            return Err(LinkError::MissingField("url").into());
        }

        let request = HttpRequest::post(self.endpoint("incrementView")?)
            .with_query(&[("url", url), ("action", action.as_str())])
            .with_body(Vec::new());

        let response = self.send(request, "incrementView").await?;
        let status = response.status();
        if status.is_success() {
            response.drain().await;
            return Ok(true);
        }

        let body = response.drain().await;
        warn!(
            "incrementView | Failed: {} for {} ({}). Body: {}",
            status.as_u16(),
            url,
            action,
            body
        );
        Ok(false)
    }

    /// Submits a new link after normalizing it.
    #[tracing::instrument(skip(self, link), fields(url = %link.url))]
    pub async fn add_link(&self, link: &Link) -> Result<AddLinkOutcome> {
        let link = link.normalized()?;
        let request = HttpRequest::post(self.endpoint("addLink")?).with_json(&link)?;

        let response = self.send(request, "addLink").await?;
        let status = response.status();

        let outcome = if status.is_success() {
            response.drain().await;
            info!("addLink | Successfully added {}", link.url);
            AddLinkOutcome::Added
        } else if status == StatusCode::CONFLICT {
            response.drain().await;
            warn!("addLink | Duplicate entry for {}", link.url);
            AddLinkOutcome::Duplicate
        } else {
            let body = response.drain().await;
            warn!("addLink | Failed: {} for {}. Body: {}", status.as_u16(), link.url, body);
            AddLinkOutcome::Rejected {
                status,
                message: error_message(&body),
            }
        };
        Ok(outcome)
    }

    /// Checks that the backend and its database are reachable.
    #[tracing::instrument(skip(self))]
    pub async fn health(&self) -> Result<bool> {
        let response = self
            .send(HttpRequest::get(self.endpoint("health")?), "health")
            .await?;
        let healthy = response.is_success();
        response.drain().await;
        Ok(healthy)
    }
}

/// Pulls `error` out of a `{"error": "..."}` body, falling back to the raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
