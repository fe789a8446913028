use anyhow::{Context, Result};
use log::debug;
use reqwest::Client;
use std::time::Duration;

use crate::http::RetryPolicy;

/// Production backend.
pub const DEFAULT_API_URL: &str = "https://backend.discoverall.space";

/// Platform tag sent with `getLinks`.
pub const DEFAULT_PLATFORM: &str = "mobile";

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub platform: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            user_agent: format!("discover-cli/{}", env!("DISCOVER_VERSION")),
            retry: RetryPolicy::default(),
        }
    }
}

impl ApiConfig {
    pub fn new(api_url: Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = api_url {
            config.base_url = url;
        }
        config
    }

    pub fn with_platform(mut self, platform: &str) -> Self {
        self.platform = platform.to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Builds the reqwest client used for single attempts.
    pub fn build_client(&self) -> Result<Client> {
        debug!(
            "Building HTTP client for {} (connect timeout {:?}, request timeout {:?})",
            self.base_url, self.connect_timeout, self.request_timeout
        );

        Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .timeout(self.request_timeout)
            .build()
            .context("Failed to build HTTP client")
    }
}
