//! Retry-with-backoff decorator around an [`Executor`].

use log::{debug, error, warn};
use tokio_util::sync::CancellationToken;

use super::client::Executor;
use super::error::{PolicyError, RetryError, TransportError};
use super::message::{HttpRequest, HttpResponse};
use super::policy::RetryPolicy;
use super::retry::{AttemptOutcome, classify};

/// Sends requests through an executor, retrying transient failures.
///
/// Each call runs its attempts strictly one after another. Calls are
/// independent of each other; only the read-only policy is shared.
pub struct RetryingTransport<E: Executor> {
    executor: E,
    policy: RetryPolicy,
}

impl<E: Executor> RetryingTransport<E> {
    pub fn new(executor: E, policy: RetryPolicy) -> Result<Self, PolicyError> {
        policy.validate()?;
        Ok(Self { executor, policy })
    }

    /// Sends with the configured policy. Cannot be cancelled except by
    /// dropping the future.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RetryError> {
        self.send_cancellable(request, &CancellationToken::new())
            .await
    }

    /// Sends with the configured policy, stopping when `cancel` fires
    /// before an attempt or while waiting between attempts.
    pub async fn send_cancellable(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, RetryError> {
        run(&self.executor, request, &self.policy, cancel).await
    }

    /// Sends with a per-call policy instead of the configured one.
    pub async fn send_with_policy(
        &self,
        request: &HttpRequest,
        policy: &RetryPolicy,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, RetryError> {
        policy.validate().map_err(RetryError::InvalidPolicy)?;
        run(&self.executor, request, policy, cancel).await
    }
}

#[tracing::instrument(skip_all, fields(method = %request.method(), url = %request.url()))]
async fn run<E: Executor + ?Sized>(
    executor: &E,
    request: &HttpRequest,
    policy: &RetryPolicy,
    cancel: &CancellationToken,
) -> Result<HttpResponse, RetryError> {
    let mut backoff = policy.backoff();
    let mut attempt: u32 = 0;
    let mut last: Option<TransportError> = None;

    loop {
        if cancel.is_cancelled() {
            warn!("Retry cancelled for {} before attempt {}", request.url(), attempt + 1);
            return Err(RetryError::Cancelled {
                attempts: attempt,
                last,
            });
        }

        attempt = attempt.saturating_add(1);
        debug!(
            "Attempt {} for request: {} {}",
            attempt,
            request.method(),
            request.url()
        );

        let failure = match classify(executor.execute(request).await, policy.retryable_status) {
            AttemptOutcome::Success(response) => {
                debug!(
                    "Request successful for {} on attempt {}",
                    request.url(),
                    attempt
                );
                return Ok(response);
            }
            AttemptOutcome::Terminal(response) => {
                warn!(
                    "Non-retryable HTTP error: {} for {} on attempt {}",
                    response.status().as_u16(),
                    request.url(),
                    attempt
                );
                return Ok(response);
            }
            AttemptOutcome::RetryableStatus(response) => {
                let status = response.status();
                let body = response.drain().await;
                warn!(
                    "HTTP error: {} for {} on attempt {}. Body: {}",
                    status.as_u16(),
                    request.url(),
                    attempt,
                    body
                );
                TransportError::RetryableStatus(status)
            }
            AttemptOutcome::RetryableError(e) => {
                warn!(
                    "Request failed for {} on attempt {}: {}",
                    request.url(),
                    attempt,
                    e
                );
                e
            }
        };

        if policy.max_attempts.is_last(attempt) {
            error!(
                "All {} attempts failed for {}. Last error: {}",
                attempt,
                request.url(),
                failure
            );
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: failure,
            });
        }

        let delay = backoff.next_delay();
        debug!("Retrying {} in {}ms", request.url(), delay.as_millis());
        last = Some(failure);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Retry interrupted for {}", request.url());
                return Err(RetryError::Cancelled { attempts: attempt, last });
            }
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
