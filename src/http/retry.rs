//! Attempt classification: retryable vs. terminal outcomes.

use reqwest::StatusCode;

use super::error::TransportError;
use super::message::HttpResponse;
use super::policy::StatusPredicate;

/// Default retryable statuses: request timeout (408), too many requests (429)
/// and every server error (5xx).
pub fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

/// Result of one attempt against the executor.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// 2xx response, returned to the caller
    Success(HttpResponse),
    /// Non-retryable response, returned to the caller as-is
    Terminal(HttpResponse),
    /// Response with a retryable status; its body must be drained before retrying
    RetryableStatus(HttpResponse),
    /// Transport-level failure
    RetryableError(TransportError),
}

impl AttemptOutcome {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttemptOutcome::RetryableStatus(_) | AttemptOutcome::RetryableError(_)
        )
    }
}

/// Classifies the result of a single attempt.
pub fn classify(
    result: Result<HttpResponse, TransportError>,
    retryable_status: StatusPredicate,
) -> AttemptOutcome {
    match result {
        Err(e) => AttemptOutcome::RetryableError(e),
        Ok(response) if response.is_success() => AttemptOutcome::Success(response),
        Ok(response) if retryable_status(response.status()) => {
            AttemptOutcome::RetryableStatus(response)
        }
        Ok(response) => AttemptOutcome::Terminal(response),
    }
}
