//! HTTP transport with retry-with-backoff and failure classification.

mod client;
mod error;
mod message;
mod policy;
mod retry;
mod transport;

pub use client::{Executor, ReqwestExecutor};
#[cfg(test)]
pub use client::MockExecutor;
pub use error::{PolicyError, RetryError, TransportError};
pub use message::{DRAIN_LOG_LIMIT, HttpRequest, HttpResponse};
pub use policy::{
    Backoff, DEFAULT_BACKOFF_FACTOR, DEFAULT_INITIAL_DELAY_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_DELAY_MS, MaxAttempts, RetryPolicy, StatusPredicate,
};
pub use retry::{AttemptOutcome, classify, is_retryable_status};
pub use transport::RetryingTransport;
pub use tokio_util::sync::CancellationToken;
