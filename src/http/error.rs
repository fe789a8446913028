//! Error types surfaced by the retrying transport.

use reqwest::StatusCode;

/// A failed attempt. Every variant is retryable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be established (refused, DNS failure, TLS handshake)
    Connect(String),
    /// Connect or request timeout elapsed
    Timeout(String),
    /// Any other I/O failure while sending the request or reading the response
    Io(String),
    /// Synthesized when an attempt ended with a retryable HTTP status
    RetryableStatus(StatusCode),
}

impl TransportError {
    /// The HTTP status behind this failure, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            TransportError::RetryableStatus(status) => Some(*status),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::Timeout(msg) => write!(f, "Request timed out: {}", msg),
            TransportError::Io(msg) => write!(f, "I/O error: {}", msg),
            TransportError::RetryableStatus(status) => {
                write!(f, "Retryable HTTP error: {}", status.as_u16())
            }
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        let msg = error.to_string();
        if error.is_timeout() {
            TransportError::Timeout(msg)
        } else if error.is_connect() {
            TransportError::Connect(msg)
        } else {
            TransportError::Io(msg)
        }
    }
}

/// Why a logical call ended without a response.
#[derive(Debug)]
pub enum RetryError {
    /// The attempt limit was reached; `last` is the final failure.
    Exhausted { attempts: u32, last: TransportError },
    /// The caller cancelled before or between attempts.
    Cancelled {
        attempts: u32,
        last: Option<TransportError>,
    },
    /// The policy passed to the call is unusable.
    InvalidPolicy(PolicyError),
}

impl RetryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Number of attempts made before the call ended.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Exhausted { attempts, .. } | RetryError::Cancelled { attempts, .. } => {
                *attempts
            }
            RetryError::InvalidPolicy(_) => 0,
        }
    }

    pub fn last_failure(&self) -> Option<&TransportError> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Cancelled { last, .. } => last.as_ref(),
            RetryError::InvalidPolicy(_) => None,
        }
    }
}

impl std::fmt::Display for RetryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetryError::Exhausted { attempts, last } => {
                write!(f, "Retries exhausted after {} attempts: {}", attempts, last)
            }
            RetryError::Cancelled {
                attempts,
                last: Some(last),
            } => write!(
                f,
                "Retry cancelled after {} attempts (last failure: {})",
                attempts, last
            ),
            RetryError::Cancelled {
                attempts,
                last: None,
            } => write!(f, "Retry cancelled after {} attempts", attempts),
            RetryError::InvalidPolicy(e) => write!(f, "Invalid retry policy: {}", e),
        }
    }
}

impl std::error::Error for RetryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Exhausted { last, .. } => Some(last),
            RetryError::Cancelled { last, .. } => {
                last.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
            }
            RetryError::InvalidPolicy(e) => Some(e),
        }
    }
}

/// A retry policy that violates its own constraints.
#[derive(Debug, Clone, PartialEq)]
pub enum PolicyError {
    /// A limited policy must allow at least one attempt
    ZeroMaxAttempts,
    /// The first retry must wait for a non-zero duration
    ZeroInitialDelay,
    /// The delay must never shrink between retries
    BackoffFactorBelowOne(f64),
    /// The cap must not be lower than the starting delay
    MaxDelayBelowInitial,
}

impl std::fmt::Display for PolicyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyError::ZeroMaxAttempts => write!(f, "max attempts must be at least 1"),
            PolicyError::ZeroInitialDelay => write!(f, "initial delay must be greater than zero"),
            PolicyError::BackoffFactorBelowOne(factor) => {
                write!(f, "backoff factor must be >= 1.0, got {}", factor)
            }
            PolicyError::MaxDelayBelowInitial => {
                write!(f, "max delay must not be lower than the initial delay")
            }
        }
    }
}

impl std::error::Error for PolicyError {}
