//! Client for the Discover backend: links, counters and submissions.

mod client;
mod config;
mod link;

pub use client::{AddLinkOutcome, DiscoverClient};
pub use config::{
    ApiConfig, DEFAULT_API_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_PLATFORM, DEFAULT_REQUEST_TIMEOUT,
};
pub use link::{Link, LinkError, ViewAction};
