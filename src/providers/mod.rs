//! Outbound clients for the OAuth providers.

pub mod google;
pub mod meta;

use std::time::Duration;

/// Shared reqwest client defaults for provider calls.
pub(crate) fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .unwrap_or_default()
}
