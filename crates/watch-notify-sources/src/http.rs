use reqwest::Client;
use std::time::Duration;
use tracing::warn;

const USER_AGENT: &str = concat!("watchnotify/", env!("CARGO_PKG_VERSION"));

/// Shared client for every upstream; one connection pool per process
pub fn create_http_client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            warn!(error = %e, "Failed to build configured HTTP client, using defaults");
            Client::new()
        })
}
