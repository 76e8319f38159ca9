use reqwest::Client;
use std::time::Duration;
use tracing::warn;

/// Fetches the application-layer status code for a host. Any transport-level
/// failure (resolution, refused, timeout) comes back as `None`; the status
/// code itself is reported as-is, error classes included.
pub async fn check_status(client: &Client, host: &str, timeout: Duration) -> Option<u16> {
    let url = host_url(host);
    match client.get(&url).timeout(timeout).send().await {
        Ok(resp) => Some(resp.status().as_u16()),
        Err(err) => {
            warn!(host = %host, url = %url, error = %err, "http check failed");
            None
        }
    }
}

/// Hosts may embed their own scheme; bare names default to HTTPS.
fn host_url(host: &str) -> String {
    if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}
