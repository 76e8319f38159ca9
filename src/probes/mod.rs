pub mod http;
pub mod ping;

use crate::state::Phase;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// Echo requests per probe cycle.
    pub ping_count: u32,
    /// Spacing between echo requests.
    pub ping_interval: Duration,
    /// Per-echo reply timeout.
    pub ping_timeout: Duration,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PingStats {
    /// Average round-trip time over successful replies; `None` when every
    /// echo went unanswered.
    pub avg_rtt_ms: Option<f64>,
    pub packets_sent: u32,
    pub packets_received: u32,
}

/// Outcome of one probe cycle. Failure is data: an unreachable check leaves
/// its field absent instead of erroring out of the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReport {
    pub ping: Option<PingStats>,
    pub http_status: Option<u16>,
}

impl ProbeReport {
    /// A cycle is `Ok` only when both sub-checks produced a measurement.
    /// Severity of the measured values is the renderer's business.
    pub fn phase(&self) -> Phase {
        let ping_ok = self.ping.as_ref().is_some_and(|p| p.avg_rtt_ms.is_some());
        if ping_ok && self.http_status.is_some() {
            Phase::Ok
        } else {
            Phase::Error
        }
    }
}

#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, host: &str, settings: &ProbeSettings) -> ProbeReport;
}

/// Production prober: system `ping` for latency/loss, reqwest for the
/// application-layer status. Both checks run concurrently; `probe` returns
/// once both are done.
pub struct SystemProber {
    client: Client,
}

impl SystemProber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Prober for SystemProber {
    async fn probe(&self, host: &str, settings: &ProbeSettings) -> ProbeReport {
        let (ping, http_status) = tokio::join!(
            ping::run_ping(host, settings),
            http::check_status(&self.client, host, settings.http_timeout),
        );
        ProbeReport { ping, http_status }
    }
}
