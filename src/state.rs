use crate::probes::ProbeReport;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Shared handle to one host's state. Exactly one poll loop writes it;
/// the renderer only reads.
pub type SharedHostState = Arc<RwLock<HostState>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Pending,
    Ok,
    Error,
}

#[derive(Debug, Clone)]
pub struct HostState {
    pub host: String,
    pub latency_ms: Option<f64>,
    pub packets_sent: u32,
    pub packets_received: u32,
    pub http_status: Option<u16>,
    /// `None` until the first publish so the first probe fires immediately.
    pub last_updated: Option<Instant>,
    pub phase: Phase,
    /// Set by the owning poll loop while a probe is in flight.
    pub probing: bool,
}

impl HostState {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            latency_ms: None,
            packets_sent: 0,
            packets_received: 0,
            http_status: None,
            last_updated: None,
            phase: Phase::Pending,
            probing: false,
        }
    }

    pub fn shared(host: impl Into<String>) -> SharedHostState {
        Arc::new(RwLock::new(Self::new(host)))
    }

    /// Applies one completed probe cycle as a single unit. The caller holds
    /// the write lock for exactly this call, so readers never see a
    /// half-updated record.
    pub fn publish(&mut self, report: &ProbeReport, now: Instant) {
        self.latency_ms = report.ping.as_ref().and_then(|p| p.avg_rtt_ms);
        self.packets_sent = report.ping.as_ref().map_or(0, |p| p.packets_sent);
        self.packets_received = report.ping.as_ref().map_or(0, |p| p.packets_received);
        self.http_status = report.http_status;
        self.phase = report.phase();
        self.last_updated = Some(now);
        self.probing = false;
    }
}
