use crate::probes::{ProbeSettings, Prober};
use crate::state::SharedHostState;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

/// Granularity of the cooldown wait. Also bounds how long a poll loop can
/// take to notice shutdown.
pub const SLEEP_SLICE: Duration = Duration::from_millis(250);

/// One poll loop per host: wait out the cooldown, probe, publish, repeat.
/// The first probe fires immediately (`last_updated` starts out empty). The
/// loop only ends when the shutdown channel flips; a failed probe is recorded
/// and waited out like any other cycle.
pub async fn poll_host(
    prober: Arc<dyn Prober>,
    state: SharedHostState,
    settings: ProbeSettings,
    cooldown: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let host = state.read().await.host.clone();

    loop {
        // Waiting: sleep in slices so shutdown is observed promptly.
        loop {
            if *shutdown.borrow() {
                return;
            }
            let remaining = {
                let guard = state.read().await;
                match guard.last_updated {
                    None => Duration::ZERO,
                    Some(at) => cooldown.saturating_sub(at.elapsed()),
                }
            };
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                _ = shutdown.changed() => return,
                _ = tokio::time::sleep(remaining.min(SLEEP_SLICE)) => {}
            }
        }

        // Probing: the flag lets the renderer show an in-flight indicator
        // instead of a stale countdown.
        state.write().await.probing = true;
        let report = tokio::select! {
            _ = shutdown.changed() => return,
            report = prober.probe(&host, &settings) => report,
        };

        // Publishing: the whole field-set lands in one write-lock scope.
        {
            let mut guard = state.write().await;
            guard.publish(&report, Instant::now());
            debug!(host = %host, phase = ?guard.phase, "published probe cycle");
        }
    }
}
