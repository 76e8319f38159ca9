use super::{PingStats, ProbeSettings};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Runs one latency/loss check by delegating to the system `ping` binary in
/// quiet mode and parsing its statistics block. Works unprivileged, which a
/// raw ICMP socket would not.
pub async fn run_ping(host: &str, settings: &ProbeSettings) -> Option<PingStats> {
    let timeout_secs = ((settings.ping_timeout.as_millis() + 999) / 1000).max(1);

    let mut cmd = Command::new("ping");
    cmd.arg("-n")
        .arg("-q")
        .arg("-c")
        .arg(settings.ping_count.to_string())
        .arg("-i")
        .arg(settings.ping_interval.as_secs_f64().to_string())
        .arg("-W")
        .arg(timeout_secs.to_string())
        .arg(host)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true);

    let output = match tokio::time::timeout(run_deadline(settings), cmd.output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(err)) => {
            warn!(host = %host, error = %err, "failed to run ping");
            return None;
        }
        Err(_elapsed) => {
            warn!(host = %host, "ping run exceeded its deadline");
            return None;
        }
    };

    // ping exits 1 on total loss and 2 on errors such as a failed name
    // lookup. The statistics block is still printed in the former case, so
    // parse the output regardless of the exit status.
    let text = String::from_utf8_lossy(&output.stdout);
    let stats = parse_ping_summary(&text);
    if stats.is_none() {
        debug!(
            host = %host,
            status = ?output.status.code(),
            "no statistics in ping output"
        );
    }
    stats
}

/// Upper bound for the whole run: every echo spaced out, the last one timing
/// out, plus slack for process startup and teardown.
fn run_deadline(settings: &ProbeSettings) -> Duration {
    settings.ping_interval * settings.ping_count
        + settings.ping_timeout
        + Duration::from_secs(2)
}

/// Parses the summary printed by `ping -q`. Handles both the iputils format
/// ("3 packets transmitted, 3 received, ...") and the BSD/macOS format
/// ("3 packets transmitted, 3 packets received, ...", "round-trip
/// min/avg/max/stddev = ...").
pub fn parse_ping_summary(text: &str) -> Option<PingStats> {
    let mut sent: Option<u32> = None;
    let mut received: Option<u32> = None;
    let mut avg_rtt_ms: Option<f64> = None;

    for line in text.lines() {
        let line = line.trim();

        if line.contains("packets transmitted") {
            for part in line.split(',') {
                let part = part.trim();
                let value = part
                    .split_whitespace()
                    .next()
                    .and_then(|tok| tok.parse::<u32>().ok());
                if part.contains("transmitted") {
                    sent = value;
                } else if part.contains("received") {
                    received = value;
                }
            }
            continue;
        }

        if line.contains("min/avg/max") {
            avg_rtt_ms = line
                .split('=')
                .nth(1)
                .and_then(|values| values.trim().split('/').nth(1))
                .and_then(|avg| avg.trim().parse::<f64>().ok());
        }
    }

    let packets_sent = sent?;
    let packets_received = received?;
    if packets_received > packets_sent {
        return None;
    }

    Some(PingStats {
        avg_rtt_ms,
        packets_sent,
        packets_received,
    })
}
