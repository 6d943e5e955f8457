use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use tokio::process::Command;
use tracing::{trace, warn};

static RTT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"time=([\d.]+) ms").expect("RTT pattern is valid"));

/// Extract the round-trip time from `ping` output.
pub fn parse_rtt(output: &str) -> Option<f64> {
    RTT_PATTERN
        .captures(output)
        .and_then(|captures| captures.get(1))
        .and_then(|rtt| rtt.as_str().parse().ok())
}

/// Send a single ICMP echo via the system `ping` binary.
///
/// Returns `None` when the binary fails, writes to stderr, prints no RTT, or does not
/// finish within `timeout`. The child is killed if the timeout elapses.
pub async fn ping(host: &str, timeout: Duration) -> Option<f64> {
    let child = Command::new("ping")
        .args(["-c", "1", host])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            warn!("ping {host}: could not run ping: {e}");
            return None;
        }
        Err(_) => {
            warn!("ping {host}: no reply within {timeout:?}");
            return None;
        }
    };

    if !output.stderr.is_empty() {
        warn!(
            "ping {host}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }

    let rtt = parse_rtt(&String::from_utf8_lossy(&output.stdout));
    trace!("ping {host}: {rtt:?}");
    rtt
}
