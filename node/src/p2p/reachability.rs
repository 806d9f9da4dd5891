//! DNS and NTP reachability probes run once at `start()` (spec §4.4.1 step
//! 2). Both are purely informational: a failure is logged and otherwise
//! ignored, never propagated as a startup error, and an NTP clock-offset
//! reading never mutates any peer or monitor state (spec §3 invariant:
//! "clock-offset adjustments annotate logs only").

use log::{debug, warn};
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Resolves each configured host, logging whether it answered. Used to
/// sanity-check outbound DNS before the node starts dialing peers.
pub async fn check_dns(hosts: &[String]) {
    for host in hosts {
        let target = format!("{host}:80");
        match tokio::time::timeout(PROBE_TIMEOUT, tokio::net::lookup_host(target)).await {
            Ok(Ok(mut addrs)) if addrs.next().is_some() => debug!("dns check: {host} resolved"),
            Ok(Ok(_)) => warn!("dns check: {host} resolved to no addresses"),
            Ok(Err(err)) => warn!("dns check: {host} failed to resolve: {err}"),
            Err(_) => warn!("dns check: {host} timed out"),
        }
    }
}

/// Queries each configured NTP server with a minimal SNTP client request and
/// logs the apparent clock offset against local wall-clock time. The offset
/// is never applied anywhere; it exists purely so an operator can see in the
/// logs that their host clock has drifted.
pub async fn check_ntp(hosts: &[String]) {
    for host in hosts {
        match query_offset(host).await {
            Ok(offset_ms) => debug!("ntp check: {host} reports a clock offset of {offset_ms}ms"),
            Err(err) => warn!("ntp check: {host} unreachable: {err}"),
        }
    }
}

/// Sends a single SNTP client request (RFC 4330, mode 3) and computes the
/// round-trip-adjusted offset from the server's transmit timestamp.
async fn query_offset(host: &str) -> anyhow::Result<i64> {
    use tokio::net::UdpSocket;

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    let target = format!("{host}:123");

    let mut request = [0u8; 48];
    request[0] = 0b00_100_011; // LI = 0, VN = 4, Mode = 3 (client)
    let t1 = relay_common::time::get_current_time_in_millis();

    tokio::time::timeout(PROBE_TIMEOUT, socket.send_to(&request, target)).await??;

    let mut response = [0u8; 48];
    let (len, _) = tokio::time::timeout(PROBE_TIMEOUT, socket.recv_from(&mut response)).await??;
    if len < 48 {
        anyhow::bail!("short NTP response ({len} bytes)");
    }
    let t4 = relay_common::time::get_current_time_in_millis();

    // Transmit timestamp: seconds since 1900-01-01 (bytes 40..44) plus a
    // fractional-second field (bytes 44..48) we only need millisecond
    // precision from.
    let tx_seconds = u32::from_be_bytes(response[40..44].try_into().unwrap());
    let tx_fraction = u32::from_be_bytes(response[44..48].try_into().unwrap());
    const UNIX_EPOCH_OFFSET_SECS: u64 = 2_208_988_800; // 1900 -> 1970
    let server_millis =
        (tx_seconds as u64).saturating_sub(UNIX_EPOCH_OFFSET_SECS) * 1000 + (tx_fraction as u64 * 1000 / u32::MAX as u64);

    let local_midpoint = t1 + (t4 - t1) / 2;
    Ok(server_millis as i64 - local_midpoint as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_dns_host_does_not_panic() {
        check_dns(&["this-host-does-not-resolve.invalid".to_string()]).await;
    }

    #[tokio::test]
    async fn unreachable_ntp_host_does_not_panic() {
        check_ntp(&["198.51.100.1".to_string()]).await;
    }
}
