//! Configuration for the peer-to-peer network monitor.
//!
//! Mirrors `daemon/src/discovery/config.rs`'s shape: a `clap::Args` +
//! `serde` struct with per-field defaults and a couple of derived
//! accessors, plus a small constants table for values that are tuned once
//! and never exposed on the CLI.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;

/// A statically configured peer used to bootstrap discovery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPeer {
    pub ip: IpAddr,
    pub port: u16,
}

const fn default_global_timeout_ms() -> u64 {
    3_000
}

const fn default_cold_start_secs() -> u64 {
    30
}

const fn default_minimum_network_reach() -> usize {
    10
}

const fn default_max_peers_broadcast() -> usize {
    10
}

const fn default_max_peers() -> usize {
    100
}

const fn default_ping_refresh_secs() -> u64 {
    8
}

const fn default_discovery_interval_secs() -> u64 {
    600
}

const fn default_discovery_retry_secs() -> u64 {
    5
}

const fn default_min_peers_to_query() -> usize {
    4
}

fn default_minimum_version_req() -> String {
    ">=1.0.0".to_string()
}

const fn default_sync_max_retries() -> u32 {
    5
}

const fn default_sync_retry_backoff_ms() -> u64 {
    500
}

const fn default_fast_ping_timeout_ms() -> u64 {
    1_500
}

/// Everything the network monitor reads from configuration (spec §6).
#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seed peers used to bootstrap discovery (`peers.list`). Bootstrapping
    /// fails fast if this is empty (spec §4.4.1 step 4).
    #[clap(skip)]
    #[serde(default)]
    pub seed_peers: Vec<SeedPeer>,

    /// Semver constraint a peer's advertised version must satisfy to be
    /// accepted (`minimumVersions`).
    #[clap(name = "p2p-minimum-version", long, default_value_t = default_minimum_version_req())]
    #[serde(default = "default_minimum_version_req")]
    pub minimum_version_req: String,

    /// Hex string identifying the chain this node tracks. Peers reporting a
    /// different `nethash` are rejected at admission.
    #[clap(name = "p2p-nethash", long, default_value = "")]
    #[serde(default)]
    pub nethash: String,

    /// IP addresses never admitted regardless of other checks.
    #[clap(skip)]
    #[serde(default)]
    pub blacklist: Vec<IpAddr>,

    /// Default per-RPC timeout used by the communicator unless a call site
    /// overrides it (`globalTimeout`).
    #[clap(name = "p2p-global-timeout-ms", long, default_value_t = default_global_timeout_ms())]
    #[serde(default = "default_global_timeout_ms")]
    pub global_timeout_ms: u64,

    /// Length of the cold-start window after `start()`, during which
    /// eviction is relaxed.
    #[clap(name = "p2p-cold-start-secs", long, default_value_t = default_cold_start_secs())]
    #[serde(default = "default_cold_start_secs")]
    pub cold_start_secs: u64,

    /// Minimum number of active peers required before the node considers
    /// itself reachable (`minimumNetworkReach`, used by `hasMinimumPeers`).
    #[clap(name = "p2p-minimum-network-reach", long, default_value_t = default_minimum_network_reach())]
    #[serde(default = "default_minimum_network_reach")]
    pub minimum_network_reach: usize,

    /// Hard cap on how many peers `broadcastTransactions` fans out to.
    #[clap(name = "p2p-max-peers-broadcast", long, default_value_t = default_max_peers_broadcast())]
    #[serde(default = "default_max_peers_broadcast")]
    pub max_peers_broadcast: usize,

    /// Upper bound on the active peer set size; also the snapshot size used
    /// by `cleanPeers`.
    #[clap(name = "p2p-max-peers", long, default_value_t = default_max_peers())]
    #[serde(default = "default_max_peers")]
    pub max_peers: usize,

    /// How long a cached `ping` result is considered fresh before
    /// `communicator.ping` re-issues the remote call.
    #[clap(name = "p2p-ping-refresh-secs", long, default_value_t = default_ping_refresh_secs())]
    #[serde(default = "default_ping_refresh_secs")]
    pub ping_refresh_secs: u64,

    /// Default delay between successful discovery passes
    /// (`updateNetworkStatus` rescheduling, the "600 seconds" in spec
    /// §4.4.2).
    #[clap(name = "p2p-discovery-interval-secs", long, default_value_t = default_discovery_interval_secs())]
    #[serde(default = "default_discovery_interval_secs")]
    pub discovery_interval_secs: u64,

    /// Delay used instead of `discovery_interval_secs` when the peer count
    /// is still below `minimum_network_reach` after a pass.
    #[clap(name = "p2p-discovery-retry-secs", long, default_value_t = default_discovery_retry_secs())]
    #[serde(default = "default_discovery_retry_secs")]
    pub discovery_retry_secs: u64,

    /// Number of peers `discoverPeers` must successfully query before it is
    /// allowed to stop early (spec §4.4.3: "at least 4 peers").
    #[clap(name = "p2p-min-peers-to-query", long, default_value_t = default_min_peers_to_query())]
    #[serde(default = "default_min_peers_to_query")]
    pub min_peers_to_query: usize,

    /// Where to read/write the restored peer snapshot (`{ip, port,
    /// version}` list). `None` disables persistence.
    #[clap(name = "p2p-peer-snapshot-path", long)]
    #[serde(default)]
    pub peer_snapshot_path: Option<String>,

    /// Upper bound on `syncWithNetwork`'s retry loop (spec §9: re-architect
    /// the source's unbounded recursive retry as a bounded one).
    #[clap(name = "p2p-sync-max-retries", long, default_value_t = default_sync_max_retries())]
    #[serde(default = "default_sync_max_retries")]
    pub sync_max_retries: u32,

    /// Base delay for `syncWithNetwork`'s exponential backoff between
    /// retries, doubled on every attempt.
    #[clap(name = "p2p-sync-retry-backoff-ms", long, default_value_t = default_sync_retry_backoff_ms())]
    #[serde(default = "default_sync_retry_backoff_ms")]
    pub sync_retry_backoff_ms: u64,

    /// Per-ping timeout used by `cleanPeers(fast=true, ...)` (spec §4.4.4:
    /// "pingDelay = fast ? 1500 ms : globalTimeout").
    #[clap(name = "p2p-fast-ping-timeout-ms", long, default_value_t = default_fast_ping_timeout_ms())]
    #[serde(default = "default_fast_ping_timeout_ms")]
    pub fast_ping_timeout_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            seed_peers: Vec::new(),
            minimum_version_req: default_minimum_version_req(),
            nethash: String::new(),
            blacklist: Vec::new(),
            global_timeout_ms: default_global_timeout_ms(),
            cold_start_secs: default_cold_start_secs(),
            minimum_network_reach: default_minimum_network_reach(),
            max_peers_broadcast: default_max_peers_broadcast(),
            max_peers: default_max_peers(),
            ping_refresh_secs: default_ping_refresh_secs(),
            discovery_interval_secs: default_discovery_interval_secs(),
            discovery_retry_secs: default_discovery_retry_secs(),
            min_peers_to_query: default_min_peers_to_query(),
            peer_snapshot_path: None,
            sync_max_retries: default_sync_max_retries(),
            sync_retry_backoff_ms: default_sync_retry_backoff_ms(),
            fast_ping_timeout_ms: default_fast_ping_timeout_ms(),
        }
    }
}

impl MonitorConfig {
    pub fn global_timeout(&self) -> Duration {
        Duration::from_millis(self.global_timeout_ms)
    }

    pub fn ping_refresh(&self) -> Duration {
        Duration::from_secs(self.ping_refresh_secs)
    }

    pub fn cold_start(&self) -> Duration {
        Duration::from_secs(self.cold_start_secs)
    }

    pub fn fast_ping_timeout(&self) -> Duration {
        Duration::from_millis(self.fast_ping_timeout_ms)
    }

    pub fn is_blacklisted(&self, ip: &IpAddr) -> bool {
        self.blacklist.contains(ip)
    }
}

/// Suspension durations per error kind (spec §9, first Open Question: "the
/// implementer must define a table and justify it").
///
/// Rationale, shortest to longest:
/// - `UNRESPONSIVE`: a single timeout is routine on a gossip network, so the
///   peer is simply forgotten by `cleanPeers` rather than suspended; this
///   constant is only used when admission itself fails the initial ping
///   (spec §4.2 "failure causes suspension as unresponsive"). Short, so a
///   flaky-but-legitimate peer can be retried soon.
/// - `BAD_RESPONSE`: a peer returned a malformed reply; longer than
///   `UNRESPONSIVE` because a well-behaved client should never produce one,
///   but short enough to tolerate a transient software bug on their side.
/// - `INVALID_VERSION` / `NETHASH_MISMATCH`: admission-time chain mismatch.
///   The peer is very unlikely to fix this within minutes (it requires a
///   software upgrade or a reconfiguration), so the duration is long.
/// - `BLACKLISTED`: operator policy, not a transient condition; the longest
///   duration, matching `daemon/src/config.rs`'s `PEER_TEMP_BAN_TIME` being
///   the ceiling among its own peer penalties.
/// - `FORKED_FORK_CAUSER`: set by `refreshPeersAfterFork` once a peer is
///   blamed for causing a local rollback; kept long so the same peer can't
///   immediately cause another one while the network is still settling.
pub mod suspension_durations {
    pub const UNRESPONSIVE_SECS: u64 = 10 * 60;
    pub const BAD_RESPONSE_SECS: u64 = 30 * 60;
    pub const INVALID_VERSION_SECS: u64 = 24 * 60 * 60;
    pub const NETHASH_MISMATCH_SECS: u64 = 24 * 60 * 60;
    pub const BLACKLISTED_SECS: u64 = 7 * 24 * 60 * 60;
    pub const FORKED_FORK_CAUSER_SECS: u64 = 24 * 60 * 60;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_documented_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.discovery_interval_secs, 600);
        assert_eq!(config.discovery_retry_secs, 5);
        assert_eq!(config.min_peers_to_query, 4);
        assert!(config.seed_peers.is_empty());
    }

    #[test]
    fn blacklist_lookup() {
        let mut config = MonitorConfig::default();
        let ip: IpAddr = "10.0.0.5".parse().unwrap();
        assert!(!config.is_blacklisted(&ip));
        config.blacklist.push(ip);
        assert!(config.is_blacklisted(&ip));
    }
}
