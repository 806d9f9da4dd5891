use relay_common::crypto::Hash;
use relay_common::time::{get_current_time_in_seconds, TimestampSeconds};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Summary of the block a peer last reported as its tip. Mirrors the
/// `header` field of `getStatus` without carrying the full block body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderSummary {
    pub id: Hash,
    pub height: u64,
}

/// Outcome of comparing a peer's reported chain state against our own,
/// as produced by `getCommonBlocks` / `hasCommonBlocks` (spec §5.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub highest_common_height: u64,
    pub forked: bool,
}

impl Default for Verification {
    fn default() -> Self {
        Self {
            highest_common_height: 0,
            forked: false,
        }
    }
}

/// A peer known to the network monitor. Fields that change after admission
/// are atomics or a small mutex, so `getNetworkState` can snapshot a peer
/// without taking a lock on the whole registry.
pub struct Peer {
    ip: IpAddr,
    port: u16,
    /// Seed peers are configured by the operator and are never evicted by
    /// `cleanPeers` purely for being unreachable during cold start.
    priority: bool,
    version: Mutex<String>,
    nethash: Mutex<String>,
    height: AtomicU64,
    current_slot: AtomicU64,
    forging_allowed: AtomicBool,
    header: Mutex<Option<BlockHeaderSummary>>,
    /// `None` means "not yet verified" (spec §3: `verification = null`),
    /// which excludes the peer from fork-majority calculations.
    verification: Mutex<Option<Verification>>,
    last_pinged: AtomicU64,
}

impl Peer {
    pub fn new(ip: IpAddr, port: u16, version: String, nethash: String, priority: bool) -> Self {
        Self {
            ip,
            port,
            priority,
            version: Mutex::new(version),
            nethash: Mutex::new(nethash),
            height: AtomicU64::new(0),
            current_slot: AtomicU64::new(0),
            forging_allowed: AtomicBool::new(false),
            header: Mutex::new(None),
            verification: Mutex::new(None),
            last_pinged: AtomicU64::new(get_current_time_in_seconds()),
        }
    }

    pub fn ip(&self) -> IpAddr {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_priority(&self) -> bool {
        self.priority
    }

    pub fn version(&self) -> String {
        self.version.lock().unwrap().clone()
    }

    pub fn nethash(&self) -> String {
        self.nethash.lock().unwrap().clone()
    }

    pub fn height(&self) -> u64 {
        self.height.load(Ordering::Acquire)
    }

    pub fn current_slot(&self) -> u64 {
        self.current_slot.load(Ordering::Acquire)
    }

    pub fn forging_allowed(&self) -> bool {
        self.forging_allowed.load(Ordering::Acquire)
    }

    pub fn header(&self) -> Option<BlockHeaderSummary> {
        self.header.lock().unwrap().clone()
    }

    /// `None` if this peer has never been through a fork-verification pass.
    pub fn verification(&self) -> Option<Verification> {
        *self.verification.lock().unwrap()
    }

    pub fn last_pinged(&self) -> TimestampSeconds {
        self.last_pinged.load(Ordering::Acquire)
    }

    pub fn seconds_since_last_ping(&self) -> TimestampSeconds {
        get_current_time_in_seconds().saturating_sub(self.last_pinged())
    }

    pub fn recently_pinged(&self, freshness_secs: u64) -> bool {
        self.seconds_since_last_ping() < freshness_secs
    }

    /// True once the peer's last `verification` marked it as being on a
    /// different branch than ours (spec §5.3 "forked" flag). An unverified
    /// peer (`verification = None`) is never considered forked.
    pub fn is_forked(&self) -> bool {
        self.verification.lock().unwrap().is_some_and(|v| v.forked)
    }

    /// Applies a fresh `getStatus` response to this peer's cached state.
    pub fn apply_status(
        &self,
        version: String,
        nethash: String,
        height: u64,
        current_slot: u64,
        forging_allowed: bool,
        header: Option<BlockHeaderSummary>,
    ) {
        *self.version.lock().unwrap() = version;
        *self.nethash.lock().unwrap() = nethash;
        self.height.store(height, Ordering::Release);
        self.current_slot.store(current_slot, Ordering::Release);
        self.forging_allowed.store(forging_allowed, Ordering::Release);
        *self.header.lock().unwrap() = header;
    }

    pub fn apply_verification(&self, verification: Verification) {
        *self.verification.lock().unwrap() = Some(verification);
    }

    pub fn touch_ping(&self) {
        self.last_pinged
            .store(get_current_time_in_seconds(), Ordering::Release);
    }

    /// Snapshot used for persistence and for the `{ip, port, version}`
    /// entries returned by `getPeers`.
    pub fn snapshot(&self) -> PeerSnapshot {
        PeerSnapshot {
            ip: self.ip,
            port: self.port,
            version: self.version(),
        }
    }
}

/// Plain-data view of a peer, used both for the `getPeers` wire surface and
/// for the on-disk restore snapshot (spec §7, "a plain list of {ip, port,
/// version}").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerSnapshot {
    pub ip: IpAddr,
    pub port: u16,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_peer_starts_unforked_and_unverified() {
        let peer = Peer::new("127.0.0.1".parse().unwrap(), 4001, "1.0.0".into(), "net".into(), false);
        assert!(!peer.is_forked());
        assert_eq!(peer.height(), 0);
        assert_eq!(peer.verification(), None);
    }

    #[test]
    fn apply_status_updates_fields() {
        let peer = Peer::new("127.0.0.1".parse().unwrap(), 4001, "1.0.0".into(), "net".into(), false);
        peer.apply_status("1.1.0".into(), "net".into(), 42, 7, true, None);
        assert_eq!(peer.version(), "1.1.0");
        assert_eq!(peer.height(), 42);
        assert_eq!(peer.current_slot(), 7);
        assert!(peer.forging_allowed());
    }

    #[test]
    fn apply_verification_sets_forked_flag() {
        let peer = Peer::new("127.0.0.1".parse().unwrap(), 4001, "1.0.0".into(), "net".into(), false);
        peer.apply_verification(Verification {
            highest_common_height: 10,
            forked: true,
        });
        assert!(peer.is_forked());
    }
}
