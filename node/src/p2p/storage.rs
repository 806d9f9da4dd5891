use super::peer::Peer;
use super::suspension::SuspendedPeer;
use dashmap::DashMap;
use std::net::IpAddr;
use std::sync::Arc;

/// In-memory registry of known peers (spec §5.1 `PeerStorage`).
///
/// Active and suspended peers live in separate maps so that a peer is never
/// observably both at once: `setPeer` removes any suspension entry for the
/// same IP and `setSuspendedPeer` removes any active entry, so the two maps
/// stay disjoint by construction rather than by convention.
#[derive(Default)]
pub struct PeerStorage {
    peers: DashMap<IpAddr, Arc<Peer>>,
    suspended: DashMap<IpAddr, SuspendedPeer>,
}

impl PeerStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_peer(&self, peer: Arc<Peer>) {
        let ip = peer.ip();
        self.suspended.remove(&ip);
        self.peers.insert(ip, peer);
    }

    pub fn get_peer(&self, ip: &IpAddr) -> Option<Arc<Peer>> {
        self.peers.get(ip).map(|entry| entry.value().clone())
    }

    pub fn has_peer(&self, ip: &IpAddr) -> bool {
        self.peers.contains_key(ip)
    }

    pub fn forget_peer(&self, ip: &IpAddr) -> Option<Arc<Peer>> {
        self.peers.remove(ip).map(|(_, peer)| peer)
    }

    /// Snapshot of all currently active peers. Taken by cloning `Arc`
    /// handles rather than holding the map locked, so callers can iterate
    /// for as long as they need without blocking writers.
    pub fn get_peers(&self) -> Vec<Arc<Peer>> {
        self.peers.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn set_suspended_peer(&self, suspended: SuspendedPeer) {
        let ip = suspended.ip;
        self.peers.remove(&ip);
        self.suspended.insert(ip, suspended);
    }

    pub fn get_suspended_peer(&self, ip: &IpAddr) -> Option<SuspendedPeer> {
        self.suspended.get(ip).map(|entry| entry.value().clone())
    }

    pub fn has_suspended_peer(&self, ip: &IpAddr) -> bool {
        self.suspended.contains_key(ip)
    }

    pub fn get_suspended_peers(&self) -> Vec<SuspendedPeer> {
        self.suspended.iter().map(|entry| entry.value().clone()).collect()
    }

    pub fn forget_suspended_peer(&self, ip: &IpAddr) -> Option<SuspendedPeer> {
        self.suspended.remove(ip).map(|(_, peer)| peer)
    }

    /// Drops every suspension whose window has elapsed. Used by
    /// `resetSuspendedPeers` (spec §5.2) rather than by `cleanPeers`, which
    /// only ever touches the active map.
    pub fn expire_suspensions(&self) -> Vec<IpAddr> {
        let expired: Vec<IpAddr> = self
            .suspended
            .iter()
            .filter(|entry| entry.value().is_expired())
            .map(|entry| *entry.key())
            .collect();
        for ip in &expired {
            self.suspended.remove(ip);
        }
        expired
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p2p::suspension::SuspensionReason;

    fn peer(ip: &str) -> Arc<Peer> {
        Arc::new(Peer::new(ip.parse().unwrap(), 4001, "1.0.0".into(), "net".into(), false))
    }

    #[test]
    fn peer_is_active_xor_suspended() {
        let storage = PeerStorage::new();
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        storage.set_peer(peer("10.0.0.1"));
        assert!(storage.has_peer(&ip));
        assert!(!storage.has_suspended_peer(&ip));

        storage.set_suspended_peer(SuspendedPeer::new(ip, SuspensionReason::Unresponsive));
        assert!(!storage.has_peer(&ip));
        assert!(storage.has_suspended_peer(&ip));
    }

    #[test]
    fn forget_peer_is_idempotent() {
        let storage = PeerStorage::new();
        let ip: IpAddr = "10.0.0.2".parse().unwrap();
        storage.set_peer(peer("10.0.0.2"));
        assert!(storage.forget_peer(&ip).is_some());
        assert!(storage.forget_peer(&ip).is_none());
    }

    #[test]
    fn get_peers_reflects_registry_size() {
        let storage = PeerStorage::new();
        storage.set_peer(peer("10.0.0.3"));
        storage.set_peer(peer("10.0.0.4"));
        assert_eq!(storage.get_peers().len(), 2);
        assert_eq!(storage.peer_count(), 2);
    }
}
