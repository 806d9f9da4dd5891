use super::communicator::PeerCommunicator;
use super::error::{P2pError, P2pResult};
use super::events::EventEmitter;
use super::peer::Peer;
use super::storage::PeerStorage;
use super::suspension::{SuspendedPeer, SuspensionReason};
use crate::config::MonitorConfig;
use relay_common::api::daemon::NotifyEvent;
use semver::{Version, VersionReq};
use std::net::IpAddr;
use std::sync::Arc;

/// Admission control and suspension bookkeeping for incoming peers (spec
/// §5.2 `PeerProcessor`). Generic over the communicator the same way this
/// codebase's server types are generic over their main collaborator, so
/// tests can swap in a fake without a trait object indirection on the hot
/// path.
pub struct PeerProcessor<C: PeerCommunicator> {
    storage: Arc<PeerStorage>,
    communicator: Arc<C>,
    config: Arc<MonitorConfig>,
    events: Arc<dyn EventEmitter>,
}

impl<C: PeerCommunicator> PeerProcessor<C> {
    pub fn new(
        storage: Arc<PeerStorage>,
        communicator: Arc<C>,
        config: Arc<MonitorConfig>,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        Self {
            storage,
            communicator,
            config,
            events,
        }
    }

    /// Runs a candidate peer through every admission check and, on
    /// success, inserts it into the active registry. Idempotent: calling
    /// it again for an already-active peer just refreshes its status.
    pub async fn validate_and_accept_peer(&self, ip: IpAddr, port: u16) -> P2pResult<Arc<Peer>> {
        if self.config.is_blacklisted(&ip) {
            self.suspend(ip, SuspensionReason::Blacklisted);
            return Err(P2pError::Blacklisted(ip));
        }

        if let Some(suspended) = self.storage.get_suspended_peer(&ip) {
            if !suspended.is_expired() {
                return Err(P2pError::AlreadySuspended(ip));
            }
            self.storage.forget_suspended_peer(&ip);
        }

        let timeout = self.config.global_timeout();

        if self.communicator.ping(ip, port, timeout).await.is_err() {
            self.suspend(ip, SuspensionReason::Unresponsive);
            return Err(P2pError::Unresponsive(ip));
        }

        let status = match self.communicator.get_status(ip, port, timeout).await {
            Ok(status) => status,
            Err(_) => {
                self.suspend(ip, SuspensionReason::BadResponse);
                return Err(P2pError::BadResponse(ip));
            }
        };

        if !self.config.nethash.is_empty() && status.nethash != self.config.nethash {
            self.suspend(ip, SuspensionReason::NethashMismatch);
            return Err(P2pError::NethashMismatch {
                ip,
                got: status.nethash,
                expected: self.config.nethash.clone(),
            });
        }

        if let Err(()) = check_version(&status.version, &self.config.minimum_version_req) {
            self.suspend(ip, SuspensionReason::InvalidVersion);
            return Err(P2pError::InvalidVersion {
                ip,
                version: status.version,
                requirement: self.config.minimum_version_req.clone(),
            });
        }

        let peer = if let Some(existing) = self.storage.get_peer(&ip) {
            existing
        } else {
            Arc::new(Peer::new(
                ip,
                port,
                status.version.clone(),
                status.nethash.clone(),
                self.config
                    .seed_peers
                    .iter()
                    .any(|seed| seed.ip == ip && seed.port == port),
            ))
        };
        peer.apply_status(
            status.version,
            status.nethash,
            status.height,
            status.current_slot,
            status.forging_allowed,
            status.header,
        );
        peer.touch_ping();
        self.storage.set_peer(peer.clone());
        self.events.emit(NotifyEvent::PeerConnected { ip });
        Ok(peer)
    }

    /// Moves a peer out of the active registry and into suspension,
    /// carrying over whatever fork verification it had so far.
    pub fn suspend(&self, ip: IpAddr, reason: SuspensionReason) {
        let verification = self.storage.get_peer(&ip).and_then(|peer| peer.verification());
        self.storage.forget_peer(&ip);
        self.storage
            .set_suspended_peer(SuspendedPeer::with_verification(ip, reason, verification));
        self.events.emit(NotifyEvent::PeerSuspended {
            ip,
            reason: format!("{reason:?}"),
        });
    }

    /// Drops every suspension whose window has elapsed so the peer becomes
    /// eligible for `validate_and_accept_peer` again.
    pub fn reset_suspended_peers(&self) -> Vec<IpAddr> {
        self.storage.expire_suspensions()
    }
}

fn check_version(version: &str, requirement: &str) -> Result<(), ()> {
    let req = VersionReq::parse(requirement).map_err(|_| ())?;
    let version = Version::parse(version).map_err(|_| ())?;
    if req.matches(&version) {
        Ok(())
    } else {
        Err(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p2p::communicator::{BlockBytes, RemotePeer, StatusResponse, TransactionBytes};
    use crate::p2p::peer::Verification;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct FakeCommunicator {
        fail_ping: AtomicBool,
        version: String,
        nethash: String,
    }

    #[async_trait]
    impl PeerCommunicator for FakeCommunicator {
        async fn ping(&self, _ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<()> {
            if self.fail_ping.load(Ordering::Relaxed) {
                Err(P2pError::Unresponsive(_ip))
            } else {
                Ok(())
            }
        }

        async fn get_status(&self, _ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<StatusResponse> {
            Ok(StatusResponse {
                version: self.version.clone(),
                nethash: self.nethash.clone(),
                height: 100,
                current_slot: 5,
                forging_allowed: true,
                header: None,
            })
        }

        async fn get_peers(&self, _ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<Vec<RemotePeer>> {
            Ok(vec![])
        }

        async fn get_common_blocks(
            &self,
            _ip: IpAddr,
            _port: u16,
            _our_heights: &[u64],
            _timeout: Duration,
        ) -> P2pResult<Verification> {
            Ok(Verification {
                highest_common_height: 100,
                forked: false,
            })
        }

        async fn has_common_blocks(&self, _ip: IpAddr, _port: u16, _height: u64, _timeout: Duration) -> P2pResult<bool> {
            Ok(true)
        }

        async fn download_blocks(
            &self,
            _ip: IpAddr,
            _port: u16,
            _from_height: u64,
            _to_height: u64,
            _timeout: Duration,
        ) -> P2pResult<Vec<BlockBytes>> {
            Ok(vec![])
        }

        async fn post_block(&self, _ip: IpAddr, _port: u16, _block: BlockBytes, _timeout: Duration) -> P2pResult<()> {
            Ok(())
        }

        async fn post_transactions(
            &self,
            _ip: IpAddr,
            _port: u16,
            _transactions: Vec<TransactionBytes>,
            _timeout: Duration,
        ) -> P2pResult<()> {
            Ok(())
        }
    }

    struct NullEmitter;
    impl EventEmitter for NullEmitter {
        fn emit(&self, _event: NotifyEvent) {}
    }

    fn processor(communicator: FakeCommunicator, config: MonitorConfig) -> PeerProcessor<FakeCommunicator> {
        PeerProcessor::new(
            Arc::new(PeerStorage::new()),
            Arc::new(communicator),
            Arc::new(config),
            Arc::new(NullEmitter),
        )
    }

    #[tokio::test]
    async fn accepts_a_healthy_peer() {
        let proc = processor(
            FakeCommunicator {
                fail_ping: AtomicBool::new(false),
                version: "1.2.0".into(),
                nethash: "net".into(),
            },
            MonitorConfig {
                nethash: "net".into(),
                ..Default::default()
            },
        );
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        let peer = proc.validate_and_accept_peer(ip, 4001).await.unwrap();
        assert_eq!(peer.height(), 100);
        assert!(proc.storage.has_peer(&ip));
    }

    #[tokio::test]
    async fn unresponsive_peer_is_suspended() {
        let proc = processor(
            FakeCommunicator {
                fail_ping: AtomicBool::new(true),
                version: "1.2.0".into(),
                nethash: "net".into(),
            },
            MonitorConfig::default(),
        );
        let ip: IpAddr = "10.0.0.2".parse().unwrap();
        let err = proc.validate_and_accept_peer(ip, 4001).await.unwrap_err();
        assert!(matches!(err, P2pError::Unresponsive(_)));
        assert!(proc.storage.has_suspended_peer(&ip));
    }

    #[tokio::test]
    async fn nethash_mismatch_is_rejected() {
        let proc = processor(
            FakeCommunicator {
                fail_ping: AtomicBool::new(false),
                version: "1.2.0".into(),
                nethash: "other".into(),
            },
            MonitorConfig {
                nethash: "net".into(),
                ..Default::default()
            },
        );
        let ip: IpAddr = "10.0.0.3".parse().unwrap();
        let err = proc.validate_and_accept_peer(ip, 4001).await.unwrap_err();
        assert!(matches!(err, P2pError::NethashMismatch { .. }));
    }

    #[tokio::test]
    async fn validate_and_accept_peer_is_idempotent() {
        let proc = processor(
            FakeCommunicator {
                fail_ping: AtomicBool::new(false),
                version: "1.2.0".into(),
                nethash: "net".into(),
            },
            MonitorConfig {
                nethash: "net".into(),
                ..Default::default()
            },
        );
        let ip: IpAddr = "10.0.0.4".parse().unwrap();
        proc.validate_and_accept_peer(ip, 4001).await.unwrap();
        proc.validate_and_accept_peer(ip, 4001).await.unwrap();
        assert_eq!(proc.storage.peer_count(), 1);
    }
}
