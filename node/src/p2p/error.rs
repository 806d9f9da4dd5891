use std::net::IpAddr;
use thiserror::Error;

/// Errors raised while admitting, querying or communicating with peers.
#[derive(Error, Debug)]
pub enum P2pError {
    #[error("peer {0} is blacklisted")]
    Blacklisted(IpAddr),
    #[error("peer {0} is already suspended")]
    AlreadySuspended(IpAddr),
    #[error("peer {ip} version {version} does not satisfy {requirement}")]
    InvalidVersion {
        ip: IpAddr,
        version: String,
        requirement: String,
    },
    #[error("peer {ip} reported nethash {got}, expected {expected}")]
    NethashMismatch {
        ip: IpAddr,
        got: String,
        expected: String,
    },
    #[error("peer {0} did not respond within the configured timeout")]
    Unresponsive(IpAddr),
    #[error("peer {0} sent a malformed or unexpected response")]
    BadResponse(IpAddr),
    #[error("peer {0} not found")]
    UnknownPeer(IpAddr),
    #[error("no peers available to query")]
    NoPeersAvailable,
    #[error("all either banned or on a different chain")]
    NoViablePeers,
    #[error("network has not reached minimum reach ({have}/{required} peers)")]
    InsufficientReach { have: usize, required: usize },
    #[error("discovery aborted: seed peer list is empty")]
    NoSeedPeers,
    #[error("transport error talking to {ip}: {source}")]
    Transport {
        ip: IpAddr,
        #[source]
        source: anyhow::Error,
    },
    #[error("application not ready to serve peer requests yet")]
    AppNotReady,
}

pub type P2pResult<T> = Result<T, P2pError>;

impl P2pError {
    /// A stable grouping key for logging removal counts (spec §9: "the
    /// source uses the error object itself as a map key, which coerces to
    /// a string; use the error's kind tag explicitly for grouping").
    pub fn kind(&self) -> &'static str {
        match self {
            P2pError::Blacklisted(_) => "blacklisted",
            P2pError::AlreadySuspended(_) => "already-suspended",
            P2pError::InvalidVersion { .. } => "invalid-version",
            P2pError::NethashMismatch { .. } => "nethash-mismatch",
            P2pError::Unresponsive(_) => "unresponsive",
            P2pError::BadResponse(_) => "bad-response",
            P2pError::UnknownPeer(_) => "unknown-peer",
            P2pError::NoPeersAvailable => "no-peers-available",
            P2pError::NoViablePeers => "no-viable-peers",
            P2pError::InsufficientReach { .. } => "insufficient-reach",
            P2pError::NoSeedPeers => "no-seed-peers",
            P2pError::Transport { .. } => "transport",
            P2pError::AppNotReady => "app-not-ready",
        }
    }
}
