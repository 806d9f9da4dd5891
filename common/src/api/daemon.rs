use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Events the network monitor publishes through the injected emitter.
///
/// The distilled spec only requires `"peer.removed"`; the other variants
/// round out what a relay node's other subsystems (RPC websocket clients,
/// metrics) would want to subscribe to, following the shape of this
/// codebase's `NotifyEvent` enum.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum NotifyEvent {
    /// A candidate peer was accepted into the active set.
    PeerConnected { ip: IpAddr },
    /// A peer was forgotten, either because it failed a probe or was
    /// suspended. Corresponds to the spec's `"peer.removed"`.
    PeerRemoved { ip: IpAddr, reason: String },
    /// A peer was moved from the active set to the suspended set.
    PeerSuspended { ip: IpAddr, reason: String },
    /// `checkNetworkHealth` determined the local chain is a minority fork.
    NetworkForked { blocks_to_rollback: u64 },
}
