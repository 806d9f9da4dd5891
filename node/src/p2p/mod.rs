pub mod block_ping;
pub mod communicator;
pub mod error;
pub mod events;
pub mod monitor;
pub mod peer;
pub mod persistence;
pub mod processor;
pub mod reachability;
pub mod storage;
pub mod suspension;

pub use communicator::PeerCommunicator;
pub use error::{P2pError, P2pResult};
pub use events::EventEmitter;
pub use monitor::{BlockchainBridge, ChainState, NetworkHealth, NetworkMonitor, NetworkState, SlotProvider, StartOptions};
pub use peer::Peer;
pub use processor::PeerProcessor;
pub use storage::PeerStorage;
pub use suspension::{SuspendedPeer, SuspensionReason};
