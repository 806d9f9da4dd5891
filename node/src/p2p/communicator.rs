use super::error::{P2pError, P2pResult};
use super::peer::{BlockHeaderSummary, Verification};
use async_trait::async_trait;
use std::net::IpAddr;
use std::time::Duration;

/// Reply to a `getStatus` call (spec §5.3).
#[derive(Debug, Clone)]
pub struct StatusResponse {
    pub version: String,
    pub nethash: String,
    pub height: u64,
    pub current_slot: u64,
    pub forging_allowed: bool,
    pub header: Option<BlockHeaderSummary>,
}

/// A peer known to the remote side, as returned by `getPeers`.
#[derive(Debug, Clone)]
pub struct RemotePeer {
    pub ip: IpAddr,
    pub port: u16,
    pub version: String,
}

/// Raw block bytes as exchanged over the wire. The encoding itself is out
/// of scope here; the monitor only forwards opaque payloads between peers
/// and its own chain state.
pub type BlockBytes = Vec<u8>;
pub type TransactionBytes = Vec<u8>;

/// Façade over every remote call the monitor makes to a peer (spec §5.3
/// `PeerCommunicator`). Implementations own the actual wire protocol;
/// everything above this trait only sees typed requests/responses and a
/// [`P2pError`] classifying how the call failed.
#[async_trait]
pub trait PeerCommunicator: Send + Sync {
    async fn ping(&self, ip: IpAddr, port: u16, timeout: Duration) -> P2pResult<()>;

    async fn get_status(&self, ip: IpAddr, port: u16, timeout: Duration) -> P2pResult<StatusResponse>;

    async fn get_peers(&self, ip: IpAddr, port: u16, timeout: Duration) -> P2pResult<Vec<RemotePeer>>;

    /// Finds the highest block height both sides agree on.
    async fn get_common_blocks(
        &self,
        ip: IpAddr,
        port: u16,
        our_heights: &[u64],
        timeout: Duration,
    ) -> P2pResult<Verification>;

    /// Cheaper existence check used before a full `get_common_blocks` pass.
    async fn has_common_blocks(
        &self,
        ip: IpAddr,
        port: u16,
        height: u64,
        timeout: Duration,
    ) -> P2pResult<bool>;

    async fn download_blocks(
        &self,
        ip: IpAddr,
        port: u16,
        from_height: u64,
        to_height: u64,
        timeout: Duration,
    ) -> P2pResult<Vec<BlockBytes>>;

    async fn post_block(&self, ip: IpAddr, port: u16, block: BlockBytes, timeout: Duration) -> P2pResult<()>;

    async fn post_transactions(
        &self,
        ip: IpAddr,
        port: u16,
        transactions: Vec<TransactionBytes>,
        timeout: Duration,
    ) -> P2pResult<()>;
}

/// Wraps a future with the per-call timeout and turns elapsed timeouts into
/// [`P2pError::Unresponsive`], the single place every RPC in a concrete
/// `PeerCommunicator` funnels through.
pub async fn with_timeout<T, F>(ip: IpAddr, timeout: Duration, fut: F) -> P2pResult<T>
where
    F: std::future::Future<Output = P2pResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(P2pError::Unresponsive(ip)),
    }
}
