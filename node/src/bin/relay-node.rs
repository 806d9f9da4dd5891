use clap::Parser;
use log::{error, info};
use relay_node::config::MonitorConfig;
use relay_node::p2p::block_ping::{BlockId, BlockPing};
use relay_node::p2p::communicator::{BlockBytes, RemotePeer, StatusResponse, TransactionBytes};
use relay_node::p2p::events::BroadcastEventEmitter;
use relay_node::p2p::monitor::{BlockchainBridge, ChainState, NetworkMonitor, SlotProvider, StartOptions};
use relay_node::p2p::peer::Verification;
use relay_node::p2p::{P2pError, P2pResult, PeerCommunicator};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "relay-node", about = "Peer-to-peer network monitor for a relay node", styles = relay_common::get_cli_styles())]
struct Cli {
    #[command(flatten)]
    monitor: MonitorConfig,

    /// Write logs at this level or more severe to stdout.
    #[arg(long, default_value = "info")]
    log_level: log::LevelFilter,
}

fn setup_logger(level: log::LevelFilter) -> anyhow::Result<()> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(
            fern::Dispatch::new()
                .chain(std::io::stdout())
                .format(|out, message, _| out.finish(format_args!("{}", message))),
        )
        .apply()?;
    Ok(())
}

/// Placeholder chain state used until the monitor is wired into a real
/// blockchain runtime. Reports a fixed height so the control plane has
/// something to compare peers against.
struct StaticChainState;

impl ChainState for StaticChainState {
    fn current_height(&self) -> u64 {
        0
    }

    fn checkpoint_heights(&self) -> Vec<u64> {
        vec![0]
    }

    fn forked_block_peer(&self) -> Option<IpAddr> {
        None
    }
}

struct NotReadyBridge;

impl BlockchainBridge for NotReadyBridge {
    fn is_ready(&self) -> bool {
        false
    }

    fn apply_block(&self, _block: BlockBytes) -> anyhow::Result<()> {
        Ok(())
    }

    fn apply_transactions(&self, _transactions: Vec<TransactionBytes>) -> anyhow::Result<()> {
        Ok(())
    }

    fn get_block_ping(&self, block: BlockId) -> BlockPing {
        BlockPing::first_seen(block)
    }
}

struct ZeroSlotProvider;

impl SlotProvider for ZeroSlotProvider {
    fn current_slot(&self) -> u64 {
        0
    }
}

/// Stub communicator: every RPC reports the caller unreachable. Exists so
/// the binary builds and runs the discovery loop end-to-end without a real
/// transport wired in yet.
struct UnimplementedCommunicator;

#[async_trait::async_trait]
impl PeerCommunicator for UnimplementedCommunicator {
    async fn ping(&self, ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<()> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn get_status(&self, ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<StatusResponse> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn get_peers(&self, ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<Vec<RemotePeer>> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn get_common_blocks(
        &self,
        ip: IpAddr,
        _port: u16,
        _our_heights: &[u64],
        _timeout: Duration,
    ) -> P2pResult<Verification> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn has_common_blocks(&self, ip: IpAddr, _port: u16, _height: u64, _timeout: Duration) -> P2pResult<bool> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn download_blocks(
        &self,
        ip: IpAddr,
        _port: u16,
        _from_height: u64,
        _to_height: u64,
        _timeout: Duration,
    ) -> P2pResult<Vec<BlockBytes>> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn post_block(&self, ip: IpAddr, _port: u16, _block: BlockBytes, _timeout: Duration) -> P2pResult<()> {
        Err(P2pError::Unresponsive(ip))
    }

    async fn post_transactions(
        &self,
        ip: IpAddr,
        _port: u16,
        _transactions: Vec<TransactionBytes>,
        _timeout: Duration,
    ) -> P2pResult<()> {
        Err(P2pError::Unresponsive(ip))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    setup_logger(cli.log_level)?;

    info!("starting relay-node network monitor");

    let snapshot_path = cli.monitor.peer_snapshot_path.clone().map(std::path::PathBuf::from);
    let config = Arc::new(cli.monitor);

    let monitor = Arc::new(NetworkMonitor::new(
        Arc::new(UnimplementedCommunicator),
        config,
        Arc::new(StaticChainState),
        Arc::new(NotReadyBridge),
        Arc::new(ZeroSlotProvider),
        Arc::new(BroadcastEventEmitter::new(256)),
    ));

    let start_options = StartOptions {
        peer_snapshot_path: snapshot_path,
        ..Default::default()
    };
    if let Err(err) = monitor.start(start_options).await {
        error!("failed to start network monitor: {err}");
        return Err(err.into());
    }

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    Ok(())
}
