use super::block_ping::{BlockId, BlockPing};
use super::communicator::{BlockBytes, PeerCommunicator, TransactionBytes};
use super::error::{P2pError, P2pResult};
use super::events::EventEmitter;
use super::peer::{Peer, Verification};
use super::persistence;
use super::processor::PeerProcessor;
use super::reachability;
use super::storage::PeerStorage;
use super::suspension::SuspensionReason;
use crate::config::MonitorConfig;
use log::{debug, info, warn};
use metrics::{counter, gauge};
use rand::seq::SliceRandom;
use relay_common::api::daemon::NotifyEvent;
use relay_common::time::get_current_time_in_seconds;
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// What the monitor knows about our own chain, queried when comparing
/// against a peer's reported state (spec §5.4 `ChainState`).
pub trait ChainState: Send + Sync {
    fn current_height(&self) -> u64;
    /// Checkpoint heights offered to peers during `getCommonBlocks`, most
    /// recent first.
    fn checkpoint_heights(&self) -> Vec<u64>;
    /// `State.forkedBlock` (spec §6): the peer blamed for the most
    /// recently detected fork, if any.
    fn forked_block_peer(&self) -> Option<IpAddr>;
}

/// The subset of the blockchain runtime the monitor drives directly:
/// whether it is ready to serve peers yet, and how to hand off a block or
/// transaction batch once accepted from the network.
pub trait BlockchainBridge: Send + Sync {
    fn is_ready(&self) -> bool;
    fn apply_block(&self, block: BlockBytes) -> anyhow::Result<()>;
    fn apply_transactions(&self, transactions: Vec<TransactionBytes>) -> anyhow::Result<()>;
    /// Looks up (or starts) the hop-count tracker for a block we have just
    /// seen, used to decay further rebroadcast (spec §5.4).
    fn get_block_ping(&self, block: BlockId) -> BlockPing;
}

/// Forging-slot clock, independent from wall-clock time so it can be
/// driven deterministically in tests.
pub trait SlotProvider: Send + Sync {
    fn current_slot(&self) -> u64;
}

/// Snapshot of network-wide state, as returned by `getNetworkState`.
#[derive(Debug, Clone)]
pub struct NetworkState {
    pub peer_count: usize,
    pub suspended_count: usize,
    pub network_height: Option<u64>,
    pub pbft_forging_ratio: f64,
    pub cold_start_active: bool,
}

/// Result of `checkNetworkHealth`.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkHealth {
    Healthy,
    BelowMinimumReach { have: usize, required: usize },
    Forked { blocks_to_rollback: u64 },
}

/// Tunables passed to [`NetworkMonitor::start`]; kept separate from
/// [`MonitorConfig`] so call sites can override behaviour (e.g. in tests)
/// without constructing a whole new config (spec §6 `start(options)`).
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    pub peer_snapshot_path: Option<PathBuf>,
    /// Hosts to resolve as an informational DNS reachability check.
    pub dns: Vec<String>,
    /// Hosts to query for an informational NTP clock-offset reading.
    pub ntp: Vec<String>,
    /// Genesis-only mode: `updateNetworkStatus` becomes a permanent no-op
    /// for the lifetime of this `start()` call (spec §4.4.2 guard).
    pub network_start: bool,
    /// Bootstrap seeds and stop; never spawn the discovery loop at all
    /// (spec §4.4.1 step 5).
    pub skip_discovery: bool,
    /// Spawn the discovery loop, but every pass is a no-op (spec §4.4.2
    /// guard). Unlike `skip_discovery`, the loop still runs so a future
    /// `updateNetworkStatus` call could see the flag flip.
    pub disable_discovery: bool,
    /// Skip the `hasMinimumPeers()` gate that otherwise shortens the
    /// reschedule delay and forces a reseed when the network is thin.
    pub ignore_minimum_network_reach: bool,
}

/// Control plane for the peer network (spec §5.4 `NetworkMonitor`).
/// Generic over the communicator, matching how this codebase parameterizes
/// its server types over their main collaborator rather than boxing it.
pub struct NetworkMonitor<C: PeerCommunicator + 'static> {
    storage: Arc<PeerStorage>,
    processor: Arc<PeerProcessor<C>>,
    communicator: Arc<C>,
    config: Arc<MonitorConfig>,
    chain: Arc<dyn ChainState>,
    bridge: Arc<dyn BlockchainBridge>,
    slots: Arc<dyn SlotProvider>,
    events: Arc<dyn EventEmitter>,
    started_at: AtomicU64,
    /// True from `start()` until the first `updateNetworkStatus` pass
    /// completes (spec §4.4.1 step 6), used only to decide whether
    /// `cleanPeers` logs its extra initialization summary.
    initializing: AtomicBool,
    /// Set once from `StartOptions` and read concurrently by the discovery
    /// loop, same "assigned once before any concurrent reader exists"
    /// contract as `started_at` (spec §9 design note).
    disable_discovery: AtomicBool,
    network_start: AtomicBool,
    ignore_minimum_network_reach: AtomicBool,
    block_pings: Mutex<HashMap<BlockId, BlockPing>>,
}

impl<C: PeerCommunicator + 'static> NetworkMonitor<C> {
    pub fn new(
        communicator: Arc<C>,
        config: Arc<MonitorConfig>,
        chain: Arc<dyn ChainState>,
        bridge: Arc<dyn BlockchainBridge>,
        slots: Arc<dyn SlotProvider>,
        events: Arc<dyn EventEmitter>,
    ) -> Self {
        let storage = Arc::new(PeerStorage::new());
        let processor = Arc::new(PeerProcessor::new(
            storage.clone(),
            communicator.clone(),
            config.clone(),
            events.clone(),
        ));
        Self {
            storage,
            processor,
            communicator,
            config,
            chain,
            bridge,
            slots,
            events,
            started_at: AtomicU64::new(0),
            initializing: AtomicBool::new(true),
            disable_discovery: AtomicBool::new(false),
            network_start: AtomicBool::new(false),
            ignore_minimum_network_reach: AtomicBool::new(false),
            block_pings: Mutex::new(HashMap::new()),
        }
    }

    pub fn storage(&self) -> &Arc<PeerStorage> {
        &self.storage
    }

    /// Bootstraps from the seed list (and an optional disk snapshot), runs
    /// the informational DNS/NTP probes, then either stops (`skipDiscovery`)
    /// or spawns the self-rescheduling discovery task (spec §4.4.1).
    ///
    /// The discovery loop here is a single task that recomputes its own
    /// delay after every pass, rather than a boolean "is an update already
    /// scheduled" latch guarding repeated `tokio::spawn` calls: there is
    /// only ever one in-flight sleep, so there is nothing for a latch to
    /// protect against.
    pub async fn start(self: &Arc<Self>, options: StartOptions) -> P2pResult<()> {
        if self.config.seed_peers.is_empty() {
            return Err(P2pError::NoSeedPeers);
        }
        self.started_at
            .store(get_current_time_in_seconds(), Ordering::Release);
        self.disable_discovery.store(options.disable_discovery, Ordering::Release);
        self.network_start.store(options.network_start, Ordering::Release);
        self.ignore_minimum_network_reach
            .store(options.ignore_minimum_network_reach, Ordering::Release);

        reachability::check_dns(&options.dns).await;
        reachability::check_ntp(&options.ntp).await;

        if let Some(path) = &options.peer_snapshot_path {
            if let Ok(restored) = persistence::load_snapshot(path) {
                for entry in restored {
                    let _ = self.processor.validate_and_accept_peer(entry.ip, entry.port).await;
                }
            }
        }

        for seed in &self.config.seed_peers {
            let _ = self.processor.validate_and_accept_peer(seed.ip, seed.port).await;
        }

        if options.skip_discovery {
            info!("skip_discovery set, leaving the peer set as seeded without starting the discovery loop");
            self.initializing.store(false, Ordering::Release);
            return Ok(());
        }

        let monitor = self.clone();
        let snapshot_path = options.peer_snapshot_path.clone();
        tokio::spawn(async move {
            loop {
                let delay = monitor.update_network_status().await;
                if let Some(path) = &snapshot_path {
                    let snapshots: Vec<_> = monitor.storage.get_peers().iter().map(|p| p.snapshot()).collect();
                    let _ = persistence::save_snapshot(path, &snapshots);
                }
                tokio::time::sleep(delay).await;
            }
        });

        Ok(())
    }

    pub fn is_cold_start_active(&self) -> bool {
        let started_at = self.started_at.load(Ordering::Acquire);
        if started_at == 0 {
            return false;
        }
        get_current_time_in_seconds() < started_at + self.config.cold_start_secs
    }

    /// `hasMinimumPeers()` (spec §4.4.2/§4.4.3): whether the active set has
    /// reached the configured minimum network reach, or the gate has been
    /// disabled for this run via `ignoreMinimumNetworkReach`.
    pub fn has_minimum_peers(&self) -> bool {
        self.ignore_minimum_network_reach.load(Ordering::Acquire)
            || self.storage.peer_count() >= self.config.minimum_network_reach
    }

    /// One discovery-and-clean pass plus rescheduling (`updateNetworkStatus`,
    /// spec §4.4.2). A no-op, returning the default interval unchanged,
    /// while `disableDiscovery` or genesis-only (`networkStart`) mode is in
    /// effect.
    pub async fn update_network_status(&self) -> std::time::Duration {
        if self.disable_discovery.load(Ordering::Acquire) || self.network_start.load(Ordering::Acquire) {
            debug!("updateNetworkStatus is a no-op (disable_discovery or network_start is set)");
            return std::time::Duration::from_secs(self.config.discovery_interval_secs);
        }

        self.discover_peers().await;
        self.processor.reset_suspended_peers();
        self.clean_peers(false, false).await;
        self.initializing.store(false, Ordering::Release);

        if !self.has_minimum_peers() {
            for seed in &self.config.seed_peers {
                let _ = self.processor.validate_and_accept_peer(seed.ip, seed.port).await;
            }
            std::time::Duration::from_secs(self.config.discovery_retry_secs)
        } else {
            std::time::Duration::from_secs(self.config.discovery_interval_secs)
        }
    }

    /// Queries known peers for their peer lists in parallel batches and
    /// admits anything new (spec §4.4.3 `discoverPeers`). Stops early once
    /// `hasMinimumPeers()` holds and at least `min_peers_to_query` peers
    /// have answered. Does not clean or reschedule; see
    /// [`Self::update_network_status`] for the combined pass.
    pub async fn discover_peers(&self) {
        let timeout = self.config.global_timeout();
        let mut known: Vec<Arc<Peer>> = self.storage.get_peers();
        known.shuffle(&mut rand::thread_rng());

        let batch_size = self.config.min_peers_to_query.max(1);
        let mut queried = 0usize;

        for batch in known.chunks(batch_size) {
            let responses = futures::future::join_all(batch.iter().map(|peer| {
                let communicator = self.communicator.clone();
                let ip = peer.ip();
                let port = peer.port();
                async move { communicator.get_peers(ip, port, timeout).await }
            }))
            .await;

            for response in responses {
                let Ok(remote_peers) = response else { continue };
                queried += 1;
                for candidate in remote_peers {
                    if self.storage.has_peer(&candidate.ip) || self.storage.has_suspended_peer(&candidate.ip) {
                        continue;
                    }
                    let _ = self
                        .processor
                        .validate_and_accept_peer(candidate.ip, candidate.port)
                        .await;
                }
            }

            if self.has_minimum_peers() && queried >= self.config.min_peers_to_query {
                break;
            }
        }
    }

    /// Pings every active peer in parallel, refreshes height/slot/forging
    /// state via `getStatus` on a successful ping, and forgets whichever
    /// peers fail (spec §4.4.4, §5.3 "ping updates peer.state"). `fast`
    /// shortens the per-call timeout (used by `getNetworkState` and
    /// `checkNetworkHealth`); `force_ping` bypasses the `lastPinged`
    /// freshness cache.
    pub async fn clean_peers(&self, fast: bool, force_ping: bool) {
        if self.is_cold_start_active() {
            return;
        }
        let timeout = if fast {
            self.config.fast_ping_timeout()
        } else {
            self.config.global_timeout()
        };
        let refresh_secs = self.config.ping_refresh_secs;
        let snapshot = self.storage.get_peers();
        let max = snapshot.len();

        let results = futures::future::join_all(snapshot.into_iter().map(|peer| {
            let communicator = self.communicator.clone();
            async move {
                if !force_ping && peer.recently_pinged(refresh_secs) {
                    return (peer, Ok(()));
                }
                let outcome = communicator.ping(peer.ip(), peer.port(), timeout).await;
                if outcome.is_ok() {
                    if let Ok(status) = communicator.get_status(peer.ip(), peer.port(), timeout).await {
                        peer.apply_status(
                            status.version,
                            status.nethash,
                            status.height,
                            status.current_slot,
                            status.forging_allowed,
                            status.header,
                        );
                    }
                }
                (peer, outcome)
            }
        }))
        .await;

        let mut removed_by_reason: HashMap<&'static str, usize> = HashMap::new();
        let mut unresponsive_peers = 0usize;
        for (peer, outcome) in results {
            match outcome {
                Ok(()) => peer.touch_ping(),
                Err(err) => {
                    unresponsive_peers += 1;
                    if peer.is_priority() {
                        continue;
                    }
                    self.storage.forget_peer(&peer.ip());
                    let reason = err.kind();
                    *removed_by_reason.entry(reason).or_insert(0) += 1;
                    counter!("relay_p2p_peers_removed", "reason" => reason).increment(1u64);
                    self.events.emit(NotifyEvent::PeerRemoved {
                        ip: peer.ip(),
                        reason: reason.to_string(),
                    });
                }
            }
        }

        for (reason, count) in &removed_by_reason {
            warn!("removed {count} peers because of {reason}");
        }
        gauge!("relay_p2p_active_peers").set(self.storage.peer_count() as f64);

        if self.initializing.load(Ordering::Acquire) {
            info!(
                "{} of {max} responsive, network height {:?}, pbft forging status {:.2}",
                max.saturating_sub(unresponsive_peers),
                self.get_network_height(),
                self.get_pbft_forging_status(),
            );
        }
    }

    /// Lower-median of active peers' reported heights (spec glossary:
    /// "lower-median" breaks ties on an even peer count by taking the
    /// smaller of the two middle values).
    pub fn get_network_height(&self) -> Option<u64> {
        let mut heights: Vec<u64> = self.storage.get_peers().iter().map(|p| p.height()).collect();
        if heights.is_empty() {
            return None;
        }
        heights.sort_unstable();
        Some(heights[(heights.len() - 1) / 2])
    }

    /// Fraction of in-slot peers both caught up to the network height and
    /// reporting themselves allowed to forge (spec §4.4.5 / glossary "PBFT
    /// forging status").
    pub fn get_pbft_forging_status(&self) -> f64 {
        let slot = self.slots.current_slot();
        let height = self.get_network_height().unwrap_or(0);
        let peers = self.storage.get_peers();
        let synced = peers.iter().filter(|p| p.current_slot() == slot).count();
        if synced == 0 {
            return 0.0;
        }
        let allowed = peers
            .iter()
            .filter(|p| p.current_slot() == slot && p.forging_allowed() && p.height() >= height)
            .count();
        allowed as f64 / synced as f64
    }

    pub fn get_network_state(&self) -> NetworkState {
        NetworkState {
            peer_count: self.storage.peer_count(),
            suspended_count: self.storage.get_suspended_peers().len(),
            network_height: self.get_network_height(),
            pbft_forging_ratio: self.get_pbft_forging_status(),
            cold_start_active: self.is_cold_start_active(),
        }
    }

    /// `getNetworkState`, pinging everyone fresh first (spec §4.4.6):
    /// unlike [`Self::get_network_state`], this is async because it forces
    /// a `cleanPeers(fast=true, forcePing=true)` pass before snapshotting.
    pub async fn refresh_network_state(&self) -> NetworkState {
        if !self.is_cold_start_active() {
            self.clean_peers(true, true).await;
        }
        self.get_network_state()
    }

    /// Refreshes each active peer's [`Verification`] via `getCommonBlocks`,
    /// feeding the per-peer state `checkNetworkHealth`'s majority
    /// calculation reads. Not invoked automatically by `checkNetworkHealth`
    /// itself (the distilled spec does not name that call site); callers
    /// drive it on whatever cadence fits, e.g. alongside `syncWithNetwork`.
    pub async fn verify_peers(&self) -> usize {
        let timeout = self.config.global_timeout();
        let our_heights = self.chain.checkpoint_heights();
        let mut verified = 0;
        for peer in self.storage.get_peers() {
            if let Ok(verification) = self
                .communicator
                .get_common_blocks(peer.ip(), peer.port(), &our_heights, timeout)
                .await
            {
                peer.apply_verification(verification);
                verified += 1;
            }
        }
        verified
    }

    /// Majority consensus over peers' `verification.forked` flags (spec
    /// §4.4.7 fork detection).
    pub async fn check_network_health(&self) -> NetworkHealth {
        if !self.is_cold_start_active() {
            self.clean_peers(false, true).await;
            self.processor.reset_suspended_peers();
        }

        let active = self.storage.get_peers();
        if !self.ignore_minimum_network_reach.load(Ordering::Acquire) && active.len() < self.config.minimum_network_reach {
            return NetworkHealth::BelowMinimumReach {
                have: active.len(),
                required: self.config.minimum_network_reach,
            };
        }

        // "all" per spec step 3: every active peer (verified or not) plus
        // verified suspended peers. Unverified peers can never count as
        // forked, but they still dilute the ratio — only the step 6
        // group-by excludes them outright (spec §3: "verification = null
        // excludes the peer from the fork-majority group-by").
        let suspended_verified: Vec<Verification> = self
            .storage
            .get_suspended_peers()
            .into_iter()
            .filter_map(|sp| sp.verification)
            .collect();
        let all_count = active.len() + suspended_verified.len();
        if all_count == 0 {
            return NetworkHealth::Healthy;
        }

        let mut verified: Vec<Verification> = active.iter().filter_map(|p| p.verification()).collect();
        verified.extend(suspended_verified);

        let forked_count = verified.iter().filter(|v| v.forked).count();
        if forked_count * 2 < all_count {
            return NetworkHealth::Healthy;
        }

        // Group by highest_common_height; the largest group wins, ties
        // broken by the greatest height (spec step 6).
        let mut groups: HashMap<u64, usize> = HashMap::new();
        for v in &verified {
            *groups.entry(v.highest_common_height).or_insert(0) += 1;
        }
        let (&chosen_height, _) = groups
            .iter()
            .max_by(|(height1, count1), (height2, count2)| count1.cmp(count2).then(height1.cmp(height2)))
            .expect("verified is non-empty, so groups is non-empty");

        let blocks_to_rollback = self.chain.current_height().saturating_sub(chosen_height);
        self.events.emit(NotifyEvent::NetworkForked { blocks_to_rollback });
        NetworkHealth::Forked { blocks_to_rollback }
    }

    /// Cleans peers, resets suspensions, then suspends whichever peer the
    /// chain collaborator blames for the most recently detected fork
    /// (spec §4.4.11).
    pub async fn refresh_peers_after_fork(&self) {
        self.clean_peers(false, true).await;
        self.processor.reset_suspended_peers();
        if let Some(ip) = self.chain.forked_block_peer() {
            self.processor.suspend(ip, SuspensionReason::ForkedForkCauser);
        }
    }

    /// Downloads a batch of blocks from a uniformly random non-suspended,
    /// non-forked peer, retrying with exponential backoff (spec §4.4.8;
    /// bounded per the re-architecture noted in spec §9, since every
    /// active peer in storage is already non-suspended by construction).
    pub async fn sync_with_network(&self, from_height: u64) -> P2pResult<Vec<BlockBytes>> {
        let timeout = self.config.global_timeout();
        let mut backoff = std::time::Duration::from_millis(self.config.sync_retry_backoff_ms);
        let to_height = from_height.saturating_add(SYNC_BATCH_SIZE);

        for attempt in 0..=self.config.sync_max_retries {
            let viable: Vec<Arc<Peer>> = self
                .storage
                .get_peers()
                .into_iter()
                .filter(|p| !p.is_forked())
                .collect();
            let Some(peer) = viable.choose(&mut rand::thread_rng()) else {
                return Err(P2pError::NoViablePeers);
            };

            match self
                .communicator
                .download_blocks(peer.ip(), peer.port(), from_height, to_height, timeout)
                .await
            {
                Ok(blocks) => return Ok(blocks),
                Err(err) => {
                    warn!("sync with {} failed on attempt {attempt}: {err}", peer.ip());
                    if attempt == self.config.sync_max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
        Err(P2pError::NoViablePeers)
    }

    /// Forwards a block to active, non-forked peers, damping fan-out by
    /// how many times this block has already been re-observed locally
    /// (spec §4.4.9).
    pub async fn broadcast_block(&self, block_id: BlockId, block: BlockBytes) -> usize {
        if !self.bridge.is_ready() {
            debug!("blockchain not ready, skipping broadcast of block {}", block_id.height);
            return 0;
        }

        let mut ping = {
            let mut pings = self.block_pings.lock().unwrap();
            pings
                .entry(block_id)
                .or_insert_with(|| self.bridge.get_block_ping(block_id))
                .clone()
        };

        let mut probability = ping.forward_probability(BLOCK_PING_MAX_HOP);
        if ping.block == block_id && ping.age_millis() < BLOCK_PING_AGGREGATION_WINDOW_MS && probability > 0.0 {
            tokio::time::sleep(std::time::Duration::from_millis(
                BLOCK_PING_AGGREGATION_WINDOW_MS - ping.age_millis(),
            ))
            .await;
            let refreshed = self.bridge.get_block_ping(block_id);
            if refreshed.block != block_id {
                return 0;
            }
            ping = refreshed;
            probability = ping.forward_probability(BLOCK_PING_MAX_HOP);
        }

        let timeout = self.config.global_timeout();
        let targets: Vec<Arc<Peer>> = self
            .storage
            .get_peers()
            .into_iter()
            .filter(|peer| !peer.is_forked() && rand::random::<f64>() <= probability)
            .collect();

        let results = futures::future::join_all(targets.iter().map(|peer| {
            let communicator = self.communicator.clone();
            let block = block.clone();
            async move { communicator.post_block(peer.ip(), peer.port(), block, timeout).await }
        }))
        .await;
        let sent = results.into_iter().filter(|r| r.is_ok()).count();

        if let Some(tracked) = self.block_pings.lock().unwrap().get_mut(&block_id) {
            tracked.record_hop();
        }
        gauge!("relay_p2p_broadcast_fanout").set(sent as f64);
        sent
    }

    /// Forwards a transaction batch to a shuffled subset of at most
    /// `max_peers_broadcast` active peers (spec §4.4.10).
    pub async fn broadcast_transactions(&self, transactions: Vec<TransactionBytes>) -> usize {
        let timeout = self.config.global_timeout();
        let mut peers = self.storage.get_peers();
        peers.shuffle(&mut rand::thread_rng());
        peers.truncate(self.config.max_peers_broadcast);

        let results = futures::future::join_all(peers.iter().map(|peer| {
            let communicator = self.communicator.clone();
            let transactions = transactions.clone();
            async move {
                communicator
                    .post_transactions(peer.ip(), peer.port(), transactions, timeout)
                    .await
            }
        }))
        .await;
        let sent = results.into_iter().filter(|r| r.is_ok()).count();
        gauge!("relay_p2p_broadcast_fanout").set(sent as f64);
        sent
    }
}

/// Re-broadcast decay denominator (spec §4.4.9: "maxHop = 4").
const BLOCK_PING_MAX_HOP: u32 = 4;
/// How long `broadcastBlock` waits to aggregate further hops before
/// sending, when this block was only just first observed (spec §4.4.9).
const BLOCK_PING_AGGREGATION_WINDOW_MS: u64 = 500;
/// Blocks requested per `syncWithNetwork` call.
const SYNC_BATCH_SIZE: u64 = 400;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p2p::communicator::{RemotePeer, StatusResponse};
    use crate::p2p::events::BroadcastEventEmitter;
    use async_trait::async_trait;
    use std::time::Duration;

    struct StaticChain;
    impl ChainState for StaticChain {
        fn current_height(&self) -> u64 {
            1000
        }
        fn checkpoint_heights(&self) -> Vec<u64> {
            vec![1000, 900, 800]
        }
        fn forked_block_peer(&self) -> Option<IpAddr> {
            None
        }
    }

    struct ReadyBridge;
    impl BlockchainBridge for ReadyBridge {
        fn is_ready(&self) -> bool {
            true
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

    struct FixedSlot;
    impl SlotProvider for FixedSlot {
        fn current_slot(&self) -> u64 {
            1
        }
    }

    struct EmptyCommunicator;
    #[async_trait]
    impl PeerCommunicator for EmptyCommunicator {
        async fn ping(&self, _ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<()> {
            Ok(())
        }
        async fn get_status(&self, _ip: IpAddr, _port: u16, _timeout: Duration) -> P2pResult<StatusResponse> {
            Ok(StatusResponse {
                version: "1.0.0".into(),
                nethash: "net".into(),
                height: 1000,
                current_slot: 1,
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
                highest_common_height: 1000,
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

    fn monitor_with(config: MonitorConfig) -> Arc<NetworkMonitor<EmptyCommunicator>> {
        Arc::new(NetworkMonitor::new(
            Arc::new(EmptyCommunicator),
            Arc::new(config),
            Arc::new(StaticChain),
            Arc::new(ReadyBridge),
            Arc::new(FixedSlot),
            Arc::new(BroadcastEventEmitter::new(16)),
        ))
    }

    #[tokio::test]
    async fn network_height_is_none_when_no_peers() {
        let monitor = monitor_with(MonitorConfig::default());
        assert_eq!(monitor.get_network_height(), None);
    }

    #[tokio::test]
    async fn network_height_picks_lower_median_on_even_count() {
        let monitor = monitor_with(MonitorConfig::default());
        for (i, height) in [10u64, 20, 30, 40].into_iter().enumerate() {
            let ip: IpAddr = format!("10.0.0.{}", i + 1).parse().unwrap();
            let peer = Arc::new(Peer::new(ip, 4001, "1.0.0".into(), "net".into(), false));
            peer.apply_status("1.0.0".into(), "net".into(), height, 1, true, None);
            monitor.storage().set_peer(peer);
        }
        assert_eq!(monitor.get_network_height(), Some(20));
    }

    #[tokio::test]
    async fn pbft_ratio_is_zero_with_no_peers() {
        let monitor = monitor_with(MonitorConfig::default());
        assert_eq!(monitor.get_pbft_forging_status(), 0.0);
    }

    #[tokio::test]
    async fn below_minimum_reach_reported_with_few_peers() {
        let monitor = monitor_with(MonitorConfig {
            minimum_network_reach: 5,
            ..Default::default()
        });
        let health = monitor.check_network_health().await;
        assert_eq!(
            health,
            NetworkHealth::BelowMinimumReach { have: 0, required: 5 }
        );
    }

    #[tokio::test]
    async fn start_without_seed_peers_fails_fast() {
        let monitor = monitor_with(MonitorConfig::default());
        let result = monitor.start(StartOptions::default()).await;
        assert!(matches!(result, Err(P2pError::NoSeedPeers)));
    }

    #[tokio::test]
    async fn skip_discovery_admits_seeds_without_spawning_the_loop() {
        let ip: IpAddr = "10.0.2.1".parse().unwrap();
        let config = MonitorConfig {
            seed_peers: vec![crate::config::SeedPeer { ip, port: 4001 }],
            ..Default::default()
        };
        let monitor = monitor_with(config);
        monitor
            .start(StartOptions {
                skip_discovery: true,
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(monitor.storage().has_peer(&ip));
    }

    #[tokio::test]
    async fn network_start_makes_update_network_status_a_no_op() {
        let ip: IpAddr = "10.0.2.2".parse().unwrap();
        let config = MonitorConfig {
            seed_peers: vec![crate::config::SeedPeer { ip, port: 4001 }],
            discovery_interval_secs: 42,
            ..Default::default()
        };
        let monitor = monitor_with(config);
        monitor
            .start(StartOptions {
                skip_discovery: true,
                network_start: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let delay = monitor.update_network_status().await;
        assert_eq!(delay, std::time::Duration::from_secs(42));
        // No discovery ever ran, but the seed is still present from start().
        assert!(monitor.storage().has_peer(&ip));
    }

    #[tokio::test]
    async fn ignore_minimum_network_reach_bypasses_below_minimum_reach() {
        let monitor = monitor_with(MonitorConfig {
            minimum_network_reach: 5,
            seed_peers: vec![crate::config::SeedPeer {
                ip: "10.0.2.3".parse().unwrap(),
                port: 4001,
            }],
            ..Default::default()
        });
        monitor
            .start(StartOptions {
                skip_discovery: true,
                ignore_minimum_network_reach: true,
                ..Default::default()
            })
            .await
            .unwrap();
        let health = monitor.check_network_health().await;
        assert_ne!(health, NetworkHealth::BelowMinimumReach { have: 1, required: 5 });
    }

    #[tokio::test]
    async fn broadcast_block_never_targets_a_forked_peer() {
        let monitor = monitor_with(MonitorConfig::default());
        let ip: IpAddr = "10.0.1.1".parse().unwrap();
        let peer = Arc::new(Peer::new(ip, 4001, "1.0.0".into(), "net".into(), false));
        peer.apply_verification(Verification {
            highest_common_height: 900,
            forked: true,
        });
        monitor.storage().set_peer(peer);
        let sent = monitor
            .broadcast_block(BlockId { id: relay_common::crypto::Hash::zero(), height: 1000 }, vec![1, 2, 3])
            .await;
        assert_eq!(sent, 0);
    }
}
