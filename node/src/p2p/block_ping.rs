use relay_common::crypto::Hash;
use relay_common::time::{get_current_time_in_millis, TimestampMillis};
use serde::{Deserialize, Serialize};

/// Identifies the block a [`BlockPing`] is gossiping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, std::hash::Hash, Serialize, Deserialize)]
pub struct BlockId {
    pub id: Hash,
    pub height: u64,
}

/// Tracks how many times a given block has been re-broadcast to us, so
/// `broadcastBlock` can decay its own fan-out the more a block has already
/// propagated (spec §5.4 "probabilistic broadcast back-pressure"). Millis
/// resolution because `broadcastBlock`'s aggregation window is 500ms.
#[derive(Debug, Clone)]
pub struct BlockPing {
    pub block: BlockId,
    pub count: u32,
    pub first: TimestampMillis,
    pub last: TimestampMillis,
}

impl BlockPing {
    pub fn first_seen(block: BlockId) -> Self {
        let now = get_current_time_in_millis();
        Self {
            block,
            count: 1,
            first: now,
            last: now,
        }
    }

    pub fn record_hop(&mut self) {
        self.count += 1;
        self.last = get_current_time_in_millis();
    }

    /// Milliseconds between the first and most recent local observation of
    /// this block, used to decide whether to aggregate further hops before
    /// broadcasting (spec §4.4.9).
    pub fn age_millis(&self) -> u64 {
        self.last.saturating_sub(self.first)
    }

    /// Probability a node forwards this block to a given peer:
    /// `(maxHop - count) / maxHop`, floored at zero once a block has
    /// propagated past `max_hop` times.
    pub fn forward_probability(&self, max_hop: u32) -> f64 {
        if max_hop == 0 {
            return 0.0;
        }
        let remaining = max_hop.saturating_sub(self.count);
        remaining as f64 / max_hop as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> BlockId {
        BlockId {
            id: Hash::zero(),
            height: 10,
        }
    }

    #[test]
    fn probability_decays_with_hop_count() {
        let mut ping = BlockPing::first_seen(block());
        let p1 = ping.forward_probability(10);
        ping.record_hop();
        ping.record_hop();
        let p2 = ping.forward_probability(10);
        assert!(p2 < p1);
    }

    #[test]
    fn probability_floors_at_zero_past_max_hop() {
        let mut ping = BlockPing::first_seen(block());
        for _ in 0..20 {
            ping.record_hop();
        }
        assert_eq!(ping.forward_probability(10), 0.0);
    }
}
