use super::peer::Verification;
use crate::config::suspension_durations;
use relay_common::time::{get_current_time_in_seconds, TimestampSeconds};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Why a peer was suspended (spec §4.2, §9). Ordered roughly by how
/// recoverable the condition is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuspensionReason {
    Unresponsive,
    BadResponse,
    InvalidVersion,
    NethashMismatch,
    Blacklisted,
    ForkedForkCauser,
}

impl SuspensionReason {
    pub fn duration_secs(self) -> u64 {
        use suspension_durations::*;
        match self {
            SuspensionReason::Unresponsive => UNRESPONSIVE_SECS,
            SuspensionReason::BadResponse => BAD_RESPONSE_SECS,
            SuspensionReason::InvalidVersion => INVALID_VERSION_SECS,
            SuspensionReason::NethashMismatch => NETHASH_MISMATCH_SECS,
            SuspensionReason::Blacklisted => BLACKLISTED_SECS,
            SuspensionReason::ForkedForkCauser => FORKED_FORK_CAUSER_SECS,
        }
    }
}

/// A peer currently serving a suspension, tracked separately from the
/// active registry so `getPeers` never returns it (spec invariant: a peer
/// is active XOR suspended, never both).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuspendedPeer {
    pub ip: IpAddr,
    pub reason: SuspensionReason,
    pub suspended_at: TimestampSeconds,
    pub expires_at: TimestampSeconds,
    /// The peer's last known fork verification, carried over from the
    /// active record it was suspended from (`None` if it was never
    /// verified). Lets `checkNetworkHealth` combine active peers with
    /// "verified suspended peers" per spec §4.4.7 step 3.
    pub verification: Option<Verification>,
}

impl SuspendedPeer {
    pub fn new(ip: IpAddr, reason: SuspensionReason) -> Self {
        Self::with_verification(ip, reason, None)
    }

    pub fn with_verification(ip: IpAddr, reason: SuspensionReason, verification: Option<Verification>) -> Self {
        let now = get_current_time_in_seconds();
        Self {
            ip,
            reason,
            suspended_at: now,
            expires_at: now + reason.duration_secs(),
            verification,
        }
    }

    pub fn is_expired(&self) -> bool {
        get_current_time_in_seconds() >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blacklisted_outlasts_unresponsive() {
        assert!(SuspensionReason::Blacklisted.duration_secs() > SuspensionReason::Unresponsive.duration_secs());
    }

    #[test]
    fn fresh_suspension_is_not_expired() {
        let s = SuspendedPeer::new("127.0.0.1".parse().unwrap(), SuspensionReason::BadResponse);
        assert!(!s.is_expired());
    }
}
