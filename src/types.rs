//! Core data types shared across the evaluation engine

use serde::{Deserialize, Serialize};

/// A single observed reference to a token by a monitored source.
///
/// Immutable once created. Retained only inside the token's bounded
/// mention deque; old entries are evicted from the front by age.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    /// Token identifier (e.g. mint address)
    pub token: String,

    /// Source identifier (e.g. channel handle)
    pub source: String,

    /// Observation time, Unix seconds UTC
    pub timestamp: i64,
}

/// Alert tiers in increasing confidence order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    /// Social consensus across distinct sources
    T1,
    /// Market confirmation (holders, liquidity, transactions, VIP evidence)
    T2,
    /// Momentum (market cap, volume, price multiple)
    T3,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::T1 => "T1",
            Tier::T2 => "T2",
            Tier::T3 => "T3",
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Externally supplied market/on-chain metrics for a token.
///
/// Every market field is optional: a missing field makes any tier check
/// that depends on it evaluate ineligible (fail-closed). The snapshot is
/// valid only for the evaluation cycle that produced it; the engine never
/// caches snapshots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnrichmentSnapshot {
    /// Snapshot time, Unix seconds UTC
    pub timestamp: i64,

    pub liquidity_usd: Option<f64>,
    pub volume_h1_usd: Option<f64>,
    pub volume_h24_usd: Option<f64>,
    pub holders: Option<u64>,

    /// Largest single wallet's share of supply, percent 0-100
    pub largest_wallet_pct: Option<f64>,

    /// True when mint and freeze authorities are revoked
    pub mint_safety: Option<bool>,

    pub market_cap_usd: Option<f64>,
    pub price_usd: Option<f64>,

    /// 15-minute price trend; sign is what matters for T3
    pub price_change_m15: Option<f64>,

    pub buys_h1: Option<u64>,
    pub sells_h1: Option<u64>,
}

/// The unit handed to the external alert publisher.
///
/// At most one decision is produced per mention, already de-duplicated
/// against cooldown and tier-ordering rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertDecision {
    pub token: String,
    pub tier: Tier,

    /// Evaluation time the transition was applied at, Unix seconds UTC
    pub timestamp: i64,

    /// Snapshot the decision was based on; None for social-only T1
    pub snapshot_used: Option<EnrichmentSnapshot>,
}
