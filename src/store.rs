//! Mention store - append-only per-token aggregation of observed mentions
//!
//! Owns one `TokenAggregate` per token and answers the windowed views the
//! classifier needs (distinct-source overlap, raw velocity, token age).
//! Keyed by token through a sharded concurrent map, so mutations for
//! different tokens never contend on a global lock.

use crate::classifier::SocialView;
use crate::types::Mention;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};

/// Per-token aggregate of recent mentions and slow-moving reference data.
///
/// The mention deque is time-bounded: timestamps are monotonically
/// non-decreasing and eviction only removes from the front. Reference
/// price is write-once; peak liquidity is a running maximum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenAggregate {
    pub token: String,

    /// Recent mentions, oldest first
    mentions: VecDeque<Mention>,

    /// First time this token was ever mentioned, Unix seconds UTC
    pub first_seen: i64,

    /// Most recent mention time; drives externally-owned idle GC
    pub last_mention: i64,

    /// Price observed when the token first reached T1, write-once
    first_reference_price: Option<f64>,

    /// Highest liquidity ever observed for this token, never decreases
    peak_liquidity_usd: Option<f64>,

    /// Wallets with VIP evidence for this token, supplied by an external
    /// watcher
    vip_holders: HashSet<String>,
}

impl TokenAggregate {
    fn new(token: String, first_seen: i64) -> Self {
        Self {
            token,
            mentions: VecDeque::new(),
            first_seen,
            last_mention: first_seen,
            first_reference_price: None,
            peak_liquidity_usd: None,
            vip_holders: HashSet::new(),
        }
    }

    fn push(&mut self, mut mention: Mention, retention_secs: i64) {
        // Clamp a late timestamp to the tail so the deque stays monotonic.
        if let Some(back) = self.mentions.back() {
            if mention.timestamp < back.timestamp {
                mention.timestamp = back.timestamp;
            }
        }
        self.last_mention = self.last_mention.max(mention.timestamp);
        let newest = mention.timestamp;
        self.mentions.push_back(mention);

        let cutoff = newest - retention_secs;
        while let Some(front) = self.mentions.front() {
            if front.timestamp < cutoff {
                self.mentions.pop_front();
            } else {
                break;
            }
        }
    }

    fn unique_sources_in(&self, window_secs: i64, as_of: i64) -> usize {
        let cutoff = as_of - window_secs;
        let mut seen: HashSet<&str> = HashSet::new();
        for m in self.mentions.iter().rev() {
            if m.timestamp < cutoff {
                break;
            }
            if m.timestamp <= as_of {
                seen.insert(m.source.as_str());
            }
        }
        seen.len()
    }

    fn count_in(&self, window_secs: i64, as_of: i64) -> usize {
        let cutoff = as_of - window_secs;
        self.mentions
            .iter()
            .rev()
            .take_while(|m| m.timestamp >= cutoff)
            .filter(|m| m.timestamp <= as_of)
            .count()
    }

    pub fn mention_count(&self) -> usize {
        self.mentions.len()
    }

    pub fn first_reference_price(&self) -> Option<f64> {
        self.first_reference_price
    }

    pub fn peak_liquidity_usd(&self) -> Option<f64> {
        self.peak_liquidity_usd
    }

    pub fn vip_holder_count(&self) -> usize {
        self.vip_holders.len()
    }
}

/// Append-only store of per-token mention aggregates.
pub struct MentionStore {
    aggregates: DashMap<String, TokenAggregate>,

    /// Eviction horizon, seconds
    retention_secs: i64,
}

impl MentionStore {
    /// `retention_minutes` must cover the longest window any caller will
    /// query (see `EngineConfig::retention_minutes`).
    pub fn new(retention_minutes: i64) -> Self {
        Self {
            aggregates: DashMap::new(),
            retention_secs: retention_minutes.max(1) * 60,
        }
    }

    /// Append a mention, creating the aggregate on first sight and
    /// evicting entries older than the retention horizon. Always succeeds.
    pub fn record(&self, mention: Mention) {
        let mut agg = self
            .aggregates
            .entry(mention.token.clone())
            .or_insert_with(|| TokenAggregate::new(mention.token.clone(), mention.timestamp));
        // The aggregate may exist from VIP evidence alone; token age is
        // anchored at the first actual mention.
        if agg.mentions.is_empty() {
            agg.first_seen = mention.timestamp;
            agg.last_mention = mention.timestamp;
        }
        agg.push(mention, self.retention_secs);
    }

    /// Distinct source identifiers seen within `[as_of - window, as_of]`.
    pub fn windowed_unique_sources(&self, token: &str, window_min: i64, as_of: i64) -> usize {
        self.aggregates
            .get(token)
            .map(|a| a.unique_sources_in(window_min * 60, as_of))
            .unwrap_or(0)
    }

    /// Raw mention count within the window, not deduplicated by source.
    pub fn velocity(&self, token: &str, window_min: i64, as_of: i64) -> usize {
        self.aggregates
            .get(token)
            .map(|a| a.count_in(window_min * 60, as_of))
            .unwrap_or(0)
    }

    /// Minutes since the token was first seen; None for unknown tokens.
    pub fn age_minutes(&self, token: &str, as_of: i64) -> Option<f64> {
        self.aggregates
            .get(token)
            .map(|a| (as_of - a.first_seen) as f64 / 60.0)
    }

    pub fn first_reference_price(&self, token: &str) -> Option<f64> {
        self.aggregates
            .get(token)
            .and_then(|a| a.first_reference_price)
    }

    /// Set the reference price exactly once; later calls are no-ops.
    pub fn set_first_reference_price(&self, token: &str, price: f64) {
        if let Some(mut agg) = self.aggregates.get_mut(token) {
            if agg.first_reference_price.is_none() {
                agg.first_reference_price = Some(price);
                log::debug!("Reference price for {} set to {}", token, price);
            }
        }
    }

    /// Fold an observed liquidity value into the running per-token peak.
    pub fn observe_liquidity(&self, token: &str, liquidity_usd: f64) {
        if let Some(mut agg) = self.aggregates.get_mut(token) {
            let peak = agg.peak_liquidity_usd.unwrap_or(0.0);
            if liquidity_usd > peak {
                agg.peak_liquidity_usd = Some(liquidity_usd);
            }
        }
    }

    pub fn peak_liquidity(&self, token: &str) -> Option<f64> {
        self.aggregates
            .get(token)
            .and_then(|a| a.peak_liquidity_usd)
    }

    /// Record externally-supplied VIP holder evidence for a token.
    pub fn record_vip_holder(&self, token: &str, wallet: &str) {
        let mut agg = self
            .aggregates
            .entry(token.to_string())
            .or_insert_with(|| TokenAggregate::new(token.to_string(), 0));
        agg.vip_holders.insert(wallet.to_string());
    }

    pub fn vip_holder_count(&self, token: &str) -> usize {
        self.aggregates
            .get(token)
            .map(|a| a.vip_holders.len())
            .unwrap_or(0)
    }

    /// Most recent mention time for a token. Garbage collection of silent
    /// tokens is an external decision; this is the input to it.
    pub fn idle_since(&self, token: &str) -> Option<i64> {
        self.aggregates.get(token).map(|a| a.last_mention)
    }

    /// Drop aggregates whose last mention is older than `cutoff`.
    /// Returns the number of tokens removed.
    pub fn prune_idle(&self, cutoff: i64) -> usize {
        let before = self.aggregates.len();
        self.aggregates.retain(|_, agg| agg.last_mention >= cutoff);
        before - self.aggregates.len()
    }

    pub fn tracked_tokens(&self) -> usize {
        self.aggregates.len()
    }

    /// Classifier-facing snapshot of a token's social state.
    pub fn social_view(&self, token: &str, overlap_window_min: i64, as_of: i64) -> Option<SocialView> {
        self.aggregates.get(token).map(|a| SocialView {
            unique_sources_overlap: a.unique_sources_in(overlap_window_min * 60, as_of),
            age_minutes: (as_of - a.first_seen) as f64 / 60.0,
            first_reference_price: a.first_reference_price,
            peak_liquidity_usd: a.peak_liquidity_usd,
            vip_holder_count: a.vip_holders.len(),
        })
    }

    /// Full clone of every aggregate, for state export.
    pub fn export(&self) -> Vec<TokenAggregate> {
        self.aggregates.iter().map(|e| e.value().clone()).collect()
    }

    /// Replace tracked aggregates with a previously exported set.
    pub fn import(&self, aggregates: Vec<TokenAggregate>) {
        self.aggregates.clear();
        for agg in aggregates {
            self.aggregates.insert(agg.token.clone(), agg);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mention(token: &str, source: &str, ts: i64) -> Mention {
        Mention {
            token: token.to_string(),
            source: source.to_string(),
            timestamp: ts,
        }
    }

    #[test]
    fn test_record_creates_aggregate() {
        let store = MentionStore::new(180);
        store.record(mention("tok", "@a", 1000));

        assert_eq!(store.tracked_tokens(), 1);
        assert_eq!(store.velocity("tok", 5, 1000), 1);
        assert_eq!(store.idle_since("tok"), Some(1000));
    }

    #[test]
    fn test_sliding_window_contents() {
        // Test: window queries match the true sliding-window contents
        let store = MentionStore::new(180);
        let base = 10_000;
        // One mention per minute from three sources
        for i in 0..12 {
            let src = format!("@s{}", i % 3);
            store.record(mention("tok", &src, base + i * 60));
        }
        let as_of = base + 11 * 60;

        // 5-minute window holds the last 6 mentions (inclusive bounds)
        assert_eq!(store.velocity("tok", 5, as_of), 6);
        assert_eq!(store.windowed_unique_sources("tok", 5, as_of), 3);
        // 1-minute window: two mentions (t-60 and t)
        assert_eq!(store.velocity("tok", 1, as_of), 2);
        assert_eq!(store.windowed_unique_sources("tok", 1, as_of), 2);
        // Full horizon
        assert_eq!(store.velocity("tok", 15, as_of), 12);
    }

    #[test]
    fn test_eviction_front_only() {
        // Test: entries older than retention vanish, newest survive
        let store = MentionStore::new(10); // 10 minutes
        let base = 50_000;
        store.record(mention("tok", "@a", base));
        store.record(mention("tok", "@b", base + 300));
        store.record(mention("tok", "@c", base + 700));

        // The first mention is now 700s old with a 600s horizon
        assert_eq!(store.velocity("tok", 60, base + 700), 2);
        assert_eq!(store.windowed_unique_sources("tok", 60, base + 700), 2);
        // first_seen survives eviction
        assert_eq!(store.age_minutes("tok", base + 700), Some(700.0 / 60.0));
    }

    #[test]
    fn test_out_of_order_timestamp_clamped() {
        // Test: a late timestamp is clamped so the deque stays monotonic
        let store = MentionStore::new(180);
        store.record(mention("tok", "@a", 2000));
        store.record(mention("tok", "@b", 1500)); // earlier than tail

        // Both land in a window anchored at 2000
        assert_eq!(store.velocity("tok", 1, 2000), 2);
        assert_eq!(store.idle_since("tok"), Some(2000));
    }

    #[test]
    fn test_first_reference_price_first_wins() {
        let store = MentionStore::new(180);
        store.record(mention("tok", "@a", 1000));

        assert_eq!(store.first_reference_price("tok"), None);
        store.set_first_reference_price("tok", 0.5);
        store.set_first_reference_price("tok", 9.0); // no-op
        assert_eq!(store.first_reference_price("tok"), Some(0.5));
    }

    #[test]
    fn test_peak_liquidity_monotonic() {
        let store = MentionStore::new(180);
        store.record(mention("tok", "@a", 1000));

        store.observe_liquidity("tok", 40_000.0);
        store.observe_liquidity("tok", 60_000.0);
        store.observe_liquidity("tok", 55_000.0); // below peak, ignored
        assert_eq!(store.peak_liquidity("tok"), Some(60_000.0));
    }

    #[test]
    fn test_vip_holders_deduplicated() {
        let store = MentionStore::new(180);
        store.record_vip_holder("tok", "wallet1");
        store.record_vip_holder("tok", "wallet1");
        store.record_vip_holder("tok", "wallet2");
        assert_eq!(store.vip_holder_count("tok"), 2);
    }

    #[test]
    fn test_vip_evidence_before_first_mention() {
        // Test: VIP evidence alone creates the aggregate, but token age is
        // anchored at the first actual mention
        let store = MentionStore::new(180);
        store.record_vip_holder("tok", "wallet1");
        store.record(mention("tok", "@a", 7000));

        assert_eq!(store.vip_holder_count("tok"), 1);
        assert_eq!(store.age_minutes("tok", 7000 + 60), Some(1.0));
    }

    #[test]
    fn test_prune_idle() {
        let store = MentionStore::new(180);
        store.record(mention("old", "@a", 1000));
        store.record(mention("fresh", "@a", 9000));

        let removed = store.prune_idle(5000);
        assert_eq!(removed, 1);
        assert_eq!(store.tracked_tokens(), 1);
        assert!(store.idle_since("old").is_none());
        assert_eq!(store.idle_since("fresh"), Some(9000));
    }

    #[test]
    fn test_unknown_token_queries() {
        let store = MentionStore::new(180);
        assert_eq!(store.velocity("nope", 5, 1000), 0);
        assert_eq!(store.windowed_unique_sources("nope", 5, 1000), 0);
        assert!(store.age_minutes("nope", 1000).is_none());
        assert!(store.social_view("nope", 15, 1000).is_none());
    }

    #[test]
    fn test_export_import_round_trip() {
        let store = MentionStore::new(180);
        store.record(mention("tok", "@a", 1000));
        store.record(mention("tok", "@b", 1100));
        store.set_first_reference_price("tok", 0.25);
        store.observe_liquidity("tok", 80_000.0);
        store.record_vip_holder("tok", "w1");

        let exported = store.export();
        let restored = MentionStore::new(180);
        restored.import(exported);

        assert_eq!(restored.velocity("tok", 15, 1100), 2);
        assert_eq!(restored.first_reference_price("tok"), Some(0.25));
        assert_eq!(restored.peak_liquidity("tok"), Some(80_000.0));
        assert_eq!(restored.vip_holder_count("tok"), 1);
        assert_eq!(restored.age_minutes("tok", 1100), Some(100.0 / 60.0));
    }
}
