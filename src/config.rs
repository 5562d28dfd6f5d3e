//! Engine configuration from environment variables
//!
//! All thresholds are runtime-supplied; nothing in the evaluation path is
//! hard-coded. `Default` carries the deployment defaults, `from_env()`
//! overrides them from the environment using the same variable names the
//! production deployment uses.

use std::env;
use std::str::FromStr;

/// Flat threshold set consumed by the classifier, state machine and
/// coordinator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // Social consensus
    /// Window for counting distinct sources (minutes)
    pub overlap_window_min: i64,
    /// Distinct sources required for T1
    pub min_unique_channels_t1: usize,
    /// Short velocity window (minutes)
    pub vel5_window_min: i64,
    /// Long velocity window (minutes)
    pub vel10_window_min: i64,
    /// Mention retention floor (minutes); actual retention is the max of
    /// this and every configured window
    pub mention_retention_min: i64,

    // Alert gating
    /// T1 re-fire cooldown (minutes); 0 disables the cooldown
    pub cooldown_minutes_t1: i64,
    /// Post-T1 mention count that arms a hot-reset
    pub hot_threshold: u32,
    /// Minimum hours between hot-resets; 0 disables hot-reset
    pub hot_reset_hours: i64,

    // Safety
    pub mint_safety_required: bool,
    /// Largest wallet share cap for T2, percent
    pub largest_wallet_max_pct: f64,

    // Tier 2 (Confirmation)
    pub t2_holders_min: u64,
    pub t2_liq_min_usd: f64,
    pub t2_liq_drawdown_max_pct: f64,
    pub t2_txns_h1_min: u64,
    pub t2_buy_sell_ratio_min: f64,
    pub t2_age_min_minutes: i64,
    pub t2_age_max_minutes: i64,

    // Tier 3 (Momentum)
    pub t3_mcap_min_usd: f64,
    pub t3_vol24_min_usd: f64,
    pub t3_price_min_x: f64,
    pub t3_price_max_x: f64,
    pub t3_holders_min: u64,
    pub t3_pos_trend_required: bool,
    pub t3_age_min_minutes: i64,
    pub t3_age_max_minutes: i64,

    // Enrichment
    /// Cap on simultaneous outstanding gateway calls
    pub enrichment_max_concurrency: usize,
    /// Deadline for a single gateway call (seconds)
    pub enrichment_deadline_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            overlap_window_min: 15,
            min_unique_channels_t1: 4,
            vel5_window_min: 5,
            vel10_window_min: 10,
            mention_retention_min: 180,

            cooldown_minutes_t1: 0,
            hot_threshold: 4,
            hot_reset_hours: 24,

            mint_safety_required: true,
            largest_wallet_max_pct: 40.0,

            t2_holders_min: 250,
            t2_liq_min_usd: 50_000.0,
            t2_liq_drawdown_max_pct: 10.0,
            t2_txns_h1_min: 500,
            t2_buy_sell_ratio_min: 1.5,
            t2_age_min_minutes: 30,
            t2_age_max_minutes: 90,

            t3_mcap_min_usd: 500_000.0,
            t3_vol24_min_usd: 2_000_000.0,
            t3_price_min_x: 5.0,
            t3_price_max_x: 20.0,
            t3_holders_min: 1500,
            t3_pos_trend_required: true,
            t3_age_min_minutes: 120,
            t3_age_max_minutes: 240,

            enrichment_max_concurrency: 4,
            enrichment_deadline_secs: 15,
        }
    }
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn env_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(v) => matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        Err(_) => default,
    }
}

impl EngineConfig {
    /// Load configuration from environment variables, falling back to the
    /// deployment defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            overlap_window_min: env_parse("OVERLAP_WINDOW_MIN", d.overlap_window_min),
            min_unique_channels_t1: env_parse("MIN_UNIQUE_CHANNELS_T1", d.min_unique_channels_t1),
            vel5_window_min: env_parse("VEL5_WINDOW_MIN", d.vel5_window_min),
            vel10_window_min: env_parse("VEL10_WINDOW_MIN", d.vel10_window_min),
            mention_retention_min: env_parse("MENTION_RETENTION_MIN", d.mention_retention_min),

            cooldown_minutes_t1: env_parse("COOLDOWN_MINUTES_T1", d.cooldown_minutes_t1),
            hot_threshold: env_parse("HOT_THRESHOLD", d.hot_threshold),
            hot_reset_hours: env_parse("HOT_RESET_HOURS", d.hot_reset_hours),

            mint_safety_required: env_bool("MINT_SAFETY_REQUIRED", d.mint_safety_required),
            largest_wallet_max_pct: env_parse("LARGEST_WALLET_MAX", d.largest_wallet_max_pct),

            t2_holders_min: env_parse("T2_HOLDERS_MIN", d.t2_holders_min),
            t2_liq_min_usd: env_parse("T2_LIQ_MIN_USD", d.t2_liq_min_usd),
            t2_liq_drawdown_max_pct: env_parse(
                "T2_LIQ_DRAWDOWN_MAX_PCT",
                d.t2_liq_drawdown_max_pct,
            ),
            t2_txns_h1_min: env_parse("T2_TXNS_H1_MIN", d.t2_txns_h1_min),
            t2_buy_sell_ratio_min: env_parse("T2_BUY_SELL_RATIO_MIN", d.t2_buy_sell_ratio_min),
            t2_age_min_minutes: env_parse("T2_AGE_MIN_MINUTES", d.t2_age_min_minutes),
            t2_age_max_minutes: env_parse("T2_AGE_MAX_MINUTES", d.t2_age_max_minutes),

            t3_mcap_min_usd: env_parse("T3_MCAP_MIN_USD", d.t3_mcap_min_usd),
            t3_vol24_min_usd: env_parse("T3_VOL24_MIN_USD", d.t3_vol24_min_usd),
            t3_price_min_x: env_parse("T3_PRICE_MIN_X", d.t3_price_min_x),
            t3_price_max_x: env_parse("T3_PRICE_MAX_X", d.t3_price_max_x),
            t3_holders_min: env_parse("T3_HOLDERS_MIN", d.t3_holders_min),
            t3_pos_trend_required: env_bool("T3_POS_TREND_REQUIRED", d.t3_pos_trend_required),
            t3_age_min_minutes: env_parse("T3_AGE_MIN_MINUTES", d.t3_age_min_minutes),
            t3_age_max_minutes: env_parse("T3_AGE_MAX_MINUTES", d.t3_age_max_minutes),

            enrichment_max_concurrency: env_parse(
                "ENRICHMENT_MAX_CONCURRENCY",
                d.enrichment_max_concurrency,
            ),
            enrichment_deadline_secs: env_parse(
                "ENRICHMENT_DEADLINE_SEC",
                d.enrichment_deadline_secs,
            ),
        }
    }

    /// Longest window any store query can ask for, in minutes. Mentions
    /// older than this relative to the newest one are evicted.
    pub fn retention_minutes(&self) -> i64 {
        self.mention_retention_min
            .max(self.overlap_window_min)
            .max(self.vel5_window_min)
            .max(self.vel10_window_min)
    }
}
