//! Tier classifier - pure eligibility rules for T1/T2/T3
//!
//! Every function here is a pure decision over a social snapshot, an
//! optional enrichment snapshot and the configured thresholds. No
//! mutation, no I/O, no ordering: whether a tier is allowed to fire given
//! what fired before is the alert state machine's job.
//!
//! Fail-closed rule: a missing enrichment field makes the tier that needs
//! it ineligible. Comparisons are inclusive exactly as configured
//! (`>=` / `<=`).

use crate::config::EngineConfig;
use crate::types::EnrichmentSnapshot;

/// Point-in-time view of a token's aggregate, as seen by the classifier.
#[derive(Debug, Clone)]
pub struct SocialView {
    /// Distinct sources inside the overlap window
    pub unique_sources_overlap: usize,

    /// Minutes since first mention
    pub age_minutes: f64,

    /// Write-once price reference for the T3 multiple
    pub first_reference_price: Option<f64>,

    /// Running liquidity maximum for the T2 drawdown check
    pub peak_liquidity_usd: Option<f64>,

    /// VIP holder evidence count
    pub vip_holder_count: usize,
}

/// Independent per-tier verdicts for one evaluation cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TierVerdicts {
    pub t1: bool,
    pub t2: bool,
    pub t3: bool,
}

/// T1 (Consensus): enough distinct sources inside the overlap window.
/// Purely social, cheap enough to run on every mention.
pub fn t1_eligible(cfg: &EngineConfig, view: &SocialView) -> bool {
    view.unique_sources_overlap >= cfg.min_unique_channels_t1
}

/// T2 (Confirmation): market quality checks inside the T2 age window.
pub fn t2_eligible(
    cfg: &EngineConfig,
    view: &SocialView,
    snapshot: Option<&EnrichmentSnapshot>,
) -> bool {
    let snap = match snapshot {
        Some(s) => s,
        None => return false,
    };
    if !age_within(view.age_minutes, cfg.t2_age_min_minutes, cfg.t2_age_max_minutes) {
        return false;
    }
    if !mint_safety_ok(cfg, snap) {
        return false;
    }

    let holders_ok = matches!(snap.holders, Some(h) if h >= cfg.t2_holders_min);

    let liquidity_ok = match snap.liquidity_usd {
        Some(liq) => {
            // Drawdown is measured from the running peak; the peak already
            // includes this observation.
            let peak = view.peak_liquidity_usd.unwrap_or(liq).max(liq);
            liq >= cfg.t2_liq_min_usd
                && drawdown_pct(peak, liq) <= cfg.t2_liq_drawdown_max_pct
        }
        None => false,
    };

    let txns_ok = match (snap.buys_h1, snap.sells_h1) {
        (Some(b), Some(s)) => b + s >= cfg.t2_txns_h1_min,
        _ => false,
    };

    let ratio_ok = match (snap.buys_h1, snap.sells_h1) {
        (Some(b), Some(0)) => b > 0,
        (Some(b), Some(s)) => b as f64 / s as f64 >= cfg.t2_buy_sell_ratio_min,
        _ => false,
    };

    let whale_ok = matches!(snap.largest_wallet_pct, Some(pct) if pct <= cfg.largest_wallet_max_pct);

    let vip_ok = view.vip_holder_count >= 1;

    holders_ok && liquidity_ok && txns_ok && ratio_ok && whale_ok && vip_ok
}

/// T3 (Momentum): market cap, volume, holder base and a price multiple
/// against the first reference price, inside the T3 age window.
pub fn t3_eligible(
    cfg: &EngineConfig,
    view: &SocialView,
    snapshot: Option<&EnrichmentSnapshot>,
) -> bool {
    let snap = match snapshot {
        Some(s) => s,
        None => return false,
    };
    if !age_within(view.age_minutes, cfg.t3_age_min_minutes, cfg.t3_age_max_minutes) {
        return false;
    }
    if !mint_safety_ok(cfg, snap) {
        return false;
    }

    let mcap_ok = matches!(snap.market_cap_usd, Some(m) if m >= cfg.t3_mcap_min_usd);
    let vol_ok = matches!(snap.volume_h24_usd, Some(v) if v >= cfg.t3_vol24_min_usd);
    let holders_ok = matches!(snap.holders, Some(h) if h >= cfg.t3_holders_min);

    let multiple_ok = match (snap.price_usd, view.first_reference_price) {
        (Some(price), Some(base)) if price > 0.0 && base > 0.0 => {
            let multiple = price / base;
            multiple >= cfg.t3_price_min_x && multiple <= cfg.t3_price_max_x
        }
        _ => false,
    };

    let trend_ok = if cfg.t3_pos_trend_required {
        matches!(snap.price_change_m15, Some(change) if change > 0.0)
    } else {
        true
    };

    mcap_ok && vol_ok && holders_ok && multiple_ok && trend_ok
}

/// All three verdicts for one cycle.
pub fn classify(
    cfg: &EngineConfig,
    view: &SocialView,
    snapshot: Option<&EnrichmentSnapshot>,
) -> TierVerdicts {
    TierVerdicts {
        t1: t1_eligible(cfg, view),
        t2: t2_eligible(cfg, view, snapshot),
        t3: t3_eligible(cfg, view, snapshot),
    }
}

fn age_within(age_minutes: f64, min: i64, max: i64) -> bool {
    age_minutes >= min as f64 && age_minutes <= max as f64
}

fn mint_safety_ok(cfg: &EngineConfig, snap: &EnrichmentSnapshot) -> bool {
    if cfg.mint_safety_required {
        snap.mint_safety == Some(true)
    } else {
        true
    }
}

/// Percentage decline of `current` from `peak`; 0 when there is no peak.
fn drawdown_pct(peak: f64, current: f64) -> f64 {
    if peak <= 0.0 {
        return 0.0;
    }
    (peak - current) / peak * 100.0
}
