//! End-to-end engine flow: escalation across all three tiers, restart
//! continuity through state snapshots, and the cooldown/hot-reset cycle.

use async_trait::async_trait;
use mentionflow::{
    load_state_json, save_state_json, EngineConfig, EnrichmentError, EnrichmentGateway,
    EnrichmentSnapshot, EvaluationCoordinator, Tier, TierLevel,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Gateway answering with whatever snapshot the test scripted; reports
/// the source unavailable when nothing is scripted.
struct ScriptedGateway {
    snapshot: Mutex<Option<EnrichmentSnapshot>>,
}

impl ScriptedGateway {
    fn new() -> Self {
        Self {
            snapshot: Mutex::new(None),
        }
    }

    fn script(&self, snapshot: EnrichmentSnapshot) {
        *self.snapshot.lock().unwrap() = Some(snapshot);
    }
}

#[async_trait]
impl EnrichmentGateway for ScriptedGateway {
    async fn fetch_snapshot(
        &self,
        _token: &str,
        _deadline: Duration,
    ) -> Result<EnrichmentSnapshot, EnrichmentError> {
        match self.snapshot.lock().unwrap().clone() {
            Some(snap) => Ok(snap),
            None => Err(EnrichmentError::Unavailable("not scripted".to_string())),
        }
    }
}

fn confirming_snapshot() -> EnrichmentSnapshot {
    EnrichmentSnapshot {
        timestamp: 0,
        liquidity_usd: Some(80_000.0),
        volume_h1_usd: Some(120_000.0),
        volume_h24_usd: Some(400_000.0),
        holders: Some(400),
        largest_wallet_pct: Some(8.0),
        mint_safety: Some(true),
        market_cap_usd: Some(900_000.0),
        price_usd: Some(0.5),
        price_change_m15: Some(1.2),
        buys_h1: Some(500),
        sells_h1: Some(250),
    }
}

fn momentum_snapshot() -> EnrichmentSnapshot {
    EnrichmentSnapshot {
        holders: Some(2500),
        market_cap_usd: Some(1_200_000.0),
        volume_h24_usd: Some(4_000_000.0),
        price_usd: Some(3.0), // 6x the 0.5 reference
        price_change_m15: Some(0.8),
        ..confirming_snapshot()
    }
}

fn cfg(min_unique: usize) -> EngineConfig {
    EngineConfig {
        min_unique_channels_t1: min_unique,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_tier_escalation() {
    // Full lifecycle: consensus at minute 0, confirmation at minute 45,
    // momentum at hour 3, and nothing further after T3
    let gw = Arc::new(ScriptedGateway::new());
    let engine = EvaluationCoordinator::new(cfg(3), gw.clone());
    let base = 1_700_000_000;

    engine.record_vip_holder("MINT1", "vip_wallet");

    let mut t1 = None;
    for (i, src) in ["@alpha", "@beta", "@gamma"].iter().enumerate() {
        t1 = engine.submit_mention("MINT1", src, base + i as i64 * 30).await;
    }
    let t1 = t1.expect("T1 on the third distinct source");
    assert_eq!(t1.tier, Tier::T1);
    assert!(t1.snapshot_used.is_none());

    gw.script(confirming_snapshot());
    let t2 = engine
        .submit_mention("MINT1", "@delta", base + 45 * 60)
        .await
        .expect("T2 in the confirmation window");
    assert_eq!(t2.tier, Tier::T2);
    assert!(t2.snapshot_used.is_some());

    gw.script(momentum_snapshot());
    let t3 = engine
        .submit_mention("MINT1", "@epsilon", base + 180 * 60)
        .await
        .expect("T3 in the momentum window");
    assert_eq!(t3.tier, Tier::T3);
    assert_eq!(engine.alerts().level("MINT1"), TierLevel::T3Fired);

    // T3 is terminal until a hot-reset
    let after = engine
        .submit_mention("MINT1", "@zeta", base + 200 * 60)
        .await;
    assert!(after.is_none());
}

#[tokio::test]
async fn test_restart_resumes_mid_sequence() {
    // T1+T2 fire, the engine restarts from a snapshot, and T3 still uses
    // the reference price captured before the restart
    let dir = tempfile::tempdir().unwrap();
    let state_path = dir.path().join("engine_state.json");
    let base = 1_700_000_000;

    {
        let gw = Arc::new(ScriptedGateway::new());
        let engine = EvaluationCoordinator::new(cfg(3), gw.clone());
        engine.record_vip_holder("MINT2", "vip_wallet");
        for (i, src) in ["@a", "@b", "@c"].iter().enumerate() {
            engine.submit_mention("MINT2", src, base + i as i64).await;
        }
        gw.script(confirming_snapshot());
        let t2 = engine.submit_mention("MINT2", "@d", base + 45 * 60).await;
        assert_eq!(t2.map(|d| d.tier), Some(Tier::T2));
        assert_eq!(engine.store().first_reference_price("MINT2"), Some(0.5));

        save_state_json(&engine.export_state(), &state_path).unwrap();
    }

    let gw = Arc::new(ScriptedGateway::new());
    let engine = EvaluationCoordinator::new(cfg(3), gw.clone());
    engine.import_state(load_state_json(&state_path).unwrap());
    assert_eq!(engine.alerts().level("MINT2"), TierLevel::T2Fired);

    gw.script(momentum_snapshot());
    let t3 = engine
        .submit_mention("MINT2", "@e", base + 180 * 60)
        .await
        .expect("T3 after restart");
    assert_eq!(t3.tier, Tier::T3);
}

#[tokio::test]
async fn test_hot_reset_with_surviving_cooldown() {
    // A hot-reset reopens the sequence, but the T1 cooldown set by the
    // first firing still suppresses re-fire until it expires
    let gw = Arc::new(ScriptedGateway::new());
    let config = EngineConfig {
        min_unique_channels_t1: 2,
        cooldown_minutes_t1: 120,
        hot_threshold: 2,
        hot_reset_hours: 1,
        ..Default::default()
    };
    let engine = EvaluationCoordinator::new(config, gw.clone());
    let base = 1_700_000_000;

    engine.submit_mention("MINT3", "@a", base).await;
    let t1 = engine.submit_mention("MINT3", "@b", base + 10).await;
    assert_eq!(t1.map(|d| d.tier), Some(Tier::T1));

    // Two post-T1 mentions arm the hot counter; the hour has not elapsed
    engine.submit_mention("MINT3", "@c", base + 20).await;
    engine.submit_mention("MINT3", "@d", base + 30).await;
    assert_eq!(engine.alerts().level("MINT3"), TierLevel::T1Fired);

    // Past the hour: the next mention triggers the reset
    engine.submit_mention("MINT3", "@e", base + 3700).await;
    assert_eq!(engine.alerts().level("MINT3"), TierLevel::Unalerted);

    // Consensus reappears inside the cooldown window: suppressed
    let blocked = engine.submit_mention("MINT3", "@f", base + 3710).await;
    assert!(blocked.is_none());
    assert_eq!(engine.alerts().level("MINT3"), TierLevel::Unalerted);

    // After the 2h cooldown expires, the sequence re-fires from T1
    engine.submit_mention("MINT3", "@g", base + 7300).await;
    let refired = engine.submit_mention("MINT3", "@h", base + 7310).await;
    assert_eq!(refired.map(|d| d.tier), Some(Tier::T1));
}

#[tokio::test]
async fn test_unavailable_enrichment_keeps_engine_social_only() {
    // With no enrichment source the engine still produces T1 alerts and
    // never advances past them
    let engine = EvaluationCoordinator::new(cfg(3), Arc::new(ScriptedGateway::new()));
    let base = 1_700_000_000;

    engine.record_vip_holder("MINT4", "vip_wallet");
    for (i, src) in ["@a", "@b", "@c"].iter().enumerate() {
        engine.submit_mention("MINT4", src, base + i as i64).await;
    }
    assert_eq!(engine.alerts().level("MINT4"), TierLevel::T1Fired);

    for minute in [35, 45, 60, 150, 200] {
        let d = engine
            .submit_mention("MINT4", "@later", base + minute * 60)
            .await;
        assert!(d.is_none(), "minute={}", minute);
    }
    assert_eq!(engine.alerts().level("MINT4"), TierLevel::T1Fired);
}
