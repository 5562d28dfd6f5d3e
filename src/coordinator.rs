//! Evaluation coordinator - drives the per-mention pipeline
//!
//! On each mention: update the mention store, evaluate T1 cheaply, and
//! only when the token is past T1 and inside a market-tier age window,
//! fetch an enrichment snapshot and attempt the next transition.
//!
//! Concurrency discipline:
//! - per-token evaluation sections are exclusive and contain no awaits,
//!   so transitions are applied atomically and in arrival order
//! - enrichment calls are the only suspension point, bounded by a
//!   semaphore and deduplicated per token (one outstanding call max)
//! - the in-flight result is evaluated against the aggregate state read
//!   *after* the fetch completes, so mentions recorded meanwhile count
//! - cross-token work proceeds in parallel; there is no global lock

use crate::alerts::{AlertStateMachine, TierLevel};
use crate::classifier::{self, TierVerdicts};
use crate::config::EngineConfig;
use crate::gateway::{EnrichmentError, EnrichmentGateway};
use crate::persistence::EngineState;
use crate::store::MentionStore;
use crate::types::{AlertDecision, EnrichmentSnapshot, Mention, Tier};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Removes the per-token in-flight marker when the enrichment attempt
/// ends, including when the future is abandoned mid-fetch.
struct InFlightGuard<'a> {
    map: &'a DashMap<String, ()>,
    token: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.map.remove(&self.token);
    }
}

/// Orchestrates mention store, classifier, alert state machine and the
/// enrichment gateway. Holds no authoritative copy of token state itself.
pub struct EvaluationCoordinator {
    cfg: EngineConfig,
    store: MentionStore,
    alerts: AlertStateMachine,
    gateway: Arc<dyn EnrichmentGateway>,

    /// Per-token exclusive evaluation sections
    eval_locks: DashMap<String, Arc<Mutex<()>>>,

    /// Tokens with an enrichment call outstanding
    in_flight: DashMap<String, ()>,

    /// Cap on simultaneous outstanding enrichment calls
    permits: Arc<Semaphore>,
}

impl EvaluationCoordinator {
    pub fn new(cfg: EngineConfig, gateway: Arc<dyn EnrichmentGateway>) -> Self {
        let store = MentionStore::new(cfg.retention_minutes());
        let permits = Arc::new(Semaphore::new(cfg.enrichment_max_concurrency.max(1)));
        Self {
            cfg,
            store,
            alerts: AlertStateMachine::new(),
            gateway,
            eval_locks: DashMap::new(),
            in_flight: DashMap::new(),
            permits,
        }
    }

    /// Ingest boundary: submit one mention, get back zero or one alert
    /// decision. Never panics or propagates enrichment failures; the only
    /// externally visible outcomes are a decision or none.
    pub async fn submit_mention(
        &self,
        token: &str,
        source: &str,
        timestamp: i64,
    ) -> Option<AlertDecision> {
        if token.trim().is_empty() {
            log::warn!("Rejected mention with empty token identifier");
            return None;
        }

        let lock = self.eval_lock(token);

        // Synchronous phase: record + social-only evaluation.
        let (first_decision, warranted) = {
            let _guard = lock.lock().unwrap();
            self.record_and_evaluate_social(token, source, timestamp)
        };

        if !warranted {
            return first_decision;
        }

        // One outstanding enrichment call per token; a mention arriving
        // mid-flight leans on that call's re-evaluation instead.
        if self.in_flight.insert(token.to_string(), ()).is_some() {
            log::debug!("Enrichment already in flight for {}", token);
            return first_decision;
        }
        let _marker = InFlightGuard {
            map: &self.in_flight,
            token: token.to_string(),
        };

        let deadline = Duration::from_secs(self.cfg.enrichment_deadline_secs);
        let permit = match self.permits.acquire().await {
            Ok(p) => p,
            Err(_) => return first_decision, // semaphore closed on shutdown
        };
        let fetched = tokio::time::timeout(
            deadline,
            self.gateway.fetch_snapshot(token, deadline),
        )
        .await;
        drop(permit);

        let snapshot = match fetched {
            Ok(Ok(snapshot)) => snapshot,
            Ok(Err(e)) => {
                log::warn!("Enrichment failed for {}: {}", token, e);
                return first_decision;
            }
            Err(_) => {
                log::warn!(
                    "Enrichment failed for {}: {}",
                    token,
                    EnrichmentError::Timeout
                );
                return first_decision;
            }
        };

        // Synchronous phase two: apply the snapshot against the latest
        // aggregate state (including mentions recorded during the fetch).
        let second_decision = {
            let _guard = lock.lock().unwrap();
            self.apply_snapshot(token, timestamp, snapshot, first_decision.is_some())
        };
        first_decision.or(second_decision)
    }

    /// Record the mention, advance hot/cooldown bookkeeping, attempt the
    /// social-only T1 transition, and report whether an enrichment fetch
    /// is warranted this cycle.
    fn record_and_evaluate_social(
        &self,
        token: &str,
        source: &str,
        timestamp: i64,
    ) -> (Option<AlertDecision>, bool) {
        self.store.record(Mention {
            token: token.to_string(),
            source: source.to_string(),
            timestamp,
        });
        self.alerts.note_mention(token, timestamp, &self.cfg);

        let view = match self
            .store
            .social_view(token, self.cfg.overlap_window_min, timestamp)
        {
            Some(v) => v,
            None => return (None, false),
        };

        let verdicts = TierVerdicts {
            t1: classifier::t1_eligible(&self.cfg, &view),
            ..Default::default()
        };
        let decision = self
            .alerts
            .evaluate(token, &verdicts, timestamp, &self.cfg)
            .map(|tier| self.decision(token, tier, timestamp, None));

        let past_t1 = self.alerts.level(token) >= TierLevel::T1Fired;
        let age = view.age_minutes;
        let in_t2_window = age >= self.cfg.t2_age_min_minutes as f64
            && age <= self.cfg.t2_age_max_minutes as f64;
        let in_t3_window = age >= self.cfg.t3_age_min_minutes as f64
            && age <= self.cfg.t3_age_max_minutes as f64;

        (decision, past_t1 && (in_t2_window || in_t3_window))
    }

    /// Fold a fresh snapshot into the aggregate (peak liquidity, first
    /// reference price) and attempt the next market-tier transition,
    /// unless this cycle already produced its decision.
    fn apply_snapshot(
        &self,
        token: &str,
        timestamp: i64,
        snapshot: EnrichmentSnapshot,
        already_decided: bool,
    ) -> Option<AlertDecision> {
        if let Some(liq) = snapshot.liquidity_usd {
            self.store.observe_liquidity(token, liq);
        }
        if self.alerts.level(token) >= TierLevel::T1Fired
            && self.store.first_reference_price(token).is_none()
        {
            if let Some(price) = snapshot.price_usd {
                if price > 0.0 {
                    self.store.set_first_reference_price(token, price);
                }
            }
        }

        // At most one decision per mention.
        if already_decided {
            return None;
        }

        let view = self
            .store
            .social_view(token, self.cfg.overlap_window_min, timestamp)?;
        let verdicts = classifier::classify(&self.cfg, &view, Some(&snapshot));
        self.alerts
            .evaluate(token, &verdicts, timestamp, &self.cfg)
            .map(|tier| self.decision(token, tier, timestamp, Some(snapshot)))
    }

    fn decision(
        &self,
        token: &str,
        tier: Tier,
        timestamp: i64,
        snapshot_used: Option<EnrichmentSnapshot>,
    ) -> AlertDecision {
        let vel5 = self
            .store
            .velocity(token, self.cfg.vel5_window_min, timestamp);
        let vel10 = self
            .store
            .velocity(token, self.cfg.vel10_window_min, timestamp);
        log::info!(
            "Alert decision [{}] for {} (unique {}m: {}, velocity: {}/{}m {}/{}m)",
            tier,
            token,
            self.cfg.overlap_window_min,
            self.store
                .windowed_unique_sources(token, self.cfg.overlap_window_min, timestamp),
            vel5,
            self.cfg.vel5_window_min,
            vel10,
            self.cfg.vel10_window_min,
        );
        AlertDecision {
            token: token.to_string(),
            tier,
            timestamp,
            snapshot_used,
        }
    }

    fn eval_lock(&self, token: &str) -> Arc<Mutex<()>> {
        self.eval_locks
            .entry(token.to_string())
            .or_default()
            .clone()
    }

    /// Feed VIP holder evidence from an external watcher.
    pub fn record_vip_holder(&self, token: &str, wallet: &str) {
        self.store.record_vip_holder(token, wallet);
    }

    /// Externally driven GC: drop tokens silent since before `cutoff`.
    pub fn prune_idle(&self, cutoff: i64) -> usize {
        let removed = self.store.prune_idle(cutoff);
        if removed > 0 {
            log::info!("Pruned {} idle tokens", removed);
        }
        removed
    }

    pub fn store(&self) -> &MentionStore {
        &self.store
    }

    pub fn alerts(&self) -> &AlertStateMachine {
        &self.alerts
    }

    pub fn config(&self) -> &EngineConfig {
        &self.cfg
    }

    /// Complete, round-trippable representation of all mutable state.
    pub fn export_state(&self) -> EngineState {
        EngineState {
            aggregates: self.store.export(),
            alerts: self.alerts.export(),
        }
    }

    /// Restore a previously exported state, replacing current contents.
    pub fn import_state(&self, state: EngineState) {
        self.store.import(state.aggregates);
        self.alerts.import(state.alerts);
        log::info!(
            "State imported: {} aggregates, {} alert records",
            self.store.tracked_tokens(),
            self.alerts.tracked_tokens()
        );
    }
}
