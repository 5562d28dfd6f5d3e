//! Alert state machine - per-token tier progression, cooldown and
//! hot-reset
//!
//! Tiers fire in strict order per token: `Unalerted -> T1 -> T2 -> T3`.
//! The single sanctioned exception is a hot-reset, which reopens the full
//! sequence for a token showing sustained re-engagement. Blocked
//! transitions (not eligible, cooling down, out of order) are expected
//! steady-state outcomes; an out-of-order firing request is an internal
//! defect and surfaces as `TransitionError`.

use crate::config::EngineConfig;
use crate::types::Tier;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest tier fired so far for a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TierLevel {
    Unalerted,
    T1Fired,
    T2Fired,
    T3Fired,
}

/// Illegal transition request. This is a logic defect, distinct from the
/// expected "not yet eligible" outcome.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("tier {attempted} cannot fire from {current:?}")]
    OutOfOrder { current: TierLevel, attempted: Tier },
}

/// Per-token alert history: fired tiers, cooldown and hot-reset timers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    pub token: String,
    pub level: TierLevel,

    pub t1_fired_at: Option<i64>,
    pub t2_fired_at: Option<i64>,
    pub t3_fired_at: Option<i64>,

    /// T1 may not re-fire before this time, Unix seconds UTC
    pub cooldown_until: i64,

    /// Mentions seen since the last reset while past `Unalerted`
    pub hot_count: u32,

    /// Last hot-reset time (record creation time initially)
    pub hot_last_reset: i64,
}

impl AlertRecord {
    pub fn new(token: String, now: i64) -> Self {
        Self {
            token,
            level: TierLevel::Unalerted,
            t1_fired_at: None,
            t2_fired_at: None,
            t3_fired_at: None,
            cooldown_until: 0,
            hot_count: 0,
            hot_last_reset: now,
        }
    }

    /// Apply a tier firing. Rejects anything but the next sequential tier.
    pub fn fire(
        &mut self,
        tier: Tier,
        now: i64,
        cooldown_minutes_t1: i64,
    ) -> Result<(), TransitionError> {
        let legal = matches!(
            (self.level, tier),
            (TierLevel::Unalerted, Tier::T1)
                | (TierLevel::T1Fired, Tier::T2)
                | (TierLevel::T2Fired, Tier::T3)
        );
        if !legal {
            return Err(TransitionError::OutOfOrder {
                current: self.level,
                attempted: tier,
            });
        }
        match tier {
            Tier::T1 => {
                self.level = TierLevel::T1Fired;
                self.t1_fired_at = Some(now);
                if cooldown_minutes_t1 > 0 {
                    self.cooldown_until = now + cooldown_minutes_t1 * 60;
                }
            }
            Tier::T2 => {
                self.level = TierLevel::T2Fired;
                self.t2_fired_at = Some(now);
            }
            Tier::T3 => {
                self.level = TierLevel::T3Fired;
                self.t3_fired_at = Some(now);
            }
        }
        Ok(())
    }

    fn in_cooldown(&self, now: i64) -> bool {
        now < self.cooldown_until
    }
}

/// Keyed collection of alert records with the transition rules applied.
/// Exclusive owner of every `AlertRecord`.
pub struct AlertStateMachine {
    records: DashMap<String, AlertRecord>,
}

impl Default for AlertStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertStateMachine {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Current tier level for a token (`Unalerted` when never seen).
    pub fn level(&self, token: &str) -> TierLevel {
        self.records
            .get(token)
            .map(|r| r.level)
            .unwrap_or(TierLevel::Unalerted)
    }

    /// Feed a mention into the hot counter and apply a hot-reset when due.
    /// Returns true when the record was reset to `Unalerted`.
    ///
    /// The T1 cooldown deliberately survives a reset: a reset inside an
    /// active cooldown must not let T1 re-fire early.
    pub fn note_mention(&self, token: &str, now: i64, cfg: &EngineConfig) -> bool {
        let mut rec = self
            .records
            .entry(token.to_string())
            .or_insert_with(|| AlertRecord::new(token.to_string(), now));

        if rec.level == TierLevel::Unalerted {
            return false;
        }
        rec.hot_count += 1;

        let reset_due = cfg.hot_reset_hours > 0
            && rec.hot_count >= cfg.hot_threshold
            && now - rec.hot_last_reset >= cfg.hot_reset_hours * 3600;
        if reset_due {
            rec.level = TierLevel::Unalerted;
            rec.hot_count = 0;
            rec.hot_last_reset = now;
            log::info!("Hot-reset for {}: tier sequence reopened", token);
            return true;
        }
        false
    }

    /// Apply at most one transition for this evaluation cycle, gated on
    /// the verdicts. Returns the tier that fired, if any.
    pub fn evaluate(
        &self,
        token: &str,
        verdicts: &crate::classifier::TierVerdicts,
        now: i64,
        cfg: &EngineConfig,
    ) -> Option<Tier> {
        let mut rec = self
            .records
            .entry(token.to_string())
            .or_insert_with(|| AlertRecord::new(token.to_string(), now));

        let next = match rec.level {
            TierLevel::Unalerted if verdicts.t1 => {
                if rec.in_cooldown(now) {
                    log::debug!(
                        "T1 for {} suppressed by cooldown ({}s remaining)",
                        token,
                        rec.cooldown_until - now
                    );
                    return None;
                }
                Tier::T1
            }
            TierLevel::T1Fired if verdicts.t2 => Tier::T2,
            TierLevel::T2Fired if verdicts.t3 => Tier::T3,
            _ => return None,
        };

        match rec.fire(next, now, cfg.cooldown_minutes_t1) {
            Ok(()) => Some(next),
            Err(e) => {
                // Unreachable by construction; kept as the defect path.
                log::error!("Invariant violation for {}: {}", token, e);
                None
            }
        }
    }

    /// Full clone of every record, for state export.
    pub fn export(&self) -> Vec<AlertRecord> {
        self.records.iter().map(|e| e.value().clone()).collect()
    }

    /// Replace tracked records with a previously exported set.
    pub fn import(&self, records: Vec<AlertRecord>) {
        self.records.clear();
        for rec in records {
            self.records.insert(rec.token.clone(), rec);
        }
    }

    pub fn tracked_tokens(&self) -> usize {
        self.records.len()
    }
}
