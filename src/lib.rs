//! mentionflow - tiered alerting over token mention streams
//!
//! Ingests token mentions from monitored sources, aggregates them into
//! per-token sliding windows, and escalates alerts through three tiers:
//!
//! - T1 (Consensus): distinct sources agree within a short window
//! - T2 (Confirmation): market quality confirmed via enrichment
//! - T3 (Momentum): sustained growth against the first reference price
//!
//! Module map:
//! - [`types`] - mentions, tiers, snapshots, decisions
//! - [`config`] - thresholds from environment variables
//! - [`store`] - per-token rolling mention aggregation
//! - [`classifier`] - pure tier eligibility rules
//! - [`alerts`] - per-token tier progression, cooldown, hot-reset
//! - [`gateway`] - enrichment boundary trait
//! - [`coordinator`] - the per-mention evaluation pipeline
//! - [`persistence`] - JSON state snapshots

pub mod alerts;
pub mod classifier;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod persistence;
pub mod store;
pub mod types;

pub use alerts::{AlertRecord, AlertStateMachine, TierLevel, TransitionError};
pub use classifier::{classify, SocialView, TierVerdicts};
pub use config::EngineConfig;
pub use coordinator::EvaluationCoordinator;
pub use gateway::{EnrichmentError, EnrichmentGateway, NullEnrichmentGateway};
pub use persistence::{load_state_json, save_state_json, EngineState};
pub use store::{MentionStore, TokenAggregate};
pub use types::{AlertDecision, EnrichmentSnapshot, Mention, Tier};
