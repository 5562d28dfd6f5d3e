//! Line-oriented runtime shell around the evaluation engine.
//!
//! Reads mention events as JSON lines from stdin, writes alert decisions
//! as JSON lines to stdout. Meant to sit behind whatever feeds mentions
//! (a chat scraper, a message queue tail) and in front of whatever
//! publishes alerts.
//!
//! Environment:
//! - `STATE_FILE` - optional path for state snapshots across restarts
//! - `STATE_SAVE_SECONDS` - snapshot interval (default 300)
//! - plus every threshold variable `EngineConfig::from_env` reads

use chrono::Utc;
use mentionflow::{
    load_state_json, save_state_json, EngineConfig, EvaluationCoordinator, NullEnrichmentGateway,
};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

/// One mention event on stdin. `ts` defaults to the arrival time.
#[derive(Debug, Deserialize)]
struct MentionInput {
    token: String,
    source: String,
    #[serde(default)]
    ts: Option<i64>,
    /// Optional VIP holder evidence piggybacked on the feed
    #[serde(default)]
    vip_wallet: Option<String>,
}

fn state_file() -> Option<PathBuf> {
    std::env::var("STATE_FILE").ok().map(PathBuf::from)
}

fn save_interval() -> Duration {
    let secs = std::env::var("STATE_SAVE_SECONDS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(300u64);
    Duration::from_secs(secs.max(1))
}

fn save_if_configured(coordinator: &EvaluationCoordinator, path: &Option<PathBuf>) {
    if let Some(path) = path {
        if let Err(e) = save_state_json(&coordinator.export_state(), path) {
            log::error!("State save failed: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cfg = EngineConfig::from_env();
    log::info!(
        "Starting mention runtime (T1 >= {} sources / {}m, enrichment x{})",
        cfg.min_unique_channels_t1,
        cfg.overlap_window_min,
        cfg.enrichment_max_concurrency
    );

    let retention_secs = cfg.retention_minutes() * 60;
    let coordinator = Arc::new(EvaluationCoordinator::new(
        cfg,
        Arc::new(NullEnrichmentGateway),
    ));

    let path = state_file();
    if let Some(ref p) = path {
        coordinator.import_state(load_state_json(p)?);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut save_tick = tokio::time::interval(save_interval());
    save_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    save_tick.tick().await; // first tick fires immediately, skip it

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line? {
                    Some(l) => l,
                    None => break, // stdin closed
                };
                if line.trim().is_empty() {
                    continue;
                }
                let input: MentionInput = match serde_json::from_str(&line) {
                    Ok(input) => input,
                    Err(e) => {
                        log::warn!("Skipping malformed input line: {}", e);
                        continue;
                    }
                };
                if let Some(wallet) = &input.vip_wallet {
                    coordinator.record_vip_holder(&input.token, wallet);
                }
                let ts = input.ts.unwrap_or_else(|| Utc::now().timestamp());
                if let Some(decision) = coordinator
                    .submit_mention(&input.token, &input.source, ts)
                    .await
                {
                    println!("{}", serde_json::to_string(&decision)?);
                }
            }
            _ = save_tick.tick() => {
                save_if_configured(&coordinator, &path);
                coordinator.prune_idle(Utc::now().timestamp() - retention_secs);
            }
        }
    }

    save_if_configured(&coordinator, &path);
    log::info!("Mention runtime shut down");
    Ok(())
}
