//! Engine state snapshots - JSON save/load for restart continuity
//!
//! The exported state carries everything restart-sensitive: mention
//! aggregates (with reference prices, liquidity peaks and VIP evidence)
//! and alert records (with cooldown and hot-reset timers). A missing
//! state file on load is a normal cold start, not an error.

use crate::alerts::AlertRecord;
use crate::store::TokenAggregate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::Path;

/// Complete mutable state of a running engine.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EngineState {
    pub aggregates: Vec<TokenAggregate>,
    pub alerts: Vec<AlertRecord>,
}

/// Write the state as pretty JSON, via a temp file so a crash mid-write
/// never leaves a truncated snapshot behind.
pub fn save_state_json(state: &EngineState, path: &Path) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    log::info!(
        "State saved to {}: {} aggregates, {} alert records",
        path.display(),
        state.aggregates.len(),
        state.alerts.len()
    );
    Ok(())
}

/// Load a previously saved state. A missing file yields the empty state.
pub fn load_state_json(path: &Path) -> Result<EngineState, Box<dyn Error>> {
    if !path.exists() {
        log::info!("No state file at {}, starting fresh", path.display());
        return Ok(EngineState::default());
    }
    let json = fs::read_to_string(path)?;
    let state: EngineState = serde_json::from_str(&json)?;
    log::info!(
        "State loaded from {}: {} aggregates, {} alert records",
        path.display(),
        state.aggregates.len(),
        state.alerts.len()
    );
    Ok(state)
}
