use crashline_types::{
    Multiplier, MAX_CASHOUT_MULTIPLIER, MIN_CASHOUT_MULTIPLIER, RATE_LIMIT_MAX_STARTS,
    RATE_LIMIT_WINDOW_MS, RECONCILE_INTERVAL_MS, ROUND_RETENTION_MS, STALE_ROUND_MS,
    START_COOLDOWN_MS,
};
use serde::Serialize;

/// Tunables for the round lifecycle engine. Durations are in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Length of the round-start rate window.
    pub rate_limit_window_ms: u64,
    /// Round starts accepted per user per window.
    pub rate_limit_max_starts: u32,
    /// An active round older than this is reclaimed by the next `start_round`.
    pub stale_round_ms: u64,
    /// Minimum gap between consecutive round starts for one user.
    pub start_cooldown_ms: u64,
    /// Rounds older than this are reaped by the reconciler.
    pub round_retention_ms: u64,
    /// How often the reconciler should run.
    pub reconcile_interval_ms: u64,
    pub min_cashout_multiplier: Multiplier,
    pub max_cashout_multiplier: Multiplier,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_ms: RATE_LIMIT_WINDOW_MS,
            rate_limit_max_starts: RATE_LIMIT_MAX_STARTS,
            stale_round_ms: STALE_ROUND_MS,
            start_cooldown_ms: START_COOLDOWN_MS,
            round_retention_ms: ROUND_RETENTION_MS,
            reconcile_interval_ms: RECONCILE_INTERVAL_MS,
            min_cashout_multiplier: Multiplier::from_hundredths(MIN_CASHOUT_MULTIPLIER),
            max_cashout_multiplier: Multiplier::from_hundredths(MAX_CASHOUT_MULTIPLIER),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.rate_limit_window_ms == 0 {
            return Err("rate_limit_window_ms must be greater than zero");
        }
        if self.rate_limit_max_starts == 0 {
            return Err("rate_limit_max_starts must be greater than zero");
        }
        if self.stale_round_ms == 0 {
            return Err("stale_round_ms must be greater than zero");
        }
        if self.round_retention_ms < self.stale_round_ms {
            return Err("round_retention_ms must be at least stale_round_ms");
        }
        if self.reconcile_interval_ms == 0 {
            return Err("reconcile_interval_ms must be greater than zero");
        }
        if self.min_cashout_multiplier < Multiplier::ONE {
            return Err("min_cashout_multiplier must be at least 1.00");
        }
        if self.min_cashout_multiplier > self.max_cashout_multiplier {
            return Err("min_cashout_multiplier must not exceed max_cashout_multiplier");
        }
        Ok(())
    }
}
