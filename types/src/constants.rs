/// Length of the start-attempt rate window in milliseconds.
pub const RATE_LIMIT_WINDOW_MS: u64 = 60_000;

/// Maximum round starts accepted per user within one rate window.
pub const RATE_LIMIT_MAX_STARTS: u32 = 10;

/// Age after which an active round is treated as abandoned by `start_round`.
pub const STALE_ROUND_MS: u64 = 60_000;

/// Minimum gap between two round starts for the same user.
pub const START_COOLDOWN_MS: u64 = 1_000;

/// Rounds older than this are reaped by the reconciler (30 minutes).
pub const ROUND_RETENTION_MS: u64 = 30 * 60 * 1_000;

/// Period of the reconciler sweep (10 minutes).
pub const RECONCILE_INTERVAL_MS: u64 = 10 * 60 * 1_000;

/// Lowest multiplier a cash-out may lock in (1.00x).
pub const MIN_CASHOUT_MULTIPLIER: u32 = 100;

/// Highest multiplier a cash-out may lock in (20.00x).
pub const MAX_CASHOUT_MULTIPLIER: u32 = 2_000;

/// Maximum accepted length of a caller-supplied user identifier.
pub const MAX_USER_ID_LENGTH: usize = 128;
