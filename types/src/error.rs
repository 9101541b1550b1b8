use thiserror::Error as ThisError;

use crate::{Amount, Multiplier, RoundId};

/// Every way a ledger or round operation can be refused.
///
/// All variants are recoverable: the operation that produced one left no partial state behind
/// (except where a variant documents otherwise) and the caller may retry or render a message.
#[derive(Clone, Debug, ThisError, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: &'static str },
    #[error("insufficient balance (balance={balance}, requested={requested})")]
    InsufficientBalance { balance: Amount, requested: Amount },
    #[error("too many rounds started, retry in {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
    #[error("round start cooldown active, retry in {remaining_ms}ms")]
    CooldownActive { remaining_ms: u64 },
    #[error("round {round_id} is still active")]
    ActiveRoundExists { round_id: RoundId },
    #[error("round {round_id} not found")]
    NotFound { round_id: RoundId },
    #[error("round {round_id} belongs to another user")]
    Forbidden { round_id: RoundId },
    #[error("round {round_id} has already ended")]
    AlreadyEnded { round_id: RoundId },
    #[error("round {round_id} has already been settled")]
    AlreadySettled { round_id: RoundId },
    #[error("multiplier {multiplier} outside allowed range [{min}, {max}]")]
    InvalidMultiplier {
        multiplier: Multiplier,
        min: Multiplier,
        max: Multiplier,
    },
}

impl LedgerError {
    /// Stable machine-readable code for transports.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidRequest { .. } => "invalid_request",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::RateLimited { .. } => "rate_limited",
            LedgerError::CooldownActive { .. } => "cooldown_active",
            LedgerError::ActiveRoundExists { .. } => "active_round_exists",
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Forbidden { .. } => "forbidden",
            LedgerError::AlreadyEnded { .. } => "already_ended",
            LedgerError::AlreadySettled { .. } => "already_settled",
            LedgerError::InvalidMultiplier { .. } => "invalid_multiplier",
        }
    }

    pub(crate) fn invalid(reason: &'static str) -> Self {
        LedgerError::InvalidRequest { reason }
    }
}
