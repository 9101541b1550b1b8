//! Result records returned by engine operations.
//!
//! Field names serialize in camelCase, which is the shape the HTTP transport exposes.

use serde::Serialize;

use crate::{Amount, Multiplier, RoundId, SignedAmount};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositReceipt {
    pub balance: Amount,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub balance: Amount,
    pub withdrawn: Amount,
}

/// Returned by a successful round start. Deliberately has no crash point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundStarted {
    pub round_id: RoundId,
    pub balance: Amount,
}

/// Outcome of a cash-out attempt. A crash is a lost bet, not an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CashOutOutcome {
    Paid {
        payout: Amount,
        multiplier: Multiplier,
        balance: Amount,
    },
    Crashed {
        crashed: bool,
        #[serde(rename = "crashPoint")]
        crash_point: Multiplier,
    },
}

impl CashOutOutcome {
    pub fn crashed(crash_point: Multiplier) -> Self {
        CashOutOutcome::Crashed {
            crashed: true,
            crash_point,
        }
    }

    pub fn is_crash(&self) -> bool {
        matches!(self, CashOutOutcome::Crashed { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CrashAck {
    pub acknowledged: bool,
}

impl CrashAck {
    pub const ACKNOWLEDGED: CrashAck = CrashAck { acknowledged: true };
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_users: u64,
    pub total_games: u64,
    pub active_rounds: u64,
    /// `sum(total_wagered - total_won)` over every account.
    pub house_profit: SignedAmount,
}
