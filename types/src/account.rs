use serde::Serialize;
use std::fmt;

use crate::{Amount, LedgerError, SignedAmount, MAX_USER_ID_LENGTH};

/// Caller-supplied user identifier. Trusted as-is; only shape is checked.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::invalid("user id is empty"));
        }
        if trimmed.len() > MAX_USER_ID_LENGTH {
            return Err(LedgerError::invalid("user id is too long"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-user ledger state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    pub balance: Amount,
    pub games_played: u64,
    /// Lifetime payouts. Never decremented.
    pub total_won: Amount,
    /// Lifetime stakes. Never decremented, not even by refunds.
    pub total_wagered: Amount,
    pub last_round_started_at: Option<u64>,
}

impl Account {
    /// `total_won - total_wagered`; negative when the user is down overall.
    pub fn total_earned(&self) -> SignedAmount {
        self.total_won.signed_sub(self.total_wagered)
    }

    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            balance: self.balance,
            games_played: self.games_played,
            total_earned: self.total_earned(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub balance: Amount,
    pub games_played: u64,
    pub total_earned: SignedAmount,
}
