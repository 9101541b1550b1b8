//! Per-user account store.
//!
//! Every mutation is a single step on `&mut self`; callers that need several steps to appear
//! atomic (the engine) hold exclusive access for the whole sequence.

use std::collections::HashMap;

use crashline_types::{Account, Amount, LedgerError, UserId};

#[derive(Debug, Default)]
pub struct Ledger {
    accounts: HashMap<UserId, Account>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn account(&self, user: &UserId) -> Option<&Account> {
        self.accounts.get(user)
    }

    /// Look up an account, creating an empty one on first reference.
    pub fn get_or_create(&mut self, user: &UserId) -> &mut Account {
        self.accounts.entry(user.clone()).or_default()
    }

    /// Add `amount` to the balance and return the new balance.
    pub fn credit(&mut self, user: &UserId, amount: Amount) -> Result<Amount, LedgerError> {
        let account = self.get_or_create(user);
        account.balance = account
            .balance
            .checked_add(amount)
            .ok_or(LedgerError::InvalidRequest {
                reason: "balance would overflow",
            })?;
        Ok(account.balance)
    }

    /// Remove `amount` from the balance and return the new balance.
    pub fn debit(&mut self, user: &UserId, amount: Amount) -> Result<Amount, LedgerError> {
        let account = self.get_or_create(user);
        let balance = account.balance;
        account.balance = balance
            .checked_sub(amount)
            .ok_or(LedgerError::InsufficientBalance {
                balance,
                requested: amount,
            })?;
        Ok(account.balance)
    }

    pub fn record_wager(&mut self, user: &UserId, amount: Amount) {
        let account = self.get_or_create(user);
        account.total_wagered = account.total_wagered.saturating_add(amount);
    }

    pub fn record_win(&mut self, user: &UserId, amount: Amount) {
        let account = self.get_or_create(user);
        account.total_won = account.total_won.saturating_add(amount);
    }

    /// Count a played game and stamp the cooldown clock.
    pub fn record_round_start(&mut self, user: &UserId, now: u64) {
        let account = self.get_or_create(user);
        account.games_played = account.games_played.saturating_add(1);
        account.last_round_started_at = Some(now);
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&UserId, &Account)> {
        self.accounts.iter()
    }
}
