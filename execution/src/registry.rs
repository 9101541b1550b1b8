//! Round records and the single-active-round-per-user index.
//!
//! Invariant: `active` holds an entry for a user iff that user has a round with status
//! `Active`, and that entry names the round. Every transition out of `Active` goes through
//! [`RoundRegistry::settle`] or [`RoundRegistry::sweep_expired`], both of which drop the entry.

use std::collections::{BTreeMap, HashMap};

use crashline_types::{Amount, LedgerError, Multiplier, Round, RoundId, RoundStatus, UserId};

/// Terminal outcome applied by [`RoundRegistry::settle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Cash-out succeeded at `payout_multiplier`.
    Completed { payout_multiplier: Multiplier },
    /// The round ended without a payout.
    Crashed,
}

#[derive(Debug, Default)]
pub struct RoundRegistry {
    rounds: BTreeMap<RoundId, Round>,
    active: HashMap<UserId, RoundId>,
    next_id: u64,
}

impl RoundRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an active round for `user`.
    ///
    /// Fails with `ActiveRoundExists` when the user already has one.
    pub fn create_round(
        &mut self,
        user: &UserId,
        stake: Amount,
        termination_multiplier: Multiplier,
        now: u64,
    ) -> Result<RoundId, LedgerError> {
        if let Some(&round_id) = self.active.get(user) {
            return Err(LedgerError::ActiveRoundExists { round_id });
        }
        self.next_id += 1;
        let id = RoundId::new(self.next_id);
        self.rounds.insert(
            id,
            Round::new(id, user.clone(), stake, termination_multiplier, now),
        );
        self.active.insert(user.clone(), id);
        Ok(id)
    }

    pub fn get(&self, round_id: RoundId) -> Option<&Round> {
        self.rounds.get(&round_id)
    }

    pub fn has_active(&self, user: &UserId) -> bool {
        self.active.contains_key(user)
    }

    pub fn active_round_id(&self, user: &UserId) -> Option<RoundId> {
        self.active.get(user).copied()
    }

    pub fn active_round_for(&self, user: &UserId) -> Option<&Round> {
        self.active_round_id(user)
            .and_then(|round_id| self.rounds.get(&round_id))
    }

    /// Look up a round on behalf of `user`, distinguishing missing from foreign rounds.
    pub fn owned(&self, user: &UserId, round_id: RoundId) -> Result<&Round, LedgerError> {
        let round = self
            .rounds
            .get(&round_id)
            .ok_or(LedgerError::NotFound { round_id })?;
        if round.user_id != *user {
            return Err(LedgerError::Forbidden { round_id });
        }
        Ok(round)
    }

    /// Validate that `user` may settle `round_id` and mark it settled in the same step.
    ///
    /// Returns a snapshot of the round as it was claimed. A round can be claimed at most once.
    pub fn claim_settlement(
        &mut self,
        user: &UserId,
        round_id: RoundId,
    ) -> Result<Round, LedgerError> {
        let round = self
            .rounds
            .get_mut(&round_id)
            .ok_or(LedgerError::NotFound { round_id })?;
        if round.user_id != *user {
            return Err(LedgerError::Forbidden { round_id });
        }
        if !round.is_active() {
            return Err(LedgerError::AlreadyEnded { round_id });
        }
        if round.settled {
            return Err(LedgerError::AlreadySettled { round_id });
        }
        round.settled = true;
        Ok(round.clone())
    }

    /// Move an active round to its terminal status and drop its index entry.
    ///
    /// Returns `None` (and changes nothing) if the round is missing or already terminal.
    pub fn settle(&mut self, round_id: RoundId, settlement: Settlement) -> Option<&Round> {
        let round = self.rounds.get_mut(&round_id)?;
        if !round.is_active() {
            return None;
        }
        match settlement {
            Settlement::Completed { payout_multiplier } => {
                round.status = RoundStatus::Completed;
                round.payout_multiplier = Some(payout_multiplier);
            }
            Settlement::Crashed => round.status = RoundStatus::Crashed,
        }
        if self.active.get(&round.user_id) == Some(&round_id) {
            self.active.remove(&round.user_id);
        }
        Some(&*round)
    }

    /// Drop `user`'s index entry if it does not name a live active round.
    ///
    /// Returns `true` when an entry was removed.
    pub fn remove_orphaned_index(&mut self, user: &UserId) -> bool {
        let Some(round_id) = self.active.get(user).copied() else {
            return false;
        };
        let live = self
            .rounds
            .get(&round_id)
            .is_some_and(|round| round.is_active() && round.user_id == *user);
        if live {
            return false;
        }
        self.active.remove(user);
        true
    }

    /// Remove every round older than `retention_ms`.
    ///
    /// Rounds that were still active are marked crashed, their index entries dropped, and they
    /// are returned so the caller can refund their stakes.
    pub fn sweep_expired(&mut self, retention_ms: u64, now: u64) -> SweepOutcome {
        let expired: Vec<RoundId> = self
            .rounds
            .values()
            .filter(|round| round.age_ms(now) > retention_ms)
            .map(|round| round.id)
            .collect();

        let mut outcome = SweepOutcome::default();
        for round_id in expired {
            let Some(mut round) = self.rounds.remove(&round_id) else {
                continue;
            };
            outcome.removed += 1;
            if round.is_active() {
                round.status = RoundStatus::Crashed;
                if self.active.get(&round.user_id) == Some(&round_id) {
                    self.active.remove(&round.user_id);
                }
                outcome.abandoned.push(round);
            }
        }
        outcome
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

/// Result of [`RoundRegistry::sweep_expired`].
#[derive(Debug, Default)]
pub struct SweepOutcome {
    /// Total rounds removed, terminal or not.
    pub removed: usize,
    /// Rounds that were still active when removed; their stakes are owed back.
    pub abandoned: Vec<Round>,
}
