//! Round lifecycle engine.
//!
//! The engine owns every store (ledger, registry, rate gate) and a crash point source. Each
//! public operation takes `&mut self` and runs to completion, so a caller that serializes access
//! (the server keeps the engine behind a single mutex) gets every check-then-act sequence below
//! as one indivisible step.
//!
//! ## Round states
//!
//! ```text
//!            cash-out <= crash point
//!   active ─────────────────────────────▶ completed
//!     │
//!     │  cash-out > crash point, invalid cash-out,
//!     │  reported crash, stale reclaim, reconciler
//!     └─────────────────────────────────▶ crashed
//! ```
//!
//! Both terminal states are final.
//!
//! Time is always supplied by the caller as unix milliseconds; the engine never reads a clock.

use crashline_types::{
    AccountSummary, AggregateStats, Amount, CashOutOutcome, CrashAck, DepositReceipt,
    LedgerError, Multiplier, RoundId, RoundStarted, RoundView, SignedAmount, UserId, Withdrawal,
};
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::ledger::Ledger;
use crate::outcome::{CrashPointSource, TieredCrashPoints};
use crate::rate_gate::RateGate;
use crate::registry::{RoundRegistry, Settlement};

pub struct Engine<S = TieredCrashPoints<StdRng>> {
    pub(crate) config: EngineConfig,
    pub(crate) ledger: Ledger,
    pub(crate) registry: RoundRegistry,
    pub(crate) rate_gate: RateGate,
    outcomes: S,
    stale_reclaims: u64,
}

impl Engine {
    /// Engine with an entropy-seeded crash point generator.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_source(config, TieredCrashPoints::from_entropy())
    }

    /// Engine whose crash points are a deterministic function of `seed`.
    pub fn seeded(config: EngineConfig, seed: u64) -> Self {
        Self::with_source(config, TieredCrashPoints::seeded(seed))
    }
}

impl<S: CrashPointSource> Engine<S> {
    pub fn with_source(config: EngineConfig, outcomes: S) -> Self {
        Self {
            config,
            ledger: Ledger::new(),
            registry: RoundRegistry::new(),
            rate_gate: RateGate::new(),
            outcomes,
            stale_reclaims: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stale rounds reclaimed by [`Engine::start_round`] since creation.
    pub fn stale_reclaims(&self) -> u64 {
        self.stale_reclaims
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn registry(&self) -> &RoundRegistry {
        &self.registry
    }

    /// Balance and lifetime counters. Creates the account on first reference.
    pub fn account_summary(&mut self, user: &UserId) -> AccountSummary {
        self.ledger.get_or_create(user).summary()
    }

    pub fn deposit(&mut self, user: &UserId, amount: Amount) -> Result<DepositReceipt, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidRequest {
                reason: "deposit amount must be positive",
            });
        }
        let balance = self.ledger.credit(user, amount)?;
        debug!(user = %user, %amount, %balance, "deposit");
        Ok(DepositReceipt { balance })
    }

    /// Stake `stake` on a new round.
    ///
    /// Checks run in a fixed order and every refusal before the final step leaves the ledger
    /// untouched. The one exception is the stale-round reclaim: once an abandoned round has been
    /// crashed and refunded, that refund stands even if a later check refuses the new start.
    pub fn start_round(
        &mut self,
        user: &UserId,
        stake: Amount,
        now: u64,
    ) -> Result<RoundStarted, LedgerError> {
        if stake.is_zero() {
            return Err(LedgerError::InvalidRequest {
                reason: "stake must be positive",
            });
        }

        if self.rate_gate.check_and_increment(
            user,
            self.config.rate_limit_max_starts,
            self.config.rate_limit_window_ms,
            now,
        ) {
            let retry_after_ms = self.rate_gate.retry_after_ms(user, now);
            debug!(user = %user, retry_after_ms, "round start rate limited");
            return Err(LedgerError::RateLimited { retry_after_ms });
        }

        if let Some(active) = self.registry.active_round_for(user) {
            let round_id = active.id;
            if active.age_ms(now) <= self.config.stale_round_ms {
                return Err(LedgerError::ActiveRoundExists { round_id });
            }
            self.reclaim_stale(user, round_id)?;
        }

        let account = self.ledger.get_or_create(user);
        if let Some(last) = account.last_round_started_at {
            let elapsed = now.saturating_sub(last);
            if elapsed < self.config.start_cooldown_ms {
                return Err(LedgerError::CooldownActive {
                    remaining_ms: self.config.start_cooldown_ms - elapsed,
                });
            }
        }
        if stake > account.balance {
            return Err(LedgerError::InsufficientBalance {
                balance: account.balance,
                requested: stake,
            });
        }

        let balance = self.ledger.debit(user, stake)?;
        self.ledger.record_wager(user, stake);
        self.ledger.record_round_start(user, now);
        let crash_point = self.outcomes.next_crash_point();
        let round_id = self.registry.create_round(user, stake, crash_point, now)?;
        debug!(user = %user, %round_id, %stake, %balance, "round started");

        Ok(RoundStarted { round_id, balance })
    }

    /// Crash an abandoned active round and hand its stake back.
    fn reclaim_stale(&mut self, user: &UserId, round_id: RoundId) -> Result<(), LedgerError> {
        let Some(round) = self.registry.settle(round_id, Settlement::Crashed) else {
            return Ok(());
        };
        let stake = round.stake;
        let started_at = round.started_at;
        let balance = self.ledger.credit(user, stake)?;
        self.stale_reclaims += 1;
        warn!(
            user = %user,
            %round_id,
            %stake,
            %balance,
            started_at,
            "reclaimed stale round and refunded stake"
        );
        Ok(())
    }

    /// Try to lock in `attempted` on an active round.
    ///
    /// The round is claimed (marked settled) before anything else happens, so a second
    /// attempt on the same round always fails. Asking for more than the crash point is a lost
    /// bet, reported as [`CashOutOutcome::Crashed`] rather than an error.
    pub fn cash_out(
        &mut self,
        user: &UserId,
        round_id: RoundId,
        attempted: Multiplier,
    ) -> Result<CashOutOutcome, LedgerError> {
        let round = self.registry.claim_settlement(user, round_id)?;

        if attempted > round.termination_multiplier {
            self.registry.settle(round_id, Settlement::Crashed);
            debug!(
                user = %user,
                %round_id,
                %attempted,
                crash_point = %round.termination_multiplier,
                "cash-out too late"
            );
            return Ok(CashOutOutcome::crashed(round.termination_multiplier));
        }

        let min = self.config.min_cashout_multiplier;
        let max = self.config.max_cashout_multiplier;
        if attempted < min || attempted > max {
            // The claim is spent; void the round so the index and status stay in step.
            self.registry.settle(round_id, Settlement::Crashed);
            return Err(LedgerError::InvalidMultiplier {
                multiplier: attempted,
                min,
                max,
            });
        }

        let credited = round
            .stake
            .checked_mul_multiplier(attempted)
            .and_then(|payout| {
                self.ledger
                    .credit(user, payout)
                    .ok()
                    .map(|balance| (payout, balance))
            });
        let Some((payout, balance)) = credited else {
            self.registry.settle(round_id, Settlement::Crashed);
            return Err(LedgerError::InvalidRequest {
                reason: "payout exceeds ledger capacity",
            });
        };
        self.ledger.record_win(user, payout);
        self.registry.settle(
            round_id,
            Settlement::Completed {
                payout_multiplier: attempted,
            },
        );
        debug!(user = %user, %round_id, %attempted, %payout, %balance, "cash-out paid");

        Ok(CashOutOutcome::Paid {
            payout,
            multiplier: attempted,
            balance,
        })
    }

    /// Record that the client watched `round_id` crash without cashing out.
    ///
    /// Always acknowledges. If the round is not an active round of `user`, the only effect is
    /// dropping `user`'s index entry when it no longer names a live round.
    pub fn report_crash(&mut self, user: &UserId, round_id: RoundId) -> CrashAck {
        let owned_and_active = self
            .registry
            .get(round_id)
            .is_some_and(|round| round.user_id == *user && round.is_active());
        if owned_and_active {
            self.registry.settle(round_id, Settlement::Crashed);
            debug!(user = %user, %round_id, "crash reported");
        } else if self.registry.remove_orphaned_index(user) {
            warn!(user = %user, %round_id, "dropped orphaned active-round entry");
        }
        CrashAck::ACKNOWLEDGED
    }

    pub fn withdraw(&mut self, user: &UserId, amount: Amount) -> Result<Withdrawal, LedgerError> {
        if amount.is_zero() {
            return Err(LedgerError::InvalidRequest {
                reason: "withdrawal amount must be positive",
            });
        }
        if let Some(round_id) = self.registry.active_round_id(user) {
            return Err(LedgerError::ActiveRoundExists { round_id });
        }
        let balance = self.ledger.debit(user, amount)?;
        debug!(user = %user, %amount, %balance, "withdrawal");
        Ok(Withdrawal {
            balance,
            withdrawn: amount,
        })
    }

    /// Post-hoc view of a round owned by `user`.
    pub fn round(&self, user: &UserId, round_id: RoundId) -> Result<RoundView, LedgerError> {
        self.registry
            .owned(user, round_id)
            .map(|round| round.view())
    }

    pub fn aggregate_stats(&self) -> AggregateStats {
        let mut stats = AggregateStats {
            total_users: self.ledger.len() as u64,
            active_rounds: self.registry.active_count() as u64,
            ..Default::default()
        };
        for (_, account) in self.ledger.accounts() {
            stats.total_games = stats.total_games.saturating_add(account.games_played);
            let house_edge: SignedAmount = account.total_wagered.signed_sub(account.total_won);
            stats.house_profit = stats.house_profit.saturating_add(house_edge);
        }
        debug!(
            total_users = stats.total_users,
            active_rounds = stats.active_rounds,
            "aggregate stats computed"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{funded_engine, scripted_engine, user};
    use crashline_types::RoundStatus;

    const T0: u64 = 1_700_000_000_000;

    fn cents(value: u64) -> Amount {
        Amount::from_cents(value)
    }

    fn mult(hundredths: u32) -> Multiplier {
        Multiplier::from_hundredths(hundredths)
    }

    #[test]
    fn test_cash_out_below_crash_point_pays() {
        let alice = user("alice");
        let mut engine = funded_engine(&[350], &alice, cents(10_000));

        let started = engine.start_round(&alice, cents(4_000), T0).unwrap();
        assert_eq!(started.balance, cents(6_000));
        assert!(engine.registry().has_active(&alice));

        let outcome = engine
            .cash_out(&alice, started.round_id, mult(200))
            .unwrap();
        assert_eq!(
            outcome,
            CashOutOutcome::Paid {
                payout: cents(8_000),
                multiplier: mult(200),
                balance: cents(14_000),
            }
        );

        let round = engine.registry().get(started.round_id).unwrap();
        assert_eq!(round.status, RoundStatus::Completed);
        assert_eq!(round.payout_multiplier, Some(mult(200)));
        assert!(round.settled);
        assert!(!engine.registry().has_active(&alice));
    }

    #[test]
    fn test_cash_out_above_crash_point_crashes() {
        let alice = user("alice");
        let mut engine = funded_engine(&[180], &alice, cents(10_000));

        let started = engine.start_round(&alice, cents(4_000), T0).unwrap();
        let outcome = engine
            .cash_out(&alice, started.round_id, mult(200))
            .unwrap();
        assert_eq!(outcome, CashOutOutcome::crashed(mult(180)));

        let round = engine.registry().get(started.round_id).unwrap();
        assert_eq!(round.status, RoundStatus::Crashed);
        assert_eq!(round.payout_multiplier, None);
        assert_eq!(engine.account_summary(&alice).balance, cents(6_000));
        assert!(!engine.registry().has_active(&alice));
    }

    #[test]
    fn test_cash_out_at_crash_point_pays() {
        let alice = user("alice");
        let mut engine = funded_engine(&[180], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(3_333), T0).unwrap();
        let outcome = engine
            .cash_out(&alice, started.round_id, mult(180))
            .unwrap();
        // 33.33 * 1.80 = 59.994 -> 59.99
        assert!(matches!(
            outcome,
            CashOutOutcome::Paid { payout, .. } if payout == cents(5_999)
        ));
    }

    #[test]
    fn test_second_cash_out_fails() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        assert!(engine.cash_out(&alice, started.round_id, mult(150)).is_ok());
        assert_eq!(
            engine.cash_out(&alice, started.round_id, mult(150)),
            Err(LedgerError::AlreadyEnded {
                round_id: started.round_id
            })
        );
        // Paid exactly once.
        assert_eq!(engine.account_summary(&alice).balance, cents(10_500));
    }

    #[test]
    fn test_cash_out_validation_errors() {
        let alice = user("alice");
        let bob = user("bob");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        let missing = RoundId::new(12_345);
        assert_eq!(
            engine.cash_out(&alice, missing, mult(150)),
            Err(LedgerError::NotFound { round_id: missing })
        );
        assert_eq!(
            engine.cash_out(&bob, started.round_id, mult(150)),
            Err(LedgerError::Forbidden {
                round_id: started.round_id
            })
        );
        // A foreign attempt does not consume the round.
        assert!(engine.cash_out(&alice, started.round_id, mult(150)).is_ok());
    }

    #[test]
    fn test_cash_out_below_minimum_voids_round() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        assert_eq!(
            engine.cash_out(&alice, started.round_id, mult(50)),
            Err(LedgerError::InvalidMultiplier {
                multiplier: mult(50),
                min: mult(100),
                max: mult(2_000),
            })
        );
        let round = engine.registry().get(started.round_id).unwrap();
        assert_eq!(round.status, RoundStatus::Crashed);
        assert!(round.settled);
        assert!(!engine.registry().has_active(&alice));
        assert_eq!(engine.account_summary(&alice).balance, cents(9_000));
    }

    #[test]
    fn test_cash_out_far_above_range_is_a_crash() {
        let alice = user("alice");
        let mut engine = funded_engine(&[1_999], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();
        let outcome = engine
            .cash_out(&alice, started.round_id, mult(5_000))
            .unwrap();
        assert!(outcome.is_crash());
    }

    #[test]
    fn test_second_start_rejected_while_active() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500, 500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        assert_eq!(
            engine.start_round(&alice, cents(1_000), T0 + 5_000),
            Err(LedgerError::ActiveRoundExists {
                round_id: started.round_id
            })
        );
        assert_eq!(engine.account_summary(&alice).balance, cents(9_000));
        assert_eq!(engine.registry().active_count(), 1);
    }

    #[test]
    fn test_stale_round_reclaimed_on_start() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500, 300], &alice, cents(10_000));
        let stale = engine.start_round(&alice, cents(4_000), T0).unwrap();
        assert_eq!(stale.balance, cents(6_000));

        let fresh = engine
            .start_round(&alice, cents(1_000), T0 + 65_000)
            .unwrap();
        // Refunded 40.00, then staked 10.00.
        assert_eq!(fresh.balance, cents(9_000));
        assert_ne!(fresh.round_id, stale.round_id);
        assert_eq!(engine.stale_reclaims(), 1);

        let old = engine.registry().get(stale.round_id).unwrap();
        assert_eq!(old.status, RoundStatus::Crashed);
        assert!(!old.settled);
        assert_eq!(
            engine.registry().active_round_id(&alice),
            Some(fresh.round_id)
        );

        let summary = engine.account_summary(&alice);
        assert_eq!(summary.games_played, 2);
        // Wagers are lifetime totals: the refund does not reduce them.
        assert_eq!(summary.total_earned, SignedAmount::from_cents(-5_000));
    }

    #[test]
    fn test_round_at_stale_threshold_still_blocks() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500, 500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();
        assert_eq!(
            engine.start_round(&alice, cents(1_000), T0 + 60_000),
            Err(LedgerError::ActiveRoundExists {
                round_id: started.round_id
            })
        );
        assert_eq!(engine.stale_reclaims(), 0);
    }

    #[test]
    fn test_cooldown() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500, 500, 500], &alice, cents(10_000));
        let first = engine.start_round(&alice, cents(1_000), T0).unwrap();
        engine.report_crash(&alice, first.round_id);

        assert_eq!(
            engine.start_round(&alice, cents(1_000), T0 + 400),
            Err(LedgerError::CooldownActive { remaining_ms: 600 })
        );
        assert_eq!(engine.account_summary(&alice).balance, cents(9_000));
        assert!(engine.start_round(&alice, cents(1_000), T0 + 1_000).is_ok());
    }

    #[test]
    fn test_insufficient_balance() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500], &alice, cents(1_000));
        assert_eq!(
            engine.start_round(&alice, cents(1_001), T0),
            Err(LedgerError::InsufficientBalance {
                balance: cents(1_000),
                requested: cents(1_001),
            })
        );
        let summary = engine.account_summary(&alice);
        assert_eq!(summary.balance, cents(1_000));
        assert_eq!(summary.games_played, 0);
        assert!(!engine.registry().has_active(&alice));
    }

    #[test]
    fn test_zero_stake_rejected_before_rate_gate() {
        let alice = user("alice");
        let mut engine = funded_engine(&[], &alice, cents(1_000));
        for _ in 0..20 {
            assert!(matches!(
                engine.start_round(&alice, Amount::ZERO, T0),
                Err(LedgerError::InvalidRequest { .. })
            ));
        }
        assert!(engine.rate_gate.is_empty());
    }

    #[test]
    fn test_eleventh_start_in_window_rate_limited() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500; 10], &alice, cents(100_000));
        for i in 0..10u64 {
            let now = T0 + i * 2_000;
            let started = engine.start_round(&alice, cents(100), now).unwrap();
            engine.report_crash(&alice, started.round_id);
        }
        let err = engine
            .start_round(&alice, cents(100), T0 + 20_000)
            .unwrap_err();
        assert_eq!(err, LedgerError::RateLimited { retry_after_ms: 40_000 });
        assert!(!engine.registry().has_active(&alice));

        // The window rolls over.
        assert!(engine.start_round(&alice, cents(100), T0 + 60_000).is_ok());
    }

    #[test]
    fn test_failed_starts_count_towards_rate_limit() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        engine.start_round(&alice, cents(100), T0).unwrap();
        for i in 1..10u64 {
            assert!(matches!(
                engine.start_round(&alice, cents(100), T0 + i),
                Err(LedgerError::ActiveRoundExists { .. })
            ));
        }
        assert!(matches!(
            engine.start_round(&alice, cents(100), T0 + 10),
            Err(LedgerError::RateLimited { .. })
        ));
    }

    #[test]
    fn test_report_crash() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        assert_eq!(
            engine.report_crash(&alice, started.round_id),
            CrashAck::ACKNOWLEDGED
        );
        let round = engine.registry().get(started.round_id).unwrap();
        assert_eq!(round.status, RoundStatus::Crashed);
        assert!(!round.settled);
        assert!(!engine.registry().has_active(&alice));

        // Idempotent.
        assert_eq!(
            engine.report_crash(&alice, started.round_id),
            CrashAck::ACKNOWLEDGED
        );
        assert_eq!(engine.account_summary(&alice).balance, cents(9_000));
        assert_eq!(
            engine.cash_out(&alice, started.round_id, mult(150)),
            Err(LedgerError::AlreadyEnded {
                round_id: started.round_id
            })
        );
    }

    #[test]
    fn test_report_crash_for_foreign_or_missing_round_is_harmless() {
        let alice = user("alice");
        let bob = user("bob");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        assert_eq!(
            engine.report_crash(&bob, started.round_id),
            CrashAck::ACKNOWLEDGED
        );
        assert_eq!(
            engine.report_crash(&alice, RoundId::new(999)),
            CrashAck::ACKNOWLEDGED
        );
        let round = engine.registry().get(started.round_id).unwrap();
        assert!(round.is_active());
        assert!(engine.registry().has_active(&alice));
    }

    #[test]
    fn test_withdraw_blocked_by_active_round() {
        let alice = user("alice");
        let mut engine = funded_engine(&[500], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        assert_eq!(
            engine.withdraw(&alice, cents(500)),
            Err(LedgerError::ActiveRoundExists {
                round_id: started.round_id
            })
        );
        assert_eq!(engine.account_summary(&alice).balance, cents(9_000));

        engine.report_crash(&alice, started.round_id);
        assert_eq!(
            engine.withdraw(&alice, cents(500)).unwrap(),
            Withdrawal {
                balance: cents(8_500),
                withdrawn: cents(500),
            }
        );
        assert!(matches!(
            engine.withdraw(&alice, cents(8_501)),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert!(matches!(
            engine.withdraw(&alice, Amount::ZERO),
            Err(LedgerError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn test_deposit() {
        let mut engine = scripted_engine(&[]);
        let alice = user("alice");
        assert!(matches!(
            engine.deposit(&alice, Amount::ZERO),
            Err(LedgerError::InvalidRequest { .. })
        ));
        assert_eq!(
            engine.deposit(&alice, cents(2_550)).unwrap().balance,
            cents(2_550)
        );
        assert_eq!(
            engine.deposit(&alice, cents(50)).unwrap().balance,
            cents(2_600)
        );
    }

    #[test]
    fn test_round_view_hides_crash_point_until_terminal() {
        let alice = user("alice");
        let mut engine = funded_engine(&[420], &alice, cents(10_000));
        let started = engine.start_round(&alice, cents(1_000), T0).unwrap();

        let view = engine.round(&alice, started.round_id).unwrap();
        assert_eq!(view.crash_point, None);
        assert_eq!(
            engine.round(&user("bob"), started.round_id),
            Err(LedgerError::Forbidden {
                round_id: started.round_id
            })
        );

        engine.report_crash(&alice, started.round_id);
        let view = engine.round(&alice, started.round_id).unwrap();
        assert_eq!(view.crash_point, Some(mult(420)));
    }

    #[test]
    fn test_aggregate_stats() {
        let alice = user("alice");
        let bob = user("bob");
        let mut engine = scripted_engine(&[350, 180]);
        engine.deposit(&alice, cents(10_000)).unwrap();
        engine.deposit(&bob, cents(10_000)).unwrap();

        let a = engine.start_round(&alice, cents(4_000), T0).unwrap();
        engine.cash_out(&alice, a.round_id, mult(200)).unwrap();
        engine.start_round(&bob, cents(2_000), T0).unwrap();

        let stats = engine.aggregate_stats();
        assert_eq!(stats.total_users, 2);
        assert_eq!(stats.total_games, 2);
        assert_eq!(stats.active_rounds, 1);
        // Wagered 60.00, paid 80.00.
        assert_eq!(stats.house_profit, SignedAmount::from_cents(-2_000));
    }

    #[test]
    fn test_summary_creates_account() {
        let mut engine = scripted_engine(&[]);
        let summary = engine.account_summary(&user("new"));
        assert_eq!(summary.balance, Amount::ZERO);
        assert_eq!(summary.games_played, 0);
        assert_eq!(summary.total_earned, SignedAmount::ZERO);
        assert_eq!(engine.aggregate_stats().total_users, 1);
    }

    #[test]
    fn test_seeded_engines_agree() {
        let alice = user("alice");
        let mut a = Engine::seeded(EngineConfig::default(), 9);
        let mut b = Engine::seeded(EngineConfig::default(), 9);
        for engine in [&mut a, &mut b] {
            engine.deposit(&alice, cents(10_000)).unwrap();
        }
        let ra = a.start_round(&alice, cents(100), T0).unwrap();
        let rb = b.start_round(&alice, cents(100), T0).unwrap();
        a.report_crash(&alice, ra.round_id);
        b.report_crash(&alice, rb.round_id);
        assert_eq!(
            a.round(&alice, ra.round_id).unwrap().crash_point,
            b.round(&alice, rb.round_id).unwrap().crash_point
        );
    }
}
