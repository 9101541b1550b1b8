//! Periodic cleanup of rounds past the retention horizon.
//!
//! A sweep removes every round older than `round_retention_ms`, whatever its status. Rounds
//! that are still active at that point were abandoned by their client: their stake goes back to
//! the owner before the round is dropped. Elapsed rate windows are purged in the same pass.

use crashline_types::Amount;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::outcome::CrashPointSource;

/// What a single sweep did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub rounds_removed: usize,
    pub rounds_refunded: usize,
    pub amount_refunded: Amount,
    pub windows_purged: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        *self == SweepReport::default()
    }
}

impl<S: CrashPointSource> Engine<S> {
    /// Run one reconciliation sweep at `now`.
    pub fn reconcile(&mut self, now: u64) -> SweepReport {
        let outcome = self
            .registry
            .sweep_expired(self.config.round_retention_ms, now);

        let mut report = SweepReport {
            rounds_removed: outcome.removed,
            ..Default::default()
        };
        for round in outcome.abandoned {
            match self.ledger.credit(&round.user_id, round.stake) {
                Ok(balance) => {
                    report.rounds_refunded += 1;
                    report.amount_refunded = report.amount_refunded.saturating_add(round.stake);
                    info!(
                        user = %round.user_id,
                        round_id = %round.id,
                        stake = %round.stake,
                        %balance,
                        "refunded abandoned round"
                    );
                }
                Err(err) => warn!(
                    user = %round.user_id,
                    round_id = %round.id,
                    ?err,
                    "failed to refund abandoned round"
                ),
            }
        }
        report.windows_purged = self.rate_gate.purge_expired(now);
        report
    }
}
