use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::{Amount, Multiplier, UserId};

/// Sequence-assigned round identifier. Never derived from the clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RoundId(u64);

impl RoundId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RoundId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(RoundId)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundStatus {
    Active,
    Completed,
    Crashed,
}

impl RoundStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RoundStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RoundStatus::Active => "active",
            RoundStatus::Completed => "completed",
            RoundStatus::Crashed => "crashed",
        }
    }
}

/// A single staked round.
///
/// `termination_multiplier` is fixed at creation and must not leave the process while the
/// round is active.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Round {
    pub id: RoundId,
    pub user_id: UserId,
    pub stake: Amount,
    pub termination_multiplier: Multiplier,
    pub started_at: u64,
    pub status: RoundStatus,
    pub settled: bool,
    pub payout_multiplier: Option<Multiplier>,
}

impl Round {
    pub fn new(
        id: RoundId,
        user_id: UserId,
        stake: Amount,
        termination_multiplier: Multiplier,
        started_at: u64,
    ) -> Self {
        Self {
            id,
            user_id,
            stake,
            termination_multiplier,
            started_at,
            status: RoundStatus::Active,
            settled: false,
            payout_multiplier: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RoundStatus::Active
    }

    /// Milliseconds since the round started (zero if `now` is behind `started_at`).
    pub fn age_ms(&self, now: u64) -> u64 {
        now.saturating_sub(self.started_at)
    }

    /// Caller-facing view. The crash point is only revealed once the round is terminal.
    pub fn view(&self) -> RoundView {
        RoundView {
            round_id: self.id,
            stake: self.stake,
            status: self.status,
            started_at: self.started_at,
            settled: self.settled,
            payout_multiplier: self.payout_multiplier,
            crash_point: self
                .status
                .is_terminal()
                .then_some(self.termination_multiplier),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub round_id: RoundId,
    pub stake: Amount,
    pub status: RoundStatus,
    pub started_at: u64,
    pub settled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_multiplier: Option<Multiplier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crash_point: Option<Multiplier>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round() -> Round {
        Round::new(
            RoundId::new(1),
            UserId::parse("alice").unwrap(),
            Amount::from_cents(4_000),
            Multiplier::from_hundredths(350),
            1_000,
        )
    }

    #[test]
    fn test_active_view_hides_crash_point() {
        let round = round();
        let view = round.view();
        assert_eq!(view.crash_point, None);
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("crashPoint").is_none());
        assert_eq!(json["status"], "active");
        assert_eq!(json["roundId"], 1);
    }

    #[test]
    fn test_terminal_view_reveals_crash_point() {
        let mut round = round();
        round.status = RoundStatus::Crashed;
        let view = round.view();
        assert_eq!(view.crash_point, Some(Multiplier::from_hundredths(350)));
    }

    #[test]
    fn test_age_saturates() {
        let round = round();
        assert_eq!(round.age_ms(500), 0);
        assert_eq!(round.age_ms(66_000), 65_000);
    }

    #[test]
    fn test_round_id_parse() {
        assert_eq!("42".parse::<RoundId>().unwrap(), RoundId::new(42));
        assert!("abc".parse::<RoundId>().is_err());
    }
}
