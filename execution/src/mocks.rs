//! Test helpers: scripted crash points and pre-funded engines.

use std::collections::VecDeque;

use crashline_types::{Amount, Multiplier, UserId};

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::outcome::CrashPointSource;

/// Crash point returned once a script runs out.
const FALLBACK_CRASH_POINT: Multiplier = Multiplier::from_hundredths(200);

/// Crash point source that replays a fixed list (in hundredths).
#[derive(Clone, Debug, Default)]
pub struct ScriptedCrashPoints {
    points: VecDeque<Multiplier>,
}

impl ScriptedCrashPoints {
    pub fn new(hundredths: &[u32]) -> Self {
        Self {
            points: hundredths
                .iter()
                .copied()
                .map(Multiplier::from_hundredths)
                .collect(),
        }
    }
}

impl CrashPointSource for ScriptedCrashPoints {
    fn next_crash_point(&mut self) -> Multiplier {
        self.points.pop_front().unwrap_or(FALLBACK_CRASH_POINT)
    }
}

pub fn user(name: &str) -> UserId {
    UserId::parse(name).expect("valid user id")
}

/// Engine with default config whose rounds crash at `crash_points` in order.
pub fn scripted_engine(crash_points: &[u32]) -> Engine<ScriptedCrashPoints> {
    Engine::with_source(EngineConfig::default(), ScriptedCrashPoints::new(crash_points))
}

/// [`scripted_engine`] with `balance` already deposited for `user`.
pub fn funded_engine(
    crash_points: &[u32],
    user: &UserId,
    balance: Amount,
) -> Engine<ScriptedCrashPoints> {
    let mut engine = scripted_engine(crash_points);
    engine.deposit(user, balance).expect("deposit succeeds");
    engine
}
