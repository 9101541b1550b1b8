//! Crashline execution layer.
//!
//! This crate contains the ledger, the round registry and the round lifecycle state machine
//! ([`Engine`]) that the server drives.
//!
//! ## Determinism requirements
//! - Do not read wall-clock time inside execution; every operation takes `now` (unix ms).
//! - Only draw randomness through the engine's [`CrashPointSource`].
//!
//! ## Concurrency
//! [`Engine`] has no interior locking. Callers must serialize access (one lock around the
//! whole engine, held for the full duration of each operation, reconciler sweeps included).
//!
//! ## Minimal round (example)
//! ```rust
//! use crashline_execution::{Engine, EngineConfig};
//! use crashline_types::{Amount, CashOutOutcome, Multiplier, UserId};
//!
//! let mut engine = Engine::seeded(EngineConfig::default(), 7);
//! let alice = UserId::parse("alice").unwrap();
//! engine.deposit(&alice, Amount::from_cents(10_000)).unwrap();
//!
//! let started = engine.start_round(&alice, Amount::from_cents(4_000), 1_000).unwrap();
//! assert_eq!(started.balance, Amount::from_cents(6_000));
//!
//! // 1.00x never exceeds the crash point, so this always pays back the stake.
//! let outcome = engine.cash_out(&alice, started.round_id, Multiplier::ONE).unwrap();
//! assert!(matches!(outcome, CashOutOutcome::Paid { .. }));
//! ```

pub mod config;
pub mod engine;
pub mod ledger;
pub mod outcome;
pub mod rate_gate;
pub mod reconciler;
pub mod registry;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;

pub use config::EngineConfig;
pub use engine::Engine;
pub use ledger::Ledger;
pub use outcome::{generate, CrashPointSource, TieredCrashPoints};
pub use rate_gate::RateGate;
pub use reconciler::SweepReport;
pub use registry::{RoundRegistry, Settlement, SweepOutcome};
