//! Common types used throughout crashline: fixed-point amounts, accounts, rounds, result
//! records, and the error taxonomy shared by the engine and its transports.

mod account;
mod amount;
pub mod api;
pub mod constants;
mod error;
mod round;

pub use account::{Account, AccountSummary, UserId};
pub use amount::{Amount, Multiplier, SignedAmount};
pub use api::{AggregateStats, CashOutOutcome, CrashAck, DepositReceipt, RoundStarted, Withdrawal};
pub use constants::*;
pub use error::LedgerError;
pub use round::{Round, RoundId, RoundStatus, RoundView};
