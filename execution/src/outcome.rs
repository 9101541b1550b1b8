//! Crash point generation.
//!
//! A round's termination multiplier is drawn from a right-skewed tiered distribution: a tier is
//! picked by cumulative probability, then a value is drawn uniformly (in hundredths) from that
//! tier's half-open sub-range. Working in hundredths keeps every result on the two-decimal grid
//! and strictly below the 20.00x cap.

use crashline_types::Multiplier;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Denominator for tier probabilities (basis points).
const PROBABILITY_SCALE: u32 = 10_000;

/// A tier of the crash point distribution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tier {
    /// Upper bound of the cumulative probability, in basis points.
    pub cumulative_bps: u32,
    /// Inclusive lower bound, in hundredths.
    pub low: u32,
    /// Exclusive upper bound, in hundredths.
    pub high: u32,
}

pub const TIERS: [Tier; 5] = [
    Tier { cumulative_bps: 3_500, low: 100, high: 170 },
    Tier { cumulative_bps: 6_000, low: 170, high: 250 },
    Tier { cumulative_bps: 8_000, low: 250, high: 500 },
    Tier { cumulative_bps: 9_300, low: 500, high: 1_000 },
    Tier { cumulative_bps: 10_000, low: 1_000, high: 2_000 },
];

/// Lowest value the generator can produce (1.00x).
pub const MIN_CRASH_POINT: Multiplier = Multiplier::from_hundredths(100);

/// Exclusive cap on generated values (20.00x).
pub const CRASH_POINT_CAP: Multiplier = Multiplier::from_hundredths(2_000);

/// Draw a crash point from the tiered distribution.
pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Multiplier {
    let roll = rng.gen_range(0..PROBABILITY_SCALE);
    let tier = TIERS
        .iter()
        .find(|tier| roll < tier.cumulative_bps)
        .unwrap_or(&TIERS[TIERS.len() - 1]);
    Multiplier::from_hundredths(rng.gen_range(tier.low..tier.high))
}

/// Source of termination multipliers for new rounds.
pub trait CrashPointSource: Send {
    fn next_crash_point(&mut self) -> Multiplier;
}

/// The production source: [`generate`] driven by a pseudo-random generator.
#[derive(Debug)]
pub struct TieredCrashPoints<R = StdRng> {
    rng: R,
}

impl TieredCrashPoints<StdRng> {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for replays and local testing.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> TieredCrashPoints<R> {
    pub fn with_rng(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng + Send> CrashPointSource for TieredCrashPoints<R> {
    fn next_crash_point(&mut self) -> Multiplier {
        generate(&mut self.rng)
    }
}

impl<T: CrashPointSource + ?Sized> CrashPointSource for Box<T> {
    fn next_crash_point(&mut self) -> Multiplier {
        (**self).next_crash_point()
    }
}
