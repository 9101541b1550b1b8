//! Two-decimal fixed-point quantities.
//!
//! Balances and stakes are held as integer cents and multipliers as integer hundredths, so
//! every ledger transition is exact. Conversions from wire decimals (`f64`) happen once, at the
//! edge, and reject anything that is not a finite, non-negative number with at most two decimal
//! places. Extra precision is refused, never rounded.

use serde::{Serialize, Serializer};
use std::fmt;

/// Largest cent value accepted from a wire decimal (2^53, the last exactly representable integer).
const MAX_WIRE_CENTS: u64 = 1 << 53;

/// Slack for binary float noise (`0.29 * 100.0` is `28.999999999999996`).
const DECIMAL_EPSILON: f64 = 1e-6;

/// `value * 100` as a whole number, or `None` for negative, non-finite, or sub-hundredth input.
fn scaled_hundredths(value: f64) -> Option<f64> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let scaled = value * 100.0;
    let whole = scaled.round();
    if (scaled - whole).abs() > DECIMAL_EPSILON {
        return None;
    }
    Some(whole)
}

/// A non-negative monetary amount in cents.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> u64 {
        self.0
    }

    /// Parse a wire decimal holding whole cents.
    ///
    /// Returns `None` for NaN, infinities, negative values, values with more than two decimal
    /// places and values too large to represent exactly.
    pub fn from_decimal(value: f64) -> Option<Self> {
        let cents = scaled_hundredths(value)?;
        if cents > MAX_WIRE_CENTS as f64 {
            return None;
        }
        Some(Self(cents as u64))
    }

    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    pub fn saturating_add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// `self * multiplier`, rounded half-up to the cent.
    pub fn checked_mul_multiplier(self, multiplier: Multiplier) -> Option<Amount> {
        let scaled = (self.0 as u128) * (multiplier.0 as u128);
        let rounded = scaled.checked_add(50)? / 100;
        u64::try_from(rounded).ok().map(Amount)
    }

    /// Signed difference `self - other`, saturating at the `i64` bounds.
    pub fn signed_sub(self, other: Amount) -> SignedAmount {
        let diff = self.0 as i128 - other.0 as i128;
        SignedAmount(diff.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

/// A signed amount in cents, used for lifetime earnings and house profit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SignedAmount(i64);

impl SignedAmount {
    pub const ZERO: SignedAmount = SignedAmount(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    pub fn saturating_add(self, other: SignedAmount) -> SignedAmount {
        SignedAmount(self.0.saturating_add(other.0))
    }

    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for SignedAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Serialize for SignedAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

/// A payout multiplier in hundredths (`350` is 3.50x).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Multiplier(u32);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(100);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    pub const fn hundredths(self) -> u32 {
        self.0
    }

    /// Parse a wire decimal holding whole hundredths. Finer values are refused, never rounded.
    pub fn from_decimal(value: f64) -> Option<Self> {
        let hundredths = scaled_hundredths(value)?;
        if hundredths > u32::MAX as f64 {
            return None;
        }
        Some(Self(hundredths as u32))
    }

    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}x", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for Multiplier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}
