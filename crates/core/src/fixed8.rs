//! Fixed-point values with 8 fractional digits.
//!
//! Gas and asset amounts are fractional; fixed-point keeps the execution
//! economics exact where floats would drift.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

const SCALE: i64 = 100_000_000;

/// A signed fixed-point value scaled by 10^8.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Fixed8(i64);

impl Fixed8 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(SCALE);

    /// Number of fractional decimal digits.
    pub const DECIMALS: u32 = 8;

    /// Create a value from raw 10^-8 units.
    pub const fn from_raw(raw: i64) -> Self {
        Self(raw)
    }

    /// Create a value from whole units.
    pub const fn from_int(units: i64) -> Self {
        Self(units.saturating_mul(SCALE))
    }

    /// The raw 10^-8 units.
    pub const fn raw(self) -> i64 {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Add, clamping at the representable range.
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiply by an integer ratio `numerator / denominator`, truncating
    /// toward zero. Widens through i128 so intermediate products cannot
    /// overflow.
    pub fn scale_by(self, numerator: i64, denominator: i64) -> Self {
        let wide = self.0 as i128 * numerator as i128 / denominator as i128;
        Self(wide.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
    }
}

impl Add for Fixed8 {
    type Output = Fixed8;

    fn add(self, other: Fixed8) -> Fixed8 {
        Fixed8(self.0 + other.0)
    }
}

impl AddAssign for Fixed8 {
    fn add_assign(&mut self, other: Fixed8) {
        self.0 += other.0;
    }
}

impl Sub for Fixed8 {
    type Output = Fixed8;

    fn sub(self, other: Fixed8) -> Fixed8 {
        Fixed8(self.0 - other.0)
    }
}

impl Sum for Fixed8 {
    fn sum<I: Iterator<Item = Fixed8>>(iter: I) -> Fixed8 {
        iter.fold(Fixed8::ZERO, Add::add)
    }
}

impl fmt::Display for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(
            f,
            "{}{}.{:08}",
            sign,
            abs / SCALE as u64,
            abs % SCALE as u64
        )
    }
}

impl fmt::Debug for Fixed8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fixed8({})", self)
    }
}
