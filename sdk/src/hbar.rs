//! The ledger's native currency.
//!
//! Amounts are signed 64-bit tinybar counts. No floating point anywhere near
//! money: `Hbar::new(2)` is exactly 200,000,000 tinybars.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// Tinybars per hbar.
pub const TINYBARS_PER_HBAR: i64 = 100_000_000;

/// An amount of hbar, stored as tinybars.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Hbar(i64);

impl Hbar {
    pub const ZERO: Hbar = Hbar(0);

    /// Whole hbars. Saturates instead of overflowing.
    pub const fn new(hbars: i64) -> Self {
        Self(hbars.saturating_mul(TINYBARS_PER_HBAR))
    }

    pub const fn from_tinybars(tinybars: i64) -> Self {
        Self(tinybars)
    }

    pub const fn to_tinybars(self) -> i64 {
        self.0
    }

    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl Add for Hbar {
    type Output = Hbar;

    fn add(self, rhs: Hbar) -> Hbar {
        Hbar(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Hbar {
    type Output = Hbar;

    fn sub(self, rhs: Hbar) -> Hbar {
        Hbar(self.0.saturating_sub(rhs.0))
    }
}

impl Neg for Hbar {
    type Output = Hbar;

    fn neg(self) -> Hbar {
        Hbar(self.0.saturating_neg())
    }
}

impl fmt::Display for Hbar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % TINYBARS_PER_HBAR == 0 {
            write!(f, "{} ℏ", self.0 / TINYBARS_PER_HBAR)
        } else {
            write!(f, "{} tℏ", self.0)
        }
    }
}
