use serde::{Deserialize, Serialize};

/// A monetary amount in integer minor currency units.
///
/// All amounts in the engine are carried as signed minor units so that no
/// floating-point representation can drift the ledger. Arithmetic goes
/// through the checked helpers; an overflow aborts the operation instead of
/// wrapping.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(pub i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn as_minor(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    pub fn negated(self) -> Money {
        Money(-self.0)
    }

    /// Split a non-negative amount into two halves that always sum back to
    /// the original. An odd minor unit goes to the first half.
    pub fn split_half(self) -> (Money, Money) {
        let low = self.0 / 2;
        (Money(self.0 - low), Money(low))
    }
}

impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::str::FromStr for Money {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<i64>().map(Money)
    }
}
