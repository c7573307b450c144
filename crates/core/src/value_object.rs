//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects (immutable, compared by value).
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// Monetary amount in minor currency units (cents).
///
/// Amounts never go through floating point; arithmetic is checked and
/// overflow surfaces as a validation error.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl ValueObject for Money {}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    /// Construct a money amount that must not be negative.
    pub fn non_negative(field: &'static str, minor: i64) -> DomainResult<Self> {
        if minor < 0 {
            return Err(DomainError::validation(field, "cannot be negative"));
        }
        Ok(Self(minor))
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount", "overflow"))
    }

    pub fn checked_sub(self, other: Money) -> DomainResult<Money> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount", "overflow"))
    }

    /// Multiply a unit price by an integer quantity.
    pub fn times(self, quantity: i64) -> DomainResult<Money> {
        self.0
            .checked_mul(quantity)
            .map(Money)
            .ok_or_else(|| DomainError::validation("amount", "overflow"))
    }

    /// Sum a sequence of amounts with overflow checking.
    pub fn sum<I: IntoIterator<Item = Money>>(amounts: I) -> DomainResult<Money> {
        amounts
            .into_iter()
            .try_fold(Money::ZERO, |acc, m| acc.checked_add(m))
    }
}

/// Renders as a plain decimal with two fraction digits (`1234.50`).
impl core::fmt::Display for Money {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_two_decimals() {
        assert_eq!(Money::from_minor(123450).to_string(), "1234.50");
        assert_eq!(Money::from_minor(5).to_string(), "0.05");
        assert_eq!(Money::from_minor(-250).to_string(), "-2.50");
    }

    #[test]
    fn non_negative_rejects_negative_amounts() {
        assert!(Money::non_negative("price", -1).is_err());
        assert_eq!(Money::non_negative("price", 0).unwrap(), Money::ZERO);
    }

    #[test]
    fn times_detects_overflow() {
        assert!(Money::from_minor(i64::MAX).times(2).is_err());
        assert_eq!(Money::from_minor(250).times(4).unwrap(), Money::from_minor(1000));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: summing is order-independent when it does not overflow.
            #[test]
            fn sum_is_order_independent(values in proptest::collection::vec(0i64..1_000_000, 0..50)) {
                let forward = Money::sum(values.iter().copied().map(Money::from_minor)).unwrap();
                let backward = Money::sum(values.iter().rev().copied().map(Money::from_minor)).unwrap();
                prop_assert_eq!(forward, backward);
                prop_assert_eq!(forward.minor(), values.iter().sum::<i64>());
            }
        }
    }
}
