//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::EcommerceError;

/// Money value object: non-negative, at most two decimal places, small enough for `NUMERIC(18,2)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(Decimal);

impl Money {
    pub const SCALE: u32 = 2;
    /// Largest storable amount, 9999999999999999.99.
    pub const MAX: Decimal = Decimal::from_parts(0xA763_FFFF, 0x0DE0_B6B3, 0, false, 2);

    pub fn new(amount: Decimal) -> Result<Self, MoneyError> {
        if amount.is_sign_negative() && !amount.is_zero() { return Err(MoneyError::Negative); }
        let normalized = amount.normalize();
        if normalized.scale() > Self::SCALE { return Err(MoneyError::TooPrecise); }
        if normalized > Self::MAX { return Err(MoneyError::TooLarge); }
        Ok(Self(Self::rescaled(normalized)))
    }
    pub fn zero() -> Self { Self(Self::rescaled(Decimal::ZERO)) }
    pub fn amount(&self) -> Decimal { self.0 }

    /// Sums two amounts. Totals may exceed [`Money::MAX`]; only the 96-bit decimal range is enforced.
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0.checked_add(other.0).map(Money).ok_or(MoneyError::Overflow)
    }

    pub fn multiply(&self, qty: Quantity) -> Result<Money, MoneyError> {
        self.0.checked_mul(Decimal::from(qty.value()))
            .map(|amount| Money(Self::rescaled(amount)))
            .ok_or(MoneyError::Overflow)
    }

    fn rescaled(mut amount: Decimal) -> Decimal {
        amount.rescale(Self::SCALE);
        amount
    }
}

impl Default for Money { fn default() -> Self { Self::zero() } }

impl TryFrom<Decimal> for Money {
    type Error = MoneyError;
    fn try_from(value: Decimal) -> Result<Self, Self::Error> { Money::new(value) }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self { value.0 }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { Negative, TooPrecise, TooLarge, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Negative => write!(f, "amount must not be negative"),
            Self::TooPrecise => write!(f, "amount must have at most two decimal places"),
            Self::TooLarge => write!(f, "amount must not exceed {}", Money::MAX),
            Self::Overflow => write!(f, "total amount is too large"),
        }
    }
}

impl From<MoneyError> for EcommerceError {
    fn from(err: MoneyError) -> Self { EcommerceError::InvalidArgument(err.to_string()) }
}

/// Quantity value object: always strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct Quantity(i32);

impl Quantity {
    pub fn new(value: i32) -> Result<Self, QuantityError> {
        if value <= 0 { Err(QuantityError::NotPositive(value)) } else { Ok(Self(value)) }
    }
    pub fn value(&self) -> i32 { self.0 }
    pub fn checked_add(&self, other: Quantity) -> Result<Self, QuantityError> {
        self.0.checked_add(other.0).map(Self).ok_or(QuantityError::Overflow)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: i32) -> Result<Self, Self::Error> { Quantity::new(value) }
}

impl From<Quantity> for i32 {
    fn from(value: Quantity) -> Self { value.0 }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive(i32), Overflow }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(v) => write!(f, "quantity must be greater than zero, got {v}"),
            Self::Overflow => write!(f, "quantity is too large"),
        }
    }
}

impl From<QuantityError> for EcommerceError {
    fn from(err: QuantityError) -> Self { EcommerceError::InvalidArgument(err.to_string()) }
}

/// Row version used for optimistic locking. Every committed write bumps it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(i64);

impl Version {
    pub fn initial() -> Self { Self(1) }
    pub fn from_raw(value: i64) -> Self { Self(value) }
    pub fn value(&self) -> i64 { self.0 }
    pub fn next(&self) -> Self { Self(self.0 + 1) }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "v{}", self.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_rejects_negative_and_fractions_of_a_cent() {
        assert_eq!(Money::new(Decimal::new(-1, 0)), Err(MoneyError::Negative));
        assert_eq!(Money::new(Decimal::new(10001, 3)), Err(MoneyError::TooPrecise));
        assert_eq!(Money::new(Decimal::new(10100, 3)).unwrap().amount(), Decimal::new(1010, 2));
    }

    #[test]
    fn test_money_multiply() {
        let price = Money::new(Decimal::new(1999, 2)).unwrap();
        let total = price.multiply(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(total.amount(), Decimal::new(5997, 2));
        assert_eq!(total.to_string(), "59.97");
    }

    #[test]
    fn test_money_upper_bound() {
        assert_eq!(Money::MAX, "9999999999999999.99".parse::<Decimal>().unwrap());
        assert!(Money::new(Money::MAX).is_ok());
        assert_eq!(Money::new(Decimal::from_i128_with_scale(10i128.pow(18), 2)), Err(MoneyError::TooLarge));
        assert_eq!(Money::new(Decimal::from_i128_with_scale(7 * 10i128.pow(28), 2)), Err(MoneyError::TooLarge));
    }

    #[test]
    fn test_money_arithmetic_overflow_is_an_error() {
        let top = Money::new(Money::MAX).unwrap();
        let line = top.multiply(Quantity::new(i32::MAX).unwrap()).unwrap();
        assert!(line > top);

        let huge = Money(Decimal::MAX);
        assert_eq!(huge.add(&Money::new(Decimal::ONE).unwrap()), Err(MoneyError::Overflow));
        assert_eq!(huge.multiply(Quantity::new(2).unwrap()), Err(MoneyError::Overflow));
        assert!(matches!(EcommerceError::from(MoneyError::Overflow), EcommerceError::InvalidArgument(_)));
    }

    #[test]
    fn test_quantity() {
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-3).is_err());
        let q = Quantity::new(2).unwrap().checked_add(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(q.value(), 5);
        assert_eq!(Quantity::new(i32::MAX).unwrap().checked_add(q), Err(QuantityError::Overflow));
    }

    #[test]
    fn test_version_increases() {
        let v = Version::initial();
        assert!(v.next() > v);
    }
}
