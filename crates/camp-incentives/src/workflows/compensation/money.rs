//! Decimal value types for payroll figures.
//!
//! Amounts are kept as `rust_decimal::Decimal` internally and cross the HTTP boundary as plain
//! JSON numbers. `Money` always carries cents precision; every constructor and arithmetic
//! result is rounded half away from zero so the four bonus rules cannot drift apart.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

const CENTS: u32 = 2;

/// Currency amount rounded to cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(CENTS, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Whole currency units, e.g. `Money::from_units(500)` is $500.00.
    pub fn from_units(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Exact amount from an integer number of cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, CENTS))
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self::new)
    }

    pub fn amount(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Subtraction floored at zero.
    pub fn saturating_sub(self, other: Money) -> Money {
        if other >= self {
            Money::ZERO
        } else {
            self - other
        }
    }

    pub fn times(self, quantity: u32) -> Money {
        Money::new(self.0 * Decimal::from(quantity))
    }

    pub fn apply_rate(self, rate: Rate) -> Money {
        Money::new(self.0 * rate.0)
    }

    /// Mean over `count` items, `None` when there is nothing to average.
    pub fn average_over(self, count: usize) -> Option<Money> {
        if count == 0 {
            return None;
        }
        Some(Money::new(self.0 / Decimal::from(count as u64)))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::new(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::new(self.0 - rhs.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// Fractional rate, e.g. `0.2` for twenty percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Rate(Decimal);

impl Rate {
    pub fn new(fraction: Decimal) -> Self {
        Self(fraction)
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self)
    }

    pub fn fraction(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    pub fn is_within_unit_interval(&self) -> bool {
        self.0 >= Decimal::ZERO && self.0 <= Decimal::ONE
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// Average customer-satisfaction survey score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Score(Decimal);

impl Score {
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn from_f64(value: f64) -> Option<Self> {
        Decimal::from_f64(value).map(Self)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Mean of the given scores rounded to two places.
    pub fn mean<I>(scores: I) -> Option<Score>
    where
        I: IntoIterator<Item = Score>,
    {
        let (total, count) = scores
            .into_iter()
            .fold((Decimal::ZERO, 0u64), |(total, count), score| {
                (total + score.0, count + 1)
            });
        if count == 0 {
            return None;
        }
        Some(Score(
            (total / Decimal::from(count))
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        ))
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

fn number_from<'de, D>(deserializer: D, label: &str) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Err(D::Error::custom(format!("{label} must be a finite number")));
    }
    Decimal::from_f64(raw)
        .ok_or_else(|| D::Error::custom(format!("{label} {raw} is out of range")))
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        number_from(deserializer, "amount").map(Money::new)
    }
}

impl Serialize for Rate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Rate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        number_from(deserializer, "rate").map(Rate)
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Score {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        number_from(deserializer, "score").map(Score)
    }
}
