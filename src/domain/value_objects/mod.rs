//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};

/// Money value object. Fixed-point US dollars; the catalog is single-currency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn from_cents(cents: i64) -> Self { Self(Decimal::new(cents, 2)) }
    pub fn dollars(whole: i64) -> Self { Self(Decimal::from(whole)) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn is_zero(&self) -> bool { self.0.is_zero() }
    pub fn is_negative(&self) -> bool { self.0.is_sign_negative() && !self.0.is_zero() }
    pub fn multiply(&self, qty: u32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Unrounded product with a rate such as a tax rate or margin.
    pub fn scale(&self, rate: Decimal) -> Money { Money(self.0 * rate) }

    /// Half-cent rounds away from zero, the way receipts are printed.
    pub fn round_cents(&self) -> Money {
        Money(self.0.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub fn cents(&self) -> i64 {
        (self.round_cents().0 * Decimal::ONE_HUNDRED).to_i64().unwrap_or(i64::MAX)
    }

    /// Plain two-decimal rendering without the currency sign, e.g. `1234.50`.
    pub fn to_fixed(&self) -> String { format!("{:.2}", self.round_cents().0) }
}

impl Add for Money {
    type Output = Money;
    fn add(self, rhs: Money) -> Money { Money(self.0 + rhs.0) }
}

impl Sub for Money {
    type Output = Money;
    fn sub(self, rhs: Money) -> Money { Money(self.0 - rhs.0) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money { iter.fold(Money::zero(), |acc, m| acc + m) }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self { Money(value) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fixed = self.to_fixed();
        let (sign, digits) = match fixed.strip_prefix('-') {
            Some(rest) => ("-", rest),
            None => ("", fixed.as_str()),
        };
        let (whole, frac) = digits.split_once('.').unwrap_or((digits, "00"));
        let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
        for (i, c) in whole.chars().enumerate() {
            if i > 0 && (whole.len() - i) % 3 == 0 { grouped.push(','); }
            grouped.push(c);
        }
        write!(f, "{}${}.{}", sign, grouped, frac)
    }
}

/// Free-text category path such as `Audio Gear/Mics` or `Services/Custom`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(transparent)]
#[sqlx(transparent)]
pub struct Category(String);

pub const SERVICES_ROOT: &str = "Services";
pub const CUSTOM_SERVICE_CATEGORY: &str = "Services/Custom";

impl Category {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let normalized = path.split('/').map(str::trim).filter(|s| !s.is_empty()).collect::<Vec<_>>().join("/");
        Self(normalized)
    }
    pub fn as_str(&self) -> &str { &self.0 }
    pub fn segments(&self) -> impl Iterator<Item = &str> { self.0.split('/').filter(|s| !s.is_empty()) }
    pub fn root(&self) -> Option<&str> { self.segments().next() }

    /// `Services`, `Services/Custom`, `services/...` are all service categories.
    pub fn is_services(&self) -> bool {
        self.root().map(|r| r.eq_ignore_ascii_case(SERVICES_ROOT)).unwrap_or(false)
    }

    /// Segment-wise, case-insensitive prefix match: `Audio Gear` contains `Audio Gear/Mics`.
    pub fn contains(&self, other: &Category) -> bool {
        let mut theirs = other.segments();
        self.segments().all(|mine| theirs.next().map(|t| t.eq_ignore_ascii_case(mine)).unwrap_or(false))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}
