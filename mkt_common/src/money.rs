use std::{fmt::Display, iter::Sum, ops::Add, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::{op, Percent};

pub const DEFAULT_CURRENCY_CODE: &str = "BDT";

//--------------------------------------       Money         ---------------------------------------------------------
/// An amount of money in the smallest unit of the currency (cents, paisa, etc.).
///
/// All pricing, ledger and payout arithmetic is done on integer minor units so that
/// `commission + vendor_amount == amount` holds exactly.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a money amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value)
            .map(Self)
            .map_err(|_| MoneyConversionError(format!("{value} is too large to convert to Money")))
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

/// Parses a decimal amount in major units ("945", "945.5", "945.50") into minor units.
/// More than two decimal places is an error, since gateways never send sub-cent amounts.
impl FromStr for Money {
    type Err = MoneyConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || MoneyConversionError(format!("'{s}' is not a valid amount"));
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };
        if whole.is_empty() || frac.len() > 2 || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        if !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(err());
        }
        let whole = whole.parse::<i64>().map_err(|_| err())?;
        let frac = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| err())? * 10,
            _ => frac.parse::<i64>().map_err(|_| err())?,
        };
        let value = whole.checked_mul(100).and_then(|v| v.checked_add(frac)).ok_or_else(err)?;
        Ok(Self(if negative { -value } else { value }))
    }
}

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn from_major(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Returns `p` percent of this amount, rounded half-up to the nearest minor unit.
    pub fn percent(&self, p: Percent) -> Money {
        let bps = i128::from(p.basis_points());
        let value = i128::from(self.0) * bps;
        let rounded = if value >= 0 { (value + 5_000) / 10_000 } else { (value - 5_000) / 10_000 };
        #[allow(clippy::cast_possible_truncation)]
        Money(rounded as i64)
    }

    pub fn min(self, other: Money) -> Money {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Money) -> Money {
        Money(self.0.max(other.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(Money::from(94500).to_string(), "945.00");
        assert_eq!(Money::from(5).to_string(), "0.05");
        assert_eq!(Money::from(-1250).to_string(), "-12.50");
    }

    #[test]
    fn parse_amounts() {
        assert_eq!("945".parse::<Money>().unwrap(), Money::from(94500));
        assert_eq!("945.5".parse::<Money>().unwrap(), Money::from(94550));
        assert_eq!("0.05".parse::<Money>().unwrap(), Money::from(5));
        assert!("1.005".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".5".parse::<Money>().is_err());
    }

    #[test]
    fn percentages_round_half_up() {
        let price = Money::from_major(1000);
        assert_eq!(price.percent(Percent::from_bps(1000)), Money::from_major(100));
        assert_eq!(Money::from_major(900).percent(Percent::from_bps(500)), Money::from_major(45));
        // 0.5 minor units rounds up
        assert_eq!(Money::from(1).percent(Percent::from_bps(5000)), Money::from(1));
        assert_eq!(Money::from(333).percent(Percent::from_bps(1000)), Money::from(33));
    }

    #[test]
    fn sum_and_ops() {
        let total: Money = [Money::from(100), Money::from(250)].into_iter().sum();
        assert_eq!(total, Money::from(350));
        let mut m = Money::from(10);
        m -= Money::from(4);
        m += Money::from(1);
        assert_eq!(m, Money::from(7));
        assert_eq!(-m, Money::from(-7));
    }

    #[test]
    fn serialized_as_minor_units() {
        assert_eq!(serde_json::to_string(&Money::from(94500)).unwrap(), "94500");
        let m: Money = serde_json::from_str("-250").unwrap();
        assert_eq!(m, Money::from(-250));
    }
}
