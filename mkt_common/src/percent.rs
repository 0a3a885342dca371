use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

/// A percentage stored as basis points (1% == 100 bps).
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Percent(i64);

#[derive(Debug, Clone, Error)]
#[error("Invalid percentage: {0}")]
pub struct PercentParseError(String);

impl Percent {
    pub const ZERO: Percent = Percent(0);
    pub const HUNDRED: Percent = Percent(10_000);

    pub fn from_bps(bps: i64) -> Self {
        Self(bps)
    }

    pub fn from_whole(percent: i64) -> Self {
        Self(percent * 100)
    }

    pub fn basis_points(&self) -> i64 {
        self.0
    }

    pub fn is_valid_rate(&self) -> bool {
        (0..=10_000).contains(&self.0)
    }
}

impl Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}.{:02}%", self.0 / 100, (self.0 % 100).abs())
        }
    }
}

/// Accepts "5", "5%", "2.5" or "2.5%".
impl FromStr for Percent {
    type Err = PercentParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('%');
        let (whole, frac) = trimmed.split_once('.').unwrap_or((trimmed, ""));
        if frac.len() > 2 {
            return Err(PercentParseError(s.to_string()));
        }
        let whole = whole.parse::<i64>().map_err(|_| PercentParseError(s.to_string()))?;
        let frac = if frac.is_empty() {
            0
        } else {
            let v = frac.parse::<i64>().map_err(|_| PercentParseError(s.to_string()))?;
            if frac.len() == 1 {
                v * 10
            } else {
                v
            }
        };
        Ok(Self(whole * 100 + frac))
    }
}
