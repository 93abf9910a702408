//! Settlement period definitions.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// A half-hour settlement period within a settlement date.
///
/// Periods are numbered from 1. A normal day has 48 periods; the autumn
/// clock change day has 50, so values up to 50 are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SettlementPeriod(u8);

impl SettlementPeriod {
    /// The first period of a settlement date.
    pub const FIRST: Self = Self(1);

    /// The highest period number that can occur on any settlement date.
    pub const MAX: u8 = 50;

    /// Length of one settlement period in minutes.
    pub const MINUTES: i64 = 30;

    /// Creates a settlement period, validating the range `1..=50`.
    ///
    /// # Errors
    ///
    /// Returns an error if the number is outside the valid range.
    pub const fn new(number: u8) -> Result<Self, PeriodError> {
        if number == 0 || number > Self::MAX {
            return Err(PeriodError::OutOfRange(number as i64));
        }
        Ok(Self(number))
    }

    /// Returns the period number.
    #[must_use]
    pub const fn number(&self) -> u8 {
        self.0
    }

    /// Returns the start of this period on the given settlement date.
    ///
    /// Periods are laid out from 00:00 UTC in 30 minute steps.
    #[must_use]
    pub fn start_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN));
        midnight + TimeDelta::minutes(Self::MINUTES * (i64::from(self.0) - 1))
    }
}

impl TryFrom<u8> for SettlementPeriod {
    type Error = PeriodError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SettlementPeriod> for u8 {
    fn from(period: SettlementPeriod) -> Self {
        period.0
    }
}

impl std::fmt::Display for SettlementPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SP{:02}", self.0)
    }
}

impl FromStr for SettlementPeriod {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("SP")
            .or_else(|| trimmed.strip_prefix("sp"))
            .unwrap_or(trimmed);
        let number: i64 = digits
            .parse()
            .map_err(|_| PeriodError::Invalid(s.to_string()))?;
        let number = u8::try_from(number).map_err(|_| PeriodError::OutOfRange(number))?;
        Self::new(number)
    }
}

/// Error returned for invalid settlement periods.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PeriodError {
    /// The period number is outside `1..=50`.
    #[error("settlement period {0} out of range 1..=50")]
    OutOfRange(i64),

    /// The value is not a period number.
    #[error("invalid settlement period '{0}'")]
    Invalid(String),
}
