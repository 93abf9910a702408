//! Record identity and representation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use derive_more::{Display, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SettlementPeriod;

/// Timestamp layout embedded in record ids. Sorts lexicographically in time order.
const ID_TIME_FORMAT: &str = "%Y%m%dT%H%MZ";

/// Separator between the series identity and the timestamp in a record id.
const ID_SEPARATOR: char = '_';

/// Errors produced when building or parsing identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The source identity normalizes to nothing.
    #[error("empty source identity")]
    EmptySource,

    /// The record id does not have the `<source>_<timestamp>` shape.
    #[error("malformed record id '{0}'")]
    Malformed(String),
}

/// Normalized identity of a data series.
///
/// Upper-cased, with every character outside `[A-Z0-9.-]` folded to `-`, so
/// the identity is safe to embed in record ids and file names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Into, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId(String);

impl SourceId {
    /// Creates a normalized source identity.
    ///
    /// # Errors
    ///
    /// Returns an error if nothing remains after normalization.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, IdError> {
        let normalized = normalize(raw.as_ref());
        if normalized.is_empty() {
            return Err(IdError::EmptySource);
        }
        Ok(Self(normalized))
    }

    /// Returns the identity of a sub-series, e.g. `B1620` + `Fossil Gas`
    /// gives `B1620.FOSSIL-GAS`.
    ///
    /// Returns a copy of `self` when `kind` normalizes to nothing.
    #[must_use]
    pub fn series(&self, kind: &str) -> Self {
        let kind = normalize(kind);
        if kind.is_empty() {
            return self.clone();
        }
        Self(format!("{}.{kind}", self.0))
    }

    /// Returns the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for SourceId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::str::FromStr for SourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars() {
        let c = c.to_ascii_uppercase();
        if c.is_ascii_alphanumeric() || c == '.' {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// Deterministic record key: `<source>_<YYYYMMDDTHHMMZ>`.
///
/// The same `(source, period_start)` pair always yields the same id, which is
/// what makes repeated writes of a data point idempotent.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, Into, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordId(String);

impl RecordId {
    /// Derives the id for a data point.
    #[must_use]
    pub fn derive(source: &SourceId, period_start: DateTime<Utc>) -> Self {
        Self(format!(
            "{}{ID_SEPARATOR}{}",
            source.as_str(),
            period_start.format(ID_TIME_FORMAT)
        ))
    }

    /// Parses and validates an id.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not a well-formed record id.
    pub fn parse(raw: &str) -> Result<Self, IdError> {
        let id = Self(raw.to_string());
        let source = id.source_part().ok_or_else(|| IdError::Malformed(raw.to_string()))?;
        if !SourceId::new(source).is_ok_and(|s| s.as_str() == source) || id.period_start().is_none()
        {
            return Err(IdError::Malformed(raw.to_string()));
        }
        Ok(id)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the period start encoded in the id.
    #[must_use]
    pub fn period_start(&self) -> Option<DateTime<Utc>> {
        let (_, stamp) = self.0.rsplit_once(ID_SEPARATOR)?;
        NaiveDateTime::parse_from_str(stamp, ID_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    fn source_part(&self) -> Option<&str> {
        self.0.rsplit_once(ID_SEPARATOR).map(|(source, _)| source)
    }
}

impl TryFrom<String> for RecordId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl std::str::FromStr for RecordId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A period-keyed row as returned by the reporting API.
///
/// Every field is optional and numbers may arrive as JSON strings; the
/// converter decides whether a row is usable.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawRecord {
    /// Settlement date, `YYYY-MM-DD`.
    pub settlement_date: Option<String>,
    /// Settlement period number (number or numeric string).
    pub settlement_period: Option<serde_json::Value>,
    /// Period start as an RFC 3339 timestamp, when the API supplies it.
    pub start_time: Option<String>,
    /// Generation type (e.g. "Fossil Gas", "Wind Onshore").
    pub psr_type: Option<String>,
    /// Measured quantity (number or numeric string).
    pub quantity: Option<serde_json::Value>,
}

/// A persisted time-series data point.
///
/// Append-only: once written a record is never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    /// Deterministic key; also the partition key.
    id: RecordId,
    /// Identity of the series this point belongs to.
    source_id: SourceId,
    /// Start of the covered settlement period (UTC).
    period_start: DateTime<Utc>,
    /// Settlement date of the period.
    settlement_date: NaiveDate,
    /// Settlement period within the date.
    settlement_period: SettlementPeriod,
    /// Measured quantity (MW).
    quantity: f64,
}

impl StoredRecord {
    /// Creates a stored record, deriving its id from the series and period start.
    #[must_use]
    pub fn new(
        source_id: SourceId,
        period_start: DateTime<Utc>,
        settlement_date: NaiveDate,
        settlement_period: SettlementPeriod,
        quantity: f64,
    ) -> Self {
        Self {
            id: RecordId::derive(&source_id, period_start),
            source_id,
            period_start,
            settlement_date,
            settlement_period,
            quantity,
        }
    }

    /// Returns the record id.
    #[must_use]
    pub const fn id(&self) -> &RecordId {
        &self.id
    }

    /// Returns the series identity.
    #[must_use]
    pub const fn source_id(&self) -> &SourceId {
        &self.source_id
    }

    /// Returns the period start.
    #[must_use]
    pub const fn period_start(&self) -> DateTime<Utc> {
        self.period_start
    }

    /// Returns the settlement date.
    #[must_use]
    pub const fn settlement_date(&self) -> NaiveDate {
        self.settlement_date
    }

    /// Returns the settlement period.
    #[must_use]
    pub const fn settlement_period(&self) -> SettlementPeriod {
        self.settlement_period
    }

    /// Returns the measured quantity.
    #[must_use]
    pub const fn quantity(&self) -> f64 {
        self.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_source_id_normalization() {
        let source = SourceId::new(" b1620 ").unwrap();
        assert_eq!(source.as_str(), "B1620");

        let series = source.series("Hydro Run-of-river and poundage");
        assert_eq!(series.as_str(), "B1620.HYDRO-RUN-OF-RIVER-AND-POUNDAGE");

        assert_eq!(source.series("  ").as_str(), "B1620");
        assert_eq!(SourceId::new("__"), Err(IdError::EmptySource));
    }

    #[test]
    fn test_record_id_is_deterministic() {
        let source = SourceId::new("B1620").unwrap().series("Fossil Gas");
        let start = Utc.with_ymd_and_hms(2024, 3, 3, 13, 30, 0).unwrap();

        let a = RecordId::derive(&source, start);
        let b = RecordId::derive(&source.clone(), start);

        assert_eq!(a, b);
        assert_eq!(a.as_str(), "B1620.FOSSIL-GAS_20240303T1330Z");
        assert_eq!(a.period_start(), Some(start));
    }

    #[test]
    fn test_record_id_orders_by_time_within_series() {
        let source = SourceId::new("B1620").unwrap();
        let early = RecordId::derive(&source, Utc.with_ymd_and_hms(2023, 12, 31, 23, 30, 0).unwrap());
        let late = RecordId::derive(&source, Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        assert!(early < late);
    }

    #[test]
    fn test_record_id_parse() {
        assert!(RecordId::parse("B1620.WIND_20240101T0000Z").is_ok());
        assert!(matches!(
            RecordId::parse("B1620.WIND"),
            Err(IdError::Malformed(_))
        ));
        assert!(matches!(
            RecordId::parse("b1620_20240101T0000Z"),
            Err(IdError::Malformed(_))
        ));
        assert!(matches!(
            RecordId::parse("B1620_2024-01-01"),
            Err(IdError::Malformed(_))
        ));
    }

    #[test]
    fn test_stored_record_serde() {
        let source = SourceId::new("B1620").unwrap().series("Biomass");
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let period = SettlementPeriod::new(2).unwrap();
        let record = StoredRecord::new(source, period.start_on(date), date, period, 1850.5);

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"id\":\"B1620.BIOMASS_20240101T0030Z\""));
        assert!(json.contains("\"settlementPeriod\":2"));

        let back: StoredRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_raw_record_lenient_fields() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"settlementDate":"2024-01-01","settlementPeriod":"3","psrType":"Wind","quantity":12.5,"extra":true}"#,
        )
        .unwrap();

        assert_eq!(raw.settlement_date.as_deref(), Some("2024-01-01"));
        assert_eq!(raw.settlement_period, Some(serde_json::json!("3")));
        assert!(raw.start_time.is_none());
    }
}
