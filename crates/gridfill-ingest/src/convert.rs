//! Raw record conversion.

use chrono::{DateTime, NaiveDate, Utc};
use gridfill_types::{GridfillError, RawRecord, SettlementPeriod, SourceId, StoredRecord};
use serde_json::Value;
use thiserror::Error;

/// Reasons a raw record cannot be stored.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// A required field is absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// The settlement date is not `YYYY-MM-DD`.
    #[error("invalid settlement date '{0}'")]
    InvalidDate(String),

    /// The settlement period is not a number in `1..=50`.
    #[error("invalid settlement period '{0}'")]
    InvalidPeriod(String),

    /// The start time is not an RFC 3339 timestamp.
    #[error("invalid start time '{0}'")]
    InvalidStartTime(String),

    /// The quantity is not a finite number.
    #[error("invalid quantity '{0}'")]
    InvalidQuantity(String),
}

impl From<ConvertError> for GridfillError {
    fn from(e: ConvertError) -> Self {
        Self::MalformedRecord(e.to_string())
    }
}

/// Converts a raw API row into a stored record.
///
/// The series identity is `source` extended with the row's generation type.
/// The period start is the row's `startTime` when present, otherwise it is
/// derived from the settlement date and period. The id is a pure function of
/// the series and period start, so converting the same row twice yields the
/// same id.
///
/// # Errors
///
/// Returns an error if the date, period or quantity is missing or invalid.
pub fn convert(raw: &RawRecord, source: &SourceId) -> Result<StoredRecord, ConvertError> {
    let date = parse_date(raw.settlement_date.as_deref())?;
    let period = parse_period(raw.settlement_period.as_ref())?;
    let quantity = parse_quantity(raw.quantity.as_ref())?;

    let period_start = match raw.start_time.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => DateTime::parse_from_rfc3339(s)
            .map_err(|_| ConvertError::InvalidStartTime(s.to_string()))?
            .with_timezone(&Utc),
        _ => period.start_on(date),
    };

    let series = raw
        .psr_type
        .as_deref()
        .map_or_else(|| source.clone(), |kind| source.series(kind));

    Ok(StoredRecord::new(series, period_start, date, period, quantity))
}

fn parse_date(value: Option<&str>) -> Result<NaiveDate, ConvertError> {
    let value = value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ConvertError::MissingField("settlementDate"))?;
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ConvertError::InvalidDate(value.to_string()))
}

fn parse_period(value: Option<&Value>) -> Result<SettlementPeriod, ConvertError> {
    let invalid = |v: &Value| ConvertError::InvalidPeriod(display(v));
    match value {
        None | Some(Value::Null) => Err(ConvertError::MissingField("settlementPeriod")),
        Some(v @ Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .and_then(|n| SettlementPeriod::new(n).ok())
            .ok_or_else(|| invalid(v)),
        Some(v @ Value::String(s)) => s.parse().map_err(|_| invalid(v)),
        Some(v) => Err(invalid(v)),
    }
}

fn parse_quantity(value: Option<&Value>) -> Result<f64, ConvertError> {
    let quantity = match value {
        None | Some(Value::Null) => return Err(ConvertError::MissingField("quantity")),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    quantity
        .filter(|q| q.is_finite())
        .ok_or_else(|| ConvertError::InvalidQuantity(value.map(display).unwrap_or_default()))
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use serde_json::json;

    fn source() -> SourceId {
        SourceId::new("B1620").unwrap()
    }

    fn raw(date: &str, period: Value, psr: &str, quantity: Value) -> RawRecord {
        RawRecord {
            settlement_date: Some(date.to_string()),
            settlement_period: Some(period),
            start_time: None,
            psr_type: Some(psr.to_string()),
            quantity: Some(quantity),
        }
    }

    #[test]
    fn test_convert_derives_period_start() {
        let record = convert(&raw("2024-03-03", json!(3), "Fossil Gas", json!(8123.4)), &source())
            .unwrap();

        assert_eq!(record.source_id().as_str(), "B1620.FOSSIL-GAS");
        assert_eq!(
            record.period_start(),
            Utc.with_ymd_and_hms(2024, 3, 3, 1, 0, 0).unwrap()
        );
        assert_eq!(record.settlement_period().number(), 3);
        assert_relative_eq!(record.quantity(), 8123.4);
        assert_eq!(record.id().as_str(), "B1620.FOSSIL-GAS_20240303T0100Z");
    }

    #[test]
    fn test_convert_is_deterministic() {
        let row = raw("2024-01-01", json!("17"), "Wind Onshore", json!("412.75"));

        let a = convert(&row, &source()).unwrap();
        let b = convert(&row.clone(), &source()).unwrap();

        assert_eq!(a.id(), b.id());
        assert_eq!(a, b);
    }

    #[test]
    fn test_start_time_takes_precedence() {
        let mut row = raw("2024-06-01", json!(1), "Solar", json!(0));
        row.start_time = Some("2024-05-31T23:00:00+00:00".to_string());

        let record = convert(&row, &source()).unwrap();
        assert_eq!(
            record.period_start(),
            Utc.with_ymd_and_hms(2024, 5, 31, 23, 0, 0).unwrap()
        );
        assert_eq!(record.settlement_date(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    }

    #[test]
    fn test_missing_generation_type_uses_source() {
        let mut row = raw("2024-01-01", json!(1), "", json!(1.0));
        row.psr_type = None;
        let record = convert(&row, &source()).unwrap();
        assert_eq!(record.source_id(), &source());
    }

    #[test]
    fn test_malformed_rows() {
        assert_eq!(
            convert(&RawRecord::default(), &source()),
            Err(ConvertError::MissingField("settlementDate"))
        );
        assert_eq!(
            convert(&raw("03/03/2024", json!(1), "Wind", json!(1)), &source()),
            Err(ConvertError::InvalidDate("03/03/2024".to_string()))
        );
        assert_eq!(
            convert(&raw("2024-03-03", json!(0), "Wind", json!(1)), &source()),
            Err(ConvertError::InvalidPeriod("0".to_string()))
        );
        assert_eq!(
            convert(&raw("2024-03-03", json!(2.5), "Wind", json!(1)), &source()),
            Err(ConvertError::InvalidPeriod("2.5".to_string()))
        );
        assert_eq!(
            convert(&raw("2024-03-03", json!(4), "Wind", json!("n/a")), &source()),
            Err(ConvertError::InvalidQuantity("n/a".to_string()))
        );
        assert_eq!(
            convert(&raw("2024-03-03", json!(4), "Wind", Value::Null), &source()),
            Err(ConvertError::MissingField("quantity"))
        );

        let mut bad_start = raw("2024-03-03", json!(4), "Wind", json!(1));
        bad_start.start_time = Some("yesterday".to_string());
        assert_eq!(
            convert(&bad_start, &source()),
            Err(ConvertError::InvalidStartTime("yesterday".to_string()))
        );
    }

    #[test]
    fn test_convert_error_maps_to_malformed_record() {
        let err: GridfillError = ConvertError::MissingField("quantity").into();
        assert!(matches!(err, GridfillError::MalformedRecord(_)));
    }
}
