//! Response body parsing.

use gridfill_types::RawRecord;
use serde_json::Value;
use thiserror::Error;

/// Errors that can occur while parsing a response body.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The body is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The body is JSON but neither an array nor a `{"data": [...]}` envelope.
    #[error("unexpected response shape: expected an array or a 'data' array")]
    UnexpectedShape,
}

/// Parses raw records from a response body.
///
/// Accepts either a bare JSON array or an object whose `data` field is an
/// array. Elements that are not objects still yield a (blank) [`RawRecord`]
/// so the converter can count them as malformed instead of failing the
/// whole response.
///
/// # Errors
///
/// Returns an error if the body is not JSON or has an unexpected shape.
pub fn parse_records(body: &[u8]) -> Result<Vec<RawRecord>, ParseError> {
    let value: Value = serde_json::from_slice(body)?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => return Err(ParseError::UnexpectedShape),
        },
        _ => return Err(ParseError::UnexpectedShape),
    };

    Ok(items.into_iter().map(parse_single_record).collect())
}

/// Parses a single element, falling back to a blank record.
fn parse_single_record(item: Value) -> RawRecord {
    serde_json::from_value(item).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let body = br#"{"metadata":{},"data":[
            {"settlementDate":"2024-01-01","settlementPeriod":1,"psrType":"Biomass","quantity":2100.0},
            {"settlementDate":"2024-01-01","settlementPeriod":1,"psrType":"Nuclear","quantity":"4500.5"}
        ]}"#;

        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].psr_type.as_deref(), Some("Biomass"));
        assert_eq!(records[1].quantity, Some(serde_json::json!("4500.5")));
    }

    #[test]
    fn test_parse_bare_array() {
        let body = br#"[{"settlementDate":"2024-01-01","settlementPeriod":"48"}]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].quantity.is_none());
    }

    #[test]
    fn test_non_object_element_is_blank() {
        let body = br#"[42, {"settlementDate":"2024-01-01"}]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], RawRecord::default());
    }

    #[test]
    fn test_wrongly_typed_field_is_blank() {
        let body = br#"[{"settlementDate":20240101}]"#;
        let records = parse_records(body).unwrap();
        assert_eq!(records[0], RawRecord::default());
    }

    #[test]
    fn test_empty_data() {
        let records = parse_records(br#"{"data":[]}"#).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_unexpected_shape() {
        assert!(matches!(
            parse_records(br#"{"rows":[]}"#),
            Err(ParseError::UnexpectedShape)
        ));
        assert!(matches!(parse_records(b"\"x\""), Err(ParseError::UnexpectedShape)));
        assert!(matches!(parse_records(b"<xml/>"), Err(ParseError::Json(_))));
    }
}
