//! Reporting API URL construction.

use chrono::NaiveDate;
use reqwest::Url;

use crate::FetchError;

/// Default base URL of the reporting API.
pub const BASE_URL: &str = "https://data.elexon.co.uk/bmrs/api/v1";

/// Default dataset: actual aggregated generation per type (B1620).
pub const DEFAULT_DATASET: &str = "AGPT";

/// Builds the URL for one settlement date of a dataset.
///
/// URL format: `{base}/datasets/{DATASET}?settlementDate={YYYY-MM-DD}&format=json[&apiKey={key}]`.
/// Query values are percent-encoded.
///
/// # Example
///
/// ```
/// use gridfill_fetch::url::dataset_url;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
/// let url = dataset_url("https://example.org/api/", "agpt", date, None).unwrap();
/// assert_eq!(
///     url.as_str(),
///     "https://example.org/api/datasets/AGPT?settlementDate=2024-01-15&format=json"
/// );
/// ```
///
/// # Errors
///
/// Returns [`FetchError::InvalidUrl`] if `base` is not an absolute URL.
pub fn dataset_url(
    base: &str,
    dataset: &str,
    date: NaiveDate,
    api_key: Option<&str>,
) -> Result<Url, FetchError> {
    let path = format!("{}/datasets/{}", base.trim_end_matches('/'), dataset.to_uppercase());
    let mut url = Url::parse(&path).map_err(|e| FetchError::InvalidUrl {
        url: path.clone(),
        reason: e.to_string(),
    })?;

    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("settlementDate", &date.format("%Y-%m-%d").to_string())
            .append_pair("format", "json");
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            query.append_pair("apiKey", key);
        }
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_url_default_base() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let url = dataset_url(BASE_URL, DEFAULT_DATASET, date, None).unwrap();
        assert_eq!(
            url.as_str(),
            "https://data.elexon.co.uk/bmrs/api/v1/datasets/AGPT?settlementDate=2024-03-03&format=json"
        );
    }

    #[test]
    fn test_dataset_url_with_key() {
        let date = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();
        let url = dataset_url("http://localhost:8080", "b1620", date, Some("secret")).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/datasets/B1620?settlementDate=2023-12-31&format=json&apiKey=secret"
        );
    }

    #[test]
    fn test_api_key_is_percent_encoded() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let url = dataset_url(BASE_URL, "agpt", date, Some("a&b=c d")).unwrap();

        assert!(url.as_str().ends_with("&apiKey=a%26b%3Dc+d"));
        let key = url.query_pairs().find(|(k, _)| k == "apiKey").map(|(_, v)| v.into_owned());
        assert_eq!(key.as_deref(), Some("a&b=c d"));
    }

    #[test]
    fn test_dataset_url_ignores_empty_key() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let url = dataset_url(BASE_URL, "agpt", date, Some("")).unwrap();
        assert!(!url.as_str().contains("apiKey"));
    }

    #[test]
    fn test_relative_base_is_rejected() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let result = dataset_url("not a url", "agpt", date, None);
        assert!(matches!(result, Err(FetchError::InvalidUrl { .. })));
    }
}
