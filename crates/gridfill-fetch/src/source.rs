//! Window acquisition from the reporting API.

use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use gridfill_types::{FetchWindow, RawRecord};
use reqwest::Url;

use crate::url::{BASE_URL, DEFAULT_DATASET, dataset_url};
use crate::{FetchClient, FetchError, parse_records};

/// The raw records fetched for one window.
///
/// Consumed by value: iterating a batch moves the records out, so a batch
/// cannot be replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBatch {
    window: FetchWindow,
    records: Vec<RawRecord>,
}

impl RawBatch {
    /// Creates a new batch.
    #[must_use]
    pub const fn new(window: FetchWindow, records: Vec<RawRecord>) -> Self {
        Self { window, records }
    }

    /// Returns the window this batch was fetched for.
    #[must_use]
    pub const fn window(&self) -> FetchWindow {
        self.window
    }

    /// Returns true if the batch is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the number of records in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.records.len()
    }
}

impl IntoIterator for RawBatch {
    type Item = RawRecord;
    type IntoIter = std::vec::IntoIter<RawRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

/// Acquisition boundary: produces the raw records of a window.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches every raw record for the window.
    ///
    /// # Errors
    ///
    /// Returns an error if any part of the window could not be fetched; no
    /// partial batch is returned in that case.
    async fn fetch(&self, window: FetchWindow) -> Result<RawBatch, FetchError>;
}

/// Location of a dataset on the reporting API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// API base URL.
    pub base_url: String,
    /// Dataset name (e.g. "AGPT").
    pub dataset: String,
    /// Optional API key appended to every request.
    pub api_key: Option<String>,
}

impl Default for Endpoint {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            api_key: None,
        }
    }
}

impl Endpoint {
    /// Returns the URL for one settlement date.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidUrl`] if the base URL is not absolute.
    pub fn url_for(&self, date: chrono::NaiveDate) -> Result<Url, FetchError> {
        dataset_url(&self.base_url, &self.dataset, date, self.api_key.as_deref())
    }
}

/// [`RecordSource`] backed by the reporting API.
///
/// Each settlement date of a window is one request; requests run with the
/// client's configured concurrency and results are kept in date order.
#[derive(Debug, Clone)]
pub struct BmrsSource {
    client: FetchClient,
    endpoint: Endpoint,
}

impl BmrsSource {
    /// Creates a new source.
    #[must_use]
    pub const fn new(client: FetchClient, endpoint: Endpoint) -> Self {
        Self { client, endpoint }
    }

    /// Returns the endpoint this source reads from.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    async fn fetch_day(&self, date: chrono::NaiveDate) -> Result<Vec<RawRecord>, FetchError> {
        let url = self.endpoint.url_for(date)?;
        match self.client.get(&url).await? {
            Some(body) => {
                let records =
                    parse_records(&body).map_err(|source| FetchError::Parse { date, source })?;
                tracing::debug!(%date, records = records.len(), "fetched settlement date");
                Ok(records)
            }
            None => {
                tracing::debug!(%date, "no data for settlement date");
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl RecordSource for BmrsSource {
    async fn fetch(&self, window: FetchWindow) -> Result<RawBatch, FetchError> {
        let concurrency = self.client.config().concurrency.max(1);

        let days: Vec<Vec<RawRecord>> = stream::iter(window.days())
            .map(|date| self.fetch_day(date))
            .buffered(concurrency)
            .try_collect()
            .await?;

        Ok(RawBatch::new(window, days.into_iter().flatten().collect()))
    }
}
