//! HTTP client for reporting API requests.

use bytes::Bytes;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode, Url};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::time::Duration;
use thiserror::Error;

use crate::ParseError;

/// Longest `Retry-After` the client will wait for.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(15 * 60);

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Maximum concurrent requests within one window.
    pub concurrency: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt of a request.
    pub max_retries: u32,
    /// Delay before the first retry (in milliseconds). Doubles per retry.
    pub base_delay_ms: u64,
    /// Upper bound of the computed backoff (in milliseconds).
    pub max_delay_ms: u64,
    /// User agent string.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            timeout: Duration::from_secs(60),
            max_retries: 5,
            base_delay_ms: 500,
            max_delay_ms: 30_000,
            user_agent: format!("gridfill/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Errors that can occur while fetching a window.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API kept answering 5xx or 429 until retries ran out.
    #[error("Server error: {status}")]
    ServerError {
        /// Last HTTP status code.
        status: u16,
    },

    /// The API refused the request (4xx other than 404 and 429).
    #[error("Request rejected with status {status}")]
    Rejected {
        /// HTTP status code.
        status: u16,
    },

    /// A dataset URL could not be built.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The text that failed to parse.
        url: String,
        /// Why it failed.
        reason: String,
    },

    /// The response body for a settlement date could not be parsed.
    #[error("Invalid response for {date}: {source}")]
    Parse {
        /// The settlement date whose response was rejected.
        date: NaiveDate,
        /// The underlying parse error.
        source: ParseError,
    },
}

/// What to do with a response, by status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Disposition {
    Body,
    NoData,
    Retry,
    Reject,
}

impl Disposition {
    fn of(status: StatusCode) -> Self {
        if status == StatusCode::NOT_FOUND {
            Self::NoData
        } else if status.is_success() {
            Self::Body
        } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            Self::Retry
        } else {
            Self::Reject
        }
    }
}

/// Parses a delta-seconds `Retry-After` header. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// Reporting API client: one GET per settlement date, retried while the
/// server is overloaded or unreachable.
#[derive(Debug, Clone)]
pub struct FetchClient {
    client: Client,
    config: ClientConfig,
}

impl FetchClient {
    /// Creates a new fetch client with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .user_agent(&config.user_agent)
            .gzip(true)
            .build()?;
        Ok(Self { client, config })
    }

    /// Returns the client configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches a URL, returning the response body.
    ///
    /// Returns `Ok(None)` on 404, which the reporting API uses for dates it
    /// has no data for. 5xx, 429, timeouts and connection failures are
    /// retried; a 429 waits at least as long as its `Retry-After`.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Rejected`] for other 4xx statuses, and
    /// [`FetchError::ServerError`] or [`FetchError::Http`] once retries run out.
    pub async fn get(&self, url: &Url) -> Result<Option<Bytes>, FetchError> {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let can_retry = attempt <= self.config.max_retries;

            let wait = match self.client.get(url.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    match Disposition::of(status) {
                        Disposition::Body => return Ok(Some(response.bytes().await?)),
                        Disposition::NoData => return Ok(None),
                        Disposition::Reject => {
                            return Err(FetchError::Rejected {
                                status: status.as_u16(),
                            });
                        }
                        Disposition::Retry if !can_retry => {
                            return Err(FetchError::ServerError {
                                status: status.as_u16(),
                            });
                        }
                        Disposition::Retry => {
                            let backoff = self.backoff(url, attempt);
                            let wait = retry_after(response.headers())
                                .map_or(backoff, |requested| requested.max(backoff));
                            tracing::debug!(
                                %url,
                                status = status.as_u16(),
                                attempt,
                                wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                                "retrying request"
                            );
                            wait
                        }
                    }
                }
                Err(e) if can_retry && (e.is_timeout() || e.is_connect()) => {
                    tracing::debug!(%url, error = %e, attempt, "retrying request");
                    self.backoff(url, attempt)
                }
                Err(e) => return Err(e.into()),
            };

            tokio::time::sleep(wait).await;
        }
    }

    /// Exponential backoff for the given retry, capped at `max_delay_ms`.
    ///
    /// A ±20% spread keyed on the URL keeps the days of one window from
    /// retrying in lockstep while staying reproducible.
    fn backoff(&self, url: &Url, attempt: u32) -> Duration {
        let doublings = attempt.saturating_sub(1).min(20);
        let delay = self
            .config
            .base_delay_ms
            .saturating_mul(1 << doublings)
            .min(self.config.max_delay_ms);

        let spread = delay / 5;
        if spread == 0 {
            return Duration::from_millis(delay);
        }

        let mut hasher = DefaultHasher::new();
        url.as_str().hash(&mut hasher);
        attempt.hash(&mut hasher);
        let offset = hasher.finish() % (2 * spread + 1);

        Duration::from_millis(delay - spread + offset)
    }
}
