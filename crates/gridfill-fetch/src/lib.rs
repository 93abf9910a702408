//! HTTP client and reporting API source for the gridfill pipeline.
//!
//! This crate provides the acquisition side of the pipeline:
//!
//! - [`url::dataset_url`] - Constructs reporting API dataset URLs
//! - [`FetchClient`] - HTTP client with connection pooling and retries
//! - [`parse::parse_records`] - Response body parsing into raw records
//! - [`RecordSource`] - Acquisition boundary used by the ingest crate
//! - [`BmrsSource`] - [`RecordSource`] backed by the reporting API

#![doc(issue_tracker_base_url = "https://github.com/factordynamics/gridfill/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod parse;
mod source;
pub mod url;

pub use client::{ClientConfig, FetchClient, FetchError};
pub use parse::{ParseError, parse_records};
pub use source::{BmrsSource, Endpoint, RawBatch, RecordSource};
