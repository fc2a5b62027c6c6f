//! Fetch module for resilient HTTP access
//!
//! This module contains:
//! - The single-attempt [`Transport`] seam and its `reqwest` implementation
//! - The retrying [`ResilientFetcher`] with exponential backoff
//! - [`RequestCounter`] for throughput measurement

mod counter;
mod fetcher;
mod transport;

pub use counter::{AtomicRequestCounter, RequestCounter};
pub use fetcher::{FetchOutcome, ResilientFetcher, RetryPolicy};
pub use transport::{
    build_http_client, FetchRequest, FetchResponse, HttpTransport, Transport, TransportError,
    DEFAULT_TIMEOUT,
};
