//! cfdash - analytics dashboard client
//!
//! This library fetches several independently computed analytics metrics
//! for one handle from a backend that may defer work to background jobs.
//!
//! ## Architecture
//!
//! Leaves first:
//! - **transport**: HTTP GET boundary (reqwest in production)
//! - **staleness**: freshness metadata from response headers
//! - **net**: backoff schedules for rate-limit retries and job polling
//! - **poller**: waits for a deferred job to finish
//! - **fetcher**: one metric end-to-end, with rate-limit retries
//! - **session**: per-metric state, supersession of stale fetches
//! - **dashboard**: the fixed set of metrics and their aggregate state
//!
//! ## Usage
//!
//! ```bash
//! cargo run -- tourist --window year
//! ```

// Core modules
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod types;

// Fetch pipeline
pub mod fetcher;
pub mod net;
pub mod poller;
pub mod staleness;
pub mod transport;

// Reactive state
pub mod dashboard;
pub mod session;

// Re-export commonly used types
pub use config::Config;
pub use dashboard::{AggregateView, Dashboard, MetricKind};
pub use error::{FetchError, TransportError};
pub use fetcher::{FetchPolicy, MetricFetcher};
pub use session::{MetricSession, SessionState};
pub use transport::{HttpResponse, HttpTransport, Transport};
pub use types::{Fetched, FreshnessMetadata, TimeWindow};
