//! Application constants
//!
//! Centralized constants for retry timing, HTTP headers, and user-facing
//! strings used throughout the crate.

/// Retry and polling budgets
pub mod retry {
    use std::time::Duration;

    /// First wait after a rate-limited (429) response
    pub const RATE_LIMIT_INITIAL_DELAY: Duration = Duration::from_secs(2);

    /// Upper bound for a single rate-limit wait
    pub const RATE_LIMIT_MAX_DELAY: Duration = Duration::from_secs(30);

    /// Total request attempts (initial + retries) before giving up on 429s
    pub const RATE_LIMIT_MAX_ATTEMPTS: u32 = 3;

    /// Wait before the second job status poll (the first poll is immediate)
    pub const POLL_INITIAL_DELAY: Duration = Duration::from_secs(2);

    /// Growth factor applied to the poll delay after every poll
    pub const POLL_BACKOFF_FACTOR: f64 = 1.5;

    /// Upper bound for a single poll wait
    pub const POLL_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Job status queries before the poller gives up
    pub const POLL_MAX_ATTEMPTS: u32 = 30;

    /// Job rounds allowed per fetch
    ///
    /// The re-issued request after a completed job may itself be deferred
    /// once more (e.g. the backend evicted the result in between).
    pub const MAX_JOB_ROUNDS: u32 = 2;
}

/// HTTP boundary
pub mod http {
    /// Per-request deadline in milliseconds
    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;

    /// Default backend base URL
    pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000/api";

    /// Response header flagging data older than the backend freshness threshold
    pub const HEADER_DATA_STALE: &str = "x-data-stale";

    /// Response header carrying the data age in seconds
    pub const HEADER_DATA_AGE: &str = "x-data-age";

    /// Job status resource prefix
    pub const TASKS_PATH: &str = "tasks";

    /// Weak-tags lookup lives below the tag-ratings resource
    pub const TAG_RATINGS_PATH: &str = "tag-ratings";
    pub const WEAK_TAGS_SUFFIX: &str = "weak";

    /// Rating gap below the overall average that marks a tag as weak
    pub const DEFAULT_WEAK_THRESHOLD: u32 = 200;
    pub const MAX_WEAK_THRESHOLD: u32 = 1000;
}

/// User-facing message strings
pub mod messages {
    pub const SUBJECT_NOT_FOUND: &str = "User not found on Codeforces";

    pub const SERVICE_OVERLOADED: &str = "Too many requests. Please wait a moment and try again.";

    pub const SERVICE_UNAVAILABLE: &str =
        "Service is temporarily unavailable. Please try again later.";

    pub const POLLING_TIMEOUT: &str =
        "Data processing is taking longer than expected. Please try again.";

    /// Fallback when a failed job carries no message
    pub const JOB_FAILED: &str = "Task failed";

    /// Job id unknown to the backend (expired or never existed)
    pub const JOB_NOT_FOUND: &str = "Task not found";

    /// Staleness banner when the backend did not report an age
    pub const STALE_UNKNOWN_AGE: &str = "This data is older than 4 hours";
}
