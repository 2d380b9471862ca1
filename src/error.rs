use crate::constants::messages;
use thiserror::Error;

/// Failure of a single HTTP exchange (no response was obtained)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("timeout of {0}ms exceeded")]
    Timeout(u64),
    #[error("{0}")]
    Request(String),
}

/// Classified outcome of a failed metric fetch
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// 404 from the metric resource; not retried
    #[error("subject not found")]
    SubjectNotFound,
    /// Rate-limit retry budget exhausted
    #[error("service overloaded (rate limit retries exhausted)")]
    ServiceOverloaded,
    /// 503 from the metric resource
    #[error("service unavailable")]
    ServiceUnavailable,
    /// Backend reported that the deferred job failed
    #[error("job failed: {0}")]
    JobFailed(String),
    /// Job never completed within the poll budget
    #[error("polling timed out")]
    PollingTimeout,
    #[error("{0}")]
    GenericFetchFailure(String),
    /// 429 seen by one attempt. Consumed by the fetcher's retry loop,
    /// never returned from `MetricFetcher::fetch`.
    #[error("rate limited")]
    RateLimited,
}

impl FetchError {
    /// Message shown to the user in place of the metric
    pub fn user_message(&self) -> String {
        match self {
            FetchError::SubjectNotFound => messages::SUBJECT_NOT_FOUND.to_string(),
            FetchError::ServiceOverloaded | FetchError::RateLimited => {
                messages::SERVICE_OVERLOADED.to_string()
            }
            FetchError::ServiceUnavailable => messages::SERVICE_UNAVAILABLE.to_string(),
            FetchError::JobFailed(msg) => msg.clone(),
            FetchError::PollingTimeout => messages::POLLING_TIMEOUT.to_string(),
            FetchError::GenericFetchFailure(msg) => msg.clone(),
        }
    }

    /// Whether retrying later can help (everything but a wrong subject)
    pub fn is_retryable(&self) -> bool {
        !matches!(self, FetchError::SubjectNotFound)
    }
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        FetchError::GenericFetchFailure(e.to_string())
    }
}
