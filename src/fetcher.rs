//! End-to-end retrieval of one metric.
//!
//! One `fetch` call: GET the metric; if the backend deferred the work,
//! poll the job and GET again; read freshness headers; classify failures.
//! The whole sequence runs inside a rate-limit retry loop.

use crate::constants::{http, retry};
use crate::error::FetchError;
use crate::models::WeakTags;
use crate::net::{Backoff, BackoffKind};
use crate::poller::JobPoller;
use crate::staleness;
use crate::transport::{HttpResponse, Query, Transport};
use crate::types::{BackendReply, Fetched, JobHandle, TaskAccepted, TimeWindow};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::time::sleep;

/// Retry budgets for one fetch
#[derive(Clone, Debug, PartialEq)]
pub struct FetchPolicy {
    /// Total attempts of the whole sequence when rate limited
    pub rate_limit_attempts: u32,
    /// Job status queries per job round
    pub poll_max_attempts: u32,
    pub backoff: Backoff,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            rate_limit_attempts: retry::RATE_LIMIT_MAX_ATTEMPTS,
            poll_max_attempts: retry::POLL_MAX_ATTEMPTS,
            backoff: Backoff::default(),
        }
    }
}

/// Error body shape used by the backend for 4xx/5xx replies
#[derive(Deserialize)]
struct ErrorDetail {
    detail: String,
}

pub struct MetricFetcher<T> {
    transport: Arc<dyn Transport>,
    resource: String,
    /// Path segment after the subject, e.g. `weak`
    suffix: Option<String>,
    /// Extra query parameters sent after `window`
    params: Query,
    poller: JobPoller,
    backoff: Backoff,
    rate_limit_attempts: u32,
    _payload: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> MetricFetcher<T> {
    /// `resource` is the metric path below the API root, e.g. `tag-ratings`
    pub fn new(transport: Arc<dyn Transport>, resource: impl Into<String>) -> Self {
        Self::with_policy(transport, resource, FetchPolicy::default())
    }

    pub fn with_policy(
        transport: Arc<dyn Transport>,
        resource: impl Into<String>,
        policy: FetchPolicy,
    ) -> Self {
        let poller = JobPoller::new(transport.clone())
            .with_backoff(policy.backoff.clone())
            .with_max_attempts(policy.poll_max_attempts);
        Self {
            transport,
            resource: resource.into().trim_matches('/').to_string(),
            suffix: None,
            params: Query::new(),
            poller,
            backoff: policy.backoff,
            rate_limit_attempts: policy.rate_limit_attempts.max(1),
            _payload: PhantomData,
        }
    }

    /// Append a fixed path segment after the subject
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into().trim_matches('/').to_string();
        self.suffix = (!suffix.is_empty()).then_some(suffix);
        self
    }

    /// Send an extra query parameter with every request
    pub fn with_param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.params.push((key, value.to_string()));
        self
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Fetch the metric for `subject` over `window`
    ///
    /// `prefer_fresh` asks the backend to bypass its cache. Never returns
    /// [`FetchError::RateLimited`].
    pub async fn fetch(
        &self,
        subject: &str,
        window: TimeWindow,
        prefer_fresh: bool,
    ) -> Result<Fetched<T>, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(subject, window, prefer_fresh).await {
                Err(FetchError::RateLimited) if attempt < self.rate_limit_attempts => {
                    let delay = self.backoff.next_delay(attempt, BackoffKind::RateLimit);
                    log::warn!(
                        "[fetch] 429 {}/{} retry={} backoff={}ms",
                        self.resource,
                        subject,
                        attempt,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(FetchError::RateLimited) => {
                    log::warn!(
                        "[fetch] {}/{} still rate limited after {} attempts",
                        self.resource,
                        subject,
                        attempt
                    );
                    return Err(FetchError::ServiceOverloaded);
                }
                other => return other,
            }
        }
    }

    async fn fetch_once(
        &self,
        subject: &str,
        window: TimeWindow,
        prefer_fresh: bool,
    ) -> Result<Fetched<T>, FetchError> {
        let mut prefer_fresh = prefer_fresh;
        let mut rounds = 0;
        loop {
            match self.request(subject, window, prefer_fresh).await? {
                BackendReply::Immediate { data, metadata } => {
                    return Ok(Fetched { data, metadata });
                }
                BackendReply::Deferred(job) => {
                    rounds += 1;
                    if rounds > retry::MAX_JOB_ROUNDS {
                        log::warn!(
                            "[fetch] {}/{} deferred again after {} job rounds",
                            self.resource,
                            subject,
                            retry::MAX_JOB_ROUNDS
                        );
                        return Err(FetchError::PollingTimeout);
                    }
                    log::info!(
                        "[fetch] {}/{} deferred to job {}",
                        self.resource,
                        subject,
                        job.job_id
                    );
                    self.poller.poll(&job).await?;
                    // Job output is cached now; prefer_fresh would enqueue another job
                    prefer_fresh = false;
                }
            }
        }
    }

    /// Issue one GET and classify the reply
    pub async fn request(
        &self,
        subject: &str,
        window: TimeWindow,
        prefer_fresh: bool,
    ) -> Result<BackendReply<T>, FetchError> {
        let mut path = format!("{}/{}", self.resource, urlencoding::encode(subject));
        if let Some(suffix) = &self.suffix {
            path.push('/');
            path.push_str(suffix);
        }
        let mut query: Query = vec![("window", window.as_str().to_string())];
        query.extend(self.params.iter().cloned());
        if prefer_fresh {
            query.push(("prefer_fresh", "true".to_string()));
        }

        let res = self.transport.get(&path, &query).await?;
        classify(res)
    }
}

impl MetricFetcher<WeakTags> {
    /// `tag-ratings/<subject>/weak?threshold=N`
    ///
    /// Not part of the dashboard set; callers fetch it on demand. The
    /// threshold is clamped to what the backend accepts.
    pub fn weak_tags(transport: Arc<dyn Transport>, policy: FetchPolicy, threshold: u32) -> Self {
        let threshold = threshold.min(http::MAX_WEAK_THRESHOLD);
        Self::with_policy(transport, http::TAG_RATINGS_PATH, policy)
            .with_suffix(http::WEAK_TAGS_SUFFIX)
            .with_param("threshold", threshold)
    }
}

fn classify<T: DeserializeOwned>(res: HttpResponse) -> Result<BackendReply<T>, FetchError> {
    match res.status {
        200 => {
            let data = res.json::<T>().map_err(|e| {
                FetchError::GenericFetchFailure(format!("Invalid response body: {e}"))
            })?;
            Ok(BackendReply::Immediate {
                data,
                metadata: staleness::extract(&res),
            })
        }
        202 => {
            let accepted = res.json::<TaskAccepted>().map_err(|e| {
                FetchError::GenericFetchFailure(format!("Invalid task response: {e}"))
            })?;
            if accepted.status != "processing" {
                log::debug!("[fetch] unexpected task status '{}'", accepted.status);
            }
            if let Some(secs) = accepted.retry_after {
                log::debug!("[fetch] backend suggests retry after {secs}s");
            }
            Ok(BackendReply::Deferred(JobHandle {
                job_id: accepted.task_id,
            }))
        }
        404 => Err(FetchError::SubjectNotFound),
        429 => Err(FetchError::RateLimited),
        503 => Err(FetchError::ServiceUnavailable),
        status => {
            let msg = res
                .json::<ErrorDetail>()
                .ok()
                .map(|d| d.detail)
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| format!("Request failed with status code {status}"));
            Err(FetchError::GenericFetchFailure(msg))
        }
    }
}
