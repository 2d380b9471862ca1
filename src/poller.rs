use crate::constants::{http::TASKS_PATH, messages, retry};
use crate::error::FetchError;
use crate::net::{Backoff, BackoffKind};
use crate::transport::{Query, Transport};
use crate::types::JobHandle;
use serde::Deserialize;
use std::sync::Arc;
use tokio::time::sleep;

#[derive(Deserialize)]
struct TaskFailure {
    #[serde(default)]
    error: Option<String>,
}

/// Polls a deferred job until it completes, fails, or the budget runs out
///
/// Completion carries no payload: the caller re-requests the metric.
#[derive(Clone)]
pub struct JobPoller {
    transport: Arc<dyn Transport>,
    backoff: Backoff,
    max_attempts: u32,
}

impl JobPoller {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            backoff: Backoff::default(),
            max_attempts: retry::POLL_MAX_ATTEMPTS,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub async fn poll(&self, job: &JobHandle) -> Result<(), FetchError> {
        let path = format!("{}/{}", TASKS_PATH, urlencoding::encode(&job.job_id));
        let query = Query::new();

        for attempt in 1..=self.max_attempts {
            let delay = self.backoff.next_delay(attempt, BackoffKind::Poll);
            if !delay.is_zero() {
                sleep(delay).await;
            }

            let res = self.transport.get(&path, &query).await?;
            match res.status {
                200 => {
                    log::debug!("[poll] job {} complete after {attempt} polls", job.job_id);
                    return Ok(());
                }
                202 => {
                    log::debug!(
                        "[poll] job {} still processing ({attempt}/{})",
                        job.job_id,
                        self.max_attempts
                    );
                }
                500 => {
                    let msg = res
                        .json::<TaskFailure>()
                        .ok()
                        .and_then(|f| f.error)
                        .filter(|m| !m.is_empty())
                        .unwrap_or_else(|| messages::JOB_FAILED.to_string());
                    log::warn!("[poll] job {} failed: {msg}", job.job_id);
                    return Err(FetchError::JobFailed(msg));
                }
                404 => return Err(FetchError::JobFailed(messages::JOB_NOT_FOUND.to_string())),
                429 => return Err(FetchError::RateLimited),
                503 => return Err(FetchError::ServiceUnavailable),
                status => {
                    return Err(FetchError::GenericFetchFailure(format!(
                        "Request failed with status code {status}"
                    )))
                }
            }
        }

        log::warn!(
            "[poll] job {} not complete after {} polls",
            job.job_id,
            self.max_attempts
        );
        Err(FetchError::PollingTimeout)
    }
}
