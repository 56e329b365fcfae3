// Asynchronous job polling.
//
// Mutating calls return a job-status link; the poller GETs it until the job
// leaves the QUEUED/RUNNING/FINISHING states. The wait can be bounded by an
// overall deadline and interrupted through a `CancellationToken`.

use std::time::Duration;

use serde_json::Value;
use strum::{Display, EnumString};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::classify::DispatchResult;
use crate::dispatch::Dispatcher;
use crate::error::Error;
use crate::value::ValueExt;

/// Default sleep between two status observations.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Status reported by a job-status document.
#[derive(Debug, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum JobStatus {
    Queued,
    Running,
    Finishing,
    Succeeded,
    #[strum(to_string = "FAILED", serialize = "FAILURE")]
    Failed,
    #[strum(default)]
    Other(String),
}

impl JobStatus {
    /// Parse a status string. Unknown values become `Other`.
    pub fn from_status(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| Self::Other(raw.to_owned()))
    }

    /// `true` while the job may still change state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Queued | Self::Running | Self::Finishing)
    }
}

/// Status link of a running job, consumed once by the poller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    url: String,
}

impl JobHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// Handle from `links[0].href` of a mutating response.
    pub fn from_response(result: &DispatchResult) -> Result<Self, Error> {
        result.job_href().map(Self::new)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Final observation of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobReport {
    pub status: JobStatus,
    /// The full status document of the last poll.
    pub payload: Value,
}

/// Polls a job-status link until it reaches a terminal state.
#[derive(Debug, Clone)]
pub struct JobPoller {
    dispatcher: Dispatcher,
    interval: Duration,
    deadline: Option<Duration>,
    cancel: Option<CancellationToken>,
}

impl JobPoller {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            interval: DEFAULT_POLL_INTERVAL,
            deadline: None,
            cancel: None,
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Bound the whole wait, across every poll.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Poll `handle` until the job leaves its non-terminal states.
    ///
    /// `timeout` applies to each status GET. `SUCCEEDED` and unknown
    /// statuses return `Ok`; `FAILED`/`FAILURE` return [`Error::JobFailed`].
    pub async fn await_completion(
        &self,
        handle: &JobHandle,
        timeout: Duration,
    ) -> Result<JobReport, Error> {
        let started = Instant::now();
        let cancel = self.cancel.clone().unwrap_or_default();

        loop {
            let poll = self.poll_once(handle, timeout);
            let report = self.bounded(poll, started, &cancel).await??;
            debug!(url = handle.url(), status = %report.status, "job status");

            if report.status == JobStatus::Failed {
                return Err(Error::JobFailed {
                    message: failure_message(&report.payload),
                });
            }
            if report.status.is_terminal() {
                return Ok(report);
            }

            self.bounded(tokio::time::sleep(self.interval), started, &cancel)
                .await?;
        }
    }

    async fn poll_once(&self, handle: &JobHandle, timeout: Duration) -> Result<JobReport, Error> {
        let payload = self
            .dispatcher
            .get_job_status(handle.url(), timeout)
            .await?
            .into_value();
        let status = JobStatus::from_status(payload.str_field("status")?);
        Ok(JobReport { status, payload })
    }

    /// Run `fut` unless the token fires or the overall deadline passes first.
    async fn bounded<F: Future>(
        &self,
        fut: F,
        started: Instant,
        cancel: &CancellationToken,
    ) -> Result<F::Output, Error> {
        // A deadline too large to represent never expires.
        let expires_at = self.deadline.and_then(|limit| started.checked_add(limit));
        let expired = async {
            match expires_at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(Error::Cancelled),
            () = expired => Err(Error::DeadlineExceeded {
                deadline_secs: self.deadline.map_or(0, |d| d.as_secs()),
            }),
            out = fut => Ok(out),
        }
    }
}

/// `message`, falling back to `error.message`, then a fixed text.
fn failure_message(payload: &Value) -> String {
    payload
        .str_field("message")
        .ok()
        .or_else(|| {
            payload
                .object_field("error")
                .ok()
                .and_then(|e| e.str_field("message").ok())
        })
        .unwrap_or("Job failed")
        .to_owned()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn status_parsing() {
        assert_eq!(JobStatus::from_status("QUEUED"), JobStatus::Queued);
        assert_eq!(JobStatus::from_status("SUCCEEDED"), JobStatus::Succeeded);
        assert_eq!(JobStatus::from_status("FAILED"), JobStatus::Failed);
        assert_eq!(JobStatus::from_status("FAILURE"), JobStatus::Failed);
        assert_eq!(
            JobStatus::from_status("CANCELED"),
            JobStatus::Other("CANCELED".into())
        );
    }

    #[test]
    fn terminal_states() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::Finishing.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Other("WEIRD".into()).is_terminal());
    }

    #[test]
    fn failed_displays_canonical_name() {
        assert_eq!(JobStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn failure_message_fallbacks() {
        assert_eq!(failure_message(&json!({"message": "disk full"})), "disk full");
        assert_eq!(
            failure_message(&json!({"error": {"message": "nested"}})),
            "nested"
        );
        assert_eq!(failure_message(&json!({"status": "FAILED"})), "Job failed");
    }
}
