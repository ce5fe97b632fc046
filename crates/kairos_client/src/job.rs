use std::fmt;
use std::time::Duration;

use kairos_core::{Job, JobId};
use kairos_logging::{kairos_debug, kairos_info, kairos_warn};
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::{ApiError, JobRef, NotebookApi, PollSettings};

/// Receives every snapshot of a job that is still running, before the poller
/// sleeps.
pub trait ProgressSink: Send + Sync {
    fn on_progress(&self, job: &Job);
}

impl<F> ProgressSink for F
where
    F: Fn(&Job) + Send + Sync,
{
    fn on_progress(&self, job: &Job) {
        self(job)
    }
}

/// Sink that discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_progress(&self, _job: &Job) {}
}

/// How a polled job ended from the client's point of view.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// The job left `running` without an error flag.
    Succeeded(Option<Value>),
    /// The job reported `error: true`.
    Failed { job_id: JobId, reason: String },
    /// A polling bound was reached while the job was still running.
    TimedOut { attempts: u32, elapsed: Duration },
    Cancelled,
}

impl JobOutcome {
    fn from_terminal(job: Job) -> Self {
        if job.error {
            let reason = job
                .output_text()
                .unwrap_or_else(|| "job reported an error".to_string());
            JobOutcome::Failed {
                job_id: job.id,
                reason,
            }
        } else {
            JobOutcome::Succeeded(job.output)
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded(_))
    }

    /// Successful output as text: strings verbatim, other JSON compactly.
    pub fn output_text(&self) -> Option<String> {
        match self {
            JobOutcome::Succeeded(Some(Value::String(text))) => Some(text.clone()),
            JobOutcome::Succeeded(Some(Value::Null)) | JobOutcome::Succeeded(None) => None,
            JobOutcome::Succeeded(Some(other)) => Some(other.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Succeeded(_) => write!(f, "succeeded"),
            JobOutcome::Failed { job_id, reason } => write!(f, "job {job_id} failed: {reason}"),
            JobOutcome::TimedOut { attempts, elapsed } => write!(
                f,
                "timed out after {attempts} status checks ({:.1}s)",
                elapsed.as_secs_f64()
            ),
            JobOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Poll `job` until it leaves `running`.
///
/// Each running snapshot goes to `sink` before the poller sleeps for
/// `settings.interval`. Cancellation is checked before every status fetch and
/// interrupts the sleep. Transport failures end polling with `Err`; they are
/// not treated as job failures and are not retried.
pub async fn join_job(
    api: &dyn NotebookApi,
    job: &JobRef,
    settings: &PollSettings,
    cancel: &CancellationToken,
    sink: &dyn ProgressSink,
) -> Result<JobOutcome, ApiError> {
    let started = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            kairos_info!("job {} polling cancelled after {} checks", job, attempts);
            return Ok(JobOutcome::Cancelled);
        }

        let snapshot = api.job(job).await?;
        attempts += 1;

        if !snapshot.is_running() {
            let outcome = JobOutcome::from_terminal(snapshot);
            match &outcome {
                JobOutcome::Failed { reason, .. } => {
                    kairos_warn!("job {} failed: {}", job, reason)
                }
                _ => kairos_info!("job {} finished after {} checks", job, attempts),
            }
            return Ok(outcome);
        }

        sink.on_progress(&snapshot);

        let elapsed = started.elapsed();
        let out_of_attempts = settings.max_attempts.is_some_and(|max| attempts >= max);
        let out_of_time = settings.max_duration.is_some_and(|max| elapsed >= max);
        if out_of_attempts || out_of_time {
            kairos_warn!(
                "job {} still running after {} checks ({:?}); giving up",
                job,
                attempts,
                elapsed
            );
            return Ok(JobOutcome::TimedOut { attempts, elapsed });
        }

        kairos_debug!("job {} running (check {})", job, attempts);
        tokio::select! {
            _ = cancel.cancelled() => {
                kairos_info!("job {} polling cancelled after {} checks", job, attempts);
                return Ok(JobOutcome::Cancelled);
            }
            _ = tokio::time::sleep(settings.interval) => {}
        }
    }
}
