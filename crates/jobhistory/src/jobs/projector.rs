use futures::future::try_join_all;

use crate::error::Result;
use crate::jobs::logs::LogTailReader;
use crate::jobs::model::{Attempt, Job};
use crate::jobs::views::{AttemptDetailView, AttemptView, JobDetailView, JobSummaryView, LogTail};

pub fn attempt_view(attempt: &Attempt) -> AttemptView {
    let summary = attempt.output.as_ref().and_then(|o| o.sync_summary());

    AttemptView {
        id: attempt.number,
        status: attempt.status.into(),
        created_at: attempt.created_at.timestamp(),
        updated_at: attempt.updated_at.timestamp(),
        ended_at: attempt.ended_at.map(|t| t.timestamp()),
        records_synced: summary.map(|s| s.records_synced),
        bytes_synced: summary.map(|s| s.bytes_synced),
    }
}

pub async fn attempt_detail(
    attempt: &Attempt,
    logs: &dyn LogTailReader,
    log_tail_lines: usize,
) -> Result<AttemptDetailView> {
    let log_lines = logs.read_tail(&attempt.log_path, log_tail_lines).await?;

    Ok(AttemptDetailView {
        attempt: attempt_view(attempt),
        logs: LogTail { log_lines },
    })
}

/// Job with per-attempt metadata only. Touches no logs.
pub fn job_summary(job: &Job) -> JobSummaryView {
    JobSummaryView {
        id: job.id,
        config_type: job.scope.config_type.into(),
        config_id: job.scope.config_id.clone(),
        status: job.status.into(),
        created_at: job.created_at.timestamp(),
        updated_at: job.updated_at.timestamp(),
        attempts: job.attempts().iter().map(attempt_view).collect(),
    }
}

/// Job with every attempt's log tail. Logs are read concurrently; the result
/// keeps attempt-number order and the first failing read fails the whole view.
pub async fn job_detail(
    job: &Job,
    logs: &dyn LogTailReader,
    log_tail_lines: usize,
) -> Result<JobDetailView> {
    let attempts = try_join_all(
        job.attempts()
            .iter()
            .map(|a| attempt_detail(a, logs, log_tail_lines)),
    )
    .await?;

    Ok(JobDetailView {
        job: job_summary(job),
        attempts,
    })
}
