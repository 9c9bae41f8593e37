use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::{HistoryError, Result};
use crate::jobs::logs::{LogTailReader, DEFAULT_LOG_TAIL_LINES};
use crate::jobs::model::{ConfigType, JobId};
use crate::jobs::projector;
use crate::jobs::repo::JobPersistence;
use crate::jobs::scope::JobScope;
use crate::jobs::views::{JobDetailView, JobSummaryView};

/// Per-call bounds supplied by the caller.
///
/// The deadline covers the persistence fetch and every log read of the call.
/// Cancelling a query is dropping its future: the caller stops waiting, but a
/// blocking log read that already started runs to completion on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryContext {
    deadline: Option<Instant>,
}

impl QueryContext {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

async fn bounded<T>(deadline: Option<Instant>, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| HistoryError::DeadlineExceeded)?,
        None => fut.await,
    }
}

/// Read-only queries over job history.
///
/// Listing stays log-free so it can be polled cheaply; fetching a single job
/// tails every attempt log.
#[derive(Clone)]
pub struct HistoryService {
    jobs: Arc<dyn JobPersistence>,
    logs: Arc<dyn LogTailReader>,
    log_tail_lines: usize,
    query_timeout: Option<Duration>,
}

impl HistoryService {
    pub fn new(jobs: Arc<dyn JobPersistence>, logs: Arc<dyn LogTailReader>) -> Self {
        Self {
            jobs,
            logs,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            query_timeout: None,
        }
    }

    pub fn with_log_tail_lines(mut self, lines: usize) -> Self {
        self.log_tail_lines = lines.max(1);
        self
    }

    /// Timeout applied to calls made without an explicit [`QueryContext`].
    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn log_tail_lines(&self) -> usize {
        self.log_tail_lines
    }

    fn default_context(&self) -> QueryContext {
        self.query_timeout
            .map(QueryContext::with_timeout)
            .unwrap_or_default()
    }

    pub async fn list_jobs(
        &self,
        config_type: ConfigType,
        config_id: &str,
    ) -> Result<Vec<JobSummaryView>> {
        self.list_jobs_with(config_type, config_id, &self.default_context())
            .await
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn list_jobs_with(
        &self,
        config_type: ConfigType,
        config_id: &str,
        ctx: &QueryContext,
    ) -> Result<Vec<JobSummaryView>> {
        let scope = JobScope::new(config_type, config_id)?;
        let jobs = bounded(ctx.deadline(), self.jobs.list_jobs(&scope)).await?;

        debug!(scope = %scope, jobs = jobs.len(), "listed jobs");
        Ok(jobs.iter().map(projector::job_summary).collect())
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<JobDetailView> {
        self.get_job_with(job_id, &self.default_context()).await
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn get_job_with(&self, job_id: JobId, ctx: &QueryContext) -> Result<JobDetailView> {
        let job = bounded(ctx.deadline(), self.jobs.get_job(job_id))
            .await?
            .ok_or(HistoryError::NotFound(job_id))?;

        let detail = bounded(
            ctx.deadline(),
            projector::job_detail(&job, self.logs.as_ref(), self.log_tail_lines),
        )
        .await;

        match &detail {
            Ok(view) => debug!(attempts = view.attempts.len(), "assembled job detail"),
            Err(HistoryError::LogUnavailable { path, source }) => {
                warn!(path = %path.display(), error = %source, "attempt log unavailable")
            }
            Err(e) => warn!(error = %e, "job detail failed"),
        }
        detail
    }
}
