// crates/jobhistory/src/jobs/repo.rs

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::{HistoryError, Result};
use crate::jobs::model::{
    AttemptRow, AttemptStatus, Job, JobId, JobOutput, JobRow, JobStatus, ATTEMPT_NUMBER_BASE,
};
use crate::jobs::scope::JobScope;

/// Read side of job storage consumed by the history service.
#[async_trait]
pub trait JobPersistence: Send + Sync {
    /// Jobs for one scope, most recently created first.
    async fn list_jobs(&self, scope: &JobScope) -> Result<Vec<Job>>;

    async fn get_job(&self, job_id: JobId) -> Result<Option<Job>>;
}

#[derive(Clone)]
pub struct JobsRepo {
    pool: PgPool,
}

impl JobsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ----------------------------
    // Writes (operator tooling / tests)
    // ----------------------------

    pub async fn create_job(&self, scope: &JobScope) -> Result<JobId> {
        let id = sqlx::query_scalar::<_, JobId>(
            r#"
            INSERT INTO jobs (scope, status)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(scope.encode())
        .bind(JobStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Appends a running attempt with the next attempt number and marks the
    /// job running.
    ///
    /// The job row is locked first so concurrent callers for the same job
    /// number their attempts one after the other.
    pub async fn create_attempt(&self, job_id: JobId, log_path: &Path) -> Result<i32> {
        let mut tx = self.pool.begin().await?;

        sqlx::query_scalar::<_, JobId>("SELECT id FROM jobs WHERE id = $1 FOR UPDATE")
            .bind(job_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(HistoryError::NotFound(job_id))?;

        let number = sqlx::query_scalar::<_, i32>(
            r#"
            INSERT INTO attempts (job_id, attempt_number, status, log_path)
            VALUES (
              $1,
              COALESCE(
                (SELECT MAX(attempt_number) + 1 FROM attempts WHERE job_id = $1),
                $2
              ),
              $3,
              $4
            )
            RETURNING attempt_number
            "#,
        )
        .bind(job_id)
        .bind(ATTEMPT_NUMBER_BASE)
        .bind(AttemptStatus::Running.as_str())
        .bind(log_path.to_string_lossy().into_owned())
        .fetch_one(&mut *tx)
        .await?;

        set_job_status_in(&mut tx, job_id, JobStatus::Running).await?;

        tx.commit().await?;
        Ok(number)
    }

    pub async fn succeed_attempt(
        &self,
        job_id: JobId,
        attempt_number: i32,
        output: Option<&JobOutput>,
    ) -> Result<()> {
        self.finish_attempt(
            job_id,
            attempt_number,
            AttemptStatus::Succeeded,
            JobStatus::Succeeded,
            output,
        )
        .await
    }

    /// A failed attempt leaves the job incomplete; whether another attempt
    /// follows is up to the scheduler.
    pub async fn fail_attempt(
        &self,
        job_id: JobId,
        attempt_number: i32,
        output: Option<&JobOutput>,
    ) -> Result<()> {
        self.finish_attempt(
            job_id,
            attempt_number,
            AttemptStatus::Failed,
            JobStatus::Incomplete,
            output,
        )
        .await
    }

    pub async fn set_job_status(&self, job_id: JobId, status: JobStatus) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        set_job_status_in(&mut tx, job_id, status).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn finish_attempt(
        &self,
        job_id: JobId,
        attempt_number: i32,
        attempt_status: AttemptStatus,
        job_status: JobStatus,
        output: Option<&JobOutput>,
    ) -> Result<()> {
        let output = output.map(serde_json::to_value).transpose()?;
        let mut tx = self.pool.begin().await?;

        let res = sqlx::query(
            r#"
            UPDATE attempts
            SET status = $3,
                output = $4,
                ended_at = now(),
                updated_at = now()
            WHERE job_id = $1
              AND attempt_number = $2
              AND status = $5
            "#,
        )
        .bind(job_id)
        .bind(attempt_number)
        .bind(attempt_status.as_str())
        .bind(output)
        .bind(AttemptStatus::Running.as_str())
        .execute(&mut *tx)
        .await?;

        // terminal attempts are immutable; dropping tx rolls back
        if res.rows_affected() != 1 {
            return Err(HistoryError::AttemptNotRunning {
                job_id,
                attempt_number,
            });
        }

        set_job_status_in(&mut tx, job_id, job_status).await?;

        tx.commit().await?;
        Ok(())
    }

    // ----------------------------
    // Reads
    // ----------------------------

    async fn attempts_for(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        job_ids: &[JobId],
    ) -> Result<HashMap<JobId, Vec<AttemptRow>>> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT job_id, attempt_number, status, log_path, output,
                   created_at, updated_at, ended_at
            FROM attempts
            WHERE job_id = ANY($1)
            ORDER BY job_id ASC, attempt_number ASC
            "#,
        )
        .bind(job_ids)
        .fetch_all(&mut **tx)
        .await?;

        let mut by_job: HashMap<JobId, Vec<AttemptRow>> = HashMap::new();
        for row in rows {
            by_job.entry(row.job_id).or_default().push(row);
        }
        Ok(by_job)
    }

    async fn begin_snapshot(&self) -> Result<sqlx::Transaction<'static, sqlx::Postgres>> {
        let mut tx = self.pool.begin().await?;
        // jobs and their attempts come from the same snapshot
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ READ ONLY")
            .execute(&mut *tx)
            .await?;
        Ok(tx)
    }
}

#[async_trait]
impl JobPersistence for JobsRepo {
    async fn list_jobs(&self, scope: &JobScope) -> Result<Vec<Job>> {
        let mut tx = self.begin_snapshot().await?;

        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, scope, status, created_at, updated_at
            FROM jobs
            WHERE scope = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(scope.encode())
        .fetch_all(&mut *tx)
        .await?;

        let ids: Vec<JobId> = rows.iter().map(|r| r.id).collect();
        let mut attempts = Self::attempts_for(&mut tx, &ids).await?;
        tx.commit().await?;

        rows.into_iter()
            .map(|row| {
                let job_attempts = attempts.remove(&row.id).unwrap_or_default();
                row.into_job(job_attempts)
            })
            .collect()
    }

    async fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        let mut tx = self.begin_snapshot().await?;

        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, scope, status, created_at, updated_at
            FROM jobs
            WHERE id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            tx.commit().await?;
            return Ok(None);
        };

        let mut attempts = Self::attempts_for(&mut tx, &[job_id]).await?;
        tx.commit().await?;

        let job_attempts = attempts.remove(&job_id).unwrap_or_default();
        row.into_job(job_attempts).map(Some)
    }
}

async fn set_job_status_in(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    job_id: JobId,
    status: JobStatus,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET status = $2,
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(status.as_str())
    .execute(&mut **tx)
    .await?;

    Ok(())
}
