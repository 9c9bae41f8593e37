use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HistoryError, Result};
use crate::jobs::scope::JobScope;

pub type JobId = i64;

/// Number given to the first attempt of every job.
pub const ATTEMPT_NUMBER_BASE: i32 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigType {
    CheckConnectionSource,
    CheckConnectionDestination,
    DiscoverSchema,
    GetSpec,
    Sync,
    ResetConnection,
}

impl ConfigType {
    pub const ALL: [ConfigType; 6] = [
        ConfigType::CheckConnectionSource,
        ConfigType::CheckConnectionDestination,
        ConfigType::DiscoverSchema,
        ConfigType::GetSpec,
        ConfigType::Sync,
        ConfigType::ResetConnection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::CheckConnectionSource => "check_connection_source",
            ConfigType::CheckConnectionDestination => "check_connection_destination",
            ConfigType::DiscoverSchema => "discover_schema",
            ConfigType::GetSpec => "get_spec",
            ConfigType::Sync => "sync",
            ConfigType::ResetConnection => "reset_connection",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| HistoryError::unmapped("config_type", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Pending,
    Running,
    Incomplete,
    Failed,
    Succeeded,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Incomplete => "incomplete",
            JobStatus::Failed => "failed",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "incomplete" => Ok(JobStatus::Incomplete),
            "failed" => Ok(JobStatus::Failed),
            "succeeded" => Ok(JobStatus::Succeeded),
            "cancelled" => Ok(JobStatus::Cancelled),
            other => Err(HistoryError::unmapped("job_status", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Failed | JobStatus::Succeeded | JobStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttemptStatus {
    Running,
    Failed,
    Succeeded,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::Running => "running",
            AttemptStatus::Failed => "failed",
            AttemptStatus::Succeeded => "succeeded",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(AttemptStatus::Running),
            "failed" => Ok(AttemptStatus::Failed),
            "succeeded" => Ok(AttemptStatus::Succeeded),
            other => Err(HistoryError::unmapped("attempt_status", other)),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AttemptStatus::Running)
    }
}

// Stored as JSON in `attempts.output`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync: Option<StandardSyncOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardSyncOutput {
    pub standard_sync_summary: SyncSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub records_synced: u64,
    pub bytes_synced: u64,
}

impl JobOutput {
    pub fn sync(records_synced: u64, bytes_synced: u64) -> Self {
        Self {
            sync: Some(StandardSyncOutput {
                standard_sync_summary: SyncSummary {
                    records_synced,
                    bytes_synced,
                },
            }),
        }
    }

    pub fn sync_summary(&self) -> Option<&SyncSummary> {
        self.sync.as_ref().map(|s| &s.standard_sync_summary)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub job_id: JobId,
    pub number: i32,
    pub status: AttemptStatus,
    pub log_path: PathBuf,
    pub output: Option<JobOutput>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Attempt {
    /// Checks the per-attempt invariants: `ended_at` is present exactly when
    /// the status is terminal, and output only exists on a terminal attempt.
    pub fn validate(&self) -> Result<()> {
        if self.ended_at.is_some() != self.status.is_terminal() {
            return Err(HistoryError::InconsistentRecord(format!(
                "attempt {} of job {} is {} but ended_at is {}",
                self.number,
                self.job_id,
                self.status.as_str(),
                if self.ended_at.is_some() { "set" } else { "unset" },
            )));
        }
        if self.output.is_some() && !self.status.is_terminal() {
            return Err(HistoryError::InconsistentRecord(format!(
                "attempt {} of job {} carries output while {}",
                self.number,
                self.job_id,
                self.status.as_str(),
            )));
        }
        Ok(())
    }
}

/// A job together with every attempt it owns, in attempt-number order.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub id: JobId,
    pub scope: JobScope,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    attempts: Vec<Attempt>,
}

impl Job {
    pub fn new(
        id: JobId,
        scope: JobScope,
        status: JobStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        attempts: Vec<Attempt>,
    ) -> Result<Self> {
        for (expected, attempt) in (ATTEMPT_NUMBER_BASE..).zip(attempts.iter()) {
            if attempt.job_id != id {
                return Err(HistoryError::InconsistentRecord(format!(
                    "attempt {} belongs to job {}, not job {id}",
                    attempt.number, attempt.job_id
                )));
            }
            if attempt.number != expected {
                return Err(HistoryError::InconsistentRecord(format!(
                    "job {id} expected attempt {expected}, found {}",
                    attempt.number
                )));
            }
            attempt.validate()?;
        }

        if status.is_terminal() {
            if let Some(last) = attempts.last() {
                if last.status == AttemptStatus::Running {
                    return Err(HistoryError::InconsistentRecord(format!(
                        "job {id} is {} while attempt {} is still running",
                        status.as_str(),
                        last.number
                    )));
                }
            }
        }

        Ok(Self {
            id,
            scope,
            status,
            created_at,
            updated_at,
            attempts,
        })
    }

    pub fn attempts(&self) -> &[Attempt] {
        &self.attempts
    }

    pub fn latest_attempt(&self) -> Option<&Attempt> {
        self.attempts.last()
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRow {
    pub id: JobId,
    pub scope: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttemptRow {
    pub job_id: JobId,
    pub attempt_number: i32,
    pub status: String,
    pub log_path: String,
    pub output: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = HistoryError;

    fn try_from(row: AttemptRow) -> Result<Self> {
        let output = row.output.map(serde_json::from_value).transpose()?;
        Ok(Attempt {
            job_id: row.job_id,
            number: row.attempt_number,
            status: AttemptStatus::parse(&row.status)?,
            log_path: PathBuf::from(row.log_path),
            output,
            created_at: row.created_at,
            updated_at: row.updated_at,
            ended_at: row.ended_at,
        })
    }
}

impl JobRow {
    pub fn into_job(self, attempts: Vec<AttemptRow>) -> Result<Job> {
        let attempts = attempts
            .into_iter()
            .map(Attempt::try_from)
            .collect::<Result<Vec<_>>>()?;

        Job::new(
            self.id,
            JobScope::decode(&self.scope)?,
            JobStatus::parse(&self.status)?,
            self.created_at,
            self.updated_at,
            attempts,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn attempt(number: i32, status: AttemptStatus) -> Attempt {
        Attempt {
            job_id: 7,
            number,
            status,
            log_path: PathBuf::from(format!("/logs/7/{number}.log")),
            output: None,
            created_at: ts(100),
            updated_at: ts(110),
            ended_at: status.is_terminal().then(|| ts(120)),
        }
    }

    fn scope() -> JobScope {
        JobScope::new(ConfigType::Sync, "conn-1").unwrap()
    }

    #[test]
    fn status_strings_parse_back() {
        for t in ConfigType::ALL {
            assert_eq!(ConfigType::parse(t.as_str()).unwrap(), t);
        }
        assert_eq!(JobStatus::parse("cancelled").unwrap(), JobStatus::Cancelled);
        assert_eq!(
            AttemptStatus::parse("succeeded").unwrap(),
            AttemptStatus::Succeeded
        );
    }

    #[test]
    fn unknown_status_is_unmapped() {
        let err = JobStatus::parse("exploded").unwrap_err();
        assert!(matches!(
            err,
            HistoryError::UnmappedStatus { kind: "job_status", ref value } if value == "exploded"
        ));
        assert!(matches!(
            AttemptStatus::parse("queued"),
            Err(HistoryError::UnmappedStatus { .. })
        ));
    }

    #[test]
    fn job_accepts_contiguous_attempts() {
        let job = Job::new(
            7,
            scope(),
            JobStatus::Running,
            ts(1),
            ts(2),
            vec![
                attempt(0, AttemptStatus::Failed),
                attempt(1, AttemptStatus::Running),
            ],
        )
        .unwrap();
        assert_eq!(job.attempts().len(), 2);
        assert_eq!(job.latest_attempt().unwrap().number, 1);
    }

    #[test]
    fn job_rejects_attempt_gap() {
        let err = Job::new(
            7,
            scope(),
            JobStatus::Failed,
            ts(1),
            ts(2),
            vec![
                attempt(0, AttemptStatus::Failed),
                attempt(2, AttemptStatus::Failed),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, HistoryError::InconsistentRecord(_)));
    }

    #[test]
    fn job_rejects_foreign_attempt() {
        let mut foreign = attempt(0, AttemptStatus::Failed);
        foreign.job_id = 8;
        let err = Job::new(7, scope(), JobStatus::Failed, ts(1), ts(2), vec![foreign]).unwrap_err();
        assert!(matches!(err, HistoryError::InconsistentRecord(_)));
    }

    #[test]
    fn succeeded_job_cannot_have_running_latest_attempt() {
        let err = Job::new(
            7,
            scope(),
            JobStatus::Succeeded,
            ts(1),
            ts(2),
            vec![attempt(0, AttemptStatus::Running)],
        )
        .unwrap_err();
        assert!(matches!(err, HistoryError::InconsistentRecord(_)));
    }

    #[test]
    fn ended_at_must_follow_status() {
        let mut running = attempt(0, AttemptStatus::Running);
        running.ended_at = Some(ts(130));
        assert!(running.validate().is_err());

        let mut failed = attempt(0, AttemptStatus::Failed);
        failed.ended_at = None;
        assert!(failed.validate().is_err());
    }

    #[test]
    fn running_attempt_cannot_carry_output() {
        let mut running = attempt(0, AttemptStatus::Running);
        running.output = Some(JobOutput::sync(1, 1));
        assert!(matches!(
            running.validate(),
            Err(HistoryError::InconsistentRecord(_))
        ));
    }

    #[test]
    fn attempt_row_decodes_output_json() {
        let row = AttemptRow {
            job_id: 7,
            attempt_number: 0,
            status: "succeeded".into(),
            log_path: "/logs/7/0.log".into(),
            output: Some(serde_json::json!({
                "sync": { "standardSyncSummary": { "recordsSynced": 12, "bytesSynced": 340 } }
            })),
            created_at: ts(100),
            updated_at: ts(110),
            ended_at: Some(ts(120)),
        };

        let attempt = Attempt::try_from(row).unwrap();
        let summary = attempt.output.as_ref().and_then(|o| o.sync_summary()).unwrap();
        assert_eq!(summary.records_synced, 12);
        assert_eq!(summary.bytes_synced, 340);
    }
}
