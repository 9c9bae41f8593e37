use std::path::PathBuf;

use crate::jobs::model::JobId;

pub type Result<T, E = HistoryError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("job {0} not found")]
    NotFound(JobId),

    #[error("log unavailable at {}: {source}", path.display())]
    LogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A persisted enumeration value the code base has no variant for.
    #[error("unmapped {kind} value {value:?}")]
    UnmappedStatus { kind: &'static str, value: String },

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("inconsistent record: {0}")]
    InconsistentRecord(String),

    /// A write targeted an attempt that is missing or already terminal.
    #[error("attempt {attempt_number} of job {job_id} is not running")]
    AttemptNotRunning { job_id: JobId, attempt_number: i32 },

    #[error("query deadline exceeded")]
    DeadlineExceeded,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid attempt output: {0}")]
    Output(#[from] serde_json::Error),
}

impl HistoryError {
    pub(crate) fn log_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LogUnavailable {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn unmapped(kind: &'static str, value: &str) -> Self {
        Self::UnmappedStatus {
            kind,
            value: value.to_string(),
        }
    }
}
