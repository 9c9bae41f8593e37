//! Read models handed to the outer API layer.
//!
//! Every internal enumeration is translated through an exhaustive `match`, so
//! adding an internal variant without an external counterpart fails to compile.

use serde::{Deserialize, Serialize};

use crate::jobs::model::{AttemptStatus, ConfigType, JobId, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatusView {
    Pending,
    Running,
    Incomplete,
    Failed,
    Succeeded,
    Cancelled,
}

impl From<JobStatus> for JobStatusView {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Pending => JobStatusView::Pending,
            JobStatus::Running => JobStatusView::Running,
            JobStatus::Incomplete => JobStatusView::Incomplete,
            JobStatus::Failed => JobStatusView::Failed,
            JobStatus::Succeeded => JobStatusView::Succeeded,
            JobStatus::Cancelled => JobStatusView::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatusView {
    Running,
    Failed,
    Succeeded,
}

impl From<AttemptStatus> for AttemptStatusView {
    fn from(status: AttemptStatus) -> Self {
        match status {
            AttemptStatus::Running => AttemptStatusView::Running,
            AttemptStatus::Failed => AttemptStatusView::Failed,
            AttemptStatus::Succeeded => AttemptStatusView::Succeeded,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigTypeView {
    CheckConnectionSource,
    CheckConnectionDestination,
    DiscoverSchema,
    GetSpec,
    Sync,
    ResetConnection,
}

impl From<ConfigType> for ConfigTypeView {
    fn from(config_type: ConfigType) -> Self {
        match config_type {
            ConfigType::CheckConnectionSource => ConfigTypeView::CheckConnectionSource,
            ConfigType::CheckConnectionDestination => ConfigTypeView::CheckConnectionDestination,
            ConfigType::DiscoverSchema => ConfigTypeView::DiscoverSchema,
            ConfigType::GetSpec => ConfigTypeView::GetSpec,
            ConfigType::Sync => ConfigTypeView::Sync,
            ConfigType::ResetConnection => ConfigTypeView::ResetConnection,
        }
    }
}

// API filters arrive in the external vocabulary.
impl From<ConfigTypeView> for ConfigType {
    fn from(view: ConfigTypeView) -> Self {
        match view {
            ConfigTypeView::CheckConnectionSource => ConfigType::CheckConnectionSource,
            ConfigTypeView::CheckConnectionDestination => ConfigType::CheckConnectionDestination,
            ConfigTypeView::DiscoverSchema => ConfigType::DiscoverSchema,
            ConfigTypeView::GetSpec => ConfigType::GetSpec,
            ConfigTypeView::Sync => ConfigType::Sync,
            ConfigTypeView::ResetConnection => ConfigType::ResetConnection,
        }
    }
}

/// One attempt, timestamps in epoch seconds.
///
/// `ended_at` and the sync counters are omitted rather than zeroed when the
/// attempt has not produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptView {
    pub id: i32,
    pub status: AttemptStatusView,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records_synced: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytes_synced: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogTail {
    pub log_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptDetailView {
    pub attempt: AttemptView,
    pub logs: LogTail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummaryView {
    pub id: JobId,
    pub config_type: ConfigTypeView,
    pub config_id: String,
    pub status: JobStatusView,
    pub created_at: i64,
    pub updated_at: i64,
    pub attempts: Vec<AttemptView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDetailView {
    pub job: JobSummaryView,
    pub attempts: Vec<AttemptDetailView>,
}
