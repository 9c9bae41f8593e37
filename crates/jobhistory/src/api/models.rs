// crates/jobhistory/src/api/models.rs
use serde::{Deserialize, Serialize};

use crate::jobs::views::{ConfigTypeView, JobSummaryView};

#[derive(Debug, Clone, Deserialize)]
pub struct ListJobsQuery {
    pub config_type: ConfigTypeView,
    pub config_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListJobsResponse {
    pub jobs: Vec<JobSummaryView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
