use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::Result;
use crate::jobs::model::{Job, JobId};
use crate::jobs::repo::JobPersistence;
use crate::jobs::scope::JobScope;

/// In-process job storage for tests and demos.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<BTreeMap<JobId, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_jobs(jobs: impl IntoIterator<Item = Job>) -> Self {
        let store = Self::new();
        for job in jobs {
            store.insert(job);
        }
        store
    }

    /// Inserts or replaces the job with the same id.
    pub fn insert(&self, job: Job) {
        let mut guard = self.jobs.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(job.id, job);
    }
}

#[async_trait]
impl JobPersistence for MemoryJobStore {
    async fn list_jobs(&self, scope: &JobScope) -> Result<Vec<Job>> {
        let guard = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        let mut jobs: Vec<Job> = guard
            .values()
            .filter(|j| &j.scope == scope)
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(jobs)
    }

    async fn get_job(&self, job_id: JobId) -> Result<Option<Job>> {
        let guard = self.jobs.read().unwrap_or_else(|e| e.into_inner());
        Ok(guard.get(&job_id).cloned())
    }
}
