//! In-memory job store with a monotonic status lifecycle.
//!
//! Jobs move PENDING -> PROCESSING -> {COMPLETED | FAILED}. Terminal records
//! never change. Lookups of unknown ids return a synthetic FAILED record so
//! the polling endpoint can respond uniformly.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Status snapshot for one job. `result` carries the workflow output on
/// COMPLETED and the failure message on FAILED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub job_id: String,
    #[serde(skip)]
    pub workflow_id: String,
    pub status: JobStatus,
    pub result: Option<String>,
}

#[derive(Debug, thiserror::Error)]
#[error("Job ID not found: {0}")]
pub struct UnknownJob(pub String);

/// Concurrency-safe job record store.
pub struct JobManager {
    jobs: RwLock<HashMap<String, JobRecord>>,
}

impl JobManager {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Create a PENDING record and return its id.
    pub fn create(&self, workflow_id: &str) -> String {
        let job_id = uuid::Uuid::new_v4().to_string();
        self.jobs.write().unwrap().insert(
            job_id.clone(),
            JobRecord {
                job_id: job_id.clone(),
                workflow_id: workflow_id.to_string(),
                status: JobStatus::Pending,
                result: None,
            },
        );
        job_id
    }

    /// Overwrite status and result. Fails on unknown ids; updates against a
    /// terminal record are ignored.
    pub fn update(
        &self,
        job_id: &str,
        status: JobStatus,
        result: Option<String>,
    ) -> Result<(), UnknownJob> {
        let mut jobs = self.jobs.write().unwrap();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| UnknownJob(job_id.to_string()))?;

        if record.status.is_terminal() {
            tracing::debug!(
                "[JobManager] ignoring update to terminal job {} ({:?})",
                job_id,
                record.status
            );
            return Ok(());
        }

        record.status = status;
        record.result = result;
        Ok(())
    }

    /// Current snapshot, or a synthetic FAILED record for unknown ids.
    pub fn get(&self, job_id: &str) -> JobRecord {
        self.jobs.read().unwrap().get(job_id).cloned().unwrap_or_else(|| JobRecord {
            job_id: job_id.to_string(),
            workflow_id: String::new(),
            status: JobStatus::Failed,
            result: Some("Job ID not found or expired.".to_string()),
        })
    }
}

impl Default for JobManager {
    fn default() -> Self {
        Self::new()
    }
}
