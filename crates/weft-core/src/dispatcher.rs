//! Async dispatcher — decouples submission from workflow execution.
//!
//! `submit` synchronously creates a PENDING job, hands execution to a tokio
//! worker, and returns the record immediately. The worker owns the terminal
//! transition; no execution-layer error ever escapes to the caller.

use std::sync::Arc;

use crate::engine::WorkflowEngine;
use crate::jobs::{JobManager, JobRecord, JobStatus};

#[derive(Clone)]
pub struct Dispatcher {
    engine: Arc<WorkflowEngine>,
    jobs: Arc<JobManager>,
}

impl Dispatcher {
    pub fn new(engine: Arc<WorkflowEngine>, jobs: Arc<JobManager>) -> Self {
        Self { engine, jobs }
    }

    /// Create the job and schedule execution. Returns the PENDING record.
    pub fn submit(&self, workflow_id: &str, input: String) -> JobRecord {
        let job_id = self.jobs.create(workflow_id);
        let record = self.jobs.get(&job_id);

        let engine = Arc::clone(&self.engine);
        let jobs = Arc::clone(&self.jobs);
        let workflow_id = workflow_id.to_string();

        tokio::spawn(async move {
            tracing::info!("[Dispatcher] starting async processing for job {}", job_id);
            if let Err(e) = jobs.update(
                &job_id,
                JobStatus::Processing,
                Some("Workflow started.".to_string()),
            ) {
                tracing::error!("[Dispatcher] {}", e);
                return;
            }

            match engine.run(&workflow_id, &input).await {
                Ok(result) => {
                    tracing::info!("[Dispatcher] workflow completed for job {}", job_id);
                    let _ = jobs.update(&job_id, JobStatus::Completed, Some(result));
                }
                Err(e) => {
                    tracing::error!("[Dispatcher] workflow failed for job {}: {}", job_id, e);
                    let _ = jobs.update(
                        &job_id,
                        JobStatus::Failed,
                        Some(format!("Processing failed: {}", e)),
                    );
                }
            }
        });

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::time::Duration;

    use crate::events::workflow_event_channel;
    use crate::registry::AgentRegistry;

    async fn poll_until_terminal(jobs: &JobManager, job_id: &str) -> JobRecord {
        for _ in 0..100 {
            let record = jobs.get(job_id);
            if record.status.is_terminal() {
                return record;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {} never reached a terminal state", job_id);
    }

    #[tokio::test]
    async fn unknown_workflow_fails_the_job() {
        let (tx, _rx) = workflow_event_channel();
        let registry = Arc::new(AgentRegistry::new(Path::new("unused"), tx));
        let engine = Arc::new(WorkflowEngine::new(
            registry,
            Arc::new(crate::model::ModelFactory::new(Default::default())),
            Path::new("unused"),
        ));
        let jobs = Arc::new(JobManager::new());
        let dispatcher = Dispatcher::new(engine, Arc::clone(&jobs));

        let record = dispatcher.submit("no-such-workflow", "payload".to_string());
        assert_eq!(record.status, JobStatus::Pending);
        assert!(record.result.is_none());

        let terminal = poll_until_terminal(&jobs, &record.job_id).await;
        assert_eq!(terminal.status, JobStatus::Failed);
        let message = terminal.result.unwrap();
        assert!(message.starts_with("Processing failed: "));
        assert!(message.contains("Workflow not found"));
    }
}
