//! Workflow submission and polling API - /api/workflows
//!
//! POST /api/workflows/submit/{workflowId} - Submit a payload, returns 202 + jobId
//! GET  /api/workflows/status/{jobId}      - Poll job status and result

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use weft_core::jobs::JobRecord;
use weft_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/submit/{workflow_id}", post(submit))
        .route("/status/{job_id}", get(status))
}

/// POST /api/workflows/submit/{workflowId} — Accept a submission.
///
/// The body is an opaque payload (typically JSON) passed to the workflow
/// verbatim. Returns immediately with the PENDING job record; execution
/// happens on a worker. A nonexistent workflow id is still accepted here and
/// fails the job asynchronously.
async fn submit(
    State(state): State<AppState>,
    Path(workflow_id): Path<String>,
    body: String,
) -> (StatusCode, Json<JobRecord>) {
    tracing::info!("[WorkflowApi] received submission for workflow {}", workflow_id);
    let record = state.dispatcher.submit(&workflow_id, body);
    (StatusCode::ACCEPTED, Json(record))
}

/// GET /api/workflows/status/{jobId} — Poll for job status.
///
/// Unknown ids return a synthetic FAILED record rather than a 404, so
/// clients poll one uniform shape.
async fn status(State(state): State<AppState>, Path(job_id): Path<String>) -> Json<JobRecord> {
    Json(state.jobs.get(&job_id))
}
