//! Discovery API - /api/discovery
//!
//! Read-only catalog of configured agents and workflows. These are pure
//! projections: prompts, model configuration, credentials, and metadata are
//! never serialized.
//!
//! GET /api/discovery/agents    - List agents (id, name, description, tools)
//! GET /api/discovery/workflows - List workflows (id, name, type)

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;

use weft_core::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/agents", get(list_agents))
        .route("/workflows", get(list_workflows))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentSummary {
    id: String,
    name: String,
    description: String,
    allowed_tools: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowSummary {
    id: String,
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

/// GET /api/discovery/agents
async fn list_agents(State(state): State<AppState>) -> Json<Vec<AgentSummary>> {
    let agents = state
        .registry
        .all()
        .into_iter()
        .map(|agent| AgentSummary {
            id: agent.id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            allowed_tools: agent.allowed_tools.clone(),
        })
        .collect();
    Json(agents)
}

/// GET /api/discovery/workflows
async fn list_workflows(State(state): State<AppState>) -> Json<Vec<WorkflowSummary>> {
    let workflows = state
        .engine
        .all_workflows()
        .into_iter()
        .map(|workflow| WorkflowSummary {
            id: workflow.id,
            name: workflow.name,
            kind: workflow.kind.to_string(),
        })
        .collect();
    Json(workflows)
}
