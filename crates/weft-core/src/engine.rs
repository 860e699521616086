//! Workflow engine — interprets chain and router workflows.
//!
//! The engine owns the workflow cache with the same load-and-reload
//! discipline as the agent registry, except it is fed by `WorkflowFileChanged`
//! events instead of watching the filesystem itself.
//!
//! Chain workflows run their steps strictly in declared order, threading an
//! execution context keyed by step id. Router workflows loop: the manager
//! agent is asked for a JSON decision `{"next_agent": "<id>"}` and either a
//! worker runs or `FINISH` ends the loop. A malformed decision is treated as
//! FINISH and the current payload is returned unchanged.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use serde::Deserialize;

use crate::config::{
    InputSource, Step, WorkflowDefinition, WorkflowKind, USER_INPUT_KEY,
};
use crate::error::{classify_provider_error, EngineError};
use crate::events::WorkflowEventReceiver;
use crate::model::ModelProvider;
use crate::registry::AgentRegistry;

pub struct WorkflowEngine {
    agents: Arc<AgentRegistry>,
    models: Arc<dyn ModelProvider>,
    workflows_dir: PathBuf,
    workflows: RwLock<HashMap<String, WorkflowDefinition>>,
    /// Source YAML path per cached workflow id, for event-driven eviction.
    sources: RwLock<HashMap<PathBuf, String>>,
}

/// The manager agent's routing verdict.
#[derive(Debug, Deserialize)]
struct RouterDecision {
    next_agent: String,
}

impl WorkflowEngine {
    pub fn new(agents: Arc<AgentRegistry>, models: Arc<dyn ModelProvider>, base_dir: &Path) -> Self {
        Self {
            agents,
            models,
            workflows_dir: base_dir.join("workflows"),
            workflows: RwLock::new(HashMap::new()),
            sources: RwLock::new(HashMap::new()),
        }
    }

    /// Scan the workflows directory and cache every valid YAML definition.
    pub fn load_workflows(&self) {
        if !self.workflows_dir.exists() {
            return;
        }
        self.walk_yaml(&self.workflows_dir);
    }

    fn walk_yaml(&self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[WorkflowEngine] failed to read {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.walk_yaml(&path);
            } else if path
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase().ends_with(".yaml"))
                .unwrap_or(false)
            {
                self.parse_and_cache(&path);
            }
        }
    }

    fn parse_and_cache(&self, path: &Path) {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("[WorkflowEngine] failed to read {}: {}", path.display(), e);
                return;
            }
        };
        let workflow: WorkflowDefinition = match serde_yaml::from_str(&raw) {
            Ok(workflow) => workflow,
            Err(e) => {
                tracing::error!("[WorkflowEngine] invalid workflow YAML {}: {}", path.display(), e);
                return;
            }
        };
        if let Err(e) = workflow.validate() {
            tracing::error!("[WorkflowEngine] rejected workflow {}: {}", path.display(), e);
            return;
        }

        let id = workflow.id.clone();
        self.workflows.write().unwrap().insert(id.clone(), workflow);
        self.sources
            .write()
            .unwrap()
            .insert(path.to_path_buf(), id.clone());
        tracing::info!("[WorkflowEngine] loaded workflow [{}]", id);
    }

    /// React to a workflow-file event: reload if the file still exists,
    /// evict the cached definition otherwise.
    pub fn handle_file_change(&self, path: &Path) {
        if path.exists() {
            self.parse_and_cache(path);
        } else {
            let removed = self.sources.write().unwrap().remove(path);
            if let Some(id) = removed {
                self.workflows.write().unwrap().remove(&id);
                tracing::info!("[WorkflowEngine] removed workflow [{}] (config deleted)", id);
            }
        }
    }

    /// Drain `WorkflowFileChanged` events on a background task.
    pub fn spawn_event_loop(self: Arc<Self>, mut events: WorkflowEventReceiver) {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                self.handle_file_change(&event.path);
            }
        });
    }

    /// Snapshot of all cached workflow definitions.
    pub fn all_workflows(&self) -> Vec<WorkflowDefinition> {
        self.workflows.read().unwrap().values().cloned().collect()
    }

    /// Main entry point: run a workflow by id against an input payload.
    pub async fn run(&self, workflow_id: &str, initial_input: &str) -> Result<String, EngineError> {
        let workflow = self
            .workflows
            .read()
            .unwrap()
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| EngineError::WorkflowNotFound(workflow_id.to_string()))?;

        tracing::info!(
            "[WorkflowEngine] starting workflow [{}] type [{}]",
            workflow.id,
            workflow.kind
        );

        match workflow.kind {
            WorkflowKind::Chain => self.run_chain(&workflow, initial_input).await,
            WorkflowKind::Router => self.run_router(&workflow, initial_input).await,
        }
    }

    /// Linear chain: step A -> step B -> step C.
    async fn run_chain(
        &self,
        workflow: &WorkflowDefinition,
        initial_input: &str,
    ) -> Result<String, EngineError> {
        let mut context: HashMap<String, String> = HashMap::new();
        context.insert(USER_INPUT_KEY.to_string(), initial_input.to_string());
        let mut current = initial_input.to_string();

        for step in &workflow.steps {
            tracing::debug!("[WorkflowEngine] executing step {}", step.step_id);

            let step_input = resolve_input(step, &context, &current);
            let output = self.execute_agent(&step.agent_id, &step_input).await?;

            context.insert(step.step_id.clone(), output.clone());
            current = output;
        }

        Ok(current)
    }

    /// Dynamic router: the manager decides the next worker each iteration.
    async fn run_router(
        &self,
        workflow: &WorkflowDefinition,
        initial_input: &str,
    ) -> Result<String, EngineError> {
        let manager_id = workflow.manager_agent_id.as_deref().unwrap_or_default();
        let mut current = initial_input.to_string();

        for _ in 0..workflow.effective_max_steps() {
            let routing_prompt = build_routing_prompt(workflow, &current);
            let response = self.execute_agent(manager_id, &routing_prompt).await?;

            let decision = match serde_json::from_str::<RouterDecision>(&response) {
                Ok(decision) => decision,
                Err(e) => {
                    // Fail-safe: an unparseable decision ends the loop.
                    tracing::error!("[WorkflowEngine] failed to parse router decision: {}", e);
                    return Ok(current);
                }
            };

            if decision.next_agent.eq_ignore_ascii_case("FINISH") {
                return Ok(current);
            }

            tracing::info!("[WorkflowEngine] router decided to call: {}", decision.next_agent);
            current = self.execute_agent(&decision.next_agent, &current).await?;
        }

        Ok(current)
    }

    /// Look up the agent, build its prompt, invoke the model, and
    /// post-process the response.
    async fn execute_agent(&self, agent_id: &str, user_message: &str) -> Result<String, EngineError> {
        let agent = self
            .agents
            .get(agent_id)
            .ok_or_else(|| EngineError::AgentNotFound(agent_id.to_string()))?;

        let model = self
            .models
            .get(&agent.model)
            .map_err(|e| classify_provider_error(agent_id, e))?;

        let prompt = format!("{}\n\nUser Input:\n{}", agent.system_prompt, user_message);

        match model.chat(&prompt).await {
            Ok(response) => Ok(strip_code_fences(&response)),
            Err(e) => {
                let classified = classify_provider_error(agent_id, e);
                tracing::error!(
                    "[WorkflowEngine] agent [{}] failed with HTTP {}: {}",
                    agent_id,
                    classified.status_code,
                    classified.message
                );
                Err(classified.into())
            }
        }
    }
}

/// Resolve a chain step's input: template first, then the declared source.
/// Template keys absent from the context stay literal.
fn resolve_input(step: &Step, context: &HashMap<String, String>, last_output: &str) -> String {
    if let Some(template) = &step.input_template {
        let mut resolved = template.clone();
        for (key, value) in context {
            resolved = resolved.replace(&format!("{{{{{}}}}}", key), value);
        }
        return resolved;
    }

    match step.input_source {
        InputSource::UserInput => context.get(USER_INPUT_KEY).cloned().unwrap_or_default(),
        InputSource::Previous => last_output.to_string(),
    }
}

fn build_routing_prompt(workflow: &WorkflowDefinition, current: &str) -> String {
    format!(
        "Analyze this input: {}\nDecide next step from allowed list: [{}]\nReturn JSON: {{ \"next_agent\": \"NAME\" }} or {{ \"next_agent\": \"FINISH\" }}",
        current,
        workflow.allowed_agents.join(", ")
    )
}

/// Strip a leading/trailing triple-backtick fence (with or without the
/// `json` language hint) and trim whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    let mut text = raw.trim();
    if let Some(rest) = text.strip_prefix("```") {
        text = rest.strip_prefix("json").unwrap_or(rest);
    }
    text = text.trim_end();
    if let Some(rest) = text.strip_suffix("```") {
        text = rest;
    }
    text.trim().to_string()
}
