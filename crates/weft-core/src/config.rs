//! YAML schema types for agent and workflow definitions.
//!
//! An agent YAML names its prompts and model:
//!
//! ```yaml
//! id: "math-grader"
//! name: "Math Grader"
//! description: "Grades math answers against a rubric"
//! systemPromptPath: "prompts/system.md"
//! userPromptPath: "prompts/user.md"
//! model:
//!   provider: "openai"
//!   name: "gpt-4o-mini"
//!   temperature: 0.2
//! allowedTools: [calculator]
//! metadata:
//!   subject: "algebra"
//! ```
//!
//! A workflow YAML composes agents, either as a fixed chain or as a
//! manager-directed router loop:
//!
//! ```yaml
//! id: "grade-essay"
//! name: "Essay Grading Pipeline"
//! type: CHAIN
//! steps:
//!   - stepId: "summary"
//!     agentId: "summarizer"
//!     inputSource: USER_INPUT
//!   - stepId: "grade"
//!     agentId: "grader"
//!     inputTemplate: "Score {{summary}} against the original: {{USER_INPUT}}"
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Context key under which the submission payload is seeded.
pub const USER_INPUT_KEY: &str = "USER_INPUT";

/// Router iteration cap applied when `maxSteps` is absent or non-positive.
pub const DEFAULT_MAX_STEPS: usize = 5;

/// Raw agent configuration as written on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentConfig {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub description: String,

    /// Prompt file path, relative to the YAML's parent directory.
    #[serde(default)]
    pub system_prompt_path: Option<String>,

    #[serde(default)]
    pub user_prompt_path: Option<String>,

    pub model: ModelConfig,

    #[serde(default)]
    pub allowed_tools: Vec<String>,

    /// Drives `{{key}}` placeholder substitution in the prompt files.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_yaml::Value>,
}

/// Which provider and model an agent talks to.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ModelConfig {
    /// "openai", "anthropic", "gemini", "ollama", "deepseek", "groq", "azure"
    pub provider: String,

    /// Model name; for Azure this is the deployment name.
    pub name: String,

    #[serde(default)]
    pub temperature: Option<f64>,
}

/// A fully hydrated agent: prompts loaded, includes expanded, placeholders
/// substituted. Immutable once constructed; the registry hands out
/// `Arc<AgentDefinition>` snapshots.
#[derive(Debug, Clone)]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: String,
    pub system_prompt: String,
    pub user_prompt: String,
    pub model: ModelConfig,
    pub allowed_tools: Vec<String>,
    pub metadata: BTreeMap<String, serde_yaml::Value>,
}

/// Workflow topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum WorkflowKind {
    #[serde(rename = "CHAIN", alias = "chain")]
    Chain,
    #[serde(rename = "ROUTER", alias = "router")]
    Router,
}

impl fmt::Display for WorkflowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowKind::Chain => write!(f, "CHAIN"),
            WorkflowKind::Router => write!(f, "ROUTER"),
        }
    }
}

/// Where a chain step takes its input from when no template is given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum InputSource {
    #[serde(rename = "USER_INPUT", alias = "user_input")]
    UserInput,
    #[default]
    #[serde(rename = "PREVIOUS", alias = "previous")]
    Previous,
}

/// One step of a chain workflow.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    /// Unique within the workflow; completed steps are recorded in the
    /// execution context under this key.
    pub step_id: String,

    pub agent_id: String,

    #[serde(default)]
    pub input_source: InputSource,

    /// Optional template with `{{key}}` placeholders referencing
    /// `USER_INPUT` or any earlier step id.
    #[serde(default)]
    pub input_template: Option<String>,
}

/// Top-level workflow definition loaded from a YAML file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(rename = "type")]
    pub kind: WorkflowKind,

    /// CHAIN only: ordered steps.
    #[serde(default)]
    pub steps: Vec<Step>,

    /// ROUTER only: the agent that picks the next worker or signals FINISH.
    #[serde(default)]
    pub manager_agent_id: Option<String>,

    /// ROUTER only: worker ids offered to the manager in the routing prompt.
    #[serde(default)]
    pub allowed_agents: Vec<String>,

    /// ROUTER only: iteration cap; non-positive falls back to the default.
    #[serde(default)]
    pub max_steps: i64,
}

impl WorkflowDefinition {
    pub fn effective_max_steps(&self) -> usize {
        if self.max_steps > 0 {
            self.max_steps as usize
        } else {
            DEFAULT_MAX_STEPS
        }
    }

    /// Structural checks applied at load time. Failing definitions are
    /// rejected wholesale and never enter the cache.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for step in &self.steps {
            if !seen.insert(step.step_id.as_str()) {
                return Err(format!("duplicate stepId '{}'", step.step_id));
            }
        }
        if self.kind == WorkflowKind::Router
            && self.manager_agent_id.as_deref().unwrap_or("").trim().is_empty()
        {
            return Err("router workflow is missing managerAgentId".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_agent_config() {
        let yaml = r#"
id: "math-grader"
name: "Math Grader"
systemPromptPath: "prompts/system.md"
model:
  provider: "openai"
  name: "gpt-4o-mini"
  temperature: 0.2
allowedTools:
  - calculator
metadata:
  subject: "algebra"
  passMark: 60
unknownField: "tolerated"
"#;
        let config: AgentConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.id, "math-grader");
        assert_eq!(config.model.provider, "openai");
        assert_eq!(config.model.temperature, Some(0.2));
        assert_eq!(config.allowed_tools, vec!["calculator"]);
        assert!(config.user_prompt_path.is_none());
        assert_eq!(config.metadata.len(), 2);
    }

    #[test]
    fn agent_config_requires_id_and_model() {
        assert!(serde_yaml::from_str::<AgentConfig>("name: no-id\nmodel:\n  provider: x\n  name: y\n").is_err());
        assert!(serde_yaml::from_str::<AgentConfig>("id: no-model\n").is_err());
        assert!(serde_yaml::from_str::<AgentConfig>("id: partial\nmodel:\n  provider: x\n").is_err());
    }

    #[test]
    fn parse_chain_workflow() {
        let yaml = r#"
id: "grade-essay"
name: "Essay Grading"
type: CHAIN
steps:
  - stepId: "step1"
    agentId: "summarizer"
    inputSource: USER_INPUT
  - stepId: "step2"
    agentId: "grader"
    inputTemplate: "score {{step1}} for {{USER_INPUT}}"
"#;
        let wf: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wf.kind, WorkflowKind::Chain);
        assert_eq!(wf.steps.len(), 2);
        assert_eq!(wf.steps[0].input_source, InputSource::UserInput);
        assert_eq!(wf.steps[1].input_source, InputSource::Previous);
        assert!(wf.validate().is_ok());
    }

    #[test]
    fn parse_router_workflow_with_default_max_steps() {
        let yaml = r#"
id: "triage"
type: ROUTER
managerAgentId: "manager"
allowedAgents: ["worker-a", "worker-b"]
"#;
        let wf: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(wf.kind, WorkflowKind::Router);
        assert_eq!(wf.effective_max_steps(), DEFAULT_MAX_STEPS);
        assert!(wf.validate().is_ok());
    }

    #[test]
    fn duplicate_step_ids_rejected() {
        let yaml = r#"
id: "bad"
type: CHAIN
steps:
  - stepId: "s"
    agentId: "a"
  - stepId: "s"
    agentId: "b"
"#;
        let wf: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(wf.validate().unwrap_err().contains("duplicate stepId"));
    }

    #[test]
    fn router_without_manager_rejected() {
        let yaml = "id: bad\ntype: ROUTER\nallowedAgents: [w]\n";
        let wf: WorkflowDefinition = serde_yaml::from_str(yaml).unwrap();
        assert!(wf.validate().is_err());
    }
}
