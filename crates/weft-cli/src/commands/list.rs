//! `weft agents` / `weft workflows` — inspect the local catalog.

use std::path::Path;
use std::sync::Arc;

use weft_core::engine::WorkflowEngine;
use weft_core::events::workflow_event_channel;
use weft_core::model::ModelFactory;
use weft_core::registry::AgentRegistry;

pub fn agents(base_path: &str) -> Result<(), String> {
    let registry = load_registry(base_path);

    let mut agents = registry.all();
    agents.sort_by(|a, b| a.id.cmp(&b.id));

    println!("┌──────────────────┬────────────────────┬──────────────────────────────┐");
    println!("│ ID               │ Name               │ Description                  │");
    println!("├──────────────────┼────────────────────┼──────────────────────────────┤");
    for agent in &agents {
        println!(
            "│ {:<16} │ {:<18} │ {:<28} │",
            truncate(&agent.id, 16),
            truncate(&agent.name, 18),
            truncate(&agent.description, 28)
        );
    }
    println!("└──────────────────┴────────────────────┴──────────────────────────────┘");
    println!("{} agent(s)", agents.len());
    Ok(())
}

pub fn workflows(base_path: &str) -> Result<(), String> {
    let registry = load_registry(base_path);
    let engine = WorkflowEngine::new(
        registry,
        Arc::new(ModelFactory::from_env()),
        Path::new(base_path),
    );
    engine.load_workflows();

    let mut workflows = engine.all_workflows();
    workflows.sort_by(|a, b| a.id.cmp(&b.id));

    println!("┌──────────────────┬────────────────────┬──────────┐");
    println!("│ ID               │ Name               │ Type     │");
    println!("├──────────────────┼────────────────────┼──────────┤");
    for workflow in &workflows {
        println!(
            "│ {:<16} │ {:<18} │ {:<8} │",
            truncate(&workflow.id, 16),
            truncate(&workflow.name, 18),
            workflow.kind
        );
    }
    println!("└──────────────────┴────────────────────┴──────────┘");
    println!("{} workflow(s)", workflows.len());
    Ok(())
}

fn load_registry(base_path: &str) -> Arc<AgentRegistry> {
    let (tx, _rx) = workflow_event_channel();
    let registry = Arc::new(AgentRegistry::new(Path::new(base_path), tx));
    registry.load_all();
    registry
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}
