//! Agent registry — the live map of hydrated agent definitions.
//!
//! At startup the registry walks the base directory and loads every agent
//! YAML. It then reacts to watcher events: agent YAMLs reload in place,
//! prompt (`.md`) changes reload the owning YAMLs one level above, and
//! workflow YAML events are republished to the engine. Cache entries are
//! replaced atomically per file; a failed reload keeps the previous
//! definition.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::config::AgentDefinition;
use crate::events::{WorkflowEventSender, WorkflowFileChanged};
use crate::loader::AgentLoader;
use crate::watcher::{FileEvent, FileEventKind, FileWatcher};

pub struct AgentRegistry {
    base_dir: PathBuf,
    loader: AgentLoader,
    agents: RwLock<HashMap<String, Arc<AgentDefinition>>>,
    /// Source YAML path per registered agent id, for event-driven eviction.
    sources: RwLock<HashMap<PathBuf, String>>,
    workflow_events: WorkflowEventSender,
}

impl AgentRegistry {
    pub fn new(base_dir: &Path, workflow_events: WorkflowEventSender) -> Self {
        Self {
            base_dir: base_dir.to_path_buf(),
            loader: AgentLoader::new(base_dir),
            agents: RwLock::new(HashMap::new()),
            sources: RwLock::new(HashMap::new()),
            workflow_events,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Initial load: walk the base directory and dispatch every YAML file.
    pub fn load_all(&self) {
        tracing::info!(
            "[AgentRegistry] initializing, root path: {}",
            self.base_dir.display()
        );
        if !self.base_dir.exists() {
            if let Err(e) = fs::create_dir_all(&self.base_dir) {
                tracing::error!(
                    "[AgentRegistry] failed to create base directory {}: {}",
                    self.base_dir.display(),
                    e
                );
                return;
            }
        }
        self.walk_yaml(&self.base_dir);
    }

    /// Subscribe to the watcher for `.yaml` and `.md` events under the base
    /// directory.
    pub fn watch(self: Arc<Self>, watcher: &FileWatcher) {
        let base_dir = self.base_dir.clone();
        watcher.start(&base_dir, &[".yaml", ".md"], move |event| {
            self.handle_event(&event);
        });
    }

    /// Snapshot of the current definition for `id`, if any.
    pub fn get(&self, id: &str) -> Option<Arc<AgentDefinition>> {
        self.agents.read().unwrap().get(id).cloned()
    }

    /// Snapshot of all current definitions.
    pub fn all(&self) -> Vec<Arc<AgentDefinition>> {
        self.agents.read().unwrap().values().cloned().collect()
    }

    /// Unified callback for watcher events.
    pub fn handle_event(&self, event: &FileEvent) {
        tracing::info!(
            "[AgentRegistry] file event: {:?} {}",
            event.kind,
            event.path.display()
        );

        match event.kind {
            FileEventKind::Deleted => self.handle_deletion(&event.path),
            FileEventKind::Created | FileEventKind::Modified => {
                if is_yaml(&event.path) {
                    self.dispatch_load(&event.path);
                } else if is_markdown(&event.path) {
                    self.reload_owner_configs(&event.path);
                }
            }
        }
    }

    fn handle_deletion(&self, path: &Path) {
        if is_yaml(path) {
            if in_subtree(path, "workflows") {
                self.publish_workflow_change(path);
            } else {
                self.remove_by_path(path);
            }
        } else if is_markdown(path) {
            // Reload the owning YAML so downstream prompts reflect the
            // absent include.
            self.reload_owner_configs(path);
        }
    }

    fn walk_yaml(&self, dir: &Path) {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!("[AgentRegistry] failed to read {}: {}", dir.display(), e);
                return;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.walk_yaml(&path);
            } else if is_yaml(&path) {
                self.dispatch_load(&path);
            }
        }
    }

    /// Route a YAML file to the right consumer by subtree.
    fn dispatch_load(&self, path: &Path) {
        if in_subtree(path, "agents") {
            self.load_and_register(path);
        } else if in_subtree(path, "workflows") {
            self.publish_workflow_change(path);
        }
    }

    fn load_and_register(&self, path: &Path) {
        match self.loader.load(path) {
            Ok(agent) => {
                let id = agent.id.clone();
                self.agents
                    .write()
                    .unwrap()
                    .insert(id.clone(), Arc::new(agent));
                self.sources
                    .write()
                    .unwrap()
                    .insert(path.to_path_buf(), id.clone());
                tracing::info!("[AgentRegistry] loaded agent [{}]", id);
            }
            Err(e) => {
                tracing::error!(
                    "[AgentRegistry] error loading agent file {}: {}",
                    path.display(),
                    e
                );
            }
        }
    }

    fn publish_workflow_change(&self, path: &Path) {
        tracing::info!(
            "[AgentRegistry] publishing workflow change: {}",
            path.display()
        );
        if self
            .workflow_events
            .send(WorkflowFileChanged {
                path: path.to_path_buf(),
            })
            .is_err()
        {
            tracing::debug!("[AgentRegistry] workflow event channel closed");
        }
    }

    /// A prompt changed: reload every YAML in the directory one level above
    /// the prompt file.
    fn reload_owner_configs(&self, prompt_path: &Path) {
        let Some(component_dir) = prompt_path.parent().and_then(Path::parent) else {
            return;
        };
        let Ok(entries) = fs::read_dir(component_dir) else {
            return;
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if is_yaml(&path) {
                tracing::info!(
                    "[AgentRegistry] prompt change in {}, reloading owner {}",
                    prompt_path.display(),
                    path.display()
                );
                self.dispatch_load(&path);
            }
        }
    }

    fn remove_by_path(&self, path: &Path) {
        let removed = self.sources.write().unwrap().remove(path);
        if let Some(id) = removed {
            self.agents.write().unwrap().remove(&id);
            tracing::info!("[AgentRegistry] removed agent [{}] (config deleted)", id);
        }
    }

    /// Test seam: register a pre-built definition directly.
    #[cfg(test)]
    pub(crate) fn register(&self, agent: AgentDefinition) {
        self.agents
            .write()
            .unwrap()
            .insert(agent.id.clone(), Arc::new(agent));
    }
}

fn is_yaml(path: &Path) -> bool {
    has_suffix(path, ".yaml")
}

fn is_markdown(path: &Path) -> bool {
    has_suffix(path, ".md")
}

fn has_suffix(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().to_lowercase().ends_with(suffix))
        .unwrap_or(false)
}

fn in_subtree(path: &Path, name: &str) -> bool {
    path.components().any(|c| c.as_os_str() == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::workflow_event_channel;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn agent_yaml(id: &str) -> String {
        format!(
            "id: \"{}\"\nname: \"{}\"\nsystemPromptPath: \"prompts/system.md\"\nmodel:\n  provider: \"openai\"\n  name: \"gpt-4o-mini\"\n",
            id, id
        )
    }

    #[test]
    fn loads_agents_and_publishes_workflow_changes_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        write(&dir.path().join("agents/echo/echo.yaml"), &agent_yaml("echo"));
        write(&dir.path().join("agents/echo/prompts/system.md"), "You echo.");
        write(
            &dir.path().join("workflows/pipe.yaml"),
            "id: pipe\ntype: CHAIN\nsteps: []\n",
        );

        let (tx, mut rx) = workflow_event_channel();
        let registry = AgentRegistry::new(dir.path(), tx);
        registry.load_all();

        let agent = registry.get("echo").expect("agent registered");
        assert_eq!(agent.system_prompt, "You echo.");
        assert_eq!(registry.all().len(), 1);

        let event = rx.try_recv().expect("workflow change published");
        assert!(event.path.ends_with("workflows/pipe.yaml"));
    }

    #[test]
    fn broken_reload_keeps_previous_definition() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("agents/echo/echo.yaml");
        write(&yaml, &agent_yaml("echo"));
        write(&dir.path().join("agents/echo/prompts/system.md"), "v1");

        let (tx, _rx) = workflow_event_channel();
        let registry = AgentRegistry::new(dir.path(), tx);
        registry.load_all();
        assert_eq!(registry.get("echo").unwrap().system_prompt, "v1");

        write(&yaml, "id: [broken yaml");
        registry.handle_event(&FileEvent {
            path: yaml.clone(),
            kind: FileEventKind::Modified,
        });
        assert_eq!(registry.get("echo").unwrap().system_prompt, "v1");
    }

    #[test]
    fn prompt_change_reloads_owner_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let prompt = dir.path().join("agents/echo/prompts/system.md");
        write(&dir.path().join("agents/echo/echo.yaml"), &agent_yaml("echo"));
        write(&prompt, "old prompt");

        let (tx, _rx) = workflow_event_channel();
        let registry = AgentRegistry::new(dir.path(), tx);
        registry.load_all();

        write(&prompt, "new prompt");
        registry.handle_event(&FileEvent {
            path: prompt,
            kind: FileEventKind::Modified,
        });
        assert_eq!(registry.get("echo").unwrap().system_prompt, "new prompt");
    }

    #[test]
    fn deleted_agent_yaml_evicts_entry() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("agents/echo/echo.yaml");
        write(&yaml, &agent_yaml("echo"));
        write(&dir.path().join("agents/echo/prompts/system.md"), "x");

        let (tx, _rx) = workflow_event_channel();
        let registry = AgentRegistry::new(dir.path(), tx);
        registry.load_all();
        assert!(registry.get("echo").is_some());

        fs::remove_file(&yaml).unwrap();
        registry.handle_event(&FileEvent {
            path: yaml,
            kind: FileEventKind::Deleted,
        });
        assert!(registry.get("echo").is_none());
    }
}
