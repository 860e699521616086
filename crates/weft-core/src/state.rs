//! Shared application state: explicit construction, leaves first.
//!
//! `AppStateInner::new` wires the whole engine: the loader and watcher feed
//! the agent registry, the registry republishes workflow changes over a
//! channel the engine drains, and the dispatcher couples the engine to the
//! job store. All mutable state is owned by a specific component; there are
//! no globals beyond the process-wide model cache.

use std::path::Path;
use std::sync::Arc;

use crate::dispatcher::Dispatcher;
use crate::engine::WorkflowEngine;
use crate::events::workflow_event_channel;
use crate::jobs::JobManager;
use crate::model::{ModelFactory, ModelProvider};
use crate::registry::AgentRegistry;
use crate::watcher::FileWatcher;

pub struct AppStateInner {
    pub registry: Arc<AgentRegistry>,
    pub engine: Arc<WorkflowEngine>,
    pub jobs: Arc<JobManager>,
    pub dispatcher: Dispatcher,
    /// Held so the poll thread lives as long as the state; stopped on drop.
    _watcher: FileWatcher,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    /// Production wiring: provider credentials from the environment.
    ///
    /// Must be called from within a tokio runtime; the engine's event loop
    /// and the dispatcher's workers are spawned onto it.
    pub fn new(base_path: &Path) -> Self {
        Self::with_models(base_path, Arc::new(ModelFactory::from_env()))
    }

    /// Wiring with an injected model provider; the seam tests use to
    /// substitute deterministic chat models.
    pub fn with_models(base_path: &Path, models: Arc<dyn ModelProvider>) -> Self {
        let (workflow_tx, workflow_rx) = workflow_event_channel();

        let registry = Arc::new(AgentRegistry::new(base_path, workflow_tx));
        registry.load_all();

        let watcher = FileWatcher::new();
        Arc::clone(&registry).watch(&watcher);

        let engine = Arc::new(WorkflowEngine::new(
            Arc::clone(&registry),
            models,
            base_path,
        ));
        engine.load_workflows();
        Arc::clone(&engine).spawn_event_loop(workflow_rx);

        let jobs = Arc::new(JobManager::new());
        let dispatcher = Dispatcher::new(Arc::clone(&engine), Arc::clone(&jobs));

        Self {
            registry,
            engine,
            jobs,
            dispatcher,
            _watcher: watcher,
        }
    }
}
