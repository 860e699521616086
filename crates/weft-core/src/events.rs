//! Workflow-file change notifications.
//!
//! The agent registry owns the file watcher; workflow YAML events are
//! republished over a plain channel that the workflow engine drains. This
//! keeps the registry and the engine decoupled with one-way data flow.

use std::path::PathBuf;

use tokio::sync::mpsc;

/// A workflow YAML was created, modified, or deleted. The receiver decides
/// between reload and eviction by checking whether the path still exists.
#[derive(Debug, Clone)]
pub struct WorkflowFileChanged {
    pub path: PathBuf,
}

pub type WorkflowEventSender = mpsc::UnboundedSender<WorkflowFileChanged>;
pub type WorkflowEventReceiver = mpsc::UnboundedReceiver<WorkflowFileChanged>;

pub fn workflow_event_channel() -> (WorkflowEventSender, WorkflowEventReceiver) {
    mpsc::unbounded_channel()
}
