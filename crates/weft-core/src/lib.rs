//! Weft Core — transport-agnostic orchestration engine for multi-step LM
//! workflows.
//!
//! Agents (prompt + model bundles) and workflows (chain or router
//! compositions of agents) are declared in YAML under a base directory,
//! hot-reloaded on file change, and executed asynchronously against a
//! concurrency-safe job store. This crate has no HTTP framework dependency;
//! `weft-server` provides the axum adapter on top.
//!
//! # Architecture
//!
//! ```text
//! watcher ──> registry ──(WorkflowFileChanged)──> engine ──> model factory
//!                 │                                  │
//!                 └── agent definitions              └── provider clients
//!
//! dispatcher ──> jobs (PENDING -> PROCESSING -> COMPLETED | FAILED)
//! ```

pub mod config;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod events;
pub mod jobs;
pub mod loader;
pub mod model;
pub mod registry;
pub mod state;
pub mod watcher;

// Convenience re-exports
pub use error::{AgentExecutionError, EngineError, LoadError, ProviderError};
pub use state::{AppState, AppStateInner};
