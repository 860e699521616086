//! Error types shared across the Weft core.
//!
//! Load-time failures (`LoadError`) are logged per file and never abort
//! startup. Execution-time failures surface as `EngineError`; provider
//! failures are first classified into an `AgentExecutionError` carrying the
//! HTTP status and a retryability hint for future retry layers.

use std::path::PathBuf;

/// Failure while loading an agent or workflow definition from disk.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    ConfigInvalid { path: PathBuf, message: String },

    #[error("include depth exceeded (max {max}) while expanding prompts under {}", path.display())]
    IncludeDepthExceeded { path: PathBuf, max: usize },

    #[error("prompt path escapes the configured base directory: {}", path.display())]
    PathEscapesBase { path: PathBuf },
}

/// Failure constructing or invoking a provider chat model.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request timed out")]
    Timeout,

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Missing API key for provider: {0}")]
    MissingCredential(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// An agent invocation failure, classified for upstream consumers.
///
/// `status_code` follows HTTP semantics (408 for timeouts, 500 for internal
/// failures); `retryable` marks transient conditions. The engine performs no
/// retries itself.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AgentExecutionError {
    pub message: String,
    pub status_code: u16,
    pub retryable: bool,
    #[source]
    pub source: Option<ProviderError>,
}

impl AgentExecutionError {
    pub fn new(message: impl Into<String>, status_code: u16, retryable: bool, source: ProviderError) -> Self {
        Self {
            message: message.into(),
            status_code,
            retryable,
            source: Some(source),
        }
    }
}

/// Map a provider failure onto the execution-error taxonomy.
pub fn classify_provider_error(agent_id: &str, err: ProviderError) -> AgentExecutionError {
    match err {
        ProviderError::Http { status: 404, .. } => AgentExecutionError::new(
            "Model not found. Check the agent's model configuration (provider/model name).",
            404,
            false,
            err,
        ),
        ProviderError::Http { status: 429, .. } => AgentExecutionError::new(
            "Rate limit exceeded (quota full). Please try again later.",
            429,
            true,
            err,
        ),
        ProviderError::Http { status: 401, .. } => {
            AgentExecutionError::new("Invalid API key. Contact administrator.", 401, false, err)
        }
        ProviderError::Http { status, .. } if status == 500 || status == 503 => {
            AgentExecutionError::new("AI provider is currently down.", status, true, err)
        }
        ProviderError::Http { status, .. } => {
            let message = format!("AI provider error: {}", err);
            AgentExecutionError::new(message, status, false, err)
        }
        ProviderError::Timeout => AgentExecutionError::new(
            format!("Agent [{}] did not respond in time.", agent_id),
            408,
            true,
            err,
        ),
        ProviderError::UnsupportedProvider(_) | ProviderError::MissingCredential(_) => {
            let message = err.to_string();
            AgentExecutionError::new(message, 500, false, err)
        }
        ProviderError::Transport(_) | ProviderError::Malformed(_) => {
            let message = format!("Internal agent error: {}", err);
            AgentExecutionError::new(message, 500, false, err)
        }
    }
}

/// Failure of a single workflow run. `Display` is the human-readable text
/// recorded on the FAILED job.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("Agent ID not found: {0}")]
    AgentNotFound(String),

    #[error(transparent)]
    Execution(#[from] AgentExecutionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_is_retryable() {
        let err = classify_provider_error(
            "grader",
            ProviderError::Http {
                status: 429,
                message: "too many requests".into(),
            },
        );
        assert_eq!(err.status_code, 429);
        assert!(err.retryable);
        assert!(err.message.contains("Rate limit"));
    }

    #[test]
    fn provider_down_keeps_status() {
        for status in [500, 503] {
            let err = classify_provider_error(
                "grader",
                ProviderError::Http {
                    status,
                    message: String::new(),
                },
            );
            assert_eq!(err.status_code, status);
            assert!(err.retryable);
        }
    }

    #[test]
    fn timeout_maps_to_408() {
        let err = classify_provider_error("grader", ProviderError::Timeout);
        assert_eq!(err.status_code, 408);
        assert!(err.retryable);
    }

    #[test]
    fn auth_and_lookup_failures_are_permanent() {
        for (status, needle) in [(401, "API key"), (404, "Model not found")] {
            let err = classify_provider_error(
                "grader",
                ProviderError::Http {
                    status,
                    message: String::new(),
                },
            );
            assert_eq!(err.status_code, status);
            assert!(!err.retryable);
            assert!(err.message.contains(needle));
        }
    }

    #[test]
    fn missing_credential_is_internal() {
        let err = classify_provider_error(
            "grader",
            ProviderError::MissingCredential("openai".into()),
        );
        assert_eq!(err.status_code, 500);
        assert!(!err.retryable);
        assert!(err.message.contains("openai"));
    }
}
