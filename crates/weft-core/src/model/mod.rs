//! Chat model abstraction and the provider-keyed model factory.
//!
//! The engine consumes a single contract: `ChatModel::chat(prompt) -> text`.
//! `ModelFactory` builds concrete clients per `(provider, model, temperature)`
//! and caches them for the process lifetime. Credentials come from the
//! environment and are only checked on first use of the affected provider.

mod clients;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::config::ModelConfig;
use crate::error::ProviderError;

pub use clients::{AnthropicChatModel, GeminiChatModel, OllamaChatModel, OpenAiCompatChatModel};

/// Request timeout applied to every constructed client.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
const AZURE_API_VERSION: &str = "2024-06-01";

/// A provider-backed chat model. One prompt in, one text completion out.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// Source of `ChatModel` instances. The factory is the production
/// implementation; tests substitute deterministic mocks at this seam.
pub trait ModelProvider: Send + Sync {
    fn get(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ProviderError>;
}

/// Provider credentials and endpoints, resolved once from the environment.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub deepseek_api_key: Option<String>,
    pub groq_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_api_key: Option<String>,
    pub ollama_base_url: Option<String>,
}

impl ProviderSettings {
    pub fn from_env() -> Self {
        Self {
            openai_api_key: env_var("OPENAI_API_KEY"),
            gemini_api_key: env_var("GEMINI_API_KEY").or_else(|| env_var("GOOGLE_API_KEY")),
            anthropic_api_key: env_var("ANTHROPIC_API_KEY"),
            deepseek_api_key: env_var("DEEPSEEK_API_KEY"),
            groq_api_key: env_var("GROQ_API_KEY"),
            azure_endpoint: env_var("AZURE_OPENAI_ENDPOINT"),
            azure_api_key: env_var("AZURE_OPENAI_API_KEY"),
            ollama_base_url: env_var("OLLAMA_BASE_URL"),
        }
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Process-wide cache of constructed chat models, keyed by
/// `provider:name:temperature`. Instances are never invalidated.
pub struct ModelFactory {
    settings: ProviderSettings,
    cache: Mutex<HashMap<String, Arc<dyn ChatModel>>>,
}

impl ModelFactory {
    pub fn new(settings: ProviderSettings) -> Self {
        Self {
            settings,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ProviderSettings::from_env())
    }

    fn build(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ProviderError> {
        let provider = config.provider.to_lowercase();
        let client = http_client()?;

        match provider.as_str() {
            "openai" => Ok(Arc::new(OpenAiCompatChatModel::bearer(
                client,
                format!("{}/chat/completions", OPENAI_BASE_URL),
                self.require_key(&self.settings.openai_api_key, &provider)?,
                config.name.clone(),
                config.temperature,
            ))),
            "deepseek" => Ok(Arc::new(OpenAiCompatChatModel::bearer(
                client,
                format!("{}/chat/completions", DEEPSEEK_BASE_URL),
                self.require_key(&self.settings.deepseek_api_key, &provider)?,
                config.name.clone(),
                config.temperature,
            ))),
            "groq" => Ok(Arc::new(OpenAiCompatChatModel::bearer(
                client,
                format!("{}/chat/completions", GROQ_BASE_URL),
                self.require_key(&self.settings.groq_api_key, &provider)?,
                config.name.clone(),
                config.temperature,
            ))),
            "azure" | "azure-openai" => {
                let endpoint = self.require_key(&self.settings.azure_endpoint, &provider)?;
                let key = self.require_key(&self.settings.azure_api_key, &provider)?;
                // On Azure the model name denotes the deployment name.
                let url = format!(
                    "{}/openai/deployments/{}/chat/completions?api-version={}",
                    endpoint.trim_end_matches('/'),
                    config.name,
                    AZURE_API_VERSION
                );
                Ok(Arc::new(OpenAiCompatChatModel::azure(
                    client,
                    url,
                    key,
                    config.name.clone(),
                    config.temperature,
                )))
            }
            "anthropic" | "claude" => Ok(Arc::new(AnthropicChatModel::new(
                client,
                self.require_key(&self.settings.anthropic_api_key, &provider)?,
                config.name.clone(),
                config.temperature,
            ))),
            "gemini" | "google" => Ok(Arc::new(GeminiChatModel::new(
                client,
                self.require_key(&self.settings.gemini_api_key, &provider)?,
                config.name.clone(),
                config.temperature,
            ))),
            "ollama" => Ok(Arc::new(OllamaChatModel::new(
                client,
                self.settings
                    .ollama_base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
                config.name.clone(),
                config.temperature,
            ))),
            other => Err(ProviderError::UnsupportedProvider(other.to_string())),
        }
    }

    fn require_key(&self, value: &Option<String>, provider: &str) -> Result<String, ProviderError> {
        value
            .clone()
            .ok_or_else(|| ProviderError::MissingCredential(provider.to_string()))
    }
}

impl ModelProvider for ModelFactory {
    fn get(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ProviderError> {
        let key = format!(
            "{}:{}:{:?}",
            config.provider.to_lowercase(),
            config.name,
            config.temperature
        );

        let mut cache = self.cache.lock().unwrap();
        if let Some(model) = cache.get(&key) {
            return Ok(Arc::clone(model));
        }

        let model = self.build(config)?;
        tracing::info!("[ModelFactory] built chat model for {}", key);
        cache.insert(key, Arc::clone(&model));
        Ok(model)
    }
}

fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProviderError::Transport(e.to_string()))
}
