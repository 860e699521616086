//! Provider HTTP clients behind the `ChatModel` contract.
//!
//! Each client speaks its provider's wire format directly over reqwest:
//! OpenAI-compatible `chat/completions` (OpenAI, DeepSeek, Groq, Azure),
//! Anthropic `v1/messages`, Gemini `generateContent`, and Ollama `api/chat`.
//! Non-2xx responses surface as `ProviderError::Http` with the original
//! status so the engine can classify them.

use serde_json::{json, Value};

use super::ChatModel;
use crate::error::ProviderError;

const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_MAX_TOKENS: u32 = 8192;
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

enum Auth {
    /// `Authorization: Bearer <key>` — the OpenAI family.
    Bearer(String),
    /// `api-key: <key>` — Azure OpenAI deployments.
    AzureKey(String),
}

/// Client for OpenAI-compatible `chat/completions` endpoints.
pub struct OpenAiCompatChatModel {
    client: reqwest::Client,
    url: String,
    auth: Auth,
    model: String,
    temperature: Option<f64>,
}

impl OpenAiCompatChatModel {
    pub fn bearer(
        client: reqwest::Client,
        url: String,
        api_key: String,
        model: String,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            client,
            url,
            auth: Auth::Bearer(api_key),
            model,
            temperature,
        }
    }

    pub fn azure(
        client: reqwest::Client,
        url: String,
        api_key: String,
        model: String,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            client,
            url,
            auth: Auth::AzureKey(api_key),
            model,
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiCompatChatModel {
    async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        let mut request = self.client.post(&self.url).json(&body);
        request = match &self.auth {
            Auth::Bearer(key) => request.bearer_auth(key),
            Auth::AzureKey(key) => request.header("api-key", key),
        };

        let json = send(request).await?;
        extract_openai_content(&json)
    }
}

/// Client for the Anthropic Messages API.
pub struct AnthropicChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: Option<f64>,
}

impl AnthropicChatModel {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        model: String,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for AnthropicChatModel {
    async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", ANTHROPIC_BASE_URL);
        let mut body = json!({
            "model": self.model,
            "max_tokens": ANTHROPIC_MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = json!(temperature);
        }

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        let json = send(request).await?;
        extract_anthropic_content(&json)
    }
}

/// Client for the Gemini `generateContent` API.
pub struct GeminiChatModel {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: Option<f64>,
}

impl GeminiChatModel {
    pub fn new(
        client: reqwest::Client,
        api_key: String,
        model: String,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            client,
            api_key,
            model,
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for GeminiChatModel {
    async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            GEMINI_BASE_URL, self.model
        );
        let mut body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });
        if let Some(temperature) = self.temperature {
            body["generationConfig"] = json!({ "temperature": temperature });
        }

        let request = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let json = send(request).await?;
        extract_gemini_content(&json)
    }
}

/// Client for a local Ollama daemon. No credential required.
pub struct OllamaChatModel {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: Option<f64>,
}

impl OllamaChatModel {
    pub fn new(
        client: reqwest::Client,
        base_url: String,
        model: String,
        temperature: Option<f64>,
    ) -> Self {
        Self {
            client,
            base_url,
            model,
            temperature,
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OllamaChatModel {
    async fn chat(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.base_url.trim_end_matches('/'));
        let mut body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });
        if let Some(temperature) = self.temperature {
            body["options"] = json!({ "temperature": temperature });
        }

        let json = send(self.client.post(&url).json(&body)).await?;
        json.get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::Malformed("missing message.content".to_string()))
    }
}

/// Issue the request and return the parsed JSON body, mapping transport and
/// status failures onto `ProviderError`.
async fn send(request: reqwest::RequestBuilder) -> Result<Value, ProviderError> {
    let response = request.send().await.map_err(map_reqwest_error)?;

    let status = response.status();
    let text = response.text().await.map_err(map_reqwest_error)?;

    if !status.is_success() {
        return Err(ProviderError::Http {
            status: status.as_u16(),
            message: truncate(&text, 500),
        });
    }

    serde_json::from_str(&text).map_err(|e| ProviderError::Malformed(e.to_string()))
}

fn map_reqwest_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(e.to_string())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

fn extract_openai_content(json: &Value) -> Result<String, ProviderError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProviderError::Malformed("missing choices[0].message.content".to_string()))
}

fn extract_anthropic_content(json: &Value) -> Result<String, ProviderError> {
    json.get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ProviderError::Malformed("missing content text blocks".to_string()))
}

fn extract_gemini_content(json: &Value) -> Result<String, ProviderError> {
    json.get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(|parts| parts.as_array())
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ProviderError::Malformed("missing candidate parts".to_string()))
}
