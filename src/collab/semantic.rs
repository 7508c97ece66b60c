//! LLM-backed semantic commentary
//!
//! Sync HTTP via ureq; no async runtime needed. The client produces a
//! short natural-language description of what the analyzed module does,
//! attached to the report only when the caller asked for it.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CollabError, CollabResult};
use crate::config::SemanticConfig;

const SYSTEM_PROMPT: &str = "You are a code reviewer. Describe in two or three \
sentences what the given Python module does and call out anything that looks \
risky. Respond with plain prose, no markdown.";

const MAX_TOKENS: u32 = 512;

/// Supported commentary backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    Anthropic,
    OpenAi,
    Ollama,
}

impl LlmBackend {
    pub fn parse(name: &str) -> CollabResult<Self> {
        match name.to_ascii_lowercase().as_str() {
            "anthropic" => Ok(LlmBackend::Anthropic),
            "openai" => Ok(LlmBackend::OpenAi),
            "ollama" => Ok(LlmBackend::Ollama),
            other => Err(CollabError::UnknownBackend(other.to_string())),
        }
    }

    pub fn env_key(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::Ollama => "OLLAMA_MODEL",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "claude-sonnet-4-20250514",
            LlmBackend::OpenAi => "gpt-4o",
            LlmBackend::Ollama => "deepseek-coder:6.7b",
        }
    }

    pub fn api_url(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "https://api.anthropic.com/v1/messages",
            LlmBackend::OpenAi => "https://api.openai.com/v1/chat/completions",
            LlmBackend::Ollama => "http://localhost:11434/v1/chat/completions",
        }
    }

    pub fn is_openai_compatible(&self) -> bool {
        matches!(self, LlmBackend::OpenAi | LlmBackend::Ollama)
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmBackend::Ollama)
    }
}

/// Sync LLM client for one configured backend
pub struct SemanticClient {
    backend: LlmBackend,
    model: String,
    api_key: String,
    agent: ureq::Agent,
}

impl SemanticClient {
    pub fn from_config(config: &SemanticConfig) -> CollabResult<Self> {
        let backend = LlmBackend::parse(&config.backend)?;
        let api_key = if backend.requires_api_key() {
            let env_key = backend.env_key();
            env::var(env_key).map_err(|_| CollabError::MissingApiKey {
                env_var: env_key.to_string(),
            })?
        } else {
            "ollama".to_string()
        };
        let model = config
            .model
            .clone()
            .unwrap_or_else(|| backend.default_model().to_string());
        Ok(Self {
            backend,
            model,
            api_key,
            agent: make_agent(config.timeout_secs),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// One-shot commentary on the given module source
    pub fn describe(&self, source: &str) -> CollabResult<String> {
        debug!(backend = ?self.backend, model = %self.model, "requesting semantic commentary");
        let prompt = format!("```python\n{source}\n```");
        if self.backend.is_openai_compatible() {
            self.describe_openai(&prompt)
        } else {
            self.describe_anthropic(&prompt)
        }
    }

    fn describe_openai(&self, prompt: &str) -> CollabResult<String> {
        let body = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user",
                    content: prompt.to_string(),
                },
            ],
            max_tokens: MAX_TOKENS,
        };

        let mut req = self
            .agent
            .post(self.backend.api_url())
            .header("Content-Type", "application/json");
        if self.backend.requires_api_key() {
            req = req.header("Authorization", &format!("Bearer {}", self.api_key));
        }

        let response = req.send_json(&body).map_err(|e| CollabError::Api {
            status: 0,
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(CollabError::Api { status, message });
        }

        let resp: OpenAiResponse = response
            .into_body()
            .read_json()
            .map_err(|e| CollabError::Parse(e.to_string()))?;
        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CollabError::Parse("no response choices".to_string()))
    }

    fn describe_anthropic(&self, prompt: &str) -> CollabResult<String> {
        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            system: SYSTEM_PROMPT.to_string(),
            messages: vec![Message {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        let response = self
            .agent
            .post(self.backend.api_url())
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .send_json(&body)
            .map_err(|e| CollabError::Api {
                status: 0,
                message: e.to_string(),
            })?;
        let status = response.status().as_u16();
        if status >= 400 {
            let message = response.into_body().read_to_string().unwrap_or_default();
            return Err(CollabError::Api { status, message });
        }

        let resp: AnthropicResponse = response
            .into_body()
            .read_json()
            .map_err(|e| CollabError::Parse(e.to_string()))?;
        resp.content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text)
            .ok_or_else(|| CollabError::Parse("no text content in response".to_string()))
    }
}

fn make_agent(timeout_secs: u64) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false)
        .timeout_global(Some(Duration::from_secs(timeout_secs)))
        .build()
        .new_agent()
}

#[derive(Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_names() {
        assert_eq!(LlmBackend::parse("anthropic").unwrap(), LlmBackend::Anthropic);
        assert_eq!(LlmBackend::parse("OpenAI").unwrap(), LlmBackend::OpenAi);
        assert_eq!(LlmBackend::parse("ollama").unwrap(), LlmBackend::Ollama);
        assert!(matches!(
            LlmBackend::parse("mystery"),
            Err(CollabError::UnknownBackend(_))
        ));
    }

    #[test]
    fn ollama_needs_no_key() {
        assert!(!LlmBackend::Ollama.requires_api_key());
        assert!(LlmBackend::Anthropic.requires_api_key());
    }

    #[test]
    fn default_models_per_backend() {
        assert_eq!(LlmBackend::OpenAi.default_model(), "gpt-4o");
        assert_eq!(
            LlmBackend::Anthropic.default_model(),
            "claude-sonnet-4-20250514"
        );
    }
}
