// Generation providers: OpenAI-compatible chat completions (OpenAI, Groq,
// custom endpoints) and Anthropic messages.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmSection;
use crate::error::{GenerationError, ScribeError};

use super::{GenerationOptions, LlmProvider, TokenUsage};

const GROQ_BASE_URL: &str = "https://api.groq.com/openai";
const OPENAI_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

/// Build an HTTP client with a request timeout.
///
/// reqwest is compiled without a bundled crypto provider, so install
/// aws-lc-rs as the process default first if nobody else has.
fn http_client(timeout: Duration) -> Result<Client, GenerationError> {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Losing the race to another installer is fine.
        let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
    }
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| GenerationError::Config(e.to_string()))
}

// ── OpenAI-compatible Provider ──────────────────────────────────────

#[derive(Debug)]
pub struct OpenAiProvider {
    client: Client,
    name: String,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(timeout)?,
            name: "openai".to_string(),
            api_key,
            model,
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }

    /// Groq serves the OpenAI chat-completions API under `/openai`.
    pub fn groq(api_key: String, model: String, timeout: Duration) -> Result<Self, GenerationError> {
        Ok(Self::new(api_key, model, timeout)?
            .with_name("groq")
            .with_base_url(GROQ_BASE_URL.to_string()))
    }

    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<(String, TokenUsage), GenerationError> {
        let url = format!("{}/v1/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            max_tokens: options.max_output_tokens,
            temperature: options.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(provider = %self.name, model = %self.model, prompt_chars = prompt.len(), "Calling chat completions API");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError { status, body: text });
        }

        let result: ChatResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        let usage = result.usage.map_or_else(TokenUsage::default, |u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok((text, usage))
    }
}

// ── Anthropic Provider ──────────────────────────────────────────────

#[derive(Debug)]
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self, GenerationError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            model,
            base_url: ANTHROPIC_BASE_URL.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: AnthropicUsage,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[async_trait::async_trait]
#[allow(clippy::unnecessary_literal_bound)]
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<(String, TokenUsage), GenerationError> {
        let url = format!("{}/v1/messages", self.base_url);

        let body = AnthropicRequest {
            model: &self.model,
            max_tokens: options.max_output_tokens,
            // Anthropic accepts 0.0..=1.0.
            temperature: options.temperature.min(1.0),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        debug!(model = %self.model, prompt_chars = prompt.len(), "Calling Anthropic API");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError { status, body: text });
        }

        let result: AnthropicResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text = result
            .content
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("");

        Ok((
            text,
            TokenUsage {
                input_tokens: result.usage.input_tokens,
                output_tokens: result.usage.output_tokens,
            },
        ))
    }
}

// ── Provider Factory ────────────────────────────────────────────────

/// Create a provider by name with an already-resolved API key.
pub fn create_provider(
    provider: &str,
    model: &str,
    api_key: &str,
    base_url: Option<&str>,
    timeout: Duration,
) -> Result<Box<dyn LlmProvider>, GenerationError> {
    match provider {
        "anthropic" => {
            let mut p = AnthropicProvider::new(api_key.to_string(), model.to_string(), timeout)?;
            if let Some(url) = base_url {
                p = p.with_base_url(url.to_string());
            }
            Ok(Box::new(p))
        }
        "groq" | "openai" | "custom" => {
            let mut p = if provider == "groq" {
                OpenAiProvider::groq(api_key.to_string(), model.to_string(), timeout)?
            } else {
                OpenAiProvider::new(api_key.to_string(), model.to_string(), timeout)?
                    .with_name(provider)
            };
            if let Some(url) = base_url {
                p = p.with_base_url(url.to_string());
            } else if provider == "custom" {
                return Err(GenerationError::Config(
                    "provider \"custom\" requires llm.base_url".to_string(),
                ));
            }
            Ok(Box::new(p))
        }
        other => Err(GenerationError::Config(format!(
            "Unknown provider: {other}. Use: groq, openai, anthropic, custom"
        ))),
    }
}

/// Create the configured provider, resolving the credential from the
/// environment. Fails closed when the credential is missing.
pub fn from_config(llm: &LlmSection) -> crate::error::Result<Box<dyn LlmProvider>> {
    let api_key = llm.resolve_api_key()?;
    create_provider(
        &llm.provider,
        &llm.model,
        &api_key,
        llm.base_url.as_deref(),
        Duration::from_secs(llm.timeout_secs),
    )
    .map_err(ScribeError::from)
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn create_provider_factory() {
        let p = create_provider("groq", "llama-3.1-8b-instant", "key", None, TIMEOUT).unwrap();
        assert_eq!(p.name(), "groq");
        assert_eq!(p.model_id(), "llama-3.1-8b-instant");

        let p = create_provider("openai", "gpt-4o-mini", "key", None, TIMEOUT).unwrap();
        assert_eq!(p.name(), "openai");

        let p = create_provider("anthropic", "claude-sonnet-4-20250514", "key", None, TIMEOUT)
            .unwrap();
        assert_eq!(p.name(), "anthropic");

        let p = create_provider(
            "custom",
            "local-model",
            "key",
            Some("http://localhost:8080/"),
            TIMEOUT,
        );
        assert_eq!(p.unwrap().name(), "custom");

        assert!(create_provider("custom", "m", "key", None, TIMEOUT).is_err());
        assert!(create_provider("invalid", "model", "key", None, TIMEOUT).is_err());
    }

    #[test]
    fn groq_uses_openai_compatible_endpoint() {
        let p = OpenAiProvider::groq("key".into(), "m".into(), TIMEOUT).unwrap();
        assert_eq!(p.base_url, GROQ_BASE_URL);
        let p = p.with_base_url("http://proxy.local/".into());
        assert_eq!(p.base_url, "http://proxy.local");
    }

    #[test]
    fn from_config_without_credential_fails() {
        let llm = LlmSection {
            api_key_env: "SCRIBE_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmSection::default()
        };
        let err = from_config(&llm).unwrap_err();
        assert!(err.is_run_scoped(), "{err}");
    }

    #[test]
    fn chat_response_parses_without_usage() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"class ATest {}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.usage.is_none());
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("class ATest {}")
        );
    }
}
