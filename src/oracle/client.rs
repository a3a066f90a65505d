//! HTTP client for the LLM planning backend
//!
//! Speaks the Anthropic messages format or any OpenAI-compatible chat
//! endpoint, picked from the URL. The engine never depends on a reply: every
//! failure here is turned into a fallback by the caller.

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::config::OracleSettings;
use crate::core::error::{GridError, Result};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
/// Plans and actions are short JSON objects
const MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFormat {
    Anthropic,
    OpenAi,
}

impl ApiFormat {
    fn for_url(url: &str) -> Self {
        if url.contains("anthropic.com") {
            ApiFormat::Anthropic
        } else {
            ApiFormat::OpenAi
        }
    }
}

pub struct LlmClient {
    http: Client,
    api_key: String,
    api_url: String,
    model: String,
    format: ApiFormat,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        let format = ApiFormat::for_url(&api_url);
        Ok(Self {
            http,
            api_key,
            api_url,
            model,
            format,
        })
    }

    /// Build from `LLM_API_KEY`, `LLM_API_URL` and `LLM_MODEL`
    ///
    /// A model named in the settings wins over `LLM_MODEL`.
    pub fn from_env(settings: &OracleSettings) -> Result<Self> {
        let api_key =
            std::env::var("LLM_API_KEY").map_err(|_| GridError::OracleError("LLM_API_KEY not set".into()))?;
        let api_url = std::env::var("LLM_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let model = settings
            .model
            .clone()
            .or_else(|| std::env::var("LLM_MODEL").ok())
            .unwrap_or_else(|| DEFAULT_MODEL.into());
        Self::new(api_key, api_url, model, Duration::from_secs(settings.timeout_secs))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn format(&self) -> ApiFormat {
        self.format
    }

    /// One system + user exchange, returning the reply text
    pub async fn complete(&self, system: &str, user: &str) -> Result<String> {
        debug!(model = %self.model, format = ?self.format, "Oracle request");
        match self.format {
            ApiFormat::Anthropic => {
                let body = AnthropicRequest {
                    model: &self.model,
                    max_tokens: MAX_TOKENS,
                    system,
                    messages: vec![Message { role: "user", content: user }],
                };
                let reply: AnthropicResponse = self
                    .post(&body, &[("x-api-key", self.api_key.clone()), ("anthropic-version", "2023-06-01".into())])
                    .await?;
                reply
                    .content
                    .into_iter()
                    .next()
                    .map(|block| block.text)
                    .ok_or_else(|| GridError::OracleError("empty response".into()))
            }
            ApiFormat::OpenAi => {
                let body = OpenAiRequest {
                    model: &self.model,
                    max_tokens: MAX_TOKENS,
                    messages: vec![
                        Message {
                            role: "system",
                            content: system,
                        },
                        Message { role: "user", content: user },
                    ],
                };
                let reply: OpenAiResponse = self
                    .post(&body, &[("Authorization", format!("Bearer {}", self.api_key))])
                    .await?;
                reply
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or_else(|| GridError::OracleError("empty response".into()))
            }
        }
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, body: &B, headers: &[(&str, String)]) -> Result<R> {
        let mut request = self
            .http
            .post(&self.api_url)
            .header("content-type", "application/json")
            .json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(GridError::OracleError(format!("API error {}: {}", status, detail)));
        }
        Ok(response.json().await?)
    }
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<TextBlock>,
}

#[derive(Deserialize)]
struct TextBlock {
    text: String,
}

#[derive(Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<Message<'a>>,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}
