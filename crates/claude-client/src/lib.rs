pub mod error;
pub mod prompt;

pub use error::{ClaudeError, ClaudeResult};

use async_trait::async_trait;
use equity_core::{AnalystError, NarrativeGenerator, RankedResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for the Claude Messages API
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub base_url: String,
    pub timeout: Duration,
}

impl ClaudeConfig {
    pub fn from_env() -> ClaudeResult<Self> {
        let api_key =
            std::env::var("ANTHROPIC_API_KEY").map_err(|_| ClaudeError::MissingApiKey)?;

        Ok(Self {
            api_key,
            model: std::env::var("CLAUDE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: std::env::var("CLAUDE_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2000),
            base_url: std::env::var("CLAUDE_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            timeout: Duration::from_secs(60),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for Claude narrative generation
#[derive(Clone)]
pub struct ClaudeClient {
    client: reqwest::Client,
    config: ClaudeConfig,
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    pub fn from_env() -> ClaudeResult<Self> {
        Ok(Self::new(ClaudeConfig::from_env()?))
    }

    /// Send a single user prompt and return the text of the reply
    pub async fn complete(&self, prompt: &str) -> ClaudeResult<String> {
        let request = MessagesRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            messages: vec![Message {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(ClaudeError::Api(format!("{}: {}", status, message)));
        }

        let reply = response.json::<MessagesResponse>().await?;

        if let Some(usage) = &reply.usage {
            tracing::debug!(
                "Claude usage: {} input / {} output tokens",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        reply
            .content
            .iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text.clone())
            .ok_or(ClaudeError::EmptyResponse)
    }
}

#[async_trait]
impl NarrativeGenerator for ClaudeClient {
    async fn recommend(&self, result: &RankedResult) -> Result<String, AnalystError> {
        let prompt = prompt::recommendation_prompt(result);
        self.complete(&prompt)
            .await
            .map_err(|e| AnalystError::NarrativeError(e.to_string()))
    }

    async fn strategy(
        &self,
        result: &RankedResult,
        investment_amount: f64,
    ) -> Result<String, AnalystError> {
        let prompt = prompt::strategy_prompt(result, investment_amount);
        self.complete(&prompt)
            .await
            .map_err(|e| AnalystError::NarrativeError(e.to_string()))
    }
}
