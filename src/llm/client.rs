use std::future::Future;
use std::pin::Pin;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Configuration for the chat-completion API client
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// API key (from CALLSIGHT_API_KEY env var)
    pub api_key: String,
    /// Base URL of the messages API
    pub base_url: String,
    /// Model used for PII masking (fast, cheap)
    pub masking_model: String,
    /// Model used for call analysis
    pub analysis_model: String,
    /// Temperature (0-1, lower = more deterministic)
    pub temperature: f64,
    /// Maximum tokens in response
    pub max_tokens: u32,
}

impl ModelConfig {
    /// Create config from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("CALLSIGHT_API_KEY")
            .context("CALLSIGHT_API_KEY environment variable not set")?;

        Ok(Self::new(api_key))
    }

    /// Create with default model settings
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            masking_model: "claude-3-5-haiku-20241022".to_string(),
            analysis_model: "claude-sonnet-4-20250514".to_string(),
            temperature: 0.1,
            max_tokens: 4096,
        }
    }
}

/// A completion backend the pipeline stages can call without knowing which
/// model (or fake) sits behind it.
pub trait CompletionClient: Send + Sync {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

    /// Name recorded in result metadata for provenance
    fn model_name(&self) -> &str;
}

/// Messages-API client over HTTP
pub struct ChatClient {
    client: Client,
    config: ModelConfig,
    model: String,
}

impl ChatClient {
    /// Client bound to the masking model
    pub fn masking(config: ModelConfig) -> Self {
        let model = config.masking_model.clone();
        Self {
            client: Client::new(),
            config,
            model,
        }
    }

    /// Client bound to the analysis model
    pub fn analysis(config: ModelConfig) -> Self {
        let model = config.analysis_model.clone();
        Self {
            client: Client::new(),
            config,
            model,
        }
    }

    /// Send a message to the model and get a response
    async fn send_message(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            system: Some(system.to_string()),
            messages: vec![Message {
                role: "user".to_string(),
                content: user.to_string(),
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .context("Failed to send request to messages API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Messages API error: {} - {}", status, body);
        }

        let response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse messages API response")?;

        // Extract text from the first content block
        response
            .content
            .first()
            .and_then(|c| {
                if c.content_type == "text" {
                    Some(c.text.clone())
                } else {
                    None
                }
            })
            .context("No text content in response")
    }
}

impl CompletionClient for ChatClient {
    fn complete<'a>(
        &'a self,
        system: &'a str,
        user: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>> {
        Box::pin(self.send_message(system, user))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}
