//! LLM agent module for comic explanations.
//!
//! Talks to Groq's OpenAI-compatible chat completions API with a vision
//! model, and parses the reply into a [`ComicAnalysis`].

pub use crate::analysis::{ComicAnalysis, Description};

use crate::comic::ComicRecord;
use crate::config::{Config, ImageModel};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

const GROQ_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
const TEMPERATURE: f32 = 1.0;
const MAX_TOKENS: u32 = 512;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),
    #[error("LLM request timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to parse response: {0}")]
    ParseError(String),
    #[error("configuration error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}

impl AgentError {
    /// Transport and server-side failures are worth another attempt
    fn is_retryable(&self) -> bool {
        matches!(self, AgentError::RequestFailed(_) | AgentError::Timeout(_))
    }
}

/// What the model needs to explain one comic.
#[derive(Debug, Clone, Copy)]
pub struct DescribeRequest<'a> {
    pub image_url: &'a str,
    pub alt_text: &'a str,
    pub comic_name: &'a str,
}

impl<'a> From<&'a ComicRecord> for DescribeRequest<'a> {
    fn from(record: &'a ComicRecord) -> Self {
        Self {
            image_url: &record.image_url,
            alt_text: &record.description,
            comic_name: record.source_name(),
        }
    }
}

#[async_trait]
pub trait Describer: Send + Sync {
    async fn describe(&self, request: &DescribeRequest<'_>) -> Result<ComicAnalysis, AgentError>;
}

/// Explain a comic, substituting the fallback description on any failure
pub async fn explain(describer: &dyn Describer, record: &ComicRecord) -> Description {
    match describer.describe(&DescribeRequest::from(record)).await {
        Ok(analysis) => Description::from(analysis),
        Err(e) => {
            error!(source = record.source_name(), error = %e, "error generating comic analysis");
            Description::fallback()
        }
    }
}

/// Groq-hosted vision model.
pub struct GroqAgent {
    client: reqwest::Client,
    api_key: Option<String>,
    model: ImageModel,
    max_retries: u32,
    timeout: Option<Duration>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<serde_json::Value>,
    temperature: f32,
    max_tokens: u32,
    response_format: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl GroqAgent {
    pub fn new(api_key: Option<String>, model: ImageModel) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model,
            max_retries: 2,
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut agent = Self::new(config.api.groq_key.clone(), config.settings().image_model);
        agent.max_retries = config.agent.max_retries;
        agent.timeout = config.agent.timeout_secs.map(Duration::from_secs);
        agent
    }

    async fn request_once(&self, api_key: &str, body: &ChatRequest<'_>) -> Result<String, AgentError> {
        let send = self
            .client
            .post(GROQ_ENDPOINT)
            .bearer_auth(api_key)
            .json(body)
            .send();

        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, send)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => send.await,
        }
        .map_err(|e| AgentError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let error = format!("HTTP {}: {}", status.as_u16(), detail);
            return if status.is_server_error() || status.as_u16() == 429 {
                Err(AgentError::RequestFailed(error))
            } else {
                Err(AgentError::ParseError(error))
            };
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::ParseError(e.to_string()))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AgentError::ParseError("response has no message content".into()))
    }
}

#[async_trait]
impl Describer for GroqAgent {
    async fn describe(&self, request: &DescribeRequest<'_>) -> Result<ComicAnalysis, AgentError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| crate::config::ConfigError::MissingApiKey("groq".to_string()))?;

        let body = ChatRequest {
            model: self.model.model_id(),
            messages: build_messages(request),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: json!({ "type": "json_object" }),
        };

        let mut attempt = 0;
        let text = loop {
            match self.request_once(api_key, &body).await {
                Ok(text) => break text,
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    debug!(attempt, error = %e, "retrying LLM request");
                }
                Err(e) => return Err(e),
            }
        };

        parse_analysis(&text)
    }
}

/// System and user messages for one comic
fn build_messages(request: &DescribeRequest<'_>) -> Vec<serde_json::Value> {
    let system = format!(
        r#"You are a witty {} explainer.
Analyze the provided comic and output the response in JSON format.

Structure your response according to the instructions below:
{}

Keep the explanation concise and accessible."#,
        request.comic_name,
        format_instructions()
    );

    vec![
        json!({ "role": "system", "content": system }),
        json!({
            "role": "user",
            "content": [
                {
                    "type": "text",
                    "text": format!("Here is an {} comic. Alt text: {}", request.comic_name, request.alt_text),
                },
                {
                    "type": "image_url",
                    "image_url": { "url": request.image_url },
                },
            ],
        }),
    ]
}

/// JSON schema of [`ComicAnalysis`] as prompt text
fn format_instructions() -> String {
    let schema = schemars::schema_for!(ComicAnalysis);
    let schema_json = serde_json::to_string_pretty(&schema).unwrap_or_default();
    format!(
        "The output should be a JSON object that conforms to the JSON schema below.\n```\n{}\n```\nDo not include any markdown formatting, code blocks, or explanations. Only output the raw JSON object.",
        schema_json
    )
}

fn parse_analysis(text: &str) -> Result<ComicAnalysis, AgentError> {
    let cleaned = strip_markdown_json(text);
    serde_json::from_str(&cleaned).map_err(|e| AgentError::ParseError(format!("{}: {}", e, cleaned)))
}

/// Strip markdown code block wrappers from JSON response
fn strip_markdown_json(text: &str) -> String {
    let trimmed = text.trim();

    // Remove ```json ... ``` or ``` ... ```
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_prefix = rest.strip_prefix("json").unwrap_or(rest);

        if let Some(end_idx) = without_prefix.rfind("```") {
            return without_prefix[..end_idx].trim().to_string();
        }
    }

    trimmed.to_string()
}
