//! Chat completion client
//!
//! `TextGenerator` is the seam every prompt-driven operation goes through.
//! Production code uses `OpenAIChat`; tests plug in `ScriptedGenerator`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;
use crate::errors::{AppError, Result};

/// One single-turn completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    pub max_tokens: Option<usize>,
    pub temperature: f32,
    pub stop: Vec<String>,
    /// Token id to bias, as accepted by the completions API
    pub logit_bias: BTreeMap<String, i32>,
}

impl CompletionRequest {
    /// Deterministic request (temperature 0) with no limits
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            max_tokens: None,
            temperature: 0.0,
            stop: Vec::new(),
            logit_bias: BTreeMap::new(),
        }
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }

    pub fn bias(mut self, token: impl Into<String>, bias: i32) -> Self {
        self.logit_bias.insert(token.into(), bias);
        self
    }
}

/// Trait for text generation services
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Complete a prompt
    ///
    /// `Ok(None)` means the service answered without content. Callers decide
    /// whether that is fatal.
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>>;
}

/// OpenAI-compatible chat completions client
pub struct OpenAIChat {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
    #[serde(skip_serializing_if = "no_bias")]
    logit_bias: &'a BTreeMap<String, i32>,
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

fn no_bias(bias: &&BTreeMap<String, i32>) -> bool {
    bias.is_empty()
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAIChat {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }

    /// Build the client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "llm.api_key (or OPENAI_API_KEY) is required".to_string(),
        })?;
        Self::new(&config.endpoint, api_key, Duration::from_secs(config.timeout_secs))
    }
}

#[async_trait]
impl TextGenerator for OpenAIChat {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>> {
        let body = ChatRequest {
            model: &request.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stop: &request.stop,
            logit_bias: &request.logit_bias,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                service: "chat-completions".to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        let content = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        debug!(
            model = %request.model,
            chars = content.as_ref().map(|c| c.len()).unwrap_or(0),
            "Completion received"
        );
        Ok(content)
    }
}

type Script = dyn Fn(&CompletionRequest) -> Option<String> + Send + Sync;

/// Text generator answering from a closure, for tests and offline runs
///
/// Every request is recorded so tests can assert on prompts and parameters.
#[derive(Clone)]
pub struct ScriptedGenerator {
    script: Arc<Script>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl ScriptedGenerator {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Generator answering every prompt with the same text
    pub fn constant(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::new(move |_| Some(text.clone()))
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn complete(&self, request: CompletionRequest) -> Result<Option<String>> {
        let answer = (self.script)(&request);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        Ok(answer)
    }
}
