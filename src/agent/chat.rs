//! OpenAI-compatible chat-completions agent.
//!
//! All configured providers expose `POST {base_url}/chat/completions` with the
//! OpenAI request/response shape, so one client covers them. A request is sent
//! once; failures are returned to the caller without retrying.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

use super::Agent;
use crate::errors::AgentError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(600);

/// Message in a chat completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

pub struct ChatAgent {
    name: String,
    model: String,
    temperature: f64,
    endpoint: String,
    client: reqwest::Client,
    system_prompt: String,
    /// Earlier turns, kept only when the agent manages history
    history: Option<Vec<Message>>,
}

impl ChatAgent {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: &str,
        api_key: &str,
        system_prompt: impl Into<String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|_| anyhow::anyhow!("API key contains invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()
            .map_err(|e| AgentError::Http {
                url: base_url.to_string(),
                source: e,
            })?;

        Ok(Self {
            name: name.into(),
            model: model.into(),
            temperature: 0.0,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            client,
            system_prompt: system_prompt.into(),
            history: None,
        })
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Keep the conversation so later prompts see earlier turns.
    pub fn with_history(mut self, enabled: bool) -> Self {
        self.history = enabled.then(Vec::new);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Messages for the next request: system prompt, history, then `prompt`.
    fn build_messages(&self, prompt: &str) -> Vec<Message> {
        let mut messages = vec![Message::system(&self.system_prompt)];
        if let Some(history) = &self.history {
            messages.extend(history.iter().cloned());
        }
        messages.push(Message::user(prompt));
        messages
    }

    fn record_turn(&mut self, prompt: &str, reply: &str) {
        if let Some(history) = &mut self.history {
            history.push(Message::user(prompt));
            history.push(Message::assistant(reply));
        }
    }
}

#[async_trait]
impl Agent for ChatAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&mut self, prompt: &str) -> Result<String> {
        let messages = self.build_messages(prompt);
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature: self.temperature,
        };

        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::Http {
                url: self.endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| AgentError::Http {
            url: self.endpoint.clone(),
            source: e,
        })?;

        if !status.is_success() {
            return Err(AgentError::Api {
                status: status.as_u16(),
                message: api_error_message(&text),
            }
            .into());
        }

        let reply = parse_reply(&text)?;
        debug!(
            agent = %self.name,
            model = %self.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            chars = reply.len(),
            "Chat completion received"
        );
        self.record_turn(prompt, &reply);
        Ok(reply)
    }
}

/// Extract the first choice's text from a chat-completions response body.
fn parse_reply(body: &str) -> Result<String, AgentError> {
    let parsed: ChatCompletionResponse = serde_json::from_str(body)
        .map_err(|e| AgentError::InvalidResponse(format!("{e}")))?;

    if let Some(usage) = &parsed.usage {
        debug!(
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.completion_tokens,
            "Token usage"
        );
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AgentError::InvalidResponse("response contained no text".to_string()))
}

/// Error message from an API error body, or the raw body when it isn't JSON.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ApiErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(500).collect())
}
