//! HTTP client for the remote chat completion API.
//!
//! One POST per prompt, single attempt, no retry. The endpoint, model and
//! bearer credential come from [`ChatConfig`].

use std::time::Duration;

use tracing::debug;

use crate::api_types::{ChatMessage, ChatRequest, ChatResponse};
use crate::config::ChatConfig;
use crate::error::{ProsaError, Result};

/// Parsed outcome of a successful chat completion call.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Assistant reply text
    pub text: String,

    /// Model name echoed by the provider
    pub model: String,

    /// Total tokens consumed by the call
    pub total_tokens: i64,
}

/// Chat completion client using direct HTTP requests.
pub struct ChatClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    /// Create a client from config.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProsaError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }

    /// Send the conversation window and return the parsed completion.
    pub async fn complete(&self, messages: Vec<ChatMessage>) -> Result<Completion> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "Sending chat completion request");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            // Prefer the provider's error body over the bare status line
            return Err(ProsaError::Api(if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                format!("{} - {}", status, body.trim())
            }));
        }

        let api_response: ChatResponse = response.json().await.map_err(ProsaError::from)?;
        Self::parse_completion(api_response)
    }

    fn parse_completion(response: ChatResponse) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProsaError::Api("response contained no choices".to_string()))?;

        Ok(Completion {
            text: choice.message.content,
            model: response.model,
            total_tokens: response.usage.total_tokens,
        })
    }
}
