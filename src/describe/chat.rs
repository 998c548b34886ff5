//! OpenAI-compatible chat-completions client for frame descriptions.

use crate::config::VisionConfig;
use crate::describe::prompt::{COLD_START_INSTRUCTION, continuation_instruction};
use crate::describe::service::{DescriptionFailure, DescriptionRequest, DescriptionService};
use crate::error::{NarratorError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

/// Maximum number of response-body bytes kept in a status failure.
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Description service backed by a chat-completions endpoint.
///
/// Each call is a single POST bounded by the configured timeout.
pub struct ChatCompletionsDescriber {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl ChatCompletionsDescriber {
    pub fn new(config: &VisionConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NarratorError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            max_tokens: config.max_tokens,
        })
    }

    /// JSON body for a request: instruction text first, then the images.
    pub(crate) fn request_body(&self, request: &DescriptionRequest<'_>) -> Value {
        let instruction = match request {
            DescriptionRequest::Cold { .. } => COLD_START_INSTRUCTION.to_string(),
            DescriptionRequest::Continuation { preview, .. } => continuation_instruction(preview),
        };

        let mut content = vec![json!({ "type": "text", "text": instruction })];
        content.extend(request.images().into_iter().map(|image| {
            json!({
                "type": "image_url",
                "image_url": { "url": image.data_uri() }
            })
        }));

        json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.max_tokens,
        })
    }
}

/// Extract `choices[0].message.content` from a response body.
pub(crate) fn parse_content(body: &str) -> std::result::Result<String, DescriptionFailure> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| DescriptionFailure::Malformed(e.to_string()))?;
    response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| DescriptionFailure::Malformed("response has no choices".to_string()))?
        .message
        .content
        .ok_or_else(|| DescriptionFailure::Malformed("choice has no content".to_string()))
}

fn transport_failure(error: reqwest::Error) -> DescriptionFailure {
    if error.is_timeout() {
        DescriptionFailure::Timeout
    } else {
        DescriptionFailure::Transport(error.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    match body.char_indices().nth(ERROR_BODY_LIMIT) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[async_trait]
impl DescriptionService for ChatCompletionsDescriber {
    async fn complete(
        &self,
        request: &DescriptionRequest<'_>,
    ) -> std::result::Result<String, DescriptionFailure> {
        let body = self.request_body(request);

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(transport_failure)?;
        let status = response.status();
        if !status.is_success() {
            // The status is the failure; an unreadable body is reported empty.
            let text = response.text().await.unwrap_or_default();
            return Err(DescriptionFailure::Status {
                code: status.as_u16(),
                body: truncate_body(&text),
            });
        }

        let text = response.text().await.map_err(transport_failure)?;
        parse_content(&text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
