//! Text-to-speech over an OpenAI-compatible `audio/speech` endpoint.

use crate::config::{SpeechConfig, SpeechFormat};
use crate::error::{NarratorError, Result};
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    voice: &'a str,
    input: &'a str,
    response_format: &'a str,
}

/// HTTP client that turns text into encoded audio bytes.
pub struct SpeechClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    voice: String,
    format: SpeechFormat,
    api_key: Option<String>,
}

impl SpeechClient {
    pub fn new(config: &SpeechConfig, api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NarratorError::SpeechSynthesis {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            format: config.format,
            api_key,
        })
    }

    pub fn format(&self) -> SpeechFormat {
        self.format
    }

    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Request synthesized audio for `text`.
    pub async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let body = SpeechRequest {
            model: &self.model,
            voice: &self.voice,
            input: text,
            response_format: self.format.as_str(),
        };

        let mut builder = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| NarratorError::SpeechSynthesis {
                message: format!("Request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(NarratorError::SpeechSynthesis {
                message: format!("Service returned status {}: {}", status.as_u16(), detail),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| NarratorError::SpeechSynthesis {
                message: format!("Failed to read audio body: {}", e),
            })?;
        Ok(bytes.to_vec())
    }
}
