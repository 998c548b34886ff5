//! Description requests, failures and the service seam.

use crate::video::frame::EncodedFrame;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Which description protocol a request uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptionMode {
    /// Single image, no prior context.
    ColdStart,
    /// Previous image, current image and the narration so far.
    Continuation,
}

impl fmt::Display for DescriptionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptionMode::ColdStart => write!(f, "cold-start"),
            DescriptionMode::Continuation => write!(f, "continuation"),
        }
    }
}

/// A description request, tagged by mode.
#[derive(Debug, Clone, Copy)]
pub enum DescriptionRequest<'a> {
    Cold {
        image: &'a EncodedFrame,
    },
    Continuation {
        previous: &'a EncodedFrame,
        current: &'a EncodedFrame,
        preview: &'a str,
    },
}

impl<'a> DescriptionRequest<'a> {
    pub fn mode(&self) -> DescriptionMode {
        match self {
            DescriptionRequest::Cold { .. } => DescriptionMode::ColdStart,
            DescriptionRequest::Continuation { .. } => DescriptionMode::Continuation,
        }
    }

    /// The frame being described.
    pub fn current(&self) -> &'a EncodedFrame {
        match self {
            DescriptionRequest::Cold { image } => image,
            DescriptionRequest::Continuation { current, .. } => current,
        }
    }

    /// Images in the order they are sent: previous first, then current.
    pub fn images(&self) -> Vec<&'a EncodedFrame> {
        match self {
            DescriptionRequest::Cold { image } => vec![*image],
            DescriptionRequest::Continuation {
                previous, current, ..
            } => vec![*previous, *current],
        }
    }
}

/// Why a description request produced no text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptionFailure {
    #[error("service returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("service returned an empty description")]
    Empty,
}

impl DescriptionFailure {
    /// Short label for logs and stats.
    pub fn kind(&self) -> &'static str {
        match self {
            DescriptionFailure::Status { .. } => "status",
            DescriptionFailure::Timeout => "timeout",
            DescriptionFailure::Transport(_) => "transport",
            DescriptionFailure::Malformed(_) => "malformed",
            DescriptionFailure::Empty => "empty",
        }
    }
}

/// Outcome of one description call plus the time it took.
///
/// Text is present exactly when the call succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct DescriptionResult {
    pub outcome: Result<String, DescriptionFailure>,
    pub latency: Duration,
}

impl DescriptionResult {
    pub fn text(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn failed(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Trait for vision-language description backends.
///
/// Implementations issue exactly one request per call and never retry.
#[async_trait]
pub trait DescriptionService: Send + Sync {
    /// Perform the request and return the raw description text.
    async fn complete(
        &self,
        request: &DescriptionRequest<'_>,
    ) -> Result<String, DescriptionFailure>;

    /// Name of the model behind this service.
    fn model_name(&self) -> &str;

    /// Timed description. Whitespace-only text counts as a failure.
    async fn describe(&self, request: &DescriptionRequest<'_>) -> DescriptionResult {
        let start = Instant::now();
        let outcome = self
            .complete(request)
            .await
            .and_then(|text| match text.trim() {
                "" => Err(DescriptionFailure::Empty),
                trimmed => Ok(trimmed.to_string()),
            });
        DescriptionResult {
            outcome,
            latency: start.elapsed(),
        }
    }
}

/// A request as seen by [`ScriptedDescriber`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub mode: DescriptionMode,
    pub current_index: u64,
    pub previous_index: Option<u64>,
    pub preview: String,
}

/// Scripted description service for testing
///
/// Answers `"scene <index>"` for each frame unless told otherwise, and records
/// every request it receives.
#[derive(Debug, Default)]
pub struct ScriptedDescriber {
    responses: HashMap<u64, String>,
    failures: HashMap<u64, DescriptionFailure>,
    delays: HashMap<u64, Duration>,
    calls: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedDescriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `text` for the frame with raw index `index`.
    pub fn with_response(mut self, index: u64, text: &str) -> Self {
        self.responses.insert(index, text.to_string());
        self
    }

    /// Fail the request for raw index `index`.
    pub fn with_failure(mut self, index: u64, failure: DescriptionFailure) -> Self {
        self.failures.insert(index, failure);
        self
    }

    /// Sleep for `delay` before answering requests for `index`.
    pub fn with_delay_on(mut self, index: u64, delay: Duration) -> Self {
        self.delays.insert(index, delay);
        self
    }

    /// Requests received so far, in order.
    pub fn calls(&self) -> Vec<RecordedRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Modes of the requests received so far, in order.
    pub fn modes(&self) -> Vec<DescriptionMode> {
        self.calls().into_iter().map(|c| c.mode).collect()
    }
}

#[async_trait]
impl DescriptionService for ScriptedDescriber {
    async fn complete(
        &self,
        request: &DescriptionRequest<'_>,
    ) -> Result<String, DescriptionFailure> {
        let current = request.current().index;
        let (previous_index, preview) = match request {
            DescriptionRequest::Cold { .. } => (None, String::new()),
            DescriptionRequest::Continuation {
                previous, preview, ..
            } => (Some(previous.index), preview.to_string()),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedRequest {
                mode: request.mode(),
                current_index: current,
                previous_index,
                preview,
            });
        }

        if let Some(delay) = self.delays.get(&current) {
            tokio::time::sleep(*delay).await;
        }

        if let Some(failure) = self.failures.get(&current) {
            return Err(failure.clone());
        }
        Ok(self
            .responses
            .get(&current)
            .cloned()
            .unwrap_or_else(|| format!("scene {}", current)))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(index: u64) -> EncodedFrame {
        EncodedFrame::new(index, Duration::ZERO, vec![0xFF, 0xD8, 0xFF, 0xD9])
    }

    #[test]
    fn request_modes_and_images() {
        let a = frame(0);
        let b = frame(4);

        let cold = DescriptionRequest::Cold { image: &a };
        assert_eq!(cold.mode(), DescriptionMode::ColdStart);
        assert_eq!(cold.current().index, 0);
        assert_eq!(cold.images().len(), 1);

        let cont = DescriptionRequest::Continuation {
            previous: &a,
            current: &b,
            preview: "a dog",
        };
        assert_eq!(cont.mode(), DescriptionMode::Continuation);
        assert_eq!(cont.current().index, 4);
        let order: Vec<u64> = cont.images().iter().map(|f| f.index).collect();
        assert_eq!(order, vec![0, 4]);
    }

    #[test]
    fn result_text_present_iff_success() {
        let ok = DescriptionResult {
            outcome: Ok("a cat".to_string()),
            latency: Duration::from_millis(5),
        };
        assert_eq!(ok.text(), Some("a cat"));
        assert!(!ok.failed());

        let failed = DescriptionResult {
            outcome: Err(DescriptionFailure::Timeout),
            latency: Duration::from_secs(30),
        };
        assert_eq!(failed.text(), None);
        assert!(failed.failed());
    }

    #[test]
    fn failure_display_and_kind() {
        let status = DescriptionFailure::Status {
            code: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(status.to_string(), "service returned status 429: rate limited");
        assert_eq!(status.kind(), "status");
        assert_eq!(DescriptionFailure::Timeout.kind(), "timeout");
        assert_eq!(
            DescriptionFailure::Malformed("missing choices".to_string()).to_string(),
            "malformed response: missing choices"
        );
    }

    #[tokio::test]
    async fn describe_trims_text_and_measures_latency() {
        let service = ScriptedDescriber::new().with_response(0, "  A red car.  ");
        let image = frame(0);
        let result = service
            .describe(&DescriptionRequest::Cold { image: &image })
            .await;
        assert_eq!(result.text(), Some("A red car."));
    }

    #[tokio::test]
    async fn describe_treats_blank_text_as_failure() {
        let service = ScriptedDescriber::new().with_response(0, "   \n");
        let image = frame(0);
        let result = service
            .describe(&DescriptionRequest::Cold { image: &image })
            .await;
        assert_eq!(result.outcome, Err(DescriptionFailure::Empty));
    }

    #[tokio::test]
    async fn scripted_describer_records_requests() {
        let service = ScriptedDescriber::new()
            .with_failure(2, DescriptionFailure::Timeout);
        let a = frame(0);
        let b = frame(2);

        let first = service
            .describe(&DescriptionRequest::Cold { image: &a })
            .await;
        assert_eq!(first.text(), Some("scene 0"));

        let second = service
            .describe(&DescriptionRequest::Continuation {
                previous: &a,
                current: &b,
                preview: "scene 0",
            })
            .await;
        assert!(second.failed());

        let calls = service.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].previous_index, Some(0));
        assert_eq!(calls[1].preview, "scene 0");
        assert_eq!(
            service.modes(),
            vec![DescriptionMode::ColdStart, DescriptionMode::Continuation]
        );
    }

    #[tokio::test]
    async fn delays_are_kept_per_frame() {
        let service = ScriptedDescriber::new()
            .with_delay_on(0, Duration::from_millis(200))
            .with_delay_on(2, Duration::from_millis(5));
        let a = frame(0);
        let b = frame(2);

        let first = service
            .describe(&DescriptionRequest::Cold { image: &a })
            .await;
        assert!(first.latency >= Duration::from_millis(200));

        let second = service
            .describe(&DescriptionRequest::Cold { image: &b })
            .await;
        assert!(second.latency >= Duration::from_millis(5));
        assert!(second.latency < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn service_is_object_safe() {
        let service: Box<dyn DescriptionService> = Box::new(ScriptedDescriber::new());
        let image = frame(9);
        let result = service
            .describe(&DescriptionRequest::Cold { image: &image })
            .await;
        assert_eq!(result.text(), Some("scene 9"));
        assert_eq!(service.model_name(), "scripted");
    }
}
