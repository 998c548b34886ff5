//! Narration history carried between frames.

use crate::video::frame::EncodedFrame;

/// Rolling narration state for one session.
///
/// History only grows, and `previous` is set exactly when at least one
/// sampled frame has been described successfully.
#[derive(Debug, Default, Clone)]
pub struct NarrationContext {
    history: Vec<String>,
    previous: Option<EncodedFrame>,
}

impl NarrationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a successful description and remember its frame.
    pub fn record_success(&mut self, description: String, frame: EncodedFrame) {
        self.history.push(description);
        self.previous = Some(frame);
    }

    /// History joined with single spaces.
    pub fn joined_preview(&self) -> String {
        self.history.join(" ")
    }

    pub fn has_prior(&self) -> bool {
        self.previous.is_some()
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn previous_frame(&self) -> Option<&EncodedFrame> {
        self.previous.as_ref()
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn into_history(self) -> Vec<String> {
        self.history
    }
}
