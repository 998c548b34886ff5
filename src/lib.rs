//! narrat - live spoken narration of video
//!
//! Samples frames from a video, describes them with a remote vision-language
//! model in the context of the narration so far, and speaks each description.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod describe;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod speech;
pub mod video;

// Composition root - needs every adapter
#[cfg(all(feature = "cpal-audio", feature = "ffmpeg"))]
pub mod app;

// Core traits (source → describe → render)
pub use describe::DescriptionService;
pub use speech::AudioRenderer;
pub use video::FrameSource;

// Test doubles
pub use describe::ScriptedDescriber;
pub use speech::MockAudioRenderer;
pub use video::MockFrameSource;

// Pipeline
pub use pipeline::{
    CancelFlag, EndReason, NarrationContext, PipelineConfig, PipelineEvent, PipelineOrchestrator,
    SessionOutcome, SessionReport,
};

// Error handling
pub use error::{NarratorError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
