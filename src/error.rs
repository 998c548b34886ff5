//! Error types for narrat.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NarratorError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid cadence {cycle}: must be a positive number of frames")]
    InvalidCadence { cycle: i64 },

    #[error("Invalid target frame rate {fps}: must be a positive number")]
    InvalidTargetRate { fps: f64 },

    // Video source errors
    #[error("Video file '{path}' not found")]
    VideoNotFound { path: String },

    #[error("Webcam mode not implemented in this version; pass --video <PATH>")]
    WebcamUnsupported,

    #[error("Could not open video source: {message}")]
    VideoOpen { message: String },

    #[error("Video decode failed: {message}")]
    VideoDecode { message: String },

    #[error("Frame encoding failed: {message}")]
    FrameEncode { message: String },

    // Speech errors
    #[error("Speech synthesis failed: {message}")]
    SpeechSynthesis { message: String },

    #[error("Audio format error: {message}")]
    AudioFormat { message: String },

    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NarratorError>;
