//! Default configuration constants for narrat.
//!
//! Shared by the config file types, the CLI and the service clients so the
//! same values are used everywhere.

/// Describe every Nth raw frame unless overridden.
pub const CYCLE: i64 = 5;

/// Request timeout for the vision-language service, in seconds.
///
/// Also bounds how long a cancelled session waits for an in-flight request.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Output-length hint sent with every description request.
pub const MAX_TOKENS: u32 = 300;

/// JPEG quality used when encoding sampled frames.
pub const JPEG_QUALITY: u8 = 85;

/// Chat-completions endpoint used for frame descriptions.
pub const VISION_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

/// Default vision-language model.
pub const VISION_MODEL: &str = "gpt-4.1-nano";

/// Speech synthesis endpoint.
pub const SPEECH_ENDPOINT: &str = "https://api.openai.com/v1/audio/speech";

/// Default speech synthesis model.
pub const SPEECH_MODEL: &str = "tts-1-hd";

/// Default synthesis voice.
pub const SPEECH_VOICE: &str = "nova";

/// Environment variable holding the bearer token for both services.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Sample rate of headerless PCM returned by the speech endpoint.
///
/// The `pcm` response format is 24kHz signed 16-bit little-endian mono.
pub const PCM_SAMPLE_RATE: u32 = 24000;

/// Extra time allowed past the clip length before playback is abandoned.
pub const PLAYBACK_GRACE_MS: u64 = 2000;

/// Time left for the device buffer to drain after the last sample is queued.
pub const PLAYBACK_DRAIN_MS: u64 = 150;
