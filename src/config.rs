//! TOML configuration with environment overrides.

use crate::defaults;
use crate::error::{NarratorError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub video: VideoConfig,
    pub vision: VisionConfig,
    pub speech: SpeechConfig,
}

/// Frame sampling configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VideoConfig {
    /// Describe every Nth raw frame.
    pub cycle: i64,
    /// Target processed frames per second; overrides `cycle` when the
    /// source frame rate is known.
    pub target_fps: Option<f64>,
    pub jpeg_quality: u8,
}

/// Vision-language service configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct VisionConfig {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Name of the environment variable holding the bearer token.
    /// Empty disables authentication (local endpoints).
    pub api_key_env: String,
}

/// Speech synthesis and playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub model: String,
    pub voice: String,
    pub format: SpeechFormat,
    /// Output device name; `None` picks the system default.
    pub device: Option<String>,
}

/// Audio container requested from the speech endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechFormat {
    Wav,
    Pcm,
}

impl SpeechFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeechFormat::Wav => "wav",
            SpeechFormat::Pcm => "pcm",
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            cycle: defaults::CYCLE,
            target_fps: None,
            jpeg_quality: defaults::JPEG_QUALITY,
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::VISION_ENDPOINT.to_string(),
            model: defaults::VISION_MODEL.to_string(),
            max_tokens: defaults::MAX_TOKENS,
            timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            api_key_env: defaults::API_KEY_ENV.to_string(),
        }
    }
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: defaults::SPEECH_ENDPOINT.to_string(),
            model: defaults::SPEECH_MODEL.to_string(),
            voice: defaults::SPEECH_VOICE.to_string(),
            format: SpeechFormat::Wav,
            device: None,
        }
    }
}

impl VisionConfig {
    /// Resolve the bearer token from the configured environment variable.
    ///
    /// Returns `Ok(None)` when authentication is disabled, and a configuration
    /// error when the variable is named but unset.
    pub fn api_key(&self) -> Result<Option<String>> {
        if self.api_key_env.is_empty() {
            return Ok(None);
        }
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.is_empty() => Ok(Some(key)),
            _ => Err(NarratorError::ConfigInvalidValue {
                key: "vision.api_key_env".to_string(),
                message: format!("environment variable {} is not set", self.api_key_env),
            }),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                NarratorError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                NarratorError::Io(e)
            }
        })?;
        toml::from_str(&contents).map_err(|e| NarratorError::ConfigParse {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(NarratorError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - NARRAT_MODEL → vision.model
    /// - NARRAT_VISION_ENDPOINT → vision.endpoint
    /// - NARRAT_VOICE → speech.voice
    /// - NARRAT_AUDIO_DEVICE → speech.device
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("NARRAT_MODEL")
            && !model.is_empty()
        {
            self.vision.model = model;
        }

        if let Ok(endpoint) = std::env::var("NARRAT_VISION_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.vision.endpoint = endpoint;
        }

        if let Ok(voice) = std::env::var("NARRAT_VOICE")
            && !voice.is_empty()
        {
            self.speech.voice = voice;
        }

        if let Ok(device) = std::env::var("NARRAT_AUDIO_DEVICE")
            && !device.is_empty()
        {
            self.speech.device = Some(device);
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/narrat/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("narrat")
            .join("config.toml")
    }

    /// Render the built-in defaults as a TOML template.
    pub fn dump_template() -> Result<String> {
        toml::to_string_pretty(&Self::default()).map_err(|e| NarratorError::ConfigParse {
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::NamedTempFile;

    // Serializes tests that modify environment variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    // SAFETY: only used with ENV_LOCK held.
    fn set_env(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) }
    }

    fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) }
    }

    fn clear_narrat_env() {
        remove_env("NARRAT_MODEL");
        remove_env("NARRAT_VISION_ENDPOINT");
        remove_env("NARRAT_VOICE");
        remove_env("NARRAT_AUDIO_DEVICE");
    }

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config_has_correct_values() {
        let config = Config::default();

        assert_eq!(config.video.cycle, 5);
        assert_eq!(config.video.target_fps, None);
        assert_eq!(config.video.jpeg_quality, 85);

        assert_eq!(config.vision.model, "gpt-4.1-nano");
        assert_eq!(config.vision.max_tokens, 300);
        assert_eq!(config.vision.timeout_secs, 30);
        assert_eq!(config.vision.api_key_env, "OPENAI_API_KEY");

        assert!(config.speech.enabled);
        assert_eq!(config.speech.model, "tts-1-hd");
        assert_eq!(config.speech.voice, "nova");
        assert_eq!(config.speech.format, SpeechFormat::Wav);
        assert_eq!(config.speech.device, None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let file = write_temp(
            r#"
            [video]
            cycle = 30
            target_fps = 0.5
            jpeg_quality = 70

            [vision]
            endpoint = "http://localhost:8080/v1/chat/completions"
            model = "llava"
            max_tokens = 120
            timeout_secs = 10
            api_key_env = ""

            [speech]
            enabled = false
            voice = "alloy"
            format = "pcm"
            device = "pulse"
        "#,
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.video.cycle, 30);
        assert_eq!(config.video.target_fps, Some(0.5));
        assert_eq!(config.video.jpeg_quality, 70);
        assert_eq!(config.vision.model, "llava");
        assert_eq!(config.vision.max_tokens, 120);
        assert_eq!(config.vision.timeout_secs, 10);
        assert_eq!(config.vision.api_key_env, "");
        assert!(!config.speech.enabled);
        assert_eq!(config.speech.voice, "alloy");
        assert_eq!(config.speech.format, SpeechFormat::Pcm);
        assert_eq!(config.speech.device, Some("pulse".to_string()));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = write_temp(
            r#"
            [video]
            cycle = 12
        "#,
        );

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.video.cycle, 12);
        assert_eq!(config.video.jpeg_quality, 85);
        assert_eq!(config.vision, VisionConfig::default());
        assert_eq!(config.speech, SpeechConfig::default());
    }

    #[test]
    fn test_invalid_toml_returns_parse_error() {
        let file = write_temp("[video\ncycle = ");
        let result = Config::load(file.path());
        assert!(matches!(result, Err(NarratorError::ConfigParse { .. })));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let result = Config::load(Path::new("/tmp/nonexistent_narrat_config_54321.toml"));
        match result {
            Err(NarratorError::ConfigFileNotFound { path }) => {
                assert!(path.contains("nonexistent_narrat_config_54321"));
            }
            other => panic!("Expected ConfigFileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_load_or_default_returns_default_for_missing_file() {
        let config =
            Config::load_or_default(Path::new("/tmp/nonexistent_narrat_config_12345.toml"))
                .unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_or_default_rejects_invalid_toml() {
        let file = write_temp("[speech\nvoice = \"broken");
        assert!(Config::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_env_override_model_and_voice() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_narrat_env();

        set_env("NARRAT_MODEL", "gpt-4o-mini");
        set_env("NARRAT_VOICE", "echo");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.vision.model, "gpt-4o-mini");
        assert_eq!(config.speech.voice, "echo");
        assert_eq!(config.speech.device, None);

        clear_narrat_env();
    }

    #[test]
    fn test_env_override_device_and_endpoint() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_narrat_env();

        set_env("NARRAT_AUDIO_DEVICE", "hw:1,0");
        set_env("NARRAT_VISION_ENDPOINT", "http://127.0.0.1:9000/v1/chat/completions");
        let config = Config::default().with_env_overrides();

        assert_eq!(config.speech.device, Some("hw:1,0".to_string()));
        assert_eq!(
            config.vision.endpoint,
            "http://127.0.0.1:9000/v1/chat/completions"
        );

        clear_narrat_env();
    }

    #[test]
    fn test_env_override_empty_string_ignored() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_narrat_env();

        set_env("NARRAT_MODEL", "");
        let config = Config::default().with_env_overrides();
        assert_eq!(config.vision.model, "gpt-4.1-nano");

        clear_narrat_env();
    }

    #[test]
    fn test_api_key_disabled_when_env_name_empty() {
        let vision = VisionConfig {
            api_key_env: String::new(),
            ..Default::default()
        };
        assert_eq!(vision.api_key().unwrap(), None);
    }

    #[test]
    fn test_api_key_missing_is_config_error() {
        let vision = VisionConfig {
            api_key_env: "NARRAT_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            vision.api_key(),
            Err(NarratorError::ConfigInvalidValue { .. })
        ));
    }

    #[test]
    fn test_api_key_read_from_env() {
        let _lock = ENV_LOCK.lock().unwrap();
        set_env("NARRAT_TEST_KEY", "sk-test");
        let vision = VisionConfig {
            api_key_env: "NARRAT_TEST_KEY".to_string(),
            ..Default::default()
        };
        assert_eq!(vision.api_key().unwrap(), Some("sk-test".to_string()));
        remove_env("NARRAT_TEST_KEY");
    }

    #[test]
    fn test_dump_template_round_trips_defaults() {
        let template = Config::dump_template().unwrap();
        assert!(template.contains("[video]"));
        assert!(template.contains("[speech]"));
        let parsed: Config = toml::from_str(&template).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_default_path_ends_with_config_toml() {
        let path = Config::default_path();
        let path_str = path.to_string_lossy();
        assert!(path_str.contains("narrat"));
        assert!(path_str.ends_with("config.toml"));
    }
}
