//! Narration application entry point.
//!
//! Wires the complete flow:
//! video file → sample → describe → speak

use crate::config::Config;
use crate::describe::{ChatCompletionsDescriber, DescriptionService};
use crate::error::{NarratorError, Result};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::orchestrator::{PipelineConfig, PipelineOrchestrator, SessionOutcome};
use crate::speech::{
    AudioRenderer, CpalPlayback, RemoteSpeechRenderer, SilentRenderer, SpeechClient,
};
use crate::video::{Cadence, FfmpegFrameSource, FrameSource};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Command-line choices layered over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub video: Option<PathBuf>,
    pub cycle: Option<i64>,
    pub fps: Option<f64>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub device: Option<String>,
    pub mute: bool,
    pub timeout_secs: Option<u64>,
    pub quiet: bool,
    pub verbosity: u8,
}

/// Apply CLI overrides on top of file and environment settings.
pub fn apply_overrides(mut config: Config, options: &RunOptions) -> Config {
    if let Some(cycle) = options.cycle {
        config.video.cycle = cycle;
    }
    if let Some(fps) = options.fps {
        config.video.target_fps = Some(fps);
    }
    if let Some(model) = &options.model {
        config.vision.model = model.clone();
    }
    if let Some(voice) = &options.voice {
        config.speech.voice = voice.clone();
    }
    if let Some(device) = &options.device {
        config.speech.device = Some(device.clone());
    }
    if let Some(secs) = options.timeout_secs {
        config.vision.timeout_secs = secs;
    }
    if options.mute {
        config.speech.enabled = false;
    }
    config
}

/// Run a narration session over a video file.
///
/// Configuration problems (no video, bad cadence, missing file or key,
/// unknown audio device) are reported before any frame is read.
pub async fn run_narration(config: Config, options: RunOptions) -> Result<SessionOutcome> {
    let config = apply_overrides(config, &options);

    let Some(video) = options.video.as_deref() else {
        return Err(NarratorError::WebcamUnsupported);
    };

    // Validates cycle and target rate without needing the source.
    Cadence::derive(config.video.cycle, None, config.video.target_fps)?;

    if !video.exists() {
        return Err(NarratorError::VideoNotFound {
            path: video.display().to_string(),
        });
    }

    let api_key = config.vision.api_key()?;
    let describer: Arc<dyn DescriptionService> =
        Arc::new(ChatCompletionsDescriber::new(&config.vision, api_key.clone())?);
    let renderer = build_renderer(&config, api_key)?;

    if options.verbosity >= 2 && !options.quiet {
        eprintln!(
            "narrat: model {}, speech {} ({})",
            describer.model_name(),
            renderer.name(),
            config.speech.voice
        );
    }

    let source: Box<dyn FrameSource> = Box::new(FfmpegFrameSource::open(video)?);

    let cancel = CancelFlag::new();
    cancel.watch_ctrl_c();
    cancel.watch_quit_key();
    if !options.quiet {
        eprintln!("Press Ctrl+C or type q + Enter to stop.");
    }

    let pipeline_config = PipelineConfig {
        cycle: config.video.cycle,
        target_fps: config.video.target_fps,
        jpeg_quality: config.video.jpeg_quality,
        quiet: options.quiet,
        verbosity: options.verbosity,
    };

    let outcome = PipelineOrchestrator::new(pipeline_config, source, describer, renderer)
        .with_cancel(cancel)
        .run()
        .await?;

    if !options.quiet {
        outcome.report.print_summary();
    }

    Ok(outcome)
}

fn build_renderer(config: &Config, api_key: Option<String>) -> Result<Arc<dyn AudioRenderer>> {
    if !config.speech.enabled {
        return Ok(Arc::new(SilentRenderer));
    }

    let playback = CpalPlayback::new(config.speech.device.as_deref())?;
    let client = SpeechClient::new(
        &config.speech,
        api_key,
        Duration::from_secs(config.vision.timeout_secs),
    )?;
    Ok(Arc::new(RemoteSpeechRenderer::new(client, Arc::new(playback))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(video: Option<&str>) -> RunOptions {
        RunOptions {
            video: video.map(PathBuf::from),
            mute: true,
            quiet: true,
            ..Default::default()
        }
    }

    #[test]
    fn overrides_replace_config_values() {
        let opts = RunOptions {
            cycle: Some(12),
            fps: Some(2.0),
            model: Some("local-vlm".to_string()),
            voice: Some("alloy".to_string()),
            device: Some("pipewire".to_string()),
            timeout_secs: Some(10),
            mute: true,
            ..Default::default()
        };
        let config = apply_overrides(Config::default(), &opts);
        assert_eq!(config.video.cycle, 12);
        assert_eq!(config.video.target_fps, Some(2.0));
        assert_eq!(config.vision.model, "local-vlm");
        assert_eq!(config.speech.voice, "alloy");
        assert_eq!(config.speech.device.as_deref(), Some("pipewire"));
        assert_eq!(config.vision.timeout_secs, 10);
        assert!(!config.speech.enabled);
    }

    #[test]
    fn no_overrides_keeps_config() {
        let config = apply_overrides(Config::default(), &RunOptions::default());
        assert_eq!(config, Config::default());
    }

    #[tokio::test]
    async fn missing_video_argument_is_webcam_error() {
        let err = run_narration(Config::default(), options(None))
            .await
            .unwrap_err();
        assert!(matches!(err, NarratorError::WebcamUnsupported));
    }

    #[tokio::test]
    async fn invalid_cycle_fails_before_opening_video() {
        let opts = RunOptions {
            cycle: Some(0),
            ..options(Some("/nonexistent/video.mp4"))
        };
        let err = run_narration(Config::default(), opts).await.unwrap_err();
        assert!(matches!(err, NarratorError::InvalidCadence { cycle: 0 }));
    }

    #[tokio::test]
    async fn invalid_fps_is_configuration_error() {
        let opts = RunOptions {
            fps: Some(-1.0),
            ..options(Some("/nonexistent/video.mp4"))
        };
        let err = run_narration(Config::default(), opts).await.unwrap_err();
        assert!(matches!(err, NarratorError::InvalidTargetRate { .. }));
    }

    #[tokio::test]
    async fn missing_video_file_is_reported() {
        let err = run_narration(Config::default(), options(Some("/nonexistent/video.mp4")))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Video file '/nonexistent/video.mp4' not found"
        );
    }

    #[tokio::test]
    async fn missing_api_key_is_configuration_error() {
        let video = tempfile::NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.vision.api_key_env = "NARRAT_TEST_KEY_THAT_IS_NEVER_SET".to_string();

        let opts = RunOptions {
            video: Some(video.path().to_path_buf()),
            ..options(None)
        };
        let err = run_narration(config, opts).await.unwrap_err();
        assert!(matches!(err, NarratorError::ConfigInvalidValue { .. }));
    }
}
