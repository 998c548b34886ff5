//! Speech rendering seam and its implementations.

use crate::error::{NarratorError, Result};
use crate::speech::pcm::PcmClip;
use crate::speech::synth::SpeechClient;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Result of rendering one description.
///
/// `latency` is wall-clock time from the start of synthesis to the end of
/// playback, measured whether or not rendering succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechOutcome {
    pub latency: Duration,
    pub error: Option<String>,
}

impl SpeechOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Trait for turning description text into audible speech.
#[async_trait]
pub trait AudioRenderer: Send + Sync {
    /// Synthesize `text` and return once playback has finished.
    async fn speak(&self, text: &str) -> Result<()>;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Timed render that never fails; errors land in the outcome.
    async fn render(&self, text: &str) -> SpeechOutcome {
        let start = Instant::now();
        let error = self.speak(text).await.err().map(|e| e.to_string());
        SpeechOutcome {
            latency: start.elapsed(),
            error,
        }
    }
}

/// Renderer for muted sessions: descriptions are only printed.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentRenderer;

#[async_trait]
impl AudioRenderer for SilentRenderer {
    async fn speak(&self, _text: &str) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str {
        "silent"
    }
}

/// Mock renderer for testing
///
/// Records spoken text; can be told to fail or to take a fixed time.
#[derive(Debug, Default)]
pub struct MockAudioRenderer {
    spoken: Mutex<Vec<String>>,
    failure: Option<String>,
    delay: Duration,
}

impl MockAudioRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every render with `message`.
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Take `delay` per render.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Texts passed to the renderer, in order.
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AudioRenderer for MockAudioRenderer {
    async fn speak(&self, text: &str) -> Result<()> {
        if let Ok(mut spoken) = self.spoken.lock() {
            spoken.push(text.to_string());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.failure {
            Some(message) => Err(NarratorError::AudioPlayback {
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Trait for devices that play a clip to completion.
///
/// `play` blocks the calling thread; async callers run it on a blocking task.
pub trait PlaybackDevice: Send + Sync {
    fn play(&self, clip: &PcmClip) -> Result<()>;
}

/// Remote synthesis followed by local playback.
pub struct RemoteSpeechRenderer {
    client: SpeechClient,
    playback: Arc<dyn PlaybackDevice>,
}

impl RemoteSpeechRenderer {
    pub fn new(client: SpeechClient, playback: Arc<dyn PlaybackDevice>) -> Self {
        Self { client, playback }
    }
}

#[async_trait]
impl AudioRenderer for RemoteSpeechRenderer {
    async fn speak(&self, text: &str) -> Result<()> {
        let bytes = self.client.synthesize(text).await?;
        let clip = PcmClip::decode(&bytes, self.client.format())?;
        tracing::debug!(bytes = bytes.len(), length = ?clip.duration(), "speech synthesized");

        let playback = Arc::clone(&self.playback);
        tokio::task::spawn_blocking(move || playback.play(&clip))
            .await
            .map_err(|e| NarratorError::AudioPlayback {
                message: format!("Playback task failed: {}", e),
            })?
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn silent_renderer_always_succeeds() {
        let outcome = SilentRenderer.render("anything").await;
        assert!(outcome.succeeded());
        assert_eq!(SilentRenderer.name(), "silent");
    }

    #[tokio::test]
    async fn mock_records_spoken_text() {
        let renderer = MockAudioRenderer::new();
        renderer.render("first").await;
        renderer.render("second").await;
        assert_eq!(renderer.spoken(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn failure_is_reported_not_raised() {
        let renderer = MockAudioRenderer::new().with_failure("device unplugged");
        let outcome = renderer.render("hello").await;
        assert!(!outcome.succeeded());
        assert!(
            outcome
                .error
                .as_deref()
                .unwrap_or_default()
                .contains("device unplugged")
        );
    }

    #[tokio::test]
    async fn latency_covers_render_time() {
        let renderer = MockAudioRenderer::new().with_delay(Duration::from_millis(20));
        let outcome = renderer.render("hello").await;
        assert!(outcome.latency >= Duration::from_millis(20));
    }

    struct RecordingPlayback(Mutex<Vec<usize>>);

    impl PlaybackDevice for RecordingPlayback {
        fn play(&self, clip: &PcmClip) -> Result<()> {
            self.0.lock().unwrap().push(clip.samples.len());
            Ok(())
        }
    }

    /// A local port with nothing listening on it.
    fn closed_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn remote_renderer_reports_synthesis_failure() {
        let config = crate::config::SpeechConfig {
            endpoint: format!("http://127.0.0.1:{}/v1/audio/speech", closed_port()),
            ..Default::default()
        };
        let client = SpeechClient::new(&config, None, Duration::from_secs(5)).unwrap();
        let playback = Arc::new(RecordingPlayback(Mutex::new(Vec::new())));
        let renderer = RemoteSpeechRenderer::new(client, playback.clone());

        let outcome = renderer.render("hello").await;
        assert!(!outcome.succeeded());
        assert!(playback.0.lock().unwrap().is_empty());
    }
}
