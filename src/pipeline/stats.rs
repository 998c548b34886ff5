//! Latency accounting and the end-of-session report.

use crate::speech::SpeechOutcome;
use owo_colors::OwoColorize;
use std::time::Duration;

/// Raw counters for one session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionStats {
    /// Frames pulled from the source, sampled or not.
    pub raw_frames: u64,
    pub sampled: u64,
    /// Sampled frames with a successful description.
    pub described: u64,
    /// Sampled frames whose description failed.
    pub failed: u64,
    /// Frames dropped before a request could be made (e.g. encoding failed).
    pub skipped: u64,
    pub total_api_latency: Duration,
    pub total_audio_latency: Duration,
    pub audio_failures: u64,
    pub source_fps: Option<f64>,
}

/// Derived view over [`SessionStats`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionReport {
    pub stats: SessionStats,
    pub avg_api_latency: Option<Duration>,
    pub avg_audio_latency: Option<Duration>,
    /// Described frames per second of source video.
    pub processed_fps: Option<f64>,
}

/// Accumulates stats as the orchestrator moves through frames.
#[derive(Debug, Default)]
pub struct StatsCollector {
    stats: SessionStats,
}

impl StatsCollector {
    pub fn new(source_fps: Option<f64>) -> Self {
        Self {
            stats: SessionStats {
                source_fps,
                ..Default::default()
            },
        }
    }

    pub fn frame_pulled(&mut self) {
        self.stats.raw_frames += 1;
    }

    pub fn frame_sampled(&mut self) {
        self.stats.sampled += 1;
    }

    pub fn frame_skipped(&mut self) {
        self.stats.skipped += 1;
    }

    /// A description request failed after `latency`.
    pub fn description_failed(&mut self, latency: Duration) {
        self.stats.failed += 1;
        self.stats.total_api_latency += latency;
    }

    /// A frame was described and its speech rendered (successfully or not).
    pub fn frame_described(&mut self, api_latency: Duration, speech: &SpeechOutcome) {
        self.stats.described += 1;
        self.stats.total_api_latency += api_latency;
        self.stats.total_audio_latency += speech.latency;
        if !speech.succeeded() {
            self.stats.audio_failures += 1;
        }
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn report(&self) -> SessionReport {
        let s = &self.stats;
        SessionReport {
            stats: s.clone(),
            avg_api_latency: avg_duration(s.total_api_latency, s.described),
            avg_audio_latency: avg_duration(s.total_audio_latency, s.described),
            processed_fps: processed_fps(s.described, s.raw_frames, s.source_fps),
        }
    }
}

impl SessionReport {
    /// Prints a user-friendly summary of the session.
    pub fn print_summary(&self) {
        let s = &self.stats;
        eprintln!();
        eprintln!("=== Session Summary ===");
        eprintln!(
            "Described {} of {} sampled frame{} ({} raw frame{})",
            s.described,
            s.sampled,
            plural(s.sampled),
            s.raw_frames,
            plural(s.raw_frames)
        );
        if s.failed > 0 {
            eprintln!(
                "  {}",
                format!("{} description{} failed", s.failed, plural(s.failed)).yellow()
            );
        }
        if s.skipped > 0 {
            eprintln!(
                "  {}",
                format!("{} frame{} skipped", s.skipped, plural(s.skipped)).yellow()
            );
        }
        if s.audio_failures > 0 {
            eprintln!(
                "  {}",
                format!(
                    "{} speech render{} failed",
                    s.audio_failures,
                    plural(s.audio_failures)
                )
                .yellow()
            );
        }
        eprintln!();
        eprintln!(
            "  Avg description latency:  {}",
            format_optional(self.avg_api_latency)
        );
        eprintln!(
            "  Avg speech latency:       {}",
            format_optional(self.avg_audio_latency)
        );
        match self.processed_fps {
            Some(rate) => eprintln!("  Processing rate:          {:.2} frames per second", rate),
            None => eprintln!("  Processing rate:          {}", "n/a".dimmed()),
        }
    }
}

fn plural(n: u64) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn format_optional(d: Option<Duration>) -> String {
    d.map(format_duration).unwrap_or_else(|| "n/a".to_string())
}

/// Formats a duration as a human-friendly string.
/// Under 1s: "450ms", at or above 1s: "1.5s".
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis();
    if ms < 1000 {
        format!("{}ms", ms)
    } else {
        format!("{:.1}s", d.as_secs_f64())
    }
}

fn avg_duration(total: Duration, count: u64) -> Option<Duration> {
    if count == 0 {
        return None;
    }
    Some(Duration::from_nanos((total.as_nanos() / count as u128) as u64))
}

/// `described / (raw_frames / source_fps)`.
fn processed_fps(described: u64, raw_frames: u64, source_fps: Option<f64>) -> Option<f64> {
    let fps = source_fps.filter(|f| f.is_finite() && *f > 0.0)?;
    if raw_frames == 0 {
        return None;
    }
    let seconds = raw_frames as f64 / fps;
    Some(described as f64 / seconds)
}
