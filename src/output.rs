//! Terminal output for a narration session: start-up banner and per-frame progress.

use crate::pipeline::stats::format_duration;
use crate::video::sampler::Cadence;
use owo_colors::OwoColorize;
use std::time::Duration;

/// What is known about the source before the first frame is pulled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSummary {
    pub fps: Option<f64>,
    pub total_frames: Option<u64>,
    pub cadence: Cadence,
}

impl SourceSummary {
    fn known_fps(&self) -> Option<f64> {
        self.fps.filter(|f| f.is_finite() && *f > 0.0)
    }

    /// Stream length, when both the frame count and rate are known.
    pub fn duration(&self) -> Option<Duration> {
        let fps = self.known_fps()?;
        let total = self.total_frames?;
        Some(Duration::from_secs_f64(total as f64 / fps))
    }

    /// Approximate number of frames that will be described.
    pub fn expected_processed(&self) -> Option<f64> {
        self.total_frames
            .map(|total| total as f64 / self.cadence.frames() as f64)
    }

    /// Sampled frames per second of video.
    pub fn processing_rate(&self) -> Option<f64> {
        self.known_fps()
            .map(|fps| fps / self.cadence.frames() as f64)
    }

    pub fn print_banner(&self) {
        eprintln!();
        eprintln!("{}", "Video Information:".bold());
        match self.fps {
            Some(fps) => eprintln!("  {}          {}", "FPS:".dimmed(), fps),
            None => eprintln!("  {}          {}", "FPS:".dimmed(), "unknown"),
        }
        match self.total_frames {
            Some(total) => eprintln!("  {} {}", "Total frames:".dimmed(), total),
            None => eprintln!("  {} {}", "Total frames:".dimmed(), "unknown"),
        }
        if let Some(duration) = self.duration() {
            eprintln!(
                "  {}     {:.2} seconds",
                "Duration:".dimmed(),
                duration.as_secs_f64()
            );
        }
        eprintln!("  {}   {}", "Processing:".dimmed(), self.cadence);
        if let Some(expected) = self.expected_processed() {
            eprintln!("  {}     ~{:.1} frames", "Expected:".dimmed(), expected);
        }
        if let Some(rate) = self.processing_rate() {
            eprintln!(
                "  {}         ~{:.2} frames per second",
                "Rate:".dimmed(),
                rate
            );
        }
    }
}

/// Header line for a processed frame: `Processing frame 10/300 (3.3%)`.
pub fn frame_heading(index: u64, total: Option<u64>) -> String {
    match total {
        Some(total) if total > 0 => format!(
            "Processing frame {}/{} ({:.1}%)",
            index,
            total,
            index as f64 / total as f64 * 100.0
        ),
        _ => format!("Processing frame {}", index),
    }
}

pub fn print_frame_heading(index: u64, total: Option<u64>, since_last: Duration) {
    eprintln!();
    eprintln!("{}", frame_heading(index, total).bold());
    eprintln!(
        "{}",
        format!(
            "Time since last processed frame: {:.2} seconds",
            since_last.as_secs_f64()
        )
        .dimmed()
    );
}

pub fn print_description(text: &str) {
    eprintln!("{} {}", "Description:".green(), text);
}

/// Extra detail shown with `-v`.
pub fn print_timing(mode: &str, description: Duration, speech: Option<Duration>) {
    match speech {
        Some(speech) => eprintln!(
            "  {}",
            format!(
                "[{}] describe {}, speech {}",
                mode,
                format_duration(description),
                format_duration(speech)
            )
            .dimmed()
        ),
        None => eprintln!(
            "  {}",
            format!("[{}] describe {}", mode, format_duration(description)).dimmed()
        ),
    }
}

pub fn print_skip(reason: &str) {
    eprintln!("{}", format!("Skipping frame: {}", reason).yellow());
}

pub fn print_warning(message: &str) {
    eprintln!("{}", message.yellow());
}
