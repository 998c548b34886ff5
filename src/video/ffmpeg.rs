//! Video file decoding through an FFmpeg child process (ffmpeg-sidecar).
//!
//! FFmpeg decodes the input to raw RGB24 on stdout. Stream metadata (frame
//! rate, duration) is parsed from its log output before the first frame.

use crate::error::{NarratorError, Result};
use crate::video::frame::Frame;
use crate::video::source::FrameSource;
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel, StreamTypeSpecificData};
use ffmpeg_sidecar::iter::FfmpegIterator;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// Frame source backed by an `ffmpeg` process.
///
/// The process is killed and reaped by `close()`, which also runs on drop.
pub struct FfmpegFrameSource {
    child: Option<FfmpegChild>,
    events: Option<FfmpegIterator>,
    pending: VecDeque<Frame>,
    frame_rate: Option<f64>,
    duration_secs: Option<f64>,
    next_index: u64,
    last_error: Option<String>,
}

impl FfmpegFrameSource {
    /// Open a video file and read its stream header.
    ///
    /// # Errors
    /// - `VideoNotFound` if the path does not exist
    /// - `VideoOpen` if ffmpeg cannot be started or rejects the input
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NarratorError::VideoNotFound {
                path: path.display().to_string(),
            });
        }

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(path.to_string_lossy().as_ref())
            .rawvideo()
            .spawn()
            .map_err(|e| NarratorError::VideoOpen {
                message: format!("failed to start ffmpeg: {}", e),
            })?;

        let events = child.iter().map_err(|e| NarratorError::VideoOpen {
            message: format!("failed to read ffmpeg output: {}", e),
        })?;

        let mut source = Self {
            child: Some(child),
            events: Some(events),
            pending: VecDeque::new(),
            frame_rate: None,
            duration_secs: None,
            next_index: 0,
            last_error: None,
        };
        source.read_header()?;
        Ok(source)
    }

    /// Pump events until the video stream is known or the first frame arrives.
    fn read_header(&mut self) -> Result<()> {
        while self.frame_rate.is_none() && self.pending.is_empty() {
            if !self.pump() {
                break;
            }
        }

        if self.frame_rate.is_none()
            && self.pending.is_empty()
            && let Some(message) = self.last_error.take()
        {
            self.close();
            return Err(NarratorError::VideoOpen { message });
        }
        Ok(())
    }

    /// Handle one ffmpeg event. Returns false once the event stream is over.
    fn pump(&mut self) -> bool {
        let Some(events) = self.events.as_mut() else {
            return false;
        };
        let Some(event) = events.next() else {
            self.events = None;
            return false;
        };

        match event {
            FfmpegEvent::ParsedDuration(duration) => {
                self.duration_secs = Some(duration.duration);
            }
            FfmpegEvent::ParsedInputStream(stream) => {
                if let StreamTypeSpecificData::Video(video) = &stream.type_specific_data
                    && self.frame_rate.is_none()
                    && video.fps > 0.0
                {
                    tracing::debug!(
                        width = video.width,
                        height = video.height,
                        fps = video.fps,
                        "video stream detected"
                    );
                    self.frame_rate = Some(video.fps as f64);
                }
            }
            FfmpegEvent::OutputFrame(frame) => {
                let timestamp = Duration::from_secs_f32(frame.timestamp.max(0.0));
                self.pending.push_back(Frame::rgb(
                    self.next_index,
                    timestamp,
                    frame.width,
                    frame.height,
                    frame.data,
                ));
                self.next_index += 1;
            }
            FfmpegEvent::Log(LogLevel::Fatal, message) | FfmpegEvent::Error(message) => {
                tracing::debug!(%message, "ffmpeg reported an error");
                self.last_error = Some(message);
            }
            FfmpegEvent::Done => {
                self.events = None;
                return false;
            }
            _ => {}
        }
        true
    }
}

/// Frame count implied by duration and frame rate.
fn estimate_total(duration_secs: Option<f64>, frame_rate: Option<f64>) -> Option<u64> {
    match (duration_secs, frame_rate) {
        (Some(duration), Some(fps)) if duration > 0.0 && fps > 0.0 => {
            Some((duration * fps).round() as u64)
        }
        _ => None,
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                return Ok(Some(frame));
            }
            if !self.pump() {
                // A fatal ffmpeg error ends the stream as a decode failure,
                // before or after the first frame.
                if let Some(message) = self.last_error.take() {
                    return Err(NarratorError::VideoDecode { message });
                }
                return Ok(None);
            }
        }
    }

    fn nominal_frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn total_frames_estimate(&self) -> Option<u64> {
        estimate_total(self.duration_secs, self.frame_rate)
    }

    fn close(&mut self) {
        self.events = None;
        self.pending.clear();
        if let Some(mut child) = self.child.take() {
            // kill() fails harmlessly when ffmpeg already exited at end of stream
            if let Err(e) = child.kill() {
                tracing::debug!("ffmpeg kill: {}", e);
            }
            if let Err(e) = child.wait() {
                tracing::warn!("failed to reap ffmpeg process: {}", e);
            }
        }
    }
}

impl Drop for FfmpegFrameSource {
    fn drop(&mut self) {
        self.close();
    }
}
