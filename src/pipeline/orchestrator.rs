//! Narration pipeline: one frame at a time from source to speech.
//!
//! The orchestrator walks a small state machine per raw frame:
//! `AwaitingFrame → Sampled → Describing → ContextUpdate → Rendering`, back to
//! `AwaitingFrame`, until the source is exhausted, fails, or the session is
//! cancelled. Description and speech are awaited in turn, so no frame starts
//! before the previous one has finished playing.

use crate::defaults;
use crate::describe::{DescriptionFailure, DescriptionMode, DescriptionRequest, DescriptionService};
use crate::error::Result;
use crate::output::{self, SourceSummary};
use crate::pipeline::cancel::CancelFlag;
use crate::pipeline::context::NarrationContext;
use crate::pipeline::stats::{SessionReport, StatsCollector};
use crate::speech::{AudioRenderer, SpeechOutcome};
use crate::video::frame::{EncodedFrame, Frame, SampledFrame};
use crate::video::sampler::{Cadence, FrameSampler};
use crate::video::source::FrameSource;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directly supplied cycle; validated before the first pull.
    pub cycle: i64,
    /// Target processed frames per second, overriding `cycle` when the
    /// source rate is known.
    pub target_fps: Option<f64>,
    pub jpeg_quality: u8,
    /// Suppress progress output
    pub quiet: bool,
    /// Verbosity level (0=progress, 1=+timings, 2=+diagnostics)
    pub verbosity: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cycle: defaults::CYCLE,
            target_fps: None,
            jpeg_quality: defaults::JPEG_QUALITY,
            quiet: false,
            verbosity: 0,
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum EndReason {
    /// The source had no more frames.
    Exhausted,
    /// A cancel request was observed between frames.
    Cancelled,
    /// The source failed mid-stream; treated as end of stream.
    SourceError(String),
}

/// Notifications emitted as the pipeline moves between states.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started {
        cadence: Cadence,
    },
    Sampled {
        position: u64,
        index: u64,
    },
    /// Frame could not be prepared for a request.
    Skipped {
        index: u64,
        reason: String,
    },
    Described {
        index: u64,
        mode: DescriptionMode,
        text: String,
        latency: Duration,
    },
    DescriptionFailed {
        index: u64,
        mode: DescriptionMode,
        failure: DescriptionFailure,
        latency: Duration,
    },
    Rendered {
        index: u64,
        outcome: SpeechOutcome,
    },
    Finished {
        reason: EndReason,
    },
}

/// Everything a finished session leaves behind.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub report: SessionReport,
    pub history: Vec<String>,
    pub end: EndReason,
}

type Observer = Box<dyn FnMut(&PipelineEvent) + Send>;

enum State {
    AwaitingFrame,
    Sampled {
        position: u64,
        frame: Frame,
    },
    Describing {
        sampled: SampledFrame,
    },
    ContextUpdate {
        frame: EncodedFrame,
        mode: DescriptionMode,
        description: String,
        api_latency: Duration,
    },
    Rendering {
        index: u64,
        mode: DescriptionMode,
        description: String,
        api_latency: Duration,
    },
    Done(EndReason),
}

/// Closes the source when dropped, including on early return or a dropped future.
struct OwnedSource(Box<dyn FrameSource>);

impl Drop for OwnedSource {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Drives one narration session over a frame source.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    source: OwnedSource,
    describer: Arc<dyn DescriptionService>,
    renderer: Arc<dyn AudioRenderer>,
    cancel: CancelFlag,
    observer: Option<Observer>,
}

impl PipelineOrchestrator {
    pub fn new(
        config: PipelineConfig,
        source: Box<dyn FrameSource>,
        describer: Arc<dyn DescriptionService>,
        renderer: Arc<dyn AudioRenderer>,
    ) -> Self {
        Self {
            config,
            source: OwnedSource(source),
            describer,
            renderer,
            cancel: CancelFlag::new(),
            observer: None,
        }
    }

    /// Share a cancel flag with signal handlers.
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receive every [`PipelineEvent`].
    pub fn with_observer(mut self, observer: impl FnMut(&PipelineEvent) + Send + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    fn emit(&mut self, event: PipelineEvent) {
        if let Some(observer) = self.observer.as_mut() {
            observer(&event);
        }
    }

    fn show_progress(&self) -> bool {
        !self.config.quiet
    }

    /// Run the session to completion.
    ///
    /// Fails only on configuration errors detected before the first frame is
    /// pulled. Per-frame failures are recorded in the report instead.
    pub async fn run(mut self) -> Result<SessionOutcome> {
        let source_fps = self.source.0.nominal_frame_rate();
        let total = self.source.0.total_frames_estimate();
        let cadence = Cadence::derive(self.config.cycle, source_fps, self.config.target_fps)?;

        if self.config.target_fps.is_some() && source_fps.is_none_or(|f| f <= 0.0) {
            tracing::warn!("source frame rate unknown, using cycle {}", cadence.frames());
            if self.show_progress() {
                output::print_warning("Could not determine video FPS, using cycle value instead");
            }
        }

        if self.show_progress() {
            SourceSummary {
                fps: source_fps,
                total_frames: total,
                cadence,
            }
            .print_banner();
        }
        self.emit(PipelineEvent::Started { cadence });

        let mut sampler = FrameSampler::new(cadence);
        let mut context = NarrationContext::new();
        let mut stats = StatsCollector::new(source_fps);
        let mut last_processed = Instant::now();
        let mut state = State::AwaitingFrame;

        let end = loop {
            state = match state {
                State::AwaitingFrame => {
                    if self.cancel.is_cancelled() {
                        State::Done(EndReason::Cancelled)
                    } else {
                        match self.source.0.next_frame() {
                            Ok(Some(frame)) => {
                                stats.frame_pulled();
                                match sampler.admit(frame.index) {
                                    Some(position) => State::Sampled { position, frame },
                                    None => State::AwaitingFrame,
                                }
                            }
                            Ok(None) => State::Done(EndReason::Exhausted),
                            Err(e) => {
                                tracing::warn!("frame source failed: {}", e);
                                if self.show_progress() {
                                    output::print_warning(&format!("Stopping: {}", e));
                                }
                                State::Done(EndReason::SourceError(e.to_string()))
                            }
                        }
                    }
                }

                State::Sampled { position, frame } => {
                    stats.frame_sampled();
                    let index = frame.index;
                    let now = Instant::now();
                    if self.show_progress() {
                        output::print_frame_heading(index, total, now - last_processed);
                    }
                    last_processed = now;
                    self.emit(PipelineEvent::Sampled { position, index });

                    match frame.encode(self.config.jpeg_quality) {
                        Ok(frame) => State::Describing {
                            sampled: SampledFrame { position, frame },
                        },
                        Err(e) => {
                            tracing::warn!(index, "frame encoding failed: {}", e);
                            stats.frame_skipped();
                            if self.show_progress() {
                                output::print_skip(&e.to_string());
                            }
                            self.emit(PipelineEvent::Skipped {
                                index,
                                reason: e.to_string(),
                            });
                            State::AwaitingFrame
                        }
                    }
                }

                State::Describing { sampled } => {
                    let preview = context.joined_preview();
                    let request = match context.previous_frame() {
                        Some(previous) => DescriptionRequest::Continuation {
                            previous,
                            current: &sampled.frame,
                            preview: &preview,
                        },
                        None => DescriptionRequest::Cold {
                            image: &sampled.frame,
                        },
                    };
                    let mode = request.mode();
                    let index = sampled.frame.index;
                    let result = self.describer.describe(&request).await;

                    match result.outcome {
                        Ok(description) => {
                            self.emit(PipelineEvent::Described {
                                index,
                                mode,
                                text: description.clone(),
                                latency: result.latency,
                            });
                            State::ContextUpdate {
                                frame: sampled.frame,
                                mode,
                                description,
                                api_latency: result.latency,
                            }
                        }
                        Err(failure) => {
                            tracing::warn!(index, %mode, kind = failure.kind(), "description failed: {}", failure);
                            stats.description_failed(result.latency);
                            if self.show_progress() {
                                output::print_skip(&failure.to_string());
                                if self.config.verbosity >= 1 {
                                    output::print_timing(&mode.to_string(), result.latency, None);
                                }
                            }
                            self.emit(PipelineEvent::DescriptionFailed {
                                index,
                                mode,
                                failure,
                                latency: result.latency,
                            });
                            State::AwaitingFrame
                        }
                    }
                }

                State::ContextUpdate {
                    frame,
                    mode,
                    description,
                    api_latency,
                } => {
                    let index = frame.index;
                    if self.show_progress() {
                        output::print_description(&description);
                    }
                    context.record_success(description.clone(), frame);
                    State::Rendering {
                        index,
                        mode,
                        description,
                        api_latency,
                    }
                }

                State::Rendering {
                    index,
                    mode,
                    description,
                    api_latency,
                } => {
                    let outcome = self.renderer.render(&description).await;
                    if let Some(error) = &outcome.error {
                        tracing::warn!(index, renderer = self.renderer.name(), "speech failed: {}", error);
                    }
                    if self.show_progress() && self.config.verbosity >= 1 {
                        output::print_timing(&mode.to_string(), api_latency, Some(outcome.latency));
                    }
                    stats.frame_described(api_latency, &outcome);
                    self.emit(PipelineEvent::Rendered { index, outcome });
                    State::AwaitingFrame
                }

                State::Done(reason) => break reason,
            };
        };

        self.source.0.close();

        if self.show_progress() {
            match &end {
                EndReason::Exhausted => eprintln!("\nEnd of video reached"),
                EndReason::Cancelled => eprintln!("\nUser requested quit"),
                EndReason::SourceError(_) => {}
            }
        }
        self.emit(PipelineEvent::Finished {
            reason: end.clone(),
        });

        Ok(SessionOutcome {
            report: stats.report(),
            history: context.into_history(),
            end,
        })
    }
}
