//! Narration pipeline: rolling context, statistics and the frame-by-frame orchestrator.

pub mod cancel;
pub mod context;
pub mod orchestrator;
pub mod stats;

pub use cancel::CancelFlag;
pub use context::NarrationContext;
pub use orchestrator::{
    EndReason, PipelineConfig, PipelineEvent, PipelineOrchestrator, SessionOutcome,
};
pub use stats::{SessionReport, SessionStats, StatsCollector, format_duration};
