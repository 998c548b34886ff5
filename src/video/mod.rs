//! Video input: frame sources, cadence sampling and frame encoding.

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;
pub mod frame;
pub mod sampler;
pub mod source;

#[cfg(feature = "ffmpeg")]
pub use ffmpeg::FfmpegFrameSource;
pub use frame::{EncodedFrame, Frame, FramePixels, SampledFrame};
pub use sampler::{Cadence, FrameSampler};
pub use source::{FrameSource, MockFrameSource};
