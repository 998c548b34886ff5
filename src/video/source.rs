//! Frame source abstraction and an in-memory mock.

use crate::error::{NarratorError, Result};
use crate::video::frame::Frame;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Trait for video frame sources.
///
/// A source yields a finite, non-restartable sequence of frames. It is owned
/// by the pipeline for the whole session and closed on every exit path.
pub trait FrameSource: Send {
    /// Pull the next decoded frame, or `None` at end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Nominal frame rate of the stream, if known.
    fn nominal_frame_rate(&self) -> Option<f64>;

    /// Estimated total number of frames, if known.
    fn total_frames_estimate(&self) -> Option<u64>;

    /// Release the underlying resources. Must be idempotent.
    fn close(&mut self);
}

/// Mock frame source for testing
///
/// Yields `count` tiny JPEG frames with consecutive indices.
#[derive(Debug, Clone)]
pub struct MockFrameSource {
    frames: VecDeque<Frame>,
    frame_rate: Option<f64>,
    total: Option<u64>,
    decode_error_at: Option<u64>,
    closed: Arc<AtomicBool>,
    pulled: Arc<AtomicU64>,
}

impl MockFrameSource {
    /// Create a source with `count` frames at 30 fps.
    pub fn new(count: u64) -> Self {
        let frames = (0..count)
            .map(|index| {
                let timestamp = Duration::from_secs_f64(index as f64 / 30.0);
                Frame::jpeg(index, timestamp, vec![0xFF, 0xD8, index as u8, 0xFF, 0xD9])
            })
            .collect();
        Self {
            frames,
            frame_rate: Some(30.0),
            total: Some(count),
            decode_error_at: None,
            closed: Arc::new(AtomicBool::new(false)),
            pulled: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Configure the nominal frame rate (`None` for unknown).
    pub fn with_frame_rate(mut self, fps: Option<f64>) -> Self {
        self.frame_rate = fps;
        self
    }

    /// Configure the total frame estimate (`None` for unknown).
    pub fn with_total(mut self, total: Option<u64>) -> Self {
        self.total = total;
        self
    }

    /// Fail with a decode error when frame `index` would be returned.
    pub fn with_decode_error_at(mut self, index: u64) -> Self {
        self.decode_error_at = Some(index);
        self
    }

    /// Append a frame after the generated ones.
    pub fn push(&mut self, frame: Frame) {
        self.frames.push_back(frame);
    }

    /// Flag set once `close()` has run.
    pub fn closed_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.closed)
    }

    /// Counter of successful `next_frame()` pulls.
    pub fn pulled_counter(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.pulled)
    }
}

impl FrameSource for MockFrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let Some(frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        if self.decode_error_at == Some(frame.index) {
            return Err(NarratorError::VideoDecode {
                message: format!("mock decode failure at frame {}", frame.index),
            });
        }
        self.pulled.fetch_add(1, Ordering::SeqCst);
        Ok(Some(frame))
    }

    fn nominal_frame_rate(&self) -> Option<f64> {
        self.frame_rate
    }

    fn total_frames_estimate(&self) -> Option<u64> {
        self.total
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_yields_frames_in_order_then_ends() {
        let mut source = MockFrameSource::new(3);
        let indices: Vec<u64> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn mock_reports_metadata() {
        let source = MockFrameSource::new(4).with_frame_rate(Some(25.0));
        assert_eq!(source.nominal_frame_rate(), Some(25.0));
        assert_eq!(source.total_frames_estimate(), Some(4));

        let unknown = MockFrameSource::new(4)
            .with_frame_rate(None)
            .with_total(None);
        assert_eq!(unknown.nominal_frame_rate(), None);
        assert_eq!(unknown.total_frames_estimate(), None);
    }

    #[test]
    fn mock_decode_error() {
        let mut source = MockFrameSource::new(3).with_decode_error_at(1);
        assert!(source.next_frame().unwrap().is_some());
        assert!(matches!(
            source.next_frame(),
            Err(NarratorError::VideoDecode { .. })
        ));
    }

    #[test]
    fn close_is_idempotent_and_ends_stream() {
        let mut source = MockFrameSource::new(3);
        let closed = source.closed_flag();
        source.close();
        source.close();
        assert!(closed.load(Ordering::SeqCst));
        assert!(source.next_frame().unwrap().is_none());
    }

    #[test]
    fn pulled_counter_tracks_successful_reads() {
        let mut source = MockFrameSource::new(2);
        let pulled = source.pulled_counter();
        while source.next_frame().unwrap().is_some() {}
        assert_eq!(pulled.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn trait_is_object_safe() {
        let mut source: Box<dyn FrameSource> = Box::new(MockFrameSource::new(1));
        assert!(source.next_frame().unwrap().is_some());
        source.close();
    }
}
