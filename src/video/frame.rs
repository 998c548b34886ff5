//! Frame types and JPEG/base64 encoding for sampled frames.

use crate::error::{NarratorError, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::ExtendedColorType;
use image::codecs::jpeg::JpegEncoder;
use std::sync::Arc;
use std::time::Duration;

/// Pixel payload of a decoded frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FramePixels {
    /// Packed RGB24, `width * height * 3` bytes.
    Rgb {
        width: u32,
        height: u32,
        data: Vec<u8>,
    },
    /// Already JPEG-encoded (sources that deliver compressed frames).
    Jpeg(Vec<u8>),
}

/// A decoded frame as produced by a [`FrameSource`](super::source::FrameSource).
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Raw frame index within the stream, starting at 0.
    pub index: u64,
    /// Presentation time within the stream.
    pub timestamp: Duration,
    pub pixels: FramePixels,
}

impl Frame {
    pub fn rgb(index: u64, timestamp: Duration, width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            index,
            timestamp,
            pixels: FramePixels::Rgb {
                width,
                height,
                data,
            },
        }
    }

    pub fn jpeg(index: u64, timestamp: Duration, bytes: Vec<u8>) -> Self {
        Self {
            index,
            timestamp,
            pixels: FramePixels::Jpeg(bytes),
        }
    }

    /// Encode the frame as JPEG. Only sampled frames pay this cost.
    pub fn encode(self, quality: u8) -> Result<EncodedFrame> {
        let jpeg = match self.pixels {
            FramePixels::Jpeg(bytes) => bytes,
            FramePixels::Rgb {
                width,
                height,
                data,
            } => encode_jpeg(width, height, &data, quality)?,
        };
        Ok(EncodedFrame {
            index: self.index,
            timestamp: self.timestamp,
            jpeg: Arc::from(jpeg),
        })
    }
}

/// A JPEG-encoded frame. Cheap to clone, so it can be kept as the
/// previous frame of the narration context.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFrame {
    pub index: u64,
    pub timestamp: Duration,
    jpeg: Arc<[u8]>,
}

impl EncodedFrame {
    pub fn new(index: u64, timestamp: Duration, jpeg: Vec<u8>) -> Self {
        Self {
            index,
            timestamp,
            jpeg: Arc::from(jpeg),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.jpeg
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.jpeg)
    }

    /// `data:` URI accepted by chat-completions image parts.
    pub fn data_uri(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.to_base64())
    }
}

/// A frame selected by the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledFrame {
    /// Position among sampled frames (0-based), distinct from the raw index.
    pub position: u64,
    pub frame: EncodedFrame,
}

/// Encode packed RGB24 pixels as JPEG.
pub fn encode_jpeg(width: u32, height: u32, data: &[u8], quality: u8) -> Result<Vec<u8>> {
    let expected = width as usize * height as usize * 3;
    if width == 0 || height == 0 || data.len() != expected {
        return Err(NarratorError::FrameEncode {
            message: format!(
                "expected {} bytes for {}x{} RGB frame, got {}",
                expected,
                width,
                height,
                data.len()
            ),
        });
    }

    let mut out = Vec::with_capacity(expected / 8);
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100))
        .encode(data, width, height, ExtendedColorType::Rgb8)
        .map_err(|e| NarratorError::FrameEncode {
            message: e.to_string(),
        })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let v = (i % 256) as u8;
                [v, v.wrapping_mul(3), 255 - v]
            })
            .collect()
    }

    #[test]
    fn encode_rgb_frame_produces_jpeg_markers() {
        let frame = Frame::rgb(7, Duration::from_millis(280), 8, 4, gradient(8, 4));
        let encoded = frame.encode(85).unwrap();

        assert_eq!(encoded.index, 7);
        assert_eq!(encoded.timestamp, Duration::from_millis(280));
        let bytes = encoded.bytes();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn encode_jpeg_frame_passes_bytes_through() {
        let frame = Frame::jpeg(3, Duration::ZERO, vec![0xFF, 0xD8, 1, 2, 0xFF, 0xD9]);
        let encoded = frame.encode(85).unwrap();
        assert_eq!(encoded.bytes(), &[0xFF, 0xD8, 1, 2, 0xFF, 0xD9]);
    }

    #[test]
    fn encode_rejects_wrong_buffer_size() {
        let frame = Frame::rgb(0, Duration::ZERO, 4, 4, vec![0u8; 10]);
        assert!(matches!(
            frame.encode(85),
            Err(NarratorError::FrameEncode { .. })
        ));
    }

    #[test]
    fn encode_rejects_zero_dimensions() {
        assert!(encode_jpeg(0, 4, &[], 85).is_err());
    }

    #[test]
    fn base64_and_data_uri() {
        let encoded = EncodedFrame::new(0, Duration::ZERO, b"abc".to_vec());
        assert_eq!(encoded.to_base64(), "YWJj");
        assert_eq!(encoded.data_uri(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn encoded_frame_clone_shares_bytes() {
        let encoded = EncodedFrame::new(1, Duration::ZERO, vec![1, 2, 3]);
        let copy = encoded.clone();
        assert_eq!(encoded, copy);
        assert!(std::ptr::eq(encoded.bytes(), copy.bytes()));
    }
}
