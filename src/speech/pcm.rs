//! Decoding of synthesized speech into playable samples.

use crate::config::SpeechFormat;
use crate::defaults::PCM_SAMPLE_RATE;
use crate::error::{NarratorError, Result};
use std::io::Cursor;
use std::time::Duration;

/// Mono audio clip with samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl PcmClip {
    /// Decode a speech response body in the given container format.
    pub fn decode(bytes: &[u8], format: SpeechFormat) -> Result<Self> {
        match format {
            SpeechFormat::Wav => Self::from_wav(bytes),
            SpeechFormat::Pcm => Self::from_raw_s16le(bytes, PCM_SAMPLE_RATE),
        }
    }

    /// Parse WAV data, averaging channels down to mono.
    ///
    /// Streamed WAV carries placeholder chunk sizes (`0xFFFFFFFF`); the data
    /// chunk is then read up to the last complete sample frame received.
    pub fn from_wav(bytes: &[u8]) -> Result<Self> {
        let resized = with_received_lengths(bytes);
        let data = resized.as_deref().unwrap_or(bytes);
        let mut reader =
            hound::WavReader::new(Cursor::new(data)).map_err(|e| NarratorError::AudioFormat {
                message: format!("Failed to parse WAV data: {}", e),
            })?;

        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>(),
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<std::result::Result<Vec<_>, _>>()
            }
        }
        .map_err(|e| NarratorError::AudioFormat {
            message: format!("Failed to read WAV samples: {}", e),
        })?;

        let samples = if channels == 1 {
            interleaved
        } else {
            interleaved
                .chunks_exact(channels)
                .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                .collect()
        };

        Ok(Self {
            samples,
            sample_rate: spec.sample_rate,
        })
    }

    /// Interpret bytes as headerless signed 16-bit little-endian mono audio.
    pub fn from_raw_s16le(bytes: &[u8], sample_rate: u32) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(NarratorError::AudioFormat {
                message: format!("Raw PCM has odd length {}", bytes.len()),
            });
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f32 / 32768.0)
            .collect();
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback length at the clip's own sample rate.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate as f64)
    }

    /// Samples resampled to `rate` and repeated across `channels`.
    pub fn interleaved(&self, rate: u32, channels: usize) -> Vec<f32> {
        let mono = resample(&self.samples, self.sample_rate, rate);
        let channels = channels.max(1);
        if channels == 1 {
            return mono;
        }
        mono.iter()
            .flat_map(|&s| std::iter::repeat_n(s, channels))
            .collect()
    }
}

fn read_u32_le(bytes: &[u8], at: usize) -> Option<u32> {
    let field = bytes.get(at..at + 4)?;
    Some(u32::from_le_bytes([field[0], field[1], field[2], field[3]]))
}

/// Copy of a RIFF/WAVE buffer whose RIFF and `data` sizes match the bytes
/// actually present, trimmed to whole sample frames.
///
/// Returns `None` when the buffer is not RIFF/WAVE or has no `data` chunk.
fn with_received_lengths(bytes: &[u8]) -> Option<Vec<u8>> {
    if bytes.get(0..4)? != b"RIFF" || bytes.get(8..12)? != b"WAVE" {
        return None;
    }

    let mut block_align = 1usize;
    let mut pos = 12usize;
    while pos + 8 <= bytes.len() {
        let id = &bytes[pos..pos + 4];
        let declared = read_u32_le(bytes, pos + 4)? as usize;
        let body = pos + 8;

        if id == b"fmt " {
            // channels * bytes per sample, at offset 12 of the fmt body
            if let Some(field) = bytes.get(body + 12..body + 14) {
                block_align = usize::from(u16::from_le_bytes([field[0], field[1]])).max(1);
            }
        } else if id == b"data" {
            let received = declared.min(bytes.len() - body);
            let len = received - received % block_align;
            let mut out = bytes[..body + len].to_vec();
            out[pos + 4..pos + 8].copy_from_slice(&u32::try_from(len).ok()?.to_le_bytes());
            let riff_len = u32::try_from(out.len() - 8).ok()?;
            out[4..8].copy_from_slice(&riff_len.to_le_bytes());
            return Some(out);
        }

        // Chunks are padded to an even length.
        pos = body.checked_add(declared)?.checked_add(declared % 2)?;
    }
    None
}

/// Linear interpolation resampling.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || from_rate == 0 || to_rate == 0 || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = (source_pos - source_idx as f64) as f32;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx];
                let right = samples[source_idx + 1];
                left + (right - left) * fraction
            }
        })
        .collect()
}
