//! Blocking audio playback through CPAL.

use crate::defaults::{PLAYBACK_DRAIN_MS, PLAYBACK_GRACE_MS};
use crate::error::{NarratorError, Result};
use crate::speech::pcm::PcmClip;
use crate::speech::renderer::PlaybackDevice;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// CPAL backend probing prints ALSA/JACK noise that would interleave with
/// the narration output.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` on file descriptor 2. Safe as long as no
/// other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

fn find_output_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();

    let Some(name) = name else {
        return host
            .default_output_device()
            .ok_or_else(|| NarratorError::AudioDeviceNotFound {
                device: "default output".to_string(),
            });
    };

    let devices = host
        .output_devices()
        .map_err(|e| NarratorError::AudioPlayback {
            message: format!("Failed to enumerate devices: {}", e),
        })?;

    for dev in devices {
        if let Ok(dev_name) = dev.name()
            && dev_name == name
        {
            return Ok(dev);
        }
    }

    Err(NarratorError::AudioDeviceNotFound {
        device: name.to_string(),
    })
}

/// Output device playback using the device's native configuration.
#[derive(Debug, Clone)]
pub struct CpalPlayback {
    device_name: Option<String>,
}

impl CpalPlayback {
    /// Check that the device exists now so a typo fails at startup.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| find_output_device(device_name))?;
        if let Ok(name) = device.name() {
            tracing::info!(device = %name, "using audio output device");
        }
        Ok(Self {
            device_name: device_name.map(str::to_string),
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    samples: Arc<[f32]>,
    done: crossbeam_channel::Sender<()>,
    convert: fn(f32) -> T,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + Send + 'static,
{
    let cursor = AtomicUsize::new(0);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let start = cursor.fetch_add(data.len(), Ordering::Relaxed);
                for (i, out) in data.iter_mut().enumerate() {
                    *out = convert(samples.get(start + i).copied().unwrap_or(0.0));
                }
                if start + data.len() >= samples.len() {
                    let _ = done.try_send(());
                }
            },
            |err| tracing::warn!("audio stream error: {}", err),
            None,
        )
        .map_err(|e| NarratorError::AudioPlayback {
            message: format!("Failed to build output stream: {}", e),
        })
}

fn to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

impl PlaybackDevice for CpalPlayback {
    fn play(&self, clip: &PcmClip) -> Result<()> {
        use cpal::SampleFormat;

        if clip.is_empty() {
            return Ok(());
        }

        let device = with_suppressed_stderr(|| find_output_device(self.device_name.as_deref()))?;
        let default_config =
            device
                .default_output_config()
                .map_err(|e| NarratorError::AudioPlayback {
                    message: format!("Failed to query default output config: {}", e),
                })?;

        let rate = default_config.sample_rate();
        let channels = default_config.channels() as usize;
        let stream_config: cpal::StreamConfig = default_config.clone().into();
        let samples: Arc<[f32]> = clip.interleaved(rate, channels).into();
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);

        tracing::debug!(
            rate,
            channels,
            format = ?default_config.sample_format(),
            length = ?clip.duration(),
            "playing clip"
        );

        let stream = match default_config.sample_format() {
            SampleFormat::F32 => build_stream(&device, &stream_config, samples, done_tx, |s| s)?,
            SampleFormat::I16 => build_stream(&device, &stream_config, samples, done_tx, to_i16)?,
            fmt => {
                return Err(NarratorError::AudioPlayback {
                    message: format!(
                        "Unsupported output sample format: {:?}. \
                         Try selecting another device with speech.device.",
                        fmt
                    ),
                });
            }
        };

        stream.play().map_err(|e| NarratorError::AudioPlayback {
            message: format!("Failed to start playback: {}", e),
        })?;

        let limit = clip.duration() + Duration::from_millis(PLAYBACK_GRACE_MS);
        match done_rx.recv_timeout(limit) {
            // The last callback only filled the device buffer; let it drain.
            Ok(()) => std::thread::sleep(Duration::from_millis(PLAYBACK_DRAIN_MS)),
            Err(_) => {
                return Err(NarratorError::AudioPlayback {
                    message: format!("Playback did not finish within {:?}", limit),
                });
            }
        }

        drop(stream);
        Ok(())
    }
}
