//! Speech synthesis and playback of descriptions.

pub mod pcm;
#[cfg(feature = "cpal-audio")]
pub mod playback;
pub mod renderer;
pub mod synth;

pub use pcm::PcmClip;
#[cfg(feature = "cpal-audio")]
pub use playback::CpalPlayback;
pub use renderer::{
    AudioRenderer, MockAudioRenderer, PlaybackDevice, RemoteSpeechRenderer, SilentRenderer,
    SpeechOutcome,
};
pub use synth::SpeechClient;
