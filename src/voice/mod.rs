//! Voice interaction module
//!
//! Unifies two independent capabilities, speech capture (speech-to-text)
//! and speech output (remote TTS with local synthesis fallback), behind
//! one controller with `is_listening`/`is_speaking` flags.

pub mod capture;
pub mod controller;
pub mod playback;
pub mod synthesis;

pub use capture::{CaptureEvent, CaptureHandler, SpeechCapture};
pub use controller::{ResultHandler, VoiceBackends, VoiceController, VoiceState};
pub use playback::{AudioClip, AudioOutput, CpalPlayer, EndCallback, PlaybackHandle, decode_audio};
pub use synthesis::{
    CommandSynthesizer, OutputEvent, OutputHandler, SpeechOutput, Utterance, select_voice,
};
