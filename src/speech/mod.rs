//! Voice interaction: microphone capture, utterance detection,
//! transcription, and spoken responses.

mod capture;
mod stt;
mod synth;
mod vad;

pub use capture::{list_input_devices, MicCapture, CAPTURE_SAMPLE_RATE};
pub use stt::WhisperTranscriber;
pub use synth::{list_voices, select_voice, Speaker, VoiceInfo, SPEECH_TOOL};
pub use vad::UtteranceDetector;
