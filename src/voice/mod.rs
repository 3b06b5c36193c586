//! Voice processing module
//!
//! Handles microphone capture and phrase segmentation, speech-to-text,
//! text-to-speech and playback, plus console stand-ins for headless use.

mod capture;
mod console;
mod phrase;
mod pipeline;
mod playback;
mod speaker;
mod stt;
mod tts;

pub use capture::{AudioCapture, AudioSegment, Microphone, SAMPLE_RATE, samples_to_wav};
pub use console::{ConsoleInput, ConsoleSpeaker};
pub use phrase::{
    DetectorState, ListenSettings, MIN_THRESHOLD, PhraseDetector, PhraseEvent, ambient_threshold,
    calculate_energy,
};
pub use pipeline::{
    CaptureOutcome, Heard, Speaker, SpeechCapture, SpeechPipeline, Transcriber, Transcript,
    UtteranceSource,
};
pub use playback::AudioPlayback;
pub use speaker::VoiceSpeaker;
pub use stt::SpeechToText;
pub use tts::TextToSpeech;
