//! Adapter seams between the conversation loop and the outside world

use std::time::Duration;

use async_trait::async_trait;

use super::AudioSegment;
use crate::Result;

/// Backoff after a capture device error so a dead microphone doesn't spin
const CAPTURE_ERROR_BACKOFF: Duration = Duration::from_millis(500);

/// Result of one capture attempt
#[derive(Debug)]
pub enum CaptureOutcome {
    /// One utterance worth of audio
    Segment(AudioSegment),
    /// No speech started within the listen timeout
    Timeout,
}

/// Result of transcribing one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transcript {
    /// Recognized text
    Text(String),
    /// The service understood nothing
    NotUnderstood,
}

/// What the loop heard on one iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    /// A lower-cased utterance
    Utterance(String),
    /// Silence, timeout or a recoverable failure; try again
    Nothing,
    /// The input is gone for good (closed stdin)
    Closed,
}

/// Produces raw audio, one utterance per call
#[async_trait(?Send)]
pub trait SpeechCapture {
    /// Block until an utterance is captured or the listen timeout expires
    ///
    /// # Errors
    ///
    /// Returns error if the audio device fails
    async fn capture(&mut self) -> Result<CaptureOutcome>;
}

/// Converts captured audio to text
#[async_trait(?Send)]
pub trait Transcriber {
    /// Transcribe one segment
    ///
    /// # Errors
    ///
    /// Returns error if the speech service fails
    async fn transcribe(&self, segment: &AudioSegment) -> Result<Transcript>;
}

/// Speaks text to the user; returns once output is complete
#[async_trait(?Send)]
pub trait Speaker {
    /// Say `text`
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails
    async fn speak(&mut self, text: &str) -> Result<()>;
}

/// Source of utterances for the conversation loop
#[async_trait(?Send)]
pub trait UtteranceSource {
    /// Wait for the next utterance
    async fn listen(&mut self) -> Heard;
}

/// Capture followed by transcription
///
/// Every failure is absorbed here and reported as [`Heard::Nothing`].
pub struct SpeechPipeline {
    capture: Box<dyn SpeechCapture>,
    transcriber: Box<dyn Transcriber>,
}

impl SpeechPipeline {
    /// Combine a capture device with a transcriber
    #[must_use]
    pub fn new(capture: Box<dyn SpeechCapture>, transcriber: Box<dyn Transcriber>) -> Self {
        Self {
            capture,
            transcriber,
        }
    }
}

#[async_trait(?Send)]
impl UtteranceSource for SpeechPipeline {
    async fn listen(&mut self) -> Heard {
        tracing::info!("listening");

        let segment = match self.capture.capture().await {
            Ok(CaptureOutcome::Segment(segment)) => segment,
            Ok(CaptureOutcome::Timeout) => {
                tracing::info!("listening timeout - no speech detected");
                return Heard::Nothing;
            }
            Err(e) => {
                tracing::error!(error = %e, "microphone error");
                tokio::time::sleep(CAPTURE_ERROR_BACKOFF).await;
                return Heard::Nothing;
            }
        };

        tracing::debug!(
            samples = segment.samples.len(),
            duration_ms = segment.duration().as_millis(),
            "captured segment"
        );

        match self.transcriber.transcribe(&segment).await {
            Ok(Transcript::Text(text)) => {
                let utterance = text.trim().to_lowercase();
                if utterance.is_empty() {
                    tracing::warn!("could not understand audio");
                    Heard::Nothing
                } else {
                    tracing::info!(utterance = %utterance, "user said");
                    Heard::Utterance(utterance)
                }
            }
            Ok(Transcript::NotUnderstood) => {
                tracing::warn!("could not understand audio");
                Heard::Nothing
            }
            Err(e) => {
                tracing::error!(error = %e, "speech recognition error");
                Heard::Nothing
            }
        }
    }
}
