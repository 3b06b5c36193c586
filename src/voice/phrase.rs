//! Phrase segmentation
//!
//! Splits a live sample stream into one segment per utterance using an
//! energy threshold calibrated against ambient noise.

use std::time::Duration;

use super::AudioSegment;

/// Lowest speech threshold, used in very quiet rooms
pub const MIN_THRESHOLD: f32 = 0.01;

/// Speech must be this much louder than the ambient floor
const NOISE_MULTIPLIER: f32 = 1.5;

/// Minimum voiced audio for a segment to count as speech
const MIN_SPEECH: Duration = Duration::from_millis(300);

/// Trailing silence that ends a phrase
const END_SILENCE: Duration = Duration::from_millis(800);

/// Timing parameters for segmentation
#[derive(Debug, Clone, Copy)]
pub struct ListenSettings {
    /// Sample rate of the incoming stream
    pub sample_rate: u32,
    /// How long to wait for speech to start
    pub listen_timeout: Duration,
    /// Longest phrase kept in one segment
    pub phrase_limit: Duration,
    /// Trailing silence that ends a phrase
    pub end_silence: Duration,
}

impl ListenSettings {
    /// Settings with the default end-of-phrase silence
    #[must_use]
    pub const fn new(sample_rate: u32, listen_timeout: Duration, phrase_limit: Duration) -> Self {
        Self {
            sample_rate,
            listen_timeout,
            phrase_limit,
            end_silence: END_SILENCE,
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    const fn samples(&self, duration: Duration) -> usize {
        (duration.as_millis() * self.sample_rate as u128 / 1000) as usize
    }
}

/// State of the phrase detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    /// Waiting for speech to start
    Waiting,
    /// Speech started, accumulating the phrase
    Speaking,
}

/// Result of feeding a chunk to the detector
#[derive(Debug)]
pub enum PhraseEvent {
    /// Need more audio
    Pending,
    /// A phrase ended
    Complete(AudioSegment),
    /// No speech within the listen timeout
    TimedOut,
}

/// Detects phrase boundaries in streamed audio
pub struct PhraseDetector {
    settings: ListenSettings,
    threshold: f32,
    state: DetectorState,
    speech_buffer: Vec<f32>,
    waited: usize,
    voiced: usize,
    silence_counter: usize,
}

impl PhraseDetector {
    /// Create a detector with an energy threshold
    #[must_use]
    pub fn new(settings: ListenSettings, threshold: f32) -> Self {
        tracing::trace!(threshold, ?settings, "phrase detector initialized");

        Self {
            settings,
            threshold,
            state: DetectorState::Waiting,
            speech_buffer: Vec::new(),
            waited: 0,
            voiced: 0,
            silence_counter: 0,
        }
    }

    /// Feed a chunk of samples
    pub fn process(&mut self, samples: &[f32]) -> PhraseEvent {
        if samples.is_empty() {
            return PhraseEvent::Pending;
        }

        let energy = calculate_energy(samples);
        let is_speech = energy > self.threshold;

        match self.state {
            DetectorState::Waiting => {
                if is_speech {
                    self.state = DetectorState::Speaking;
                    self.speech_buffer.clear();
                    self.speech_buffer.extend_from_slice(samples);
                    self.voiced = samples.len();
                    self.silence_counter = 0;
                    tracing::trace!(energy, "speech started");
                } else {
                    self.waited += samples.len();
                    if self.waited >= self.settings.samples(self.settings.listen_timeout) {
                        return PhraseEvent::TimedOut;
                    }
                }
            }
            DetectorState::Speaking => {
                self.speech_buffer.extend_from_slice(samples);

                if is_speech {
                    self.voiced += samples.len();
                    self.silence_counter = 0;
                } else {
                    self.silence_counter += samples.len();
                }

                let limit = self.settings.samples(self.settings.phrase_limit);
                if self.speech_buffer.len() >= limit {
                    tracing::debug!(samples = limit, "phrase limit reached");
                    self.speech_buffer.truncate(limit);
                    return PhraseEvent::Complete(self.take_segment());
                }

                if self.silence_counter >= self.settings.samples(self.settings.end_silence) {
                    if self.voiced >= self.settings.samples(MIN_SPEECH) {
                        tracing::debug!(samples = self.speech_buffer.len(), "phrase complete");
                        return PhraseEvent::Complete(self.take_segment());
                    }

                    // Too short to be speech; the time spent still counts
                    // against the listen timeout
                    tracing::trace!(voiced = self.voiced, "discarding noise burst");
                    self.waited += self.speech_buffer.len();
                    self.state = DetectorState::Waiting;
                    self.speech_buffer.clear();
                    self.voiced = 0;
                    self.silence_counter = 0;
                    if self.waited >= self.settings.samples(self.settings.listen_timeout) {
                        return PhraseEvent::TimedOut;
                    }
                }
            }
        }

        PhraseEvent::Pending
    }

    /// Get current state
    #[must_use]
    pub const fn state(&self) -> DetectorState {
        self.state
    }

    /// Get the accumulated speech buffer
    #[must_use]
    pub fn speech_buffer(&self) -> &[f32] {
        &self.speech_buffer
    }

    /// Speech threshold in use
    #[must_use]
    pub const fn threshold(&self) -> f32 {
        self.threshold
    }

    fn take_segment(&mut self) -> AudioSegment {
        self.state = DetectorState::Waiting;
        self.voiced = 0;
        self.silence_counter = 0;
        AudioSegment::new(std::mem::take(&mut self.speech_buffer), self.settings.sample_rate)
    }
}

/// Speech threshold for a measured ambient noise level
#[must_use]
pub fn ambient_threshold(noise_rms: f32) -> f32 {
    (noise_rms * NOISE_MULTIPLIER).max(MIN_THRESHOLD)
}

/// Calculate RMS energy of audio samples
#[allow(clippy::cast_precision_loss)]
#[must_use]
pub fn calculate_energy(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_energy_calculation() {
        let silence = vec![0.0f32; 100];
        assert!(calculate_energy(&silence) < 0.001);

        let loud = vec![0.5f32; 100];
        assert!(calculate_energy(&loud) > 0.4);

        assert!(calculate_energy(&[]).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ambient_threshold() {
        assert!((ambient_threshold(0.0) - MIN_THRESHOLD).abs() < f32::EPSILON);
        assert!((ambient_threshold(0.1) - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_settings_sample_math() {
        let settings = ListenSettings::new(16_000, Duration::from_secs(5), Duration::from_secs(30));
        assert_eq!(settings.samples(Duration::from_millis(500)), 8_000);
        assert_eq!(settings.samples(settings.listen_timeout), 80_000);
    }
}
