//! Spoken replies: synthesis followed by playback

use std::time::Duration;

use async_trait::async_trait;

use super::pipeline::Speaker;
use super::{AudioPlayback, TextToSpeech};
use crate::Result;

/// Speaks through the configured TTS provider and the default output device
pub struct VoiceSpeaker {
    tts: TextToSpeech,
    playback: AudioPlayback,
    post_speech_delay: Duration,
}

impl VoiceSpeaker {
    /// Create a speaker
    ///
    /// `post_speech_delay` is waited after playback completes, before the
    /// loop starts listening again.
    #[must_use]
    pub const fn new(tts: TextToSpeech, playback: AudioPlayback, post_speech_delay: Duration) -> Self {
        Self {
            tts,
            playback,
            post_speech_delay,
        }
    }
}

#[async_trait(?Send)]
impl Speaker for VoiceSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let audio = self.tts.synthesize(text).await?;
        self.playback.play_mp3(&audio).await?;

        if !self.post_speech_delay.is_zero() {
            tokio::time::sleep(self.post_speech_delay).await;
        }

        tracing::info!("audio reply played");
        Ok(())
    }
}
