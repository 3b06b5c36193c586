//! Audio playback to speakers

use std::io::Cursor;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleRate, StreamConfig};

use crate::{Error, Result};

/// Extra wait beyond the nominal clip length before giving up on the device
const DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Time for the device to play out its last buffer after the final sample is queued
const SETTLE: Duration = Duration::from_millis(100);

/// Plays audio to the default output device
pub struct AudioPlayback {
    device: Device,
}

/// Shared between the output callback and the waiting caller
struct PlaybackCursor {
    samples: Vec<f32>,
    position: usize,
    done: Option<mpsc::SyncSender<()>>,
}

impl AudioPlayback {
    /// Create a new audio playback instance
    ///
    /// # Errors
    ///
    /// Returns error if audio device cannot be opened
    pub fn new() -> Result<Self> {
        let device = cpal::default_host()
            .default_output_device()
            .ok_or_else(|| Error::Audio("no output device available".to_string()))?;

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            "audio playback initialized"
        );

        Ok(Self { device })
    }

    /// Play mono f32 samples at `sample_rate`
    ///
    /// # Errors
    ///
    /// Returns error if playback fails
    #[allow(clippy::unused_async)]
    pub async fn play(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        self.play_samples_blocking(samples, sample_rate)
    }

    /// Play audio from MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if decoding or playback fails
    #[allow(clippy::unused_async)]
    pub async fn play_mp3(&mut self, mp3_data: &[u8]) -> Result<()> {
        let (samples, sample_rate) = decode_mp3(mp3_data)?;
        self.play_samples_blocking(samples, sample_rate)
    }

    /// Find an output config for `sample_rate`, mono preferred
    fn output_config(&self, sample_rate: u32) -> Result<StreamConfig> {
        let rate = SampleRate(sample_rate);
        let fits = |c: &cpal::SupportedStreamConfigRange, channels: u16| {
            c.channels() == channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
        };

        let supported = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::Audio(e.to_string()))?
            .find(|c| fits(c, 1))
            .or_else(|| {
                // Fallback: try stereo
                self.device
                    .supported_output_configs()
                    .ok()?
                    .find(|c| fits(c, 2))
            })
            .ok_or_else(|| {
                Error::Audio(format!("no output config supports {sample_rate} Hz"))
            })?;

        Ok(supported.with_sample_rate(rate).config())
    }

    /// Play samples, returning once the device has consumed all of them
    fn play_samples_blocking(&self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        if samples.is_empty() || sample_rate == 0 {
            return Ok(());
        }

        let config = self.output_config(sample_rate)?;
        let channels = usize::from(config.channels);
        let sample_count = samples.len();

        let (done_tx, done_rx) = mpsc::sync_channel(1);
        let cursor = Arc::new(Mutex::new(PlaybackCursor {
            samples,
            position: 0,
            done: Some(done_tx),
        }));
        let callback_cursor = Arc::clone(&cursor);

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let Ok(mut cursor) = callback_cursor.lock() else {
                        data.fill(0.0);
                        return;
                    };

                    for frame in data.chunks_mut(channels) {
                        let sample = cursor.samples.get(cursor.position).copied();
                        frame.fill(sample.unwrap_or(0.0));
                        if sample.is_some() {
                            cursor.position += 1;
                        }
                    }

                    if cursor.position >= cursor.samples.len() {
                        if let Some(done) = cursor.done.take() {
                            let _ = done.try_send(());
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio playback error");
                },
                None,
            )
            .map_err(|e| Error::Audio(e.to_string()))?;

        stream.play().map_err(|e| Error::Audio(e.to_string()))?;

        let nominal = Duration::from_millis(sample_count as u64 * 1000 / u64::from(sample_rate));
        if !wait_until_heard(&done_rx, nominal) {
            tracing::warn!(samples = sample_count, "playback did not signal completion in time");
        }

        drop(stream);
        tracing::debug!(samples = sample_count, sample_rate, "playback complete");

        Ok(())
    }
}

/// Block until the output callback reports the last sample queued, then
/// give the device time to play out its final buffer
///
/// Returns `false` if no completion signal arrived within `nominal` plus
/// the drain grace period.
fn wait_until_heard(done: &mpsc::Receiver<()>, nominal: Duration) -> bool {
    let signalled = done.recv_timeout(nominal + DRAIN_GRACE).is_ok();
    std::thread::sleep(SETTLE);
    signalled
}

/// Decode MP3 bytes to mono f32 samples and their sample rate
fn decode_mp3(mp3_data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(0);

                // Convert i16 samples to f32 and handle stereo to mono
                if frame.channels == 2 {
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Audio(format!("MP3 decode error: {e}"))),
        }
    }

    Ok((samples, sample_rate))
}
