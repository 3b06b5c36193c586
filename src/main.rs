use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voice_companion::config::TtsProviderKind;
use voice_companion::voice::{
    AudioCapture, AudioPlayback, ConsoleInput, ConsoleSpeaker, Microphone, SAMPLE_RATE, Speaker,
    SpeechPipeline, SpeechToText, TextToSpeech, UtteranceSource, VoiceSpeaker, ambient_threshold,
    calculate_energy,
};
use voice_companion::{
    Assistant, ChatSession, CommandRouter, Config, Error, OpenAiChat, OpenWeatherMap,
    SystemBrowser, WeatherLookup,
};

/// Exit code for a missing or invalid configuration
const EXIT_CONFIG: u8 = 1;

/// Exit code for any other fatal error
const EXIT_UNHANDLED: u8 = 2;

/// Voice Companion - talk to a chat model, with a few built-in commands
#[derive(Parser)]
#[command(name = "companion", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Type instead of talking: read utterances from stdin and print replies
    #[arg(long, env = "COMPANION_TEXT_MODE")]
    text: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Show microphone levels against the calibrated speech threshold
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Play a chime through the reply output path
    TestSpeaker,
    /// Speak a sentence with the configured TTS provider and voice
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hi! This is how I will sound when we chat.")]
        text: String,
    },
    /// Interactive first-run setup
    Setup,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voice_companion=info",
        1 => "info,voice_companion=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let is_config = e
                .chain()
                .any(|cause| cause.downcast_ref::<Error>().is_some_and(Error::is_config));
            tracing::error!("fatal: {e:#}");
            eprintln!("An error occurred: {e:#}");
            if is_config {
                ExitCode::from(EXIT_CONFIG)
            } else {
                ExitCode::from(EXIT_UNHANDLED)
            }
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&text).await,
            Command::Setup => voice_companion::setup::run_setup(),
        };
    }

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let mut assistant = build_assistant(&config, cli.text).await?;
    tracing::info!(text_mode = cli.text, "voice companion ready");

    assistant.run().await;
    Ok(())
}

/// Wire the configured adapters into an assistant
#[allow(clippy::future_not_send)]
async fn build_assistant(config: &Config, text_mode: bool) -> anyhow::Result<Assistant> {
    let client = config.http_client()?;

    let chat_backend = OpenAiChat::new(client.clone(), config.api_keys.openai.clone(), &config.chat)?;
    let chat = ChatSession::new(Box::new(chat_backend), config.chat.history_cap);

    let weather = WeatherLookup::new(
        Box::new(OpenWeatherMap::new(client.clone(), &config.weather.base_url)),
        config.api_keys.weather.clone(),
    );

    let (input, speaker): (Box<dyn UtteranceSource>, Box<dyn Speaker>) = if text_mode {
        (Box::new(ConsoleInput::stdin()), Box::new(ConsoleSpeaker))
    } else {
        let stt_key = match config.voice.stt_provider {
            voice_companion::config::SttProviderKind::Whisper => config.api_keys.openai.clone(),
            voice_companion::config::SttProviderKind::Deepgram => {
                config.api_keys.deepgram.clone().unwrap_or_default()
            }
        };
        let stt = SpeechToText::new(
            client.clone(),
            config.voice.stt_provider,
            stt_key,
            config.voice.stt_model.clone(),
        )?;

        let mut microphone = Microphone::open(config.voice.listen_timeout, config.voice.phrase_limit)?;
        microphone.calibrate(config.voice.calibration).await;

        let speaker = VoiceSpeaker::new(
            TextToSpeech::new(client, tts_key(config), &config.voice)?,
            AudioPlayback::new()?,
            config.voice.post_speech_delay,
        );

        (
            Box::new(SpeechPipeline::new(Box::new(microphone), Box::new(stt))),
            Box::new(speaker),
        )
    };

    Ok(Assistant::new(input, speaker, Box::new(SystemBrowser), chat, weather)
        .with_router(CommandRouter::new(&config.weather.default_city)))
}

fn tts_key(config: &Config) -> String {
    match config.voice.tts_provider {
        TtsProviderKind::OpenAi => config.api_keys.openai.clone(),
        TtsProviderKind::ElevenLabs => config.api_keys.elevenlabs.clone().unwrap_or_default(),
    }
}

/// Width of the level meter in characters
const METER_WIDTH: usize = 40;

/// Show live microphone levels against the speech threshold the assistant would use
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    let config = Config::load().ok();
    let calibration = config
        .as_ref()
        .map_or(Duration::from_secs(1), |c| c.voice.calibration);

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Stay quiet for {} ms while the room is measured...", calibration.as_millis());
    capture.clear_buffer();
    tokio::time::sleep(calibration).await;
    let noise = calculate_energy(&capture.take_buffer());
    let threshold = ambient_threshold(noise);
    println!("Ambient level {noise:.4}, speech threshold {threshold:.4}\n");
    println!("Now talk for {duration} seconds; '|' marks the threshold.");

    let mut voiced_seconds = 0;
    for second in 1..=duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let energy = calculate_energy(&capture.take_buffer());
        let heard = energy > threshold;
        if heard {
            voiced_seconds += 1;
        }

        println!(
            "[{second:2}s] {} {energy:.4}{}",
            level_meter(energy, threshold),
            if heard { "  speech" } else { "" }
        );
    }

    capture.stop();

    println!();
    if voiced_seconds == 0 {
        println!("Nothing crossed the threshold. Check the input device and its volume,");
        println!("or lengthen `calibration_ms` under [voice] in config.toml if the room was noisy.");
    } else {
        println!("Speech detected in {voiced_seconds} of {duration} seconds; the microphone is usable.");
    }

    Ok(())
}

/// Render `energy` as a bar with the threshold position marked
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn level_meter(energy: f32, threshold: f32) -> String {
    let scale = |level: f32| ((level * 200.0) as usize).min(METER_WIDTH - 1);
    let filled = scale(energy);
    let mark = scale(threshold);

    (0..METER_WIDTH)
        .map(|i| match i {
            _ if i == mark => '|',
            _ if i < filled => '#',
            _ => '.',
        })
        .collect()
}

/// Play a short rising chime through the output path used for replies
async fn test_speaker() -> anyhow::Result<()> {
    let mut playback = AudioPlayback::new()?;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = [523.25_f32, 659.25, 783.99]
        .iter()
        .flat_map(|&frequency| {
            (0..SAMPLE_RATE / 3).map(move |i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.25
            })
        })
        .collect();

    println!("Playing a three-note chime at {SAMPLE_RATE} Hz...");
    playback.play(samples, SAMPLE_RATE).await?;

    println!("If you heard three rising notes, replies will be audible.");
    println!("Otherwise check the default output device; the companion always uses it.");

    Ok(())
}

/// Synthesize and play `text` with the configured provider and voice
async fn test_tts(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    println!(
        "Provider {:?}, model {}, voice {}",
        config.voice.tts_provider, config.voice.tts_model, config.voice.tts_voice
    );

    let tts = TextToSpeech::new(config.http_client()?, tts_key(&config), &config.voice)?;
    let mp3_data = tts.synthesize(text).await?;
    println!("Received {} bytes of audio, playing...", mp3_data.len());

    let mut playback = AudioPlayback::new()?;
    playback.play_mp3(&mp3_data).await?;

    println!("Change the voice with `companion setup` or `tts_voice` under [voice] in config.toml.");

    Ok(())
}
