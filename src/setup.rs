//! Interactive first-run setup wizard (`companion setup`)

use std::path::{Path, PathBuf};

use dialoguer::{Confirm, Input, Select};

use crate::config::file::{CompanionConfigFile, LlmFileConfig, VoiceFileConfig};
use crate::config::{DEFAULT_ELEVENLABS_VOICE, DEFAULT_MODEL};

/// Run the interactive setup wizard
///
/// # Errors
///
/// Returns error if user input fails or config cannot be written
pub fn run_setup() -> anyhow::Result<()> {
    println!("Voice Companion Setup\n");

    let mut config = crate::config::file::load_config_file();
    let config_path = crate::config::file::config_file_path()
        .unwrap_or_else(|| PathBuf::from("voice-companion.toml"));

    if config_path.exists() {
        println!("Existing config found at {}\n", config_path.display());
    }

    // 1. OpenAI key (required for chat, Whisper and TTS)
    config.api_keys.openai = prompt_key("OpenAI API key (OPENAI_API_KEY)", config.api_keys.openai)?;
    if config.api_keys.openai.is_none() {
        println!("Note: the assistant will not start without an OpenAI API key.");
    }

    // 2. Weather key (optional)
    let want_weather = Confirm::new()
        .with_prompt("Configure an OpenWeatherMap key for weather questions?")
        .default(config.api_keys.weather.is_some())
        .interact()?;
    if want_weather {
        config.api_keys.weather =
            prompt_key("OpenWeatherMap API key (WEATHER_API_KEY)", config.api_keys.weather)?;
    }

    // 3. Chat model
    let model: String = Input::new()
        .with_prompt("Chat model")
        .default(config.llm.model.clone().unwrap_or_else(|| DEFAULT_MODEL.to_string()))
        .interact_text()?;
    config.llm = LlmFileConfig {
        model: Some(model),
        ..config.llm
    };

    // 4. Voice
    let tts_providers = ["openai", "elevenlabs"];
    let default_tts = config
        .voice
        .tts_provider
        .as_deref()
        .and_then(|p| tts_providers.iter().position(|&l| l == p))
        .unwrap_or(0);
    let tts_idx = Select::new()
        .with_prompt("Text-to-speech provider")
        .items(&tts_providers)
        .default(default_tts)
        .interact()?;

    if tts_providers[tts_idx] == "elevenlabs" {
        config.api_keys.elevenlabs =
            prompt_key("ElevenLabs API key (ELEVENLABS_API_KEY)", config.api_keys.elevenlabs)?;
    }

    let default_voice = match tts_providers[tts_idx] {
        "elevenlabs" => DEFAULT_ELEVENLABS_VOICE,
        _ => "alloy",
    };
    let tts_voice: String = Input::new()
        .with_prompt("Voice")
        .default(
            config
                .voice
                .tts_voice
                .clone()
                .unwrap_or_else(|| default_voice.to_string()),
        )
        .interact_text()?;

    config.voice = VoiceFileConfig {
        tts_provider: Some(tts_providers[tts_idx].to_string()),
        tts_voice: Some(tts_voice),
        ..config.voice
    };

    // 5. Write
    write_config(&config_path, &config)?;
    println!("\nConfig written to {}", config_path.display());
    println!("\nSetup complete! Run `companion -v` to start, or `companion --text` without a microphone.");

    Ok(())
}

/// Ask for a secret, showing a masked version of the current value
fn prompt_key(label: &str, existing: Option<String>) -> anyhow::Result<Option<String>> {
    let prompt = existing.as_deref().map_or_else(
        || label.to_string(),
        |k| format!("{label} (current: {}, leave blank to keep)", mask(k)),
    );

    let input: String = Input::new()
        .with_prompt(&prompt)
        .allow_empty(true)
        .interact_text()?;

    let input = input.trim();
    Ok(if input.is_empty() {
        existing
    } else {
        Some(input.to_string())
    })
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{head}...{tail}")
    } else {
        "****".to_string()
    }
}

/// Serialize and write the config file
fn write_config(path: &Path, config: &CompanionConfigFile) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    std::fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}
