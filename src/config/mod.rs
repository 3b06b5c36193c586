//! Configuration management for the voice companion
//!
//! Sources in priority order: environment (a `.env` file is loaded first),
//! the TOML config file, then built-in defaults.

pub mod file;

use std::time::Duration;

use crate::{Error, Result};

use file::CompanionConfigFile;

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default OpenAI-compatible API base
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default `ElevenLabs` voice ("Rachel")
pub const DEFAULT_ELEVENLABS_VOICE: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default current-weather endpoint
pub const DEFAULT_WEATHER_URL: &str = "http://api.openweathermap.org/data/2.5/weather";

/// Voice companion configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat backend configuration
    pub chat: ChatConfig,

    /// Voice processing configuration
    pub voice: VoiceConfig,

    /// Weather lookup configuration
    pub weather: WeatherConfig,

    /// API keys
    pub api_keys: ApiKeys,

    /// Timeout applied to every outbound HTTP request
    pub http_timeout: Duration,
}

/// Chat backend configuration
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Model identifier for chat completions
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub base_url: String,

    /// Completion token cap
    pub max_tokens: u32,

    /// Sampling temperature
    pub temperature: f32,

    /// Maximum number of turns kept in history
    pub history_cap: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            max_tokens: 500,
            temperature: 0.15,
            history_cap: 30,
        }
    }
}

/// STT provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SttProviderKind {
    /// `OpenAI` Whisper
    Whisper,
    /// Deepgram
    Deepgram,
}

/// TTS provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtsProviderKind {
    /// `OpenAI` speech
    OpenAi,
    /// `ElevenLabs`
    ElevenLabs,
}

/// Voice processing configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT provider
    pub stt_provider: SttProviderKind,

    /// STT model (e.g. "whisper-1", "nova-2")
    pub stt_model: String,

    /// TTS provider
    pub tts_provider: TtsProviderKind,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// TTS voice identifier
    pub tts_voice: String,

    /// TTS speed multiplier (0.25 to 4.0)
    pub tts_speed: f32,

    /// How long to wait for speech to start
    pub listen_timeout: Duration,

    /// Longest phrase captured in one segment
    pub phrase_limit: Duration,

    /// Ambient noise calibration window
    pub calibration: Duration,

    /// Pause after each spoken reply before listening again.
    ///
    /// Playback already blocks until the output buffer drains; this is an
    /// extra settle period for audio stacks that report completion early.
    pub post_speech_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            stt_provider: SttProviderKind::Whisper,
            stt_model: "whisper-1".to_string(),
            tts_provider: TtsProviderKind::OpenAi,
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            tts_speed: 1.0,
            listen_timeout: Duration::from_secs(5),
            phrase_limit: Duration::from_secs(30),
            calibration: Duration::from_millis(1000),
            post_speech_delay: Duration::ZERO,
        }
    }
}

/// Weather lookup configuration
#[derive(Debug, Clone)]
pub struct WeatherConfig {
    /// Current-weather endpoint
    pub base_url: String,

    /// City used when the utterance names none
    pub default_city: String,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WEATHER_URL.to_string(),
            default_city: crate::router::DEFAULT_CITY.to_string(),
        }
    }
}

/// API keys for external services
#[derive(Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (chat, Whisper, TTS); required
    pub openai: String,

    /// `OpenWeatherMap` API key
    pub weather: Option<String>,

    /// Deepgram API key (optional STT)
    pub deepgram: Option<String>,

    /// `ElevenLabs` API key (optional TTS)
    pub elevenlabs: Option<String>,
}

impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeys")
            .field("openai", &"<redacted>")
            .field("weather", &self.weather.as_ref().map(|_| "<redacted>"))
            .field("deepgram", &self.deepgram.as_ref().map(|_| "<redacted>"))
            .field("elevenlabs", &self.elevenlabs.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from `.env`, the process environment and the config file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the `OpenAI` API key is missing or a value is invalid
    pub fn load() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }

        let fc = file::load_config_file();
        Self::from_sources(|key| std::env::var(key).ok(), fc)
    }

    /// Build configuration from an environment lookup and a parsed config file
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the `OpenAI` API key is missing or a value is invalid
    pub fn from_sources<F>(env: F, fc: CompanionConfigFile) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let openai = env("OPENAI_API_KEY")
            .or(fc.api_keys.openai)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "OPENAI_API_KEY is required (set it in the environment, .env, or config.toml)"
                        .to_string(),
                )
            })?;

        let api_keys = ApiKeys {
            openai,
            weather: env("WEATHER_API_KEY").or(fc.api_keys.weather),
            deepgram: env("DEEPGRAM_API_KEY").or(fc.api_keys.deepgram),
            elevenlabs: env("ELEVENLABS_API_KEY").or(fc.api_keys.elevenlabs),
        };

        let defaults = ChatConfig::default();
        let history_cap = match env("COMPANION_HISTORY_CAP") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::Config(format!("COMPANION_HISTORY_CAP must be a number, got {raw:?}"))
            })?,
            None => fc.llm.history_cap.unwrap_or(defaults.history_cap),
        };
        if history_cap == 0 {
            return Err(Error::Config("history cap must be at least 1".to_string()));
        }

        let chat = ChatConfig {
            model: env("COMPANION_MODEL")
                .or(fc.llm.model)
                .unwrap_or(defaults.model),
            base_url: env("OPENAI_BASE_URL")
                .or(fc.llm.base_url)
                .unwrap_or(defaults.base_url),
            max_tokens: fc.llm.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: fc.llm.temperature.unwrap_or(defaults.temperature),
            history_cap,
        };

        let http_timeout_secs = match env("COMPANION_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|_| {
                Error::Config(format!(
                    "COMPANION_HTTP_TIMEOUT_SECS must be a number, got {raw:?}"
                ))
            })?,
            None => fc.llm.timeout_secs.unwrap_or(20),
        };

        let vd = VoiceConfig::default();
        let stt_provider = match fc.voice.stt_provider.as_deref() {
            None | Some("whisper") => SttProviderKind::Whisper,
            Some("deepgram") => SttProviderKind::Deepgram,
            Some(other) => {
                return Err(Error::Config(format!("unknown STT provider: {other}")));
            }
        };
        let tts_provider = match fc.voice.tts_provider.as_deref() {
            None | Some("openai") => TtsProviderKind::OpenAi,
            Some("elevenlabs") => TtsProviderKind::ElevenLabs,
            Some(other) => {
                return Err(Error::Config(format!("unknown TTS provider: {other}")));
            }
        };

        let voice = VoiceConfig {
            stt_provider,
            stt_model: env("COMPANION_STT_MODEL")
                .or(fc.voice.stt_model)
                .unwrap_or_else(|| match stt_provider {
                    SttProviderKind::Whisper => vd.stt_model.clone(),
                    SttProviderKind::Deepgram => "nova-2".to_string(),
                }),
            tts_provider,
            tts_model: env("COMPANION_TTS_MODEL")
                .or(fc.voice.tts_model)
                .unwrap_or_else(|| match tts_provider {
                    TtsProviderKind::OpenAi => vd.tts_model.clone(),
                    TtsProviderKind::ElevenLabs => "eleven_monolingual_v1".to_string(),
                }),
            tts_voice: fc.voice.tts_voice.unwrap_or_else(|| match tts_provider {
                TtsProviderKind::OpenAi => vd.tts_voice.clone(),
                TtsProviderKind::ElevenLabs => DEFAULT_ELEVENLABS_VOICE.to_string(),
            }),
            tts_speed: fc.voice.tts_speed.unwrap_or(vd.tts_speed).clamp(0.25, 4.0),
            listen_timeout: fc
                .voice
                .listen_timeout_secs
                .map_or(vd.listen_timeout, Duration::from_secs),
            phrase_limit: fc
                .voice
                .phrase_limit_secs
                .map_or(vd.phrase_limit, Duration::from_secs),
            calibration: fc
                .voice
                .calibration_ms
                .map_or(vd.calibration, Duration::from_millis),
            post_speech_delay: fc
                .voice
                .post_speech_delay_ms
                .map_or(vd.post_speech_delay, Duration::from_millis),
        };

        let wd = WeatherConfig::default();
        let weather = WeatherConfig {
            base_url: env("WEATHER_BASE_URL")
                .or(fc.weather.base_url)
                .unwrap_or(wd.base_url),
            default_city: fc.weather.default_city.unwrap_or(wd.default_city),
        };

        if api_keys.weather.is_none() {
            tracing::info!("no weather API key configured, weather lookups will apologize");
        }

        Ok(Self {
            chat,
            voice,
            weather,
            api_keys,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }

    /// Build a `reqwest` client carrying the configured request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialized
    pub fn http_client(&self) -> Result<reqwest::Client> {
        http_client(self.http_timeout)
    }
}

/// Build a `reqwest` client with a uniform request timeout
///
/// # Errors
///
/// Returns error if the TLS backend cannot be initialized
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_openai_key_is_fatal() {
        let err = Config::from_sources(env_from(&[]), CompanionConfigFile::default()).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_blank_openai_key_is_fatal() {
        let err = Config::from_sources(
            env_from(&[("OPENAI_API_KEY", "   ")]),
            CompanionConfigFile::default(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_sources(
            env_from(&[("OPENAI_API_KEY", "sk-test")]),
            CompanionConfigFile::default(),
        )
        .unwrap();

        assert_eq!(config.chat.model, DEFAULT_MODEL);
        assert_eq!(config.chat.max_tokens, 500);
        assert!((config.chat.temperature - 0.15).abs() < f32::EPSILON);
        assert_eq!(config.chat.history_cap, 30);
        assert!(config.api_keys.weather.is_none());
        assert_eq!(config.weather.default_city, "New York");
        assert_eq!(config.voice.listen_timeout, Duration::from_secs(5));
        assert_eq!(config.voice.phrase_limit, Duration::from_secs(30));
        assert_eq!(config.http_timeout, Duration::from_secs(20));
        assert_eq!(config.voice.tts_voice, "alloy");
    }

    #[test]
    fn test_elevenlabs_gets_its_own_default_voice() {
        let mut fc = CompanionConfigFile::default();
        fc.voice.tts_provider = Some("elevenlabs".to_string());

        let config = Config::from_sources(env_from(&[("OPENAI_API_KEY", "sk")]), fc).unwrap();

        assert_eq!(config.voice.tts_provider, TtsProviderKind::ElevenLabs);
        assert_eq!(config.voice.tts_voice, DEFAULT_ELEVENLABS_VOICE);
        assert_eq!(config.voice.tts_model, "eleven_monolingual_v1");

        let mut fc = CompanionConfigFile::default();
        fc.voice.tts_provider = Some("elevenlabs".to_string());
        fc.voice.tts_voice = Some("custom-voice".to_string());
        let config = Config::from_sources(env_from(&[("OPENAI_API_KEY", "sk")]), fc).unwrap();
        assert_eq!(config.voice.tts_voice, "custom-voice");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut fc = CompanionConfigFile::default();
        fc.api_keys.openai = Some("sk-file".to_string());
        fc.api_keys.weather = Some("w-file".to_string());
        fc.llm.model = Some("file-model".to_string());

        let config = Config::from_sources(
            env_from(&[("COMPANION_MODEL", "env-model"), ("WEATHER_API_KEY", "w-env")]),
            fc,
        )
        .unwrap();

        assert_eq!(config.api_keys.openai, "sk-file");
        assert_eq!(config.api_keys.weather.as_deref(), Some("w-env"));
        assert_eq!(config.chat.model, "env-model");
    }

    #[test]
    fn test_invalid_history_cap() {
        let err = Config::from_sources(
            env_from(&[("OPENAI_API_KEY", "sk"), ("COMPANION_HISTORY_CAP", "lots")]),
            CompanionConfigFile::default(),
        )
        .unwrap_err();
        assert!(err.is_config());

        let err = Config::from_sources(
            env_from(&[("OPENAI_API_KEY", "sk"), ("COMPANION_HISTORY_CAP", "0")]),
            CompanionConfigFile::default(),
        )
        .unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut fc = CompanionConfigFile::default();
        fc.voice.stt_provider = Some("carrier-pigeon".to_string());

        let err = Config::from_sources(env_from(&[("OPENAI_API_KEY", "sk")]), fc).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_api_keys_debug_redacts() {
        let keys = ApiKeys {
            openai: "sk-secret".to_string(),
            weather: Some("w-secret".to_string()),
            ..ApiKeys::default()
        };
        let rendered = format!("{keys:?}");
        assert!(!rendered.contains("secret"));
    }
}
