//! Voice Companion - a voice-driven conversational assistant
//!
//! Captures speech, transcribes it, routes it to a built-in command
//! (exit, pause/resume, clear history, open a page, search, weather) or to a
//! chat model, and speaks the result back.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 Assistant (loop)                      │
//! │   Listening ⇄ Paused → Terminated                     │
//! └───────┬───────────────┬───────────────┬──────────────┘
//!         │               │               │
//! ┌───────▼──────┐ ┌──────▼──────┐ ┌──────▼───────────────┐
//! │ Utterances   │ │ Router      │ │ Chat / Weather /     │
//! │ mic+STT, or  │ │ ordered     │ │ Browser / Speaker    │
//! │ console      │ │ rules       │ │                      │
//! └──────────────┘ └─────────────┘ └──────────────────────┘
//! ```

pub mod assistant;
pub mod browser;
pub mod chat;
pub mod config;
pub mod error;
pub mod history;
pub mod router;
pub mod setup;
pub mod voice;
pub mod weather;

pub use assistant::{Assistant, FAREWELL, GREETING, LoopState};
pub use browser::{Browser, SystemBrowser};
pub use chat::{CHAT_FALLBACK, ChatBackend, ChatMessage, ChatSession, OpenAiChat, SYSTEM_PROMPT};
pub use config::Config;
pub use error::{Error, Result};
pub use history::{ConversationHistory, Role, Turn};
pub use router::{CommandOutcome, CommandRouter, Page};
pub use weather::{OpenWeatherMap, WeatherApi, WeatherLookup};
