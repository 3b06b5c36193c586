//! Conversation loop
//!
//! A small state machine driven one utterance at a time:
//!
//! ```text
//!              pause                      exit / interrupt
//!  Listening ─────────► Paused      Listening ─────────────► Terminated
//!      ▲                  │
//!      └──────────────────┘
//!             resume
//! ```
//!
//! While paused only resume phrases are acted on; everything else is
//! dropped without a reply.

use std::future::Future;

use crate::browser::Browser;
use crate::chat::ChatSession;
use crate::history::ConversationHistory;
use crate::router::{CommandOutcome, CommandRouter};
use crate::voice::{Heard, Speaker, UtteranceSource};
use crate::weather::WeatherLookup;

/// Spoken once at startup
pub const GREETING: &str = "Hello! I'm your conversational assistant. I love to chat about anything and everything! What's on your mind today?";

/// Spoken when the session is interrupted rather than ended by command
pub const FAREWELL: &str = "Thanks for chatting! Goodbye!";

/// Conversation loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Acting on every utterance
    Listening,
    /// Waiting for a resume phrase
    Paused,
    /// Session over
    Terminated,
}

/// The voice assistant: routes utterances and drives the adapters
pub struct Assistant {
    input: Box<dyn UtteranceSource>,
    speaker: Box<dyn Speaker>,
    browser: Box<dyn Browser>,
    router: CommandRouter,
    chat: ChatSession,
    weather: WeatherLookup,
    state: LoopState,
}

impl Assistant {
    /// Assemble an assistant from its collaborators
    #[must_use]
    pub fn new(
        input: Box<dyn UtteranceSource>,
        speaker: Box<dyn Speaker>,
        browser: Box<dyn Browser>,
        chat: ChatSession,
        weather: WeatherLookup,
    ) -> Self {
        Self {
            input,
            speaker,
            browser,
            router: CommandRouter::default(),
            chat,
            weather,
            state: LoopState::Listening,
        }
    }

    /// Replace the default router
    #[must_use]
    pub fn with_router(mut self, router: CommandRouter) -> Self {
        self.router = router;
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> LoopState {
        self.state
    }

    /// Conversation history sent to the chat backend
    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        self.chat.history()
    }

    /// Run until an exit command, closed input, or Ctrl-C
    pub async fn run(&mut self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        })
        .await;
    }

    /// Run until an exit command, closed input, or `shutdown` resolves
    ///
    /// When `shutdown` fires the farewell is spoken before returning.
    pub async fn run_until<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tracing::info!("conversational voice assistant starting");
        tracing::info!("special commands:");
        tracing::info!("  'clear conversation' - start fresh");
        tracing::info!("  'stop listening' / 'start listening' - pause and resume");
        tracing::info!("  'open google' / 'open youtube' / 'search for ...' - web");
        tracing::info!("  'weather in <city>' - current weather");
        tracing::info!("  'exit' - end conversation");

        self.state = LoopState::Listening;
        self.say(GREETING).await;

        tokio::pin!(shutdown);

        while self.state != LoopState::Terminated {
            let interrupted = tokio::select! {
                _ = self.step() => false,
                () = &mut shutdown => true,
            };

            if interrupted {
                tracing::info!("chat ended by user");
                self.say(FAREWELL).await;
                self.state = LoopState::Terminated;
            }
        }

        tracing::info!("assistant stopped");
    }

    /// Listen once and act on what was heard
    pub async fn step(&mut self) -> LoopState {
        match self.input.listen().await {
            Heard::Utterance(utterance) => self.handle(&utterance).await,
            Heard::Nothing => self.state,
            Heard::Closed => {
                tracing::info!("input closed");
                self.say(FAREWELL).await;
                self.state = LoopState::Terminated;
                self.state
            }
        }
    }

    /// Act on one lower-cased utterance according to the current state
    pub async fn handle(&mut self, utterance: &str) -> LoopState {
        match self.state {
            LoopState::Terminated => {}
            LoopState::Paused => match self.router.route_paused(utterance) {
                Some(outcome) => self.execute(outcome, utterance).await,
                None => tracing::debug!(utterance, "paused, ignoring"),
            },
            LoopState::Listening => {
                let outcome = self.router.route(utterance);
                self.execute(outcome, utterance).await;
            }
        }

        self.state
    }

    async fn execute(&mut self, outcome: CommandOutcome, utterance: &str) {
        tracing::info!(command = outcome.kind(), utterance, "processing command");

        if let Some(confirmation) = outcome.confirmation() {
            self.say(&confirmation).await;
        }

        match outcome {
            CommandOutcome::Exit => self.state = LoopState::Terminated,
            CommandOutcome::Pause => self.state = LoopState::Paused,
            CommandOutcome::Resume => self.state = LoopState::Listening,
            CommandOutcome::ClearHistory => self.chat.clear(),
            CommandOutcome::OpenPage(page) => self.open(page.url()),
            CommandOutcome::RunSearch { url, .. } => self.open(&url),
            CommandOutcome::WeatherQuery(city) => {
                let report = self.weather.describe(&city).await;
                self.say(&report).await;
            }
            CommandOutcome::GeneralChat(text) => self.converse(&text).await,
            CommandOutcome::Unrecognized => self.converse(utterance).await,
        }
    }

    async fn converse(&mut self, text: &str) {
        tracing::info!("getting AI response");
        let reply = self.chat.reply(text).await;
        self.say(&reply).await;
    }

    fn open(&self, url: &str) {
        if let Err(e) = self.browser.open(url) {
            tracing::warn!(url, error = %e, "could not open browser");
        }
    }

    async fn say(&mut self, text: &str) {
        tracing::debug!(text, "speaking");
        if let Err(e) = self.speaker.speak(text).await {
            tracing::error!(error = %e, "speech synthesis failed");
        }
    }
}
