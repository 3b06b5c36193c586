//! Chat backend
//!
//! Sends the system prompt plus bounded history to an OpenAI-compatible
//! chat completion endpoint and keeps the history in step with the replies.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ChatConfig;
use crate::history::{ConversationHistory, Turn};
use crate::{Error, Result};

/// Persona sent as the system message on every request
pub const SYSTEM_PROMPT: &str = "You are a friendly, helpful, and conversational voice assistant.
Key traits:
- Be natural and conversational, like talking to a friend
- Keep responses concise but informative (1-3 sentences usually)
- Show personality and enthusiasm when appropriate
- Ask follow-up questions to keep conversation flowing
- Be helpful with any topic: science, history, math, advice, entertainment, etc.
- If you don't know something recent, acknowledge it but still try to help
- Remember the conversation context
- Be encouraging and positive
- Your replies are spoken aloud, so avoid markdown, lists and emoji";

/// Spoken when the chat backend fails
pub const CHAT_FALLBACK: &str =
    "I'm having a little trouble right now, but I'm still here to chat! Try asking me something else.";

/// A message on the chat wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// "system", "user" or "assistant"
    pub role: String,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// System message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.text.clone(),
        }
    }
}

/// Language model that turns a message list into a reply
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Generate the assistant reply for `messages`
    ///
    /// # Errors
    ///
    /// Returns error on transport, authentication or response-shape failures
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// `OpenAI` chat completions backend
pub struct OpenAiChat {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiChat {
    /// Create a backend for the configured model
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new(client: reqwest::Client, api_key: String, config: &ChatConfig) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required for chat".to_string()));
        }

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatBackend for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!(model = %self.model, messages = messages.len(), "sending chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Chat(format!("chat API error {status}: {body}")));
        }

        let result: ChatCompletionResponse = serde_json::from_str(&response.text().await?)?;
        parse_reply(result)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

fn parse_reply(response: ChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| Error::Chat("response contained no assistant text".to_string()))
}

/// Conversation state for the chat backend
///
/// Owns the history; a failed request leaves it exactly as it was before
/// the request.
pub struct ChatSession {
    backend: Box<dyn ChatBackend>,
    system_prompt: String,
    history: ConversationHistory,
}

impl ChatSession {
    /// Create a session with the default persona
    #[must_use]
    pub fn new(backend: Box<dyn ChatBackend>, history_cap: usize) -> Self {
        Self::with_prompt(backend, SYSTEM_PROMPT, history_cap)
    }

    /// Create a session with a custom system prompt
    pub fn with_prompt(
        backend: Box<dyn ChatBackend>,
        system_prompt: impl Into<String>,
        history_cap: usize,
    ) -> Self {
        Self {
            backend,
            system_prompt: system_prompt.into(),
            history: ConversationHistory::new(history_cap),
        }
    }

    /// Answer `text`, always returning something speakable
    ///
    /// The request carries the history as it would look with the user turn
    /// appended. Both turns are committed only once the backend answers, so
    /// on failure the history is unchanged and [`CHAT_FALLBACK`] is returned.
    pub async fn reply(&mut self, text: &str) -> String {
        let user_turn = Turn::user(text);

        let messages: Vec<ChatMessage> = std::iter::once(ChatMessage::system(&self.system_prompt))
            .chain(self.history.with_pending(&user_turn).map(ChatMessage::from))
            .collect();

        match self.backend.complete(&messages).await {
            Ok(reply) => {
                tracing::info!(backend = self.backend.name(), reply = %reply, "chat reply generated");
                self.history.push(user_turn);
                self.history.push(Turn::assistant(reply.clone()));
                reply
            }
            Err(e) => {
                tracing::error!(backend = self.backend.name(), error = %e, "chat request failed");
                CHAT_FALLBACK.to_string()
            }
        }
    }

    /// Forget every turn
    pub fn clear(&mut self) {
        tracing::info!(turns = self.history.len(), "clearing conversation history");
        self.history.clear();
    }

    /// Current history
    #[must_use]
    pub const fn history(&self) -> &ConversationHistory {
        &self.history
    }
}
