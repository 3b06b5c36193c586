//! Command routing
//!
//! Classifies a lower-cased utterance into exactly one [`CommandOutcome`].
//! Rules are evaluated top to bottom and the first match wins, so the order
//! of [`RULES`] is the precedence. Phrases overlap ("open google" versus
//! "google cats"), which is why the table is ordered rather than a set.

/// City used when a weather request names none
pub const DEFAULT_CITY: &str = "New York";

const EXIT_PHRASES: &[&str] = &["exit", "quit", "goodbye", "stop assistant", "shut down"];
const PAUSE_PHRASES: &[&str] = &["stop listening", "pause"];
const RESUME_PHRASES: &[&str] = &["start listening", "resume"];
const CLEAR_PHRASES: &[&str] = &["clear conversation", "forget conversation", "start over"];
const OPEN_GOOGLE_PHRASES: &[&str] = &["open google", "open chrome"];
const OPEN_YOUTUBE_PHRASES: &[&str] = &["open youtube"];
const SEARCH_PHRASES: &[&str] = &["search for", "google"];
const WEATHER_PHRASES: &[&str] = &["weather"];

/// Fillers dropped from the end of an extracted city
const CITY_TRAILERS: &[&str] = &[" please", " today"];

/// Web page the assistant knows how to open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Google home page
    Google,
    /// `YouTube` home page
    YouTube,
}

impl Page {
    /// Address opened in the browser
    #[must_use]
    pub const fn url(self) -> &'static str {
        match self {
            Self::Google => "https://google.com",
            Self::YouTube => "https://youtube.com",
        }
    }
}

/// Result of routing one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// End the session
    Exit,
    /// Stop responding until resumed
    Pause,
    /// Respond again after a pause
    Resume,
    /// Forget the conversation so far
    ClearHistory,
    /// Open a web page
    OpenPage(Page),
    /// Open a search results page
    RunSearch {
        /// What to search for
        query: String,
        /// Search results URL
        url: String,
    },
    /// Look up the weather for a city
    WeatherQuery(String),
    /// Hand the utterance to the chat backend
    GeneralChat(String),
    /// A command phrase matched but carried nothing usable; answered by chat
    Unrecognized,
}

impl CommandOutcome {
    /// Sentence spoken when the command is handled locally
    #[must_use]
    pub fn confirmation(&self) -> Option<String> {
        let text = match self {
            Self::Exit => "It was great talking with you! Goodbye!",
            Self::Pause => {
                "I'll pause for a moment. Say 'start listening' when you're ready to chat again."
            }
            Self::Resume => "I'm back! What would you like to talk about?",
            Self::ClearHistory => "Fresh start! I've cleared our conversation. What's on your mind?",
            Self::OpenPage(Page::Google) => "Opening Google for you!",
            Self::OpenPage(Page::YouTube) => "Opening YouTube! Enjoy!",
            Self::RunSearch { query, .. } => return Some(format!("Searching for {query}! Here you go.")),
            Self::WeatherQuery(_) | Self::GeneralChat(_) | Self::Unrecognized => return None,
        };
        Some(text.to_string())
    }

    /// Short label for logs
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::ClearHistory => "clear",
            Self::OpenPage(_) => "web",
            Self::RunSearch { .. } => "search",
            Self::WeatherQuery(_) => "weather",
            Self::GeneralChat(_) => "chat",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// One routing rule: a name for logs and tests, and a matcher
pub struct Rule {
    /// Rule name
    pub name: &'static str,
    apply: fn(&CommandRouter, &str) -> Option<CommandOutcome>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Routing rules in precedence order
pub static RULES: &[Rule] = &[
    Rule {
        name: "exit",
        apply: |_, u| contains_any(u, EXIT_PHRASES).then_some(CommandOutcome::Exit),
    },
    Rule {
        name: "pause",
        apply: |_, u| contains_any(u, PAUSE_PHRASES).then_some(CommandOutcome::Pause),
    },
    Rule {
        name: "resume",
        apply: |_, u| contains_any(u, RESUME_PHRASES).then_some(CommandOutcome::Resume),
    },
    Rule {
        name: "clear",
        apply: |_, u| contains_any(u, CLEAR_PHRASES).then_some(CommandOutcome::ClearHistory),
    },
    Rule {
        name: "open-google",
        apply: |_, u| {
            contains_any(u, OPEN_GOOGLE_PHRASES).then_some(CommandOutcome::OpenPage(Page::Google))
        },
    },
    Rule {
        name: "open-youtube",
        apply: |_, u| {
            contains_any(u, OPEN_YOUTUBE_PHRASES)
                .then_some(CommandOutcome::OpenPage(Page::YouTube))
        },
    },
    Rule {
        name: "search",
        apply: |_, u| contains_any(u, SEARCH_PHRASES).then(|| search_outcome(u)),
    },
    Rule {
        name: "weather",
        apply: |router, u| {
            contains_any(u, WEATHER_PHRASES)
                .then(|| CommandOutcome::WeatherQuery(extract_city(u, &router.default_city)))
        },
    },
];

/// Routes utterances through [`RULES`]
#[derive(Debug, Clone)]
pub struct CommandRouter {
    default_city: String,
}

impl Default for CommandRouter {
    fn default() -> Self {
        Self::new(DEFAULT_CITY)
    }
}

impl CommandRouter {
    /// Create a router that falls back to `default_city` for weather requests
    pub fn new(default_city: impl Into<String>) -> Self {
        Self {
            default_city: default_city.into(),
        }
    }

    /// Classify an utterance while listening
    #[must_use]
    pub fn route(&self, utterance: &str) -> CommandOutcome {
        for rule in RULES {
            if let Some(outcome) = (rule.apply)(self, utterance) {
                tracing::debug!(rule = rule.name, outcome = outcome.kind(), "rule matched");
                return outcome;
            }
        }

        CommandOutcome::GeneralChat(utterance.to_string())
    }

    /// Classify an utterance while paused: only resume phrases count
    #[must_use]
    pub fn route_paused(&self, utterance: &str) -> Option<CommandOutcome> {
        contains_any(utterance, RESUME_PHRASES).then_some(CommandOutcome::Resume)
    }
}

fn contains_any(utterance: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| utterance.contains(p))
}

fn search_outcome(utterance: &str) -> CommandOutcome {
    let mut query = utterance.to_string();
    for phrase in SEARCH_PHRASES {
        query = query.replace(phrase, "");
    }
    let query = query.trim();

    if query.is_empty() {
        return CommandOutcome::Unrecognized;
    }

    CommandOutcome::RunSearch {
        url: search_url(query),
        query: query.to_string(),
    }
}

/// Google search URL for a query, spaces joined with `+`
#[must_use]
pub fn search_url(query: &str) -> String {
    format!("https://google.com/search?q={}", query.replace(' ', "+"))
}

/// Pull the city out of a weather request
///
/// Takes the text after the first `" in "` (or `" for "` when there is no
/// `" in "`), then drops trailing punctuation and fillers like "please".
/// Returns `default` when nothing usable remains.
#[must_use]
pub fn extract_city(utterance: &str, default: &str) -> String {
    let tail = [" in ", " for "]
        .iter()
        .find_map(|marker| utterance.find(marker).map(|pos| &utterance[pos + marker.len()..]));

    let Some(mut city) = tail else {
        return default.to_string();
    };

    loop {
        let trimmed = city
            .trim()
            .trim_end_matches(|c: char| matches!(c, '?' | '.' | '!' | ','))
            .trim_end();
        let stripped = CITY_TRAILERS
            .iter()
            .find_map(|t| trimmed.strip_suffix(t))
            .unwrap_or(trimmed);
        if stripped.len() == city.len() {
            break;
        }
        city = stripped;
    }

    if city.is_empty() || CITY_TRAILERS.iter().any(|t| t.trim() == city) {
        default.to_string()
    } else {
        city.to_string()
    }
}
