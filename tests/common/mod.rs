//! Shared test utilities: in-memory stand-ins for every external collaborator

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use voice_companion::voice::{Heard, Speaker, UtteranceSource};
use voice_companion::weather::{Condition, CurrentWeather, MainReadings};
use voice_companion::{
    Assistant, Browser, ChatBackend, ChatMessage, ChatSession, Error, Result, WeatherApi,
    WeatherLookup,
};

/// Plays back a fixed list of utterances, then reports closed input
pub struct ScriptedInput {
    script: VecDeque<Heard>,
}

impl ScriptedInput {
    pub fn utterances(lines: &[&str]) -> Self {
        Self {
            script: lines
                .iter()
                .map(|l| Heard::Utterance((*l).to_string()))
                .collect(),
        }
    }

    pub fn from_heard(script: Vec<Heard>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

#[async_trait(?Send)]
impl UtteranceSource for ScriptedInput {
    async fn listen(&mut self) -> Heard {
        self.script.pop_front().unwrap_or(Heard::Closed)
    }
}

/// Records everything spoken
#[derive(Clone, Default)]
pub struct RecordingSpeaker {
    pub spoken: Arc<Mutex<Vec<String>>>,
    pub fail: bool,
}

impl RecordingSpeaker {
    pub fn lines(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait(?Send)]
impl Speaker for RecordingSpeaker {
    async fn speak(&mut self, text: &str) -> Result<()> {
        self.spoken.lock().unwrap().push(text.to_string());
        if self.fail {
            return Err(Error::Tts("speaker unplugged".to_string()));
        }
        Ok(())
    }
}

/// Records every URL opened
#[derive(Clone, Default)]
pub struct RecordingBrowser {
    pub opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingBrowser {
    pub fn urls(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl Browser for RecordingBrowser {
    fn open(&self, url: &str) -> Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        Ok(())
    }
}

/// Chat backend that counts calls and optionally fails
#[derive(Clone, Default)]
pub struct CountingChat {
    pub calls: Arc<AtomicUsize>,
    pub last_request: Arc<Mutex<Vec<ChatMessage>>>,
    pub fail: bool,
}

impl CountingChat {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatBackend for CountingChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self.last_request.lock().unwrap() = messages.to_vec();
        if self.fail {
            return Err(Error::Chat("backend down".to_string()));
        }
        Ok(format!("chat reply {n}"))
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// What the fake weather API should answer
#[derive(Clone, Copy)]
pub enum WeatherBehavior {
    Sunny,
    Status(u16),
    Broken,
}

/// Weather API that counts calls
#[derive(Clone)]
pub struct CountingWeather {
    pub calls: Arc<AtomicUsize>,
    pub cities: Arc<Mutex<Vec<String>>>,
    pub behavior: WeatherBehavior,
}

impl CountingWeather {
    pub fn new(behavior: WeatherBehavior) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            cities: Arc::new(Mutex::new(Vec::new())),
            behavior,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherApi for CountingWeather {
    async fn current(&self, city: &str, _api_key: &str) -> Result<CurrentWeather> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cities.lock().unwrap().push(city.to_string());
        match self.behavior {
            WeatherBehavior::Sunny => Ok(CurrentWeather {
                main: MainReadings {
                    temp: 72.4,
                    feels_like: None,
                    humidity: None,
                },
                weather: vec![Condition {
                    description: "sunny".to_string(),
                }],
            }),
            WeatherBehavior::Status(status) => Err(Error::WeatherStatus { status }),
            WeatherBehavior::Broken => Err(Error::Weather("unexpected weather response".to_string())),
        }
    }
}

/// Handles to the fakes wired into a test assistant
pub struct Harness {
    pub speaker: RecordingSpeaker,
    pub browser: RecordingBrowser,
    pub chat: CountingChat,
    pub weather: CountingWeather,
}

/// Build an assistant over `input` with recording fakes and a weather key
pub fn assistant_with(input: ScriptedInput) -> (Assistant, Harness) {
    assistant_with_options(
        input,
        CountingChat::default(),
        CountingWeather::new(WeatherBehavior::Sunny),
        Some("weather-key"),
        30,
    )
}

/// Build an assistant with explicit backends, weather key and history cap
pub fn assistant_with_options(
    input: ScriptedInput,
    chat: CountingChat,
    weather: CountingWeather,
    weather_key: Option<&str>,
    history_cap: usize,
) -> (Assistant, Harness) {
    let harness = Harness {
        speaker: RecordingSpeaker::default(),
        browser: RecordingBrowser::default(),
        chat,
        weather,
    };

    let assistant = Assistant::new(
        Box::new(input),
        Box::new(harness.speaker.clone()),
        Box::new(harness.browser.clone()),
        ChatSession::new(Box::new(harness.chat.clone()), history_cap),
        WeatherLookup::new(
            Box::new(harness.weather.clone()),
            weather_key.map(str::to_string),
        ),
    );

    (assistant, harness)
}

/// One captured HTTP request
pub struct CapturedRequest {
    /// Request line and headers, lower-cased
    pub head: String,
    /// Raw body
    pub body: String,
}

/// Serve a single canned HTTP response on a local port
///
/// Returns the base URL and a handle resolving to the request received.
pub async fn serve_once(
    status: u16,
    body: &'static str,
) -> (String, tokio::task::JoinHandle<CapturedRequest>) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();

        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before headers");
            raw.extend_from_slice(&chunk[..n]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&raw[..header_end]).to_lowercase();
        let content_length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .map_or(0, |v| v.trim().parse::<usize>().unwrap());

        while raw.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before body");
            raw.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&raw[header_end..]).into_owned();

        let response = format!(
            "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.unwrap();

        CapturedRequest {
            head,
            body: request_body,
        }
    });

    (base_url, handle)
}
