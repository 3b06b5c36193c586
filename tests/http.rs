//! HTTP adapter tests against a local canned server

use std::time::Duration;

use voice_companion::config::ChatConfig;
use voice_companion::{ChatBackend, ChatMessage, Error, OpenAiChat, OpenWeatherMap, WeatherApi};

mod common;

use common::serve_once;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_weather_request_and_decode() {
    let (base, server) = serve_once(
        200,
        r#"{"weather":[{"description":"light rain"}],"main":{"temp":55.04,"humidity":81}}"#,
    )
    .await;

    let api = OpenWeatherMap::new(client(), format!("{base}/data/2.5/weather"));
    let report = api.current("new york", "key-123").await.unwrap();

    assert_eq!(report.weather[0].description, "light rain");
    assert_eq!(report.main.humidity, Some(81));

    let request = server.await.unwrap();
    let request_line = request.head.lines().next().unwrap();
    assert!(request_line.starts_with("get /data/2.5/weather?"), "{request_line}");
    assert!(request_line.contains("q=new+york"), "{request_line}");
    assert!(request_line.contains("appid=key-123"), "{request_line}");
    assert!(request_line.contains("units=imperial"), "{request_line}");
}

#[tokio::test]
async fn test_weather_status_is_reported() {
    let (base, server) = serve_once(404, r#"{"cod":"404","message":"city not found"}"#).await;

    let api = OpenWeatherMap::new(client(), base);
    let err = api.current("atlantis", "key").await.unwrap_err();

    assert!(matches!(err, Error::WeatherStatus { status: 404 }), "{err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_weather_malformed_body() {
    let (base, server) = serve_once(200, r#"{"unexpected":true}"#).await;

    let api = OpenWeatherMap::new(client(), base);
    let err = api.current("paris", "key").await.unwrap_err();

    assert!(matches!(err, Error::Weather(_)), "{err:?}");
    server.await.unwrap();
}

fn chat_config(base_url: String) -> ChatConfig {
    ChatConfig {
        base_url,
        ..ChatConfig::default()
    }
}

#[tokio::test]
async fn test_chat_request_and_reply() {
    let (base, server) = serve_once(
        200,
        r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Happy to help!"}}]}"#,
    )
    .await;

    let chat = OpenAiChat::new(client(), "sk-test".to_string(), &chat_config(base)).unwrap();
    let messages = [
        ChatMessage::system("be brief"),
        ChatMessage {
            role: "user".to_string(),
            content: "hello".to_string(),
        },
    ];
    let reply = chat.complete(&messages).await.unwrap();
    assert_eq!(reply, "Happy to help!");

    let request = server.await.unwrap();
    assert!(request.head.starts_with("post /chat/completions "), "{}", request.head);
    assert!(request.head.contains("authorization: bearer sk-test"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["max_tokens"], 500);
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][1]["content"], "hello");
}

#[tokio::test]
async fn test_chat_error_status() {
    let (base, server) = serve_once(401, r#"{"error":{"message":"bad key"}}"#).await;

    let chat = OpenAiChat::new(client(), "sk-bad".to_string(), &chat_config(base)).unwrap();
    let err = chat.complete(&[ChatMessage::system("x")]).await.unwrap_err();

    assert!(matches!(err, Error::Chat(_)), "{err:?}");
    server.await.unwrap();
}

#[tokio::test]
async fn test_chat_malformed_body() {
    let (base, server) = serve_once(200, "not json").await;

    let chat = OpenAiChat::new(client(), "sk-test".to_string(), &chat_config(base)).unwrap();
    let err = chat.complete(&[ChatMessage::system("x")]).await.unwrap_err();

    assert!(matches!(err, Error::Serialization(_)), "{err:?}");
    server.await.unwrap();
}
