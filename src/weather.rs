//! Weather lookup
//!
//! [`WeatherLookup::describe`] always yields a speakable sentence: a missing
//! credential, a non-success status and transport failures each map to a
//! fixed fallback.

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

/// Spoken when no weather credential is configured
pub const NO_KEY_APOLOGY: &str = "I'd love to help with weather, but I need a weather API key. For now, I can help with many other topics!";

/// Spoken when the provider fails outright
pub const SERVICE_FALLBACK: &str =
    "I'm having trouble getting weather info right now, but I'm here to chat about anything else!";

/// Current conditions for a city
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentWeather {
    /// Temperature block
    pub main: MainReadings,
    /// Condition descriptions, most relevant first
    pub weather: Vec<Condition>,
}

/// Temperature and humidity readings
#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    /// Temperature in °F
    pub temp: f64,
    /// Apparent temperature in °F
    #[serde(default)]
    pub feels_like: Option<f64>,
    /// Relative humidity in percent
    #[serde(default)]
    pub humidity: Option<u8>,
}

/// One weather condition
#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    /// Human readable description, e.g. "light rain"
    pub description: String,
}

/// Source of current weather data
#[async_trait]
pub trait WeatherApi: Send + Sync {
    /// Fetch current conditions for `city` in imperial units
    ///
    /// # Errors
    ///
    /// Returns `Error::WeatherStatus` for a non-success response, other
    /// variants for transport or parse failures
    async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather>;
}

/// `OpenWeatherMap` current-weather client
pub struct OpenWeatherMap {
    client: reqwest::Client,
    base_url: String,
}

impl OpenWeatherMap {
    /// Create a client against `base_url`
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherApi for OpenWeatherMap {
    async fn current(&self, city: &str, api_key: &str) -> Result<CurrentWeather> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", city), ("appid", api_key), ("units", "imperial")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, city, "weather API error");
            return Err(Error::WeatherStatus {
                status: status.as_u16(),
            });
        }

        parse_current(&response.text().await?)
    }
}

/// Decode a current-weather body
///
/// # Errors
///
/// Returns `Error::Weather` if the body is not a current-weather document
pub fn parse_current(body: &str) -> Result<CurrentWeather> {
    serde_json::from_str(body)
        .map_err(|e| Error::Weather(format!("unexpected weather response: {e}")))
}

/// Weather feature with credential gate and fallbacks
pub struct WeatherLookup {
    api: Box<dyn WeatherApi>,
    api_key: Option<String>,
}

impl WeatherLookup {
    /// Create a lookup; `api_key` of `None` disables network calls
    #[must_use]
    pub fn new(api: Box<dyn WeatherApi>, api_key: Option<String>) -> Self {
        Self {
            api,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }

    /// Describe the weather in `city` as one sentence
    pub async fn describe(&self, city: &str) -> String {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::info!(city, "weather requested without an API key");
            return NO_KEY_APOLOGY.to_string();
        };

        tracing::info!(city, "looking up weather");
        match self.api.current(city, api_key).await {
            Ok(report) => format_report(city, &report),
            Err(Error::WeatherStatus { status }) => {
                tracing::warn!(city, status, "weather lookup rejected");
                format!(
                    "I couldn't get weather information for {city}, but I can help with many other things!"
                )
            }
            Err(e) => {
                tracing::error!(city, error = %e, "weather lookup failed");
                SERVICE_FALLBACK.to_string()
            }
        }
    }
}

/// Format a report as a spoken sentence, one decimal place for temperatures
#[must_use]
pub fn format_report(city: &str, report: &CurrentWeather) -> String {
    let description = report
        .weather
        .first()
        .map_or("unknown conditions", |c| c.description.as_str());

    let mut sentence = format!(
        "The weather in {city} is {description} with a temperature of {:.1}°F",
        report.main.temp
    );
    if let Some(feels_like) = report.main.feels_like {
        sentence.push_str(&format!(", feels like {feels_like:.1}°F"));
    }
    if let Some(humidity) = report.main.humidity {
        sentence.push_str(&format!(", humidity {humidity}%"));
    }
    sentence.push('.');
    sentence
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CurrentWeather {
        serde_json::from_str(
            r#"{
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}],
                "main": {"temp": 68.44, "feels_like": 67.02, "humidity": 40, "pressure": 1012},
                "name": "Paris"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_format_full_report() {
        assert_eq!(
            format_report("Paris", &sample()),
            "The weather in Paris is clear sky with a temperature of 68.4°F, feels like 67.0°F, humidity 40%."
        );
    }

    #[test]
    fn test_format_minimal_report() {
        let report: CurrentWeather = serde_json::from_str(
            r#"{"weather": [{"description": "mist"}], "main": {"temp": 50}}"#,
        )
        .unwrap();
        assert_eq!(
            format_report("oslo", &report),
            "The weather in oslo is mist with a temperature of 50.0°F."
        );
    }

    #[test]
    fn test_missing_main_is_weather_error() {
        let err = parse_current(r#"{"cod": "404", "message": "city not found"}"#).unwrap_err();
        assert!(matches!(err, Error::Weather(_)));

        let err = parse_current("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, Error::Weather(_)));
    }
}
