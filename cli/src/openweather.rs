use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

use dashkit_core::error::{self, AppError};
use dashkit_core::openweather::SAMPLES_PER_DAY;
use dashkit_core::weather::WeatherProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";

const MISSING_KEY: &str =
    "OpenWeatherMap API key not found. Please set OPENWEATHER_API_KEY environment variable.";

pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenWeatherClient {
    pub fn new_with_base_url(api_key: Option<String>, base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(format!("dashkit/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    fn api_key(&self) -> error::Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| AppError::Config(MISSING_KEY.to_string()))
    }

    async fn get(&self, endpoint: &str, params: &[(&str, String)]) -> error::Result<Value> {
        let api_key = self.api_key()?;
        let url = format!("{}/{endpoint}", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", api_key), ("units", "metric")])
            .send()
            .await
            .map_err(|e| AppError::upstream(format!("request to OpenWeatherMap failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|body| body.get("message").and_then(Value::as_str).map(str::to_string));
            tracing::warn!(%status, endpoint, "OpenWeatherMap request rejected");
            return Err(AppError::upstream(match detail {
                Some(message) => format!("HTTP {status}: {message}"),
                None => format!("HTTP {status}"),
            }));
        }

        resp.json::<Value>()
            .await
            .map_err(|e| AppError::upstream(format!("invalid JSON from OpenWeatherMap: {e}")))
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current_weather(&self, city: &str) -> error::Result<Value> {
        self.get("weather", &[("q", city.to_string())]).await
    }

    async fn weather_at(&self, latitude: f64, longitude: f64) -> error::Result<Value> {
        self.get(
            "weather",
            &[("lat", latitude.to_string()), ("lon", longitude.to_string())],
        )
        .await
    }

    async fn forecast(&self, city: &str, days: u32) -> error::Result<Value> {
        let count = days as usize * SAMPLES_PER_DAY;
        self.get(
            "forecast",
            &[("q", city.to_string()), ("cnt", count.to_string())],
        )
        .await
    }
}
