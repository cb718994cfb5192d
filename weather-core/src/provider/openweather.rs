use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    config::ProviderSettings,
    error::ProviderError,
    model::{WeatherQuery, WeatherRecord},
};

use super::WeatherProvider;

/// Client for the OpenWeatherMap "current weather" endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(settings: ProviderSettings) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Failed to build HTTP client for OpenWeather")?;

        Ok(Self {
            api_key: settings.api_key,
            base_url: settings.base_url,
            http,
        })
    }

    async fn fetch_current(
        &self,
        api_key: &str,
        query: &WeatherQuery,
    ) -> Result<WeatherRecord, ProviderError> {
        let url = format!("{}/weather", self.base_url);

        let mut params = query.query_params();
        params.push(("appid", api_key.to_string()));
        params.push(("units", "metric".to_string()));

        let res = self
            .http
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(classify_transport)?;

        match status {
            StatusCode::OK => {
                let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
                    tracing::error!(error = %e, "Failed to parse OpenWeather current JSON");
                    ProviderError::unexpected()
                })?;
                Ok(parsed.into_record())
            }
            StatusCode::NOT_FOUND => Err(ProviderError::not_found()),
            StatusCode::UNAUTHORIZED => {
                tracing::error!("OpenWeather rejected the API key (invalid or rate limited)");
                Err(ProviderError::auth_failure())
            }
            _ => {
                tracing::error!(
                    status = %status,
                    body = %truncate_body(&body),
                    "OpenWeather current request failed"
                );
                Err(ProviderError::provider_failure())
            }
        }
    }
}

/// Map a transport-level failure. Timeouts are checked first since a
/// timed-out connect also reports as a connect error.
fn classify_transport(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::timeout()
    } else if err.is_connect() {
        ProviderError::network()
    } else {
        tracing::error!(error = %err, "Unexpected error fetching weather data");
        ProviderError::unexpected()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OwWeather {
    main: String,
    description: String,
    icon: String,
}

impl Default for OwWeather {
    fn default() -> Self {
        Self {
            main: "Unknown".to_string(),
            description: String::new(),
            icon: String::new(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwSys {
    country: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct OwCurrentResponse {
    name: String,
    sys: OwSys,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    coord: OwCoord,
}

impl Default for OwCurrentResponse {
    fn default() -> Self {
        Self {
            name: "Unknown".to_string(),
            sys: OwSys::default(),
            main: OwMain::default(),
            weather: Vec::new(),
            wind: OwWind::default(),
            coord: OwCoord::default(),
        }
    }
}

impl OwCurrentResponse {
    fn into_record(self) -> WeatherRecord {
        let weather = self.weather.into_iter().next().unwrap_or_default();

        WeatherRecord {
            location_name: format!("{}, {}", self.name, self.sys.country),
            temperature: self.main.temp.round_ties_even() as i64,
            condition: weather.main,
            description: weather.description,
            humidity: self.main.humidity,
            wind_speed: self.wind.speed,
            icon: weather.icon,
            latitude: self.coord.lat,
            longitude: self.coord.lon,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn current_weather(&self, query: &WeatherQuery) -> Result<WeatherRecord, ProviderError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ProviderError::unconfigured());
        };
        self.fetch_current(api_key, query).await
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
