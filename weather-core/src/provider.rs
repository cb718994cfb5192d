use crate::{
    Config, ProviderError, WeatherQuery, WeatherRecord,
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// A source of current weather conditions.
///
/// Implementations are stateless apart from read-only settings and perform
/// at most one outbound request per call. Every failure comes back as a
/// [`ProviderError`] value.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Whether an API key is available. Checked before any I/O.
    fn is_configured(&self) -> bool;

    async fn current_weather(&self, query: &WeatherQuery) -> Result<WeatherRecord, ProviderError>;

    /// Look up by location XOR coordinates, as submitted by a caller.
    async fn lookup(
        &self,
        location: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<WeatherRecord, ProviderError> {
        if !self.is_configured() {
            return Err(ProviderError::unconfigured());
        }
        let query = WeatherQuery::from_parts(location, latitude, longitude)?;
        self.current_weather(&query).await
    }
}

/// Construct the OpenWeather provider from config.
///
/// A missing API key is not an error here; lookups report it instead.
pub fn provider_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherProvider>> {
    let provider = OpenWeatherProvider::new(config.provider_settings())?;
    Ok(Box::new(provider))
}
