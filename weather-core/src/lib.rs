//! Core library for the `weather` app.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeather client and its error taxonomy
//! - SQLite storage for users, profiles and favorite locations
//! - Request handlers that tie the two together
//!
//! It is used by `weather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod provider;
pub mod store;

pub use config::{Config, ProviderConfig, ProviderSettings, StorageConfig};
pub use error::{ProviderError, ProviderErrorKind, StoreError};
pub use handlers::{Flash, Level, ProfileView, WeatherApp, WeatherView};
pub use model::{FavoriteLocation, User, UserProfile, WeatherQuery, WeatherRecord};
pub use provider::{WeatherProvider, openweather::OpenWeatherProvider, provider_from_config};
pub use store::WeatherStore;
