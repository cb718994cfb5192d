use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// What to look up: a free-text location or a coordinate pair, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum WeatherQuery {
    Location(String),
    Coordinates { latitude: f64, longitude: f64 },
}

impl WeatherQuery {
    /// Build a query from optional form-style inputs.
    ///
    /// Blank locations count as absent and a coordinate pair is only present
    /// when both halves are. Exactly one of the two forms must remain.
    pub fn from_parts(
        location: Option<&str>,
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Self, ProviderError> {
        let location = location.map(str::trim).filter(|s| !s.is_empty());
        let has_coordinate = latitude.is_some() || longitude.is_some();

        match (location, latitude, longitude) {
            (Some(_), _, _) if has_coordinate => Err(ProviderError::ambiguous_input()),
            (Some(location), None, None) => Ok(Self::Location(location.to_string())),
            (None, Some(latitude), Some(longitude)) => {
                if !latitude.is_finite() || !longitude.is_finite() {
                    return Err(ProviderError::missing_input());
                }
                Ok(Self::Coordinates {
                    latitude,
                    longitude,
                })
            }
            _ => Err(ProviderError::missing_input()),
        }
    }

    /// Query parameters naming the lookup target (`q`, or `lat` + `lon`).
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        match self {
            WeatherQuery::Location(location) => vec![("q", location.clone())],
            WeatherQuery::Coordinates {
                latitude,
                longitude,
            } => vec![("lat", latitude.to_string()), ("lon", longitude.to_string())],
        }
    }
}

/// Current conditions, always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    /// "<city>, <country>"
    pub location_name: String,
    /// Degrees Celsius, rounded.
    pub temperature: i64,
    pub condition: String,
    pub description: String,
    /// Percent.
    pub humidity: u8,
    /// Metres per second.
    pub wind_speed: f64,
    pub icon: String,
    /// Coordinates as echoed by the provider, not as requested.
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Per-user preferences.
///
/// `default_location` is free text and may name a favorite that has since
/// been renamed or deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserProfile {
    pub user_id: i64,
    pub default_location: Option<String>,
}

/// A named coordinate pair saved by one user. Unique per (user, name).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FavoriteLocation {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Display for FavoriteLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.6}, {:.6})", self.name, self.latitude, self.longitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;

    #[test]
    fn location_only() {
        let query = WeatherQuery::from_parts(Some("Paris"), None, None).unwrap();
        assert_eq!(query, WeatherQuery::Location("Paris".into()));
        assert_eq!(query.query_params(), vec![("q", "Paris".to_string())]);
    }

    #[test]
    fn coordinates_only() {
        let query = WeatherQuery::from_parts(None, Some(48.8566), Some(2.3522)).unwrap();
        let params = query.query_params();
        assert_eq!(
            params,
            vec![("lat", "48.8566".to_string()), ("lon", "2.3522".to_string())]
        );
    }

    #[test]
    fn blank_location_is_absent() {
        let err = WeatherQuery::from_parts(Some("   "), None, None).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidInput);

        let query = WeatherQuery::from_parts(Some(""), Some(1.0), Some(2.0)).unwrap();
        assert!(matches!(query, WeatherQuery::Coordinates { .. }));
    }

    #[test]
    fn neither_is_invalid() {
        let err = WeatherQuery::from_parts(None, None, None).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidInput);
    }

    #[test]
    fn both_is_invalid() {
        let err = WeatherQuery::from_parts(Some("Paris"), Some(1.0), Some(2.0)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidInput);
    }

    #[test]
    fn half_pair_is_invalid() {
        let err = WeatherQuery::from_parts(None, Some(1.0), None).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidInput);

        let err = WeatherQuery::from_parts(Some("Paris"), None, Some(2.0)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidInput);
    }

    #[test]
    fn non_finite_coordinates_are_invalid() {
        let err = WeatherQuery::from_parts(None, Some(f64::NAN), Some(2.0)).unwrap_err();
        assert_eq!(err.kind, ProviderErrorKind::InvalidInput);
    }
}
