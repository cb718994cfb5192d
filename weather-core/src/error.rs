use std::fmt;

use thiserror::Error;

/// Stable classification of a failed weather lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderErrorKind {
    Unconfigured,
    InvalidInput,
    NotFound,
    AuthFailure,
    ProviderFailure,
    NetworkError,
    Timeout,
    Unexpected,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::Unconfigured => "unconfigured",
            ProviderErrorKind::InvalidInput => "invalid_input",
            ProviderErrorKind::NotFound => "not_found",
            ProviderErrorKind::AuthFailure => "auth_failure",
            ProviderErrorKind::ProviderFailure => "provider_failure",
            ProviderErrorKind::NetworkError => "network_error",
            ProviderErrorKind::Timeout => "timeout",
            ProviderErrorKind::Unexpected => "unexpected",
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified lookup failure.
///
/// `message` is always safe to show to an end user: it never carries status
/// codes, response bodies or transport details. Those go to the log instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unconfigured() -> Self {
        Self::new(
            ProviderErrorKind::Unconfigured,
            "Weather API key is not configured.",
        )
    }

    pub fn missing_input() -> Self {
        Self::new(
            ProviderErrorKind::InvalidInput,
            "Location or coordinates are required.",
        )
    }

    pub fn ambiguous_input() -> Self {
        Self::new(
            ProviderErrorKind::InvalidInput,
            "Provide either a location or coordinates, not both.",
        )
    }

    pub fn not_found() -> Self {
        Self::new(
            ProviderErrorKind::NotFound,
            "Location not found. Please try a different location.",
        )
    }

    pub fn auth_failure() -> Self {
        Self::new(
            ProviderErrorKind::AuthFailure,
            "Unable to authenticate with the weather service.",
        )
    }

    pub fn provider_failure() -> Self {
        Self::new(
            ProviderErrorKind::ProviderFailure,
            "Unable to fetch weather data. Please try again later.",
        )
    }

    pub fn network() -> Self {
        Self::new(
            ProviderErrorKind::NetworkError,
            "Network error. Please check your internet connection.",
        )
    }

    pub fn timeout() -> Self {
        Self::new(
            ProviderErrorKind::Timeout,
            "Request timed out. Please try again later.",
        )
    }

    pub fn unexpected() -> Self {
        Self::new(
            ProviderErrorKind::Unexpected,
            "An unexpected error occurred. Please try again later.",
        )
    }
}

/// Errors raised by the relational store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("\"{name}\" is already in your favorites")]
    AlreadyExists { name: String },

    #[error("Location not found")]
    NotFound,

    #[error("Username '{username}' is already taken")]
    UserExists { username: String },

    #[error("No such user '{username}'")]
    UnknownUser { username: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
