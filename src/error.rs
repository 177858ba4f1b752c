//! Error types and handling for the meeting-zone engine

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the `Where2Meet` engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Where2MeetError {
    /// Missing or invalid configuration, e.g. no provider credential
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Network failure or non-success status from a provider
    #[error("{provider} request failed{}: {message}", status_suffix(.status))]
    Transport {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// Provider rejected the credential (HTTP 401/403)
    #[error("{provider} rejected the request with HTTP {status}: {message}")]
    Authorization {
        provider: String,
        status: u16,
        message: String,
    },

    /// Provider call exceeded the configured per-call limit
    #[error("{provider} request timed out after {limit:?}")]
    Timeout { provider: String, limit: Duration },

    /// Provider answered 2xx with a payload we could not use
    #[error("Invalid {provider} response: {message}")]
    InvalidResponse { provider: String, message: String },

    /// Reachable-range boundary was empty or degenerate
    #[error("No reachable area: {message}")]
    NoReachableArea { message: String },

    /// Malformed geometry or input coordinates
    #[error("Geometry error: {message}")]
    Geometry { message: String },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" with HTTP {s}")).unwrap_or_default()
}

/// Coarse failure classes surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Authorization,
    Transport,
    Geometry,
}

impl Where2MeetError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport<P: Into<String>, S: Into<String>>(
        provider: P,
        status: Option<u16>,
        message: S,
    ) -> Self {
        Self::Transport {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn authorization<P: Into<String>, S: Into<String>>(
        provider: P,
        status: u16,
        message: S,
    ) -> Self {
        Self::Authorization {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    pub fn timeout<P: Into<String>>(provider: P, limit: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            limit,
        }
    }

    pub fn invalid_response<P: Into<String>, S: Into<String>>(provider: P, message: S) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn no_reachable_area<S: Into<String>>(message: S) -> Self {
        Self::NoReachableArea {
            message: message.into(),
        }
    }

    /// Create a new geometry (data quality) error
    pub fn geometry<S: Into<String>>(message: S) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    /// Map a non-success HTTP status to the matching error variant
    pub fn from_status<P: Into<String>>(provider: P, status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::authorization(provider, status, body),
            _ => Self::transport(provider, Some(status), body),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            Where2MeetError::Config { .. } => FailureKind::Configuration,
            Where2MeetError::Authorization { .. } => FailureKind::Authorization,
            Where2MeetError::Transport { .. }
            | Where2MeetError::Timeout { .. }
            | Where2MeetError::InvalidResponse { .. } => FailureKind::Transport,
            Where2MeetError::NoReachableArea { .. } | Where2MeetError::Geometry { .. } => {
                FailureKind::Geometry
            }
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Where2MeetError::Config { message } => {
                format!("Configuration error: {message}. Please check your config file and subscription key.")
            }
            Where2MeetError::Authorization { provider, status, .. } => format!(
                "{provider} refused the request (HTTP {status}). Please check your Azure Maps subscription key and make sure the Route and Search services are enabled for it."
            ),
            Where2MeetError::Transport { .. } | Where2MeetError::InvalidResponse { .. } => {
                "Unable to reach the map services. Please check your internet connection and try again."
                    .to_string()
            }
            Where2MeetError::Timeout { provider, limit } => format!(
                "{provider} did not answer within {} seconds. Please try again.",
                limit.as_secs()
            ),
            Where2MeetError::NoReachableArea { .. } => {
                "No reachable area could be computed for one of the locations.".to_string()
            }
            Where2MeetError::Geometry { message } => {
                format!("The meeting zone geometry could not be computed: {message}")
            }
        }
    }
}

/// Human-readable reason carried by a failed computation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
    pub detail: String,
}

impl From<&Where2MeetError> for FailureReason {
    fn from(err: &Where2MeetError) -> Self {
        Self {
            kind: err.kind(),
            message: err.user_message(),
            detail: err.to_string(),
        }
    }
}

impl From<Where2MeetError> for FailureReason {
    fn from(err: Where2MeetError) -> Self {
        Self::from(&err)
    }
}
