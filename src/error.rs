use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Which upstream call a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leg {
    Geocoding,
    Current,
    Forecast,
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Leg::Geocoding => "geocoding",
            Leg::Current => "current weather",
            Leg::Forecast => "forecast",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("No match found for location: {0}")]
    NotFound(String),
    #[error("No coordinates found for city: {city}")]
    LocationNotFound { city: String },
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("Failed to fetch {leg} data: {message}")]
    UpstreamFetchFailed { leg: Leg, message: String },
}

impl WeatherError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    pub fn upstream<E: fmt::Display>(leg: Leg, err: E) -> Self {
        Self::UpstreamFetchFailed {
            leg,
            message: err.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            WeatherError::Validation(_) => StatusCode::BAD_REQUEST,
            WeatherError::NotFound(_) | WeatherError::LocationNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            WeatherError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            WeatherError::UpstreamFetchFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand back to a client. Upstream detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            WeatherError::Validation(message) => message.clone(),
            WeatherError::UpstreamFetchFailed {
                leg: Leg::Geocoding,
                ..
            } => "Failed to fetch geocoding information".to_string(),
            WeatherError::UpstreamFetchFailed { .. } => "Failed to fetch weather data".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        match &self {
            WeatherError::UpstreamFetchFailed { .. } => tracing::error!("{}", self),
            _ => tracing::debug!("Request rejected: {}", self),
        }

        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}
