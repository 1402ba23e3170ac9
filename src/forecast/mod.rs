pub mod aggregator;
pub mod bucket;
#[cfg(test)]
pub mod mock;
pub mod openweather;
pub mod resolver;
pub mod types;

use crate::error::WeatherError;
use async_trait::async_trait;
use types::*;

/// Upstream provider of geocoding, current conditions and forecasts.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Direct geocoding, most relevant match first.
    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeocodingResult>, WeatherError>;

    async fn current(&self, lat: f64, lon: f64, units: Units)
        -> Result<CurrentConditions, WeatherError>;

    async fn forecast(&self, lat: f64, lon: f64, units: Units)
        -> Result<ForecastResponse, WeatherError>;
}
