use super::resolver::GeocodingResolver;
use super::types::*;
use super::WeatherSource;
use crate::cache::TimedCache;
use crate::error::WeatherError;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct CityWeather {
    pub location: GeocodingResult,
    pub current: CurrentConditions,
    pub forecast: ForecastResponse,
}

/// Current conditions plus forecast for a city, each leg cached by city name.
pub struct WeatherAggregator {
    resolver: GeocodingResolver,
    source: Arc<dyn WeatherSource>,
    current_cache: TimedCache<CurrentConditions>,
    forecast_cache: TimedCache<ForecastResponse>,
    units: Units,
}

impl WeatherAggregator {
    pub fn new(
        resolver: GeocodingResolver,
        source: Arc<dyn WeatherSource>,
        current_cache: TimedCache<CurrentConditions>,
        forecast_cache: TimedCache<ForecastResponse>,
        units: Units,
    ) -> Self {
        Self {
            resolver,
            source,
            current_cache,
            forecast_cache,
            units,
        }
    }

    pub fn units(&self) -> Units {
        self.units
    }

    pub fn resolver(&self) -> &GeocodingResolver {
        &self.resolver
    }

    /// Both legs must succeed. A leg that succeeds is cached even when the other fails.
    pub async fn get_weather(&self, city: &str) -> Result<CityWeather, WeatherError> {
        if city.trim().is_empty() {
            return Err(WeatherError::validation("City parameter is required"));
        }

        let cached_current = self.current_cache.get(city).await;
        let cached_forecast = self.forecast_cache.get(city).await;

        if let (Some(current), Some(forecast)) = (&cached_current, &cached_forecast) {
            let location = match self.resolver.cached_first_match(city).await {
                Some(location) => location,
                None => location_from_forecast(forecast),
            };
            tracing::debug!("Serving {} entirely from cache", city.trim());
            return Ok(CityWeather {
                location,
                current: current.clone(),
                forecast: forecast.clone(),
            });
        }

        let location = self.resolver.first_match(city).await?;

        let (current, forecast) = tokio::join!(
            self.current_leg(city, &location, cached_current),
            self.forecast_leg(city, &location, cached_forecast),
        );

        Ok(CityWeather {
            location,
            current: current?,
            forecast: forecast?,
        })
    }

    async fn current_leg(
        &self,
        city: &str,
        location: &GeocodingResult,
        cached: Option<CurrentConditions>,
    ) -> Result<CurrentConditions, WeatherError> {
        if let Some(current) = cached {
            return Ok(current);
        }
        let current = self
            .source
            .current(location.lat, location.lon, self.units)
            .await?;
        self.current_cache.put(city, current.clone()).await;
        Ok(current)
    }

    async fn forecast_leg(
        &self,
        city: &str,
        location: &GeocodingResult,
        cached: Option<ForecastResponse>,
    ) -> Result<ForecastResponse, WeatherError> {
        if let Some(forecast) = cached {
            return Ok(forecast);
        }
        let forecast = self
            .source
            .forecast(location.lat, location.lon, self.units)
            .await?;
        self.forecast_cache.put(city, forecast.clone()).await;
        Ok(forecast)
    }
}

/// Location rebuilt from the forecast's city block when the geocoding entry has lapsed.
fn location_from_forecast(forecast: &ForecastResponse) -> GeocodingResult {
    GeocodingResult {
        name: forecast.city.name.clone(),
        local_names: None,
        lat: forecast.city.coord.lat,
        lon: forecast.city.coord.lon,
        country: forecast.city.country.clone(),
        state: None,
    }
}
