use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    cache::TimedCache,
    clock::SharedClock,
    config::Config,
    error::WeatherError,
    forecast::{
        aggregator::WeatherAggregator,
        bucket::{bucket_by_day, ForecastWeek},
        resolver::GeocodingResolver,
        types::{CurrentConditions, ForecastResponse, GeocodingResult, Units},
        WeatherSource,
    },
    rate_limit::RateLimiter,
    utils::{
        client_id, convert_speed, convert_temperature, is_valid_city_name, parse_coordinates,
        parse_units,
    },
};

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub weather_source: Arc<dyn WeatherSource>,
    pub aggregator: Arc<WeatherAggregator>,
    pub rate_limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Builds every cache and the rate limiter once; handlers only borrow them.
    pub fn new(config: &Config, weather_source: Arc<dyn WeatherSource>, clock: SharedClock) -> Self {
        let capacity = config.cache_max_capacity;
        let resolver = GeocodingResolver::new(
            weather_source.clone(),
            TimedCache::new("geocode", config.geocode_cache_ttl, capacity, clock.clone()),
            config.geocode_limit,
        );
        let aggregator = WeatherAggregator::new(
            resolver,
            weather_source.clone(),
            TimedCache::new("current", config.current_cache_ttl, capacity, clock.clone()),
            TimedCache::new("forecast", config.forecast_cache_ttl, capacity, clock.clone()),
            config.default_units,
        );
        let rate_limiter = RateLimiter::new(config.rate_limit_max, config.rate_window(), clock);

        Self {
            weather_source,
            aggregator: Arc::new(aggregator),
            rate_limiter: Arc::new(rate_limiter),
        }
    }

    fn admit(&self, headers: &HeaderMap) -> Result<(), WeatherError> {
        if self.rate_limiter.check(&client_id(headers)) {
            Ok(())
        } else {
            Err(WeatherError::RateLimited)
        }
    }
}

// Request/Response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoQuery {
    pub city: Option<String>,
    pub state_code: Option<String>,
    pub country_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoordinatesQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    pub city: Option<String>,
    pub units: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct CityWeatherResponse {
    pub location: GeocodingResult,
    pub current: CurrentConditions,
    pub forecast: ForecastWeek,
    pub units: Units,
}

// Route handlers
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn geocode(
    State(state): State<AppState>,
    Query(params): Query<GeoQuery>,
) -> Result<Json<Vec<GeocodingResult>>, WeatherError> {
    let city = params
        .city
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| WeatherError::validation("City parameter is required"))?;

    let results = state
        .aggregator
        .resolver()
        .resolve_query(city, params.state_code.as_deref(), params.country_code.as_deref())
        .await?;
    Ok(Json(results))
}

pub async fn current_weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CoordinatesQuery>,
) -> Result<Json<CurrentConditions>, WeatherError> {
    let (lat, lon) = parse_coordinates(params.lat.as_deref(), params.lon.as_deref())?;
    let units = parse_units(params.units.as_deref(), Units::Metric)?;
    state.admit(&headers)?;

    let current = state.weather_source.current(lat, lon, units).await?;
    Ok(Json(current))
}

pub async fn forecast_weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CoordinatesQuery>,
) -> Result<Json<ForecastResponse>, WeatherError> {
    let (lat, lon) = parse_coordinates(params.lat.as_deref(), params.lon.as_deref())?;
    let units = parse_units(params.units.as_deref(), Units::Metric)?;
    state.admit(&headers)?;

    let forecast = state.weather_source.forecast(lat, lon, units).await?;
    Ok(Json(forecast))
}

/// Current conditions plus the forecast grouped into local calendar days.
pub async fn city_weather(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CityQuery>,
) -> Result<Json<CityWeatherResponse>, WeatherError> {
    let city = params.city.as_deref().map(str::trim).unwrap_or_default();
    if !is_valid_city_name(city) {
        return Err(WeatherError::validation(
            "City must be 2-100 letters, spaces, hyphens or apostrophes",
        ));
    }
    let fetched_in = state.aggregator.units();
    let units = parse_units(params.units.as_deref(), fetched_in)?;
    state.admit(&headers)?;

    let weather = state.aggregator.get_weather(city).await?;
    let week = bucket_by_day(&weather.forecast.to_series())?.with_units(fetched_in, units);

    tracing::info!(
        "Weather for {} ({}, {}): {}, {} day(s)",
        city,
        weather.location.name,
        weather.location.country,
        weather
            .current
            .primary_condition()
            .map(|c| c.description.as_str())
            .unwrap_or("no conditions"),
        week.days.len()
    );

    Ok(Json(CityWeatherResponse {
        location: weather.location,
        current: current_in_units(weather.current, fetched_in, units),
        forecast: week,
        units,
    }))
}

fn current_in_units(mut current: CurrentConditions, from: Units, to: Units) -> CurrentConditions {
    current.main.temp = convert_temperature(current.main.temp, from, to);
    current.main.feels_like = convert_temperature(current.main.feels_like, from, to);
    current.main.temp_min = convert_temperature(current.main.temp_min, from, to);
    current.main.temp_max = convert_temperature(current.main.temp_max, from, to);
    current.wind.speed = convert_speed(current.wind.speed, from, to);
    current.wind.gust = current.wind.gust.map(|gust| convert_speed(gust, from, to));
    current
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/geo", get(geocode))
        .route("/api/weather", get(city_weather))
        .route("/api/weather/current", get(current_weather))
        .route("/api/weather/forecast", get(forecast_weather))
        .with_state(state)
}
