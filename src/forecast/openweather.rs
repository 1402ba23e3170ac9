use super::bucket::{ForecastLocation, ForecastSample, ForecastSeries};
use super::types::*;
use super::WeatherSource;
use crate::config::Config;
use crate::error::{Leg, WeatherError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenWeatherError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Rate limited by provider")]
    RateLimited,
    #[error("API error: {0}")]
    ApiError(String),
    #[error("Invalid coordinates")]
    InvalidCoordinates,
}

pub struct OpenWeatherClient {
    client: Client,
    base_url: String,
    api_key: String,
    geocode_direct_path: String,
    current_path: String,
    forecast_path: String,
}

impl OpenWeatherClient {
    pub fn new(config: &Config) -> Result<Self, OpenWeatherError> {
        let client = Client::builder()
            .user_agent(concat!("CityWeather/", env!("CARGO_PKG_VERSION")))
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: config.openweather_base_url.trim_end_matches('/').to_string(),
            api_key: config.openweather_api_key.clone(),
            geocode_direct_path: config.openweather_geocode_direct_path.clone(),
            current_path: config.openweather_current_path.clone(),
            forecast_path: config.openweather_forecast_path.clone(),
        })
    }

    pub async fn geocode_direct(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<GeocodingResult>, OpenWeatherError> {
        self.fetch(
            &self.geocode_direct_path,
            &[("q", query), ("limit", &limit.to_string())],
        )
        .await
    }

    pub async fn get_current(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<CurrentConditions, OpenWeatherError> {
        if !self.is_valid_coordinates(lat, lon) {
            return Err(OpenWeatherError::InvalidCoordinates);
        }

        self.fetch(
            &self.current_path,
            &[
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
                ("units", units.as_str()),
            ],
        )
        .await
    }

    pub async fn get_forecast(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<ForecastResponse, OpenWeatherError> {
        if !self.is_valid_coordinates(lat, lon) {
            return Err(OpenWeatherError::InvalidCoordinates);
        }

        self.fetch(
            &self.forecast_path,
            &[
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
                ("units", units.as_str()),
            ],
        )
        .await
    }

    /// Single attempt; failures go straight back to the caller.
    async fn fetch<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, OpenWeatherError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response.json::<T>().await?),
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                tracing::warn!("Rate limited by OpenWeather API on {}", path);
                Err(OpenWeatherError::RateLimited)
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                Err(OpenWeatherError::ApiError(format!(
                    "HTTP {}: {}",
                    status, error_text
                )))
            }
        }
    }

    fn is_valid_coordinates(&self, lat: f64, lon: f64) -> bool {
        crate::utils::validate_coordinates(lat, lon).is_ok()
    }
}

fn into_weather_error(leg: Leg, err: OpenWeatherError) -> WeatherError {
    match err {
        OpenWeatherError::InvalidCoordinates => WeatherError::validation("Invalid coordinates"),
        other => WeatherError::upstream(leg, other),
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeocodingResult>, WeatherError> {
        self.geocode_direct(query, limit)
            .await
            .map_err(|e| into_weather_error(Leg::Geocoding, e))
    }

    async fn current(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<CurrentConditions, WeatherError> {
        self.get_current(lat, lon, units)
            .await
            .map_err(|e| into_weather_error(Leg::Current, e))
    }

    async fn forecast(
        &self,
        lat: f64,
        lon: f64,
        units: Units,
    ) -> Result<ForecastResponse, WeatherError> {
        self.get_forecast(lat, lon, units)
            .await
            .map_err(|e| into_weather_error(Leg::Forecast, e))
    }
}

// Convert OpenWeather data to internal format
impl From<&ForecastItem> for ForecastSample {
    fn from(item: &ForecastItem) -> Self {
        Self {
            timestamp: item.dt,
            temp: item.main.temp,
            temp_min: item.main.temp_min,
            temp_max: item.main.temp_max,
            humidity: item.main.humidity,
            condition: item.weather.first().cloned(),
            wind_speed: item.wind.speed,
            wind_deg: item.wind.deg,
        }
    }
}

impl From<&ForecastCity> for ForecastLocation {
    fn from(city: &ForecastCity) -> Self {
        Self {
            name: city.name.clone(),
            country: city.country.clone(),
            lat: city.coord.lat,
            lon: city.coord.lon,
            utc_offset_seconds: city.timezone,
        }
    }
}

impl ForecastResponse {
    pub fn to_series(&self) -> ForecastSeries {
        ForecastSeries {
            location: ForecastLocation::from(&self.city),
            samples: self.list.iter().map(ForecastSample::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::mock;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> OpenWeatherClient {
        let config = Config::for_tests(&server.uri());
        OpenWeatherClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_geocode_sends_query_limit_and_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geo/1.0/direct"))
            .and(query_param("q", "Austin,TX,US"))
            .and(query_param("limit", "5"))
            .and(query_param("appid", "test-key"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!([
                    { "name": "Austin", "lat": 30.2711, "lon": -97.7437, "country": "US", "state": "Texas" }
                ])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let results = client.geocode_direct("Austin,TX,US", 5).await.unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].state.as_deref(), Some("Texas"));
    }

    #[tokio::test]
    async fn test_forecast_passes_units() {
        let server = MockServer::start().await;
        let body = serde_json::to_value(mock::sample_forecast("Austin", -21_600)).unwrap();
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .and(query_param("units", "imperial"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let forecast = client
            .get_forecast(30.27, -97.74, Units::Imperial)
            .await
            .unwrap();

        assert_eq!(forecast.city.timezone, -21_600);
        assert_eq!(forecast.list.len(), 40);
    }

    #[tokio::test]
    async fn test_non_success_maps_to_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.current(30.27, -97.74, Units::Metric).await.unwrap_err();

        match err {
            WeatherError::UpstreamFetchFailed { leg, message } => {
                assert_eq!(leg, Leg::Current);
                assert!(message.contains("401"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_hung_provider_times_out() {
        let server = MockServer::start().await;
        let body = serde_json::to_value(mock::sample_current("Austin")).unwrap();
        Mock::given(method("GET"))
            .and(path("/data/2.5/weather"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(body)
                    .set_delay(std::time::Duration::from_secs(4)),
            )
            .mount(&server)
            .await;

        // Config::for_tests sets a 2 second timeout.
        let client = client_for(&server).await;
        let started = std::time::Instant::now();
        let err = client.current(30.27, -97.74, Units::Metric).await.unwrap_err();

        assert!(started.elapsed() < std::time::Duration::from_secs(4));
        assert!(matches!(
            err,
            WeatherError::UpstreamFetchFailed { leg: Leg::Current, .. }
        ));
    }

    #[tokio::test]
    async fn test_provider_rate_limit_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/forecast"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client.forecast(30.27, -97.74, Units::Metric).await.unwrap_err();
        assert!(matches!(
            err,
            WeatherError::UpstreamFetchFailed { leg: Leg::Forecast, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_coordinates_skip_the_request() {
        let server = MockServer::start().await;
        let client = client_for(&server).await;

        let err = client.current(91.0, 0.0, Units::Metric).await.unwrap_err();
        assert!(matches!(err, WeatherError::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[test]
    fn test_forecast_to_series() {
        let forecast = mock::sample_forecast("Austin", -21_600);
        let series = forecast.to_series();

        assert_eq!(series.location.name, "Austin");
        assert_eq!(series.location.utc_offset_seconds, -21_600);
        assert_eq!(series.samples.len(), forecast.list.len());
        assert_eq!(series.samples[0].temp_max, forecast.list[0].main.temp_max);
        assert_eq!(
            series.samples[0].condition.as_ref().map(|c| c.icon.as_str()),
            Some("03n")
        );
    }
}
