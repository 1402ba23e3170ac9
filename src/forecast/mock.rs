use super::types::*;
use super::WeatherSource;
use crate::error::{Leg, WeatherError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

// 2023-11-14T00:00:00Z
const FORECAST_START: i64 = 1_699_920_000;

/// In-memory provider with canned data and call counters.
pub struct MockWeatherClient {
    places: HashMap<String, Vec<GeocodingResult>>,
    fail_current: bool,
    fail_forecast: bool,
    pub geocode_calls: AtomicUsize,
    pub current_calls: AtomicUsize,
    pub forecast_calls: AtomicUsize,
}

impl MockWeatherClient {
    pub fn new() -> Self {
        let mut places = HashMap::new();
        places.insert(
            "austin".to_string(),
            vec![
                place("Austin", 30.2711, -97.7437, "US", Some("Texas")),
                place("Austin", 43.6666, -92.9746, "US", Some("Minnesota")),
            ],
        );
        places.insert(
            "paris".to_string(),
            vec![place("Paris", 48.8589, 2.32, "FR", Some("Ile-de-France"))],
        );

        Self {
            places,
            fail_current: false,
            fail_forecast: false,
            geocode_calls: AtomicUsize::new(0),
            current_calls: AtomicUsize::new(0),
            forecast_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_current(mut self) -> Self {
        self.fail_current = true;
        self
    }

    pub fn failing_forecast(mut self) -> Self {
        self.fail_forecast = true;
        self
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.geocode_calls.load(Ordering::SeqCst),
            self.current_calls.load(Ordering::SeqCst),
            self.forecast_calls.load(Ordering::SeqCst),
        )
    }

    fn lookup(&self, lat: f64, lon: f64) -> Option<&GeocodingResult> {
        self.places
            .values()
            .flatten()
            .find(|p| p.lat == lat && p.lon == lon)
    }
}

#[async_trait]
impl WeatherSource for MockWeatherClient {
    async fn geocode(&self, query: &str, limit: u32) -> Result<Vec<GeocodingResult>, WeatherError> {
        self.geocode_calls.fetch_add(1, Ordering::SeqCst);
        let city = query.split(',').next().unwrap_or_default().trim().to_lowercase();
        let mut results = self.places.get(&city).cloned().unwrap_or_default();
        results.truncate(limit as usize);
        Ok(results)
    }

    async fn current(
        &self,
        lat: f64,
        lon: f64,
        _units: Units,
    ) -> Result<CurrentConditions, WeatherError> {
        self.current_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_current {
            return Err(WeatherError::upstream(Leg::Current, "HTTP 503: unavailable"));
        }
        let name = self.lookup(lat, lon).map(|p| p.name.as_str()).unwrap_or("Somewhere");
        let mut current = sample_current(name);
        current.coord = Coord { lat, lon };
        Ok(current)
    }

    async fn forecast(
        &self,
        lat: f64,
        lon: f64,
        _units: Units,
    ) -> Result<ForecastResponse, WeatherError> {
        self.forecast_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_forecast {
            return Err(WeatherError::upstream(Leg::Forecast, "HTTP 503: unavailable"));
        }
        let name = self.lookup(lat, lon).map(|p| p.name.as_str()).unwrap_or("Somewhere");
        let mut forecast = sample_forecast(name, -21_600);
        forecast.city.coord = Coord { lat, lon };
        Ok(forecast)
    }
}

pub fn place(name: &str, lat: f64, lon: f64, country: &str, state: Option<&str>) -> GeocodingResult {
    GeocodingResult {
        name: name.to_string(),
        local_names: None,
        lat,
        lon,
        country: country.to_string(),
        state: state.map(str::to_string),
    }
}

fn condition(hour: i64) -> WeatherCondition {
    if (6..18).contains(&hour) {
        WeatherCondition {
            id: 800,
            main: "Clear".into(),
            description: "clear sky".into(),
            icon: "01d".into(),
        }
    } else {
        WeatherCondition {
            id: 802,
            main: "Clouds".into(),
            description: "scattered clouds".into(),
            icon: "03n".into(),
        }
    }
}

pub fn sample_current(name: &str) -> CurrentConditions {
    CurrentConditions {
        coord: Coord { lat: 0.0, lon: 0.0 },
        weather: vec![condition(12)],
        base: Some("stations".into()),
        main: CurrentMain {
            temp: 78.4,
            feels_like: 79.0,
            temp_min: 75.2,
            temp_max: 81.3,
            pressure: 1014.0,
            humidity: 52.0,
            sea_level: None,
            grnd_level: None,
        },
        visibility: Some(10_000),
        wind: Wind {
            speed: 6.9,
            deg: 160.0,
            gust: None,
        },
        clouds: Clouds { all: 0.0 },
        rain: None,
        snow: None,
        dt: FORECAST_START,
        sys: CurrentSys {
            kind: Some(2),
            id: Some(2_000),
            country: "US".into(),
            sunrise: FORECAST_START + 12 * 3600,
            sunset: FORECAST_START + 23 * 3600,
        },
        timezone: -21_600,
        id: 4_671_654,
        name: name.to_string(),
    }
}

/// Five days of three-hourly samples with a smooth diurnal temperature curve.
pub fn sample_forecast(name: &str, timezone: i32) -> ForecastResponse {
    let list = (0..40)
        .map(|i: i64| {
            let dt = FORECAST_START + i * 3 * 3600;
            let local_hour = (dt + i64::from(timezone)).rem_euclid(86_400) / 3600;
            let temp = 65.0 + 10.0 * ((local_hour as f64 - 9.0) * std::f64::consts::PI / 12.0).sin();
            ForecastItem {
                dt,
                main: ForecastMain {
                    temp,
                    feels_like: temp,
                    temp_min: Some(temp - 1.0),
                    temp_max: Some(temp + 1.5),
                    pressure: 1013.0,
                    sea_level: Some(1013.0),
                    grnd_level: Some(990.0),
                    humidity: 55.0,
                    temp_kf: None,
                },
                weather: vec![condition(local_hour)],
                clouds: Clouds { all: 20.0 },
                wind: Wind {
                    speed: 5.0,
                    deg: 180.0,
                    gust: None,
                },
                visibility: Some(10_000),
                pop: 0.0,
                rain: None,
                snow: None,
                sys: Some(ForecastSys {
                    pod: if (6..18).contains(&local_hour) { "d" } else { "n" }.into(),
                }),
                dt_txt: String::new(),
            }
        })
        .collect::<Vec<_>>();

    ForecastResponse {
        cod: "200".into(),
        message: 0.0,
        cnt: list.len() as u32,
        list,
        city: ForecastCity {
            id: 4_671_654,
            name: name.to_string(),
            coord: Coord {
                lat: 30.2711,
                lon: -97.7437,
            },
            country: "US".into(),
            population: None,
            timezone,
            sunrise: FORECAST_START + 12 * 3600,
            sunset: FORECAST_START + 23 * 3600,
        },
    }
}
