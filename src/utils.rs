use crate::error::WeatherError;
use crate::forecast::types::Units;
use crate::rate_limit::ANONYMOUS_CLIENT;
use axum::http::HeaderMap;

/// Validate latitude and longitude coordinates
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<(), WeatherError> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(WeatherError::validation(format!(
            "Invalid latitude: {}. Must be between -90 and 90",
            lat
        )));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(WeatherError::validation(format!(
            "Invalid longitude: {}. Must be between -180 and 180",
            lon
        )));
    }
    Ok(())
}

/// Parse `lat`/`lon` query values, both required
pub fn parse_coordinates(lat: Option<&str>, lon: Option<&str>) -> Result<(f64, f64), WeatherError> {
    let (Some(lat), Some(lon)) = (non_blank(lat), non_blank(lon)) else {
        return Err(WeatherError::validation("Latitude and longitude are required"));
    };

    let parse = |name: &str, raw: &str| {
        raw.parse::<f64>()
            .map_err(|_| WeatherError::validation(format!("Invalid {}: {}", name, raw)))
    };
    let (lat, lon) = (parse("latitude", lat)?, parse("longitude", lon)?);

    validate_coordinates(lat, lon)?;
    Ok((lat, lon))
}

/// Parse an optional `units` value, falling back to `default`
pub fn parse_units(raw: Option<&str>, default: Units) -> Result<Units, WeatherError> {
    match non_blank(raw) {
        Some(raw) => raw.parse(),
        None => Ok(default),
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// City names: letters, whitespace, hyphens and apostrophes, 2 to 100 characters
pub fn is_valid_city_name(input: &str) -> bool {
    let len = input.chars().count();
    (2..=100).contains(&len)
        && input
            .chars()
            .all(|c| c.is_ascii_alphabetic() || c.is_whitespace() || c == '-' || c == '\'')
}

/// Rate-limit key for a request: first `X-Forwarded-For` hop, else anonymous
pub fn client_id(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(ANONYMOUS_CLIENT)
        .to_string()
}

/// Convert temperature between Celsius and Fahrenheit
pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

pub fn fahrenheit_to_celsius(fahrenheit: f64) -> f64 {
    (fahrenheit - 32.0) * 5.0 / 9.0
}

/// Convert wind speed between m/s and mph
pub fn ms_to_mph(ms: f64) -> f64 {
    ms * 2.237
}

pub fn mph_to_ms(mph: f64) -> f64 {
    mph / 2.237
}

pub fn convert_temperature(value: f64, from: Units, to: Units) -> f64 {
    match (from, to) {
        (Units::Metric, Units::Imperial) => celsius_to_fahrenheit(value),
        (Units::Imperial, Units::Metric) => fahrenheit_to_celsius(value),
        _ => value,
    }
}

pub fn convert_speed(value: f64, from: Units, to: Units) -> f64 {
    match (from, to) {
        (Units::Metric, Units::Imperial) => ms_to_mph(value),
        (Units::Imperial, Units::Metric) => mph_to_ms(value),
        _ => value,
    }
}
