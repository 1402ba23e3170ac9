//! Groups a flat forecast series into calendar days in the location's local time.

use super::types::{Units, WeatherCondition};
use crate::error::{Leg, WeatherError};
use crate::utils::{convert_speed, convert_temperature};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One forecast measurement as received from the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    /// Unix seconds, UTC.
    pub timestamp: i64,
    pub temp: f64,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub humidity: f64,
    pub condition: Option<WeatherCondition>,
    pub wind_speed: f64,
    pub wind_deg: f64,
}

impl ForecastSample {
    /// Highest temperature this sample vouches for.
    pub fn high_temp(&self) -> f64 {
        self.temp_max.unwrap_or(self.temp)
    }

    /// Lowest temperature this sample vouches for.
    pub fn low_temp(&self) -> f64 {
        self.temp_min.unwrap_or(self.temp)
    }

    fn with_units(mut self, from: Units, to: Units) -> Self {
        self.temp = convert_temperature(self.temp, from, to);
        self.temp_min = self.temp_min.map(|t| convert_temperature(t, from, to));
        self.temp_max = self.temp_max.map(|t| convert_temperature(t, from, to));
        self.wind_speed = convert_speed(self.wind_speed, from, to);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastLocation {
    pub name: String,
    pub country: String,
    pub lat: f64,
    pub lon: f64,
    pub utc_offset_seconds: i32,
}

/// Input to [`bucket_by_day`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastSeries {
    pub location: ForecastLocation,
    pub samples: Vec<ForecastSample>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayBucket {
    /// Local calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub high: f64,
    pub low: f64,
    pub samples: Vec<ForecastSample>,
    /// Condition of the earliest sample of the day.
    pub summary: Option<DaySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastWeek {
    pub days: Vec<DayBucket>,
    pub location: ForecastLocation,
}

impl ForecastWeek {
    /// Re-expresses every temperature and wind speed in `to` units.
    pub fn with_units(mut self, from: Units, to: Units) -> Self {
        if from == to {
            return self;
        }
        for day in &mut self.days {
            day.high = convert_temperature(day.high, from, to);
            day.low = convert_temperature(day.low, from, to);
            day.samples = std::mem::take(&mut day.samples)
                .into_iter()
                .map(|sample| sample.with_units(from, to))
                .collect();
        }
        self
    }
}

/// Calendar date of `timestamp` once shifted by `utc_offset_seconds`.
///
/// The shift is applied to the instant itself, so the result does not depend on
/// the host timezone.
pub fn local_date(timestamp: i64, utc_offset_seconds: i32) -> Result<NaiveDate, WeatherError> {
    let shifted = timestamp
        .checked_add(i64::from(utc_offset_seconds))
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| {
            WeatherError::upstream(
                Leg::Forecast,
                format!("timestamp {timestamp} with offset {utc_offset_seconds} is out of range"),
            )
        })?;
    Ok(shifted.date_naive())
}

pub fn bucket_by_day(series: &ForecastSeries) -> Result<ForecastWeek, WeatherError> {
    let offset = series.location.utc_offset_seconds;
    let mut days: BTreeMap<NaiveDate, DayBucket> = BTreeMap::new();

    for sample in &series.samples {
        let date = local_date(sample.timestamp, offset)?;
        let (high, low) = (sample.high_temp(), sample.low_temp());

        days.entry(date)
            .and_modify(|bucket| {
                bucket.high = bucket.high.max(high);
                bucket.low = bucket.low.min(low);
                bucket.samples.push(sample.clone());
            })
            .or_insert_with(|| DayBucket {
                date: date.format("%Y-%m-%d").to_string(),
                high,
                low,
                samples: vec![sample.clone()],
                summary: None,
            });
    }

    // BTreeMap iteration is already in date order.
    let days = days
        .into_values()
        .map(|mut bucket| {
            bucket.samples.sort_by_key(|s| s.timestamp);
            bucket.summary = bucket
                .samples
                .first()
                .and_then(|s| s.condition.as_ref())
                .map(|c| DaySummary {
                    description: c.description.clone(),
                    icon: c.icon.clone(),
                });
            bucket
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        location = %series.location.name,
        samples = series.samples.len(),
        days = days.len(),
        "bucketed forecast"
    );

    Ok(ForecastWeek {
        days,
        location: series.location.clone(),
    })
}
