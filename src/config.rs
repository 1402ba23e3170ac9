use crate::forecast::types::Units;
use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub openweather_api_key: String,
    pub openweather_base_url: String,
    pub openweather_geocode_direct_path: String,
    pub openweather_current_path: String,
    pub openweather_forecast_path: String,
    pub default_units: Units,
    pub geocode_limit: u32,
    pub geocode_cache_ttl: Duration,
    pub current_cache_ttl: Duration,
    pub forecast_cache_ttl: Duration,
    pub cache_max_capacity: u64,
    pub rate_limit_max: u32,
    pub rate_limit_window: Duration,
    pub rate_limit_prune_interval: Duration,
    pub http_timeout: Duration,
    pub bind_addr: String,
}

fn var_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value {:?}: {}", key, raw, e)),
        _ => Ok(default),
    }
}

fn secs_or(key: &str, default: u64) -> anyhow::Result<Duration> {
    Ok(Duration::from_secs(var_or(key, default)?))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .map_err(|_| anyhow::anyhow!("OPENWEATHER_API_KEY not set"))?,
            openweather_base_url: env::var("OPENWEATHER_BASE_URL")
                .unwrap_or_else(|_| "https://api.openweathermap.org".to_string()),
            openweather_geocode_direct_path: env::var("OPENWEATHER_GEOCODE_DIRECT_PATH")
                .unwrap_or_else(|_| "/geo/1.0/direct".to_string()),
            openweather_current_path: env::var("OPENWEATHER_CURRENT_PATH")
                .unwrap_or_else(|_| "/data/2.5/weather".to_string()),
            openweather_forecast_path: env::var("OPENWEATHER_FORECAST_PATH")
                .unwrap_or_else(|_| "/data/2.5/forecast".to_string()),
            default_units: var_or("DEFAULT_UNITS", Units::Imperial)?,
            geocode_limit: var_or("GEOCODE_LIMIT", 5)?,
            geocode_cache_ttl: secs_or("GEOCODE_CACHE_TTL_SECS", 12 * 60 * 60)?,
            current_cache_ttl: secs_or("CURRENT_CACHE_TTL_SECS", 5 * 60)?,
            forecast_cache_ttl: secs_or("FORECAST_CACHE_TTL_SECS", 5 * 60)?,
            cache_max_capacity: var_or("CACHE_MAX_CAPACITY", 1000)?,
            rate_limit_max: var_or("RATE_LIMIT_MAX", 10)?,
            rate_limit_window: secs_or("RATE_LIMIT_WINDOW_SECS", 60)?,
            rate_limit_prune_interval: secs_or("RATE_LIMIT_PRUNE_SECS", 5 * 60)?,
            http_timeout: secs_or("HTTP_TIMEOUT_SECS", 10)?,
            bind_addr: env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
        };

        if config.geocode_limit == 0 {
            anyhow::bail!("GEOCODE_LIMIT must be at least 1");
        }
        if config.rate_limit_prune_interval.is_zero() {
            anyhow::bail!("RATE_LIMIT_PRUNE_SECS must be at least 1");
        }
        Ok(config)
    }

    pub fn rate_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.rate_limit_window).unwrap_or(chrono::Duration::seconds(60))
    }

    #[cfg(test)]
    pub fn for_tests(base_url: &str) -> Self {
        Config {
            openweather_api_key: "test-key".to_string(),
            openweather_base_url: base_url.to_string(),
            openweather_geocode_direct_path: "/geo/1.0/direct".to_string(),
            openweather_current_path: "/data/2.5/weather".to_string(),
            openweather_forecast_path: "/data/2.5/forecast".to_string(),
            default_units: Units::Imperial,
            geocode_limit: 5,
            geocode_cache_ttl: Duration::from_secs(12 * 60 * 60),
            current_cache_ttl: Duration::from_secs(5 * 60),
            forecast_cache_ttl: Duration::from_secs(5 * 60),
            cache_max_capacity: 100,
            rate_limit_max: 10,
            rate_limit_window: Duration::from_secs(60),
            rate_limit_prune_interval: Duration::from_secs(300),
            http_timeout: Duration::from_secs(2),
            bind_addr: "127.0.0.1:0".to_string(),
        }
    }
}

// Keeps the API key out of logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("openweather_api_key", &"<redacted>")
            .field("openweather_base_url", &self.openweather_base_url)
            .field("default_units", &self.default_units)
            .field("geocode_limit", &self.geocode_limit)
            .field("geocode_cache_ttl", &self.geocode_cache_ttl)
            .field("current_cache_ttl", &self.current_cache_ttl)
            .field("forecast_cache_ttl", &self.forecast_cache_ttl)
            .field("cache_max_capacity", &self.cache_max_capacity)
            .field("rate_limit_max", &self.rate_limit_max)
            .field("rate_limit_window", &self.rate_limit_window)
            .field("http_timeout", &self.http_timeout)
            .field("bind_addr", &self.bind_addr)
            .finish_non_exhaustive()
    }
}
