//! City name to coordinates, with a long-lived cache in front of the provider.

use super::types::GeocodingResult;
use super::WeatherSource;
use crate::cache::TimedCache;
use crate::error::WeatherError;
use std::sync::Arc;

pub struct GeocodingResolver {
    source: Arc<dyn WeatherSource>,
    cache: TimedCache<Vec<GeocodingResult>>,
    limit: u32,
}

/// Builds the provider query `city[,state][,country]`, skipping blank parts.
pub fn compose_query(city: &str, state_code: Option<&str>, country_code: Option<&str>) -> String {
    [Some(city), state_code, country_code]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

impl GeocodingResolver {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        cache: TimedCache<Vec<GeocodingResult>>,
        limit: u32,
    ) -> Self {
        Self {
            source,
            cache,
            limit,
        }
    }

    pub async fn resolve(&self, city: &str) -> Result<Vec<GeocodingResult>, WeatherError> {
        self.resolve_query(city, None, None).await
    }

    /// Matches in provider relevance order, at most `limit` of them.
    ///
    /// An empty match list is an error, and only non-empty results are cached.
    pub async fn resolve_query(
        &self,
        city: &str,
        state_code: Option<&str>,
        country_code: Option<&str>,
    ) -> Result<Vec<GeocodingResult>, WeatherError> {
        if city.trim().is_empty() {
            return Err(WeatherError::validation("City parameter is required"));
        }

        let query = compose_query(city, state_code, country_code);
        if let Some(results) = self.cache.get(&query).await {
            return Ok(results);
        }

        let mut results = self.source.geocode(&query, self.limit).await?;
        results.truncate(self.limit as usize);

        if results.is_empty() {
            tracing::info!("No geocoding match for {}", query);
            return Err(WeatherError::NotFound(query));
        }

        tracing::debug!(
            "Geocoded {} to {} match(es), best {} ({:.4}, {:.4})",
            query,
            results.len(),
            results[0].name,
            results[0].lat,
            results[0].lon
        );
        self.cache.put(&query, results.clone()).await;
        Ok(results)
    }

    /// The provider's top-ranked match. Ties are never re-ranked here.
    pub async fn first_match(&self, city: &str) -> Result<GeocodingResult, WeatherError> {
        let not_found = || WeatherError::LocationNotFound {
            city: city.trim().to_string(),
        };

        match self.resolve(city).await {
            Ok(results) => results.into_iter().next().ok_or_else(not_found),
            Err(WeatherError::NotFound(_)) => Err(not_found()),
            Err(e) => Err(e),
        }
    }

    /// Top match from the cache only; never calls the provider.
    pub async fn cached_first_match(&self, city: &str) -> Option<GeocodingResult> {
        self.cache
            .get(&compose_query(city, None, None))
            .await
            .and_then(|results| results.into_iter().next())
    }
}
