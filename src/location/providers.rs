//! Geocoding providers.

use super::types::{Location, LocationError};
use tracing::debug;

/// Maximum number of matches requested from the Geocoding API.
pub const MAX_MATCHES: usize = 10;

const OPEN_WEATHER_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";

/// Something that turns a place name into candidate locations.
///
/// Implementations return the raw, possibly redundant, match list.
pub trait Geocoder {
    fn search(&self, query: &str) -> Result<Vec<Location>, LocationError>;
}

// ─── OpenWeather Geocoding API ──────────────────────────────────

/// Direct geocoding through OpenWeather.
pub struct OpenWeatherGeocoder {
    agent: ureq::Agent,
    key: String,
}

impl OpenWeatherGeocoder {
    pub fn new(agent: ureq::Agent, key: impl Into<String>) -> Self {
        Self { agent, key: key.into() }
    }
}

impl Geocoder for OpenWeatherGeocoder {
    fn search(&self, query: &str) -> Result<Vec<Location>, LocationError> {
        debug!(query, "querying OpenWeather geocoding");

        let response = self
            .agent
            .get(OPEN_WEATHER_URL)
            .query("q", query)
            .query("limit", &MAX_MATCHES.to_string())
            .query("appid", &self.key)
            .call()
            .map_err(|e| LocationError::Network(e.to_string()))?;

        let matches: Vec<Location> = response
            .into_json()
            .map_err(|e| LocationError::InvalidResponse(e.to_string()))?;

        debug!(count = matches.len(), "geocoding returned matches");
        Ok(matches)
    }
}
