//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A place on Earth, typically a city.
///
/// Serialized with the Geocoding API's field names, so the same type is
/// decoded from search results and stored as the default location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "name", alias = "city")]
    pub city: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default)]
    pub country: String,
    /// Latitude in decimal degrees, south is negative.
    pub lat: f64,
    /// Longitude in decimal degrees, west is negative.
    pub lon: f64,
}

impl Location {
    /// Full display name. The state is included only when asked for and known.
    pub fn name(&self, include_state: bool) -> String {
        match &self.state {
            Some(state) if include_state && !state.is_empty() => {
                format!("{}, {}, {}", self.city, state, self.country)
            }
            _ => format!("{}, {}", self.city, self.country),
        }
    }

    /// Coordinates formatted for display, e.g. `51.5072°N, 0.1276°W`.
    pub fn coords(&self) -> String {
        let ns = if self.lat >= 0.0 { 'N' } else { 'S' };
        let ew = if self.lon >= 0.0 { 'E' } else { 'W' };
        format!("{:.4}\u{00B0}{}, {:.4}\u{00B0}{}", self.lat.abs(), ns, self.lon.abs(), ew)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(true), self.coords())
    }
}

/// Location resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid geocoding response: {0}")]
    InvalidResponse(String),
    #[error("location not found: '{0}'")]
    NotFound(String),
    #[error("coordinate {value} out of range (limit \u{00B1}{limit})")]
    CoordinateOutOfRange { value: f64, limit: f64 },
    #[error("malformed coordinate: '{0}'")]
    CoordinateMalformed(String),
    #[error("improper structure of the specified location: '{0}' (expected \"City, Country, lat, lon\")")]
    InvalidSpec(String),
    #[error("invalid choice: '{0}'")]
    InvalidChoice(String),
    #[error("cannot read choice: {0}")]
    Prompt(#[from] std::io::Error),
}
