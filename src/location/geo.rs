//! Distance estimation and coordinate parsing.
//!
//! Distances use an equirectangular projection, which is accurate enough
//! below the overlap threshold and much cheaper than haversine.

use super::types::{Location, LocationError};

/// Earth's mean radius [km].
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance [km] at or below which two same-named locations are one place.
pub const OVERLAP_THRESHOLD_KM: f64 = 10.0;

pub const LAT_LIMIT: f64 = 90.0;
pub const LON_LIMIT: f64 = 180.0;

impl Location {
    /// Estimated distance [km] to another location.
    pub fn distance_to(&self, other: &Location) -> f64 {
        let d_lat = (self.lat - other.lat).to_radians();
        let d_lon = (self.lon - other.lon).to_radians();
        let mean_lat = ((self.lat + other.lat) / 2.0).to_radians();

        EARTH_RADIUS_KM * (d_lat.powi(2) + (mean_lat.cos() * d_lon).powi(2)).sqrt()
    }

    /// Whether two locations describe the same place: identical city name
    /// (case-sensitive) and within [`OVERLAP_THRESHOLD_KM`].
    pub fn overlaps(&self, other: &Location) -> bool {
        self.city == other.city && self.distance_to(other) <= OVERLAP_THRESHOLD_KM
    }
}

/// Parse a decimal-degree coordinate and check `|value| <= limit`.
///
/// Use [`LAT_LIMIT`] for latitudes and [`LON_LIMIT`] for longitudes.
pub fn convert_coordinate(text: &str, limit: f64) -> Result<f64, LocationError> {
    let value: f64 = text
        .parse()
        .map_err(|_| LocationError::CoordinateMalformed(text.to_string()))?;

    if !value.is_finite() {
        return Err(LocationError::CoordinateMalformed(text.to_string()));
    }
    if value.abs() > limit {
        return Err(LocationError::CoordinateOutOfRange { value, limit });
    }

    Ok(value)
}

/// Build a location from `"City, Country, lat, lon"`.
///
/// Fields are trimmed. An empty city becomes `Unknown`, an empty country `N/A`.
pub fn specify_location(text: &str) -> Result<Location, LocationError> {
    let fields: Vec<&str> = text.split(',').map(str::trim).collect();

    let [city, country, lat, lon] = fields.as_slice() else {
        return Err(LocationError::InvalidSpec(text.to_string()));
    };

    Ok(Location {
        city: if city.is_empty() { "Unknown".into() } else { city.to_string() },
        state: None,
        country: if country.is_empty() { "N/A".into() } else { country.to_string() },
        lat: convert_coordinate(lat, LAT_LIMIT)?,
        lon: convert_coordinate(lon, LON_LIMIT)?,
    })
}
