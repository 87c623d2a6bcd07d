//! Location subsystem: geocoding search, duplicate removal, manual
//! coordinates.

pub mod geo;
pub mod providers;
pub mod resolver;
pub mod types;

pub use geo::{convert_coordinate, specify_location, LAT_LIMIT, LON_LIMIT, OVERLAP_THRESHOLD_KM};
pub use providers::{Geocoder, OpenWeatherGeocoder};
pub use resolver::{choose, dedup, LocationResolver};
pub use types::{Location, LocationError};
