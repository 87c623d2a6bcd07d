//! UV exposure reports from OpenUV for places found through OpenWeather
//! geocoding, with a local cache of the daily OpenUV request quota.

pub mod error;
pub mod location;
pub mod quota;
pub mod settings;
pub mod uv;

pub use error::{Error, Result};
