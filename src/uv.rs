//! OpenUV API client and report formatting.

use chrono::NaiveDateTime;
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::location::Location;

const OPEN_UV_URL: &str = "https://api.openuv.io/api/v1/uv";

/// Timestamp format used by OpenUV, e.g. `2024-06-15T11:52:42.017Z`.
pub const OPEN_UV_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";
pub const HEADER_TIME_FORMAT: &str = "%Y-%m-%d %H:%M UTC";
pub const SUN_TIME_FORMAT: &str = "%H:%M";

#[derive(Debug, thiserror::Error)]
pub enum UvError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid OpenUV response: {0}")]
    InvalidResponse(String),
}

/// Top level of the OpenUV response.
#[derive(Debug, Clone, Deserialize)]
pub struct UvReport {
    pub result: UvResult,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UvResult {
    pub uv: f64,
    pub uv_time: String,
    pub uv_max: f64,
    pub uv_max_time: String,
    pub ozone: f64,
    pub ozone_time: String,
    pub safe_exposure_time: SafeExposureTime,
    pub sun_info: SunInfo,
}

/// Safe exposure time in minutes per Fitzpatrick skin type.
/// Missing when the UV index is too low to matter.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SafeExposureTime {
    pub st1: Option<u32>, // very fair skin, white
    pub st2: Option<u32>, // fair skin, white
    pub st3: Option<u32>, // fair skin, cream white
    pub st4: Option<u32>, // olive skin
    pub st5: Option<u32>, // brown skin
    pub st6: Option<u32>, // black skin
}

impl SafeExposureTime {
    /// Minutes for skin type 1..=6.
    pub fn for_skin_type(&self, skin_type: u8) -> Option<u32> {
        match skin_type {
            1 => self.st1,
            2 => self.st2,
            3 => self.st3,
            4 => self.st4,
            5 => self.st5,
            6 => self.st6,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SunInfo {
    pub sun_times: SunTimes,
}

/// Notable sun positions. Absent near the poles.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SunTimes {
    pub sunrise: Option<String>,
    pub solar_noon: Option<String>,
    pub sunset: Option<String>,
    pub night: Option<String>,
    pub golden_hour: Option<String>,
    pub golden_hour_end: Option<String>,
}

/// Convert an OpenUV timestamp into `format`. Input that does not parse is
/// returned as is.
pub fn reformat_time(timestamp: &str, format: &str) -> String {
    match NaiveDateTime::parse_from_str(timestamp, OPEN_UV_TIME_FORMAT) {
        Ok(t) => t.format(format).to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn sun_time(t: &Option<String>) -> String {
    t.as_deref()
        .map(|t| reformat_time(t, SUN_TIME_FORMAT))
        .unwrap_or_else(|| "-".into())
}

fn minutes(m: Option<u32>) -> String {
    m.map(|m| m.to_string()).unwrap_or_else(|| "-".into())
}

impl fmt::Display for UvReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.result;
        let sun = &r.sun_info.sun_times;
        let set = &r.safe_exposure_time;

        writeln!(f, "Report time: {}", reformat_time(&r.uv_time, HEADER_TIME_FORMAT))?;
        writeln!(f)?;
        writeln!(f, "UV Index:")?;
        writeln!(f, "  Current: {:6.2}", r.uv)?;
        writeln!(f, "  Max:     {:6.2} ({})", r.uv_max, reformat_time(&r.uv_max_time, SUN_TIME_FORMAT))?;
        writeln!(f, "  Ozone:   {:6.2} ({})", r.ozone, reformat_time(&r.ozone_time, SUN_TIME_FORMAT))?;
        writeln!(f)?;
        writeln!(f, "Sunrise: {:>15}", sun_time(&sun.sunrise))?;
        writeln!(f, "Solar Noon: {:>12}", sun_time(&sun.solar_noon))?;
        writeln!(f, "Sunset: {:>16}", sun_time(&sun.sunset))?;
        writeln!(f, "Night: {:>17}", sun_time(&sun.night))?;
        writeln!(f, "Golden Hour: {:>11}", sun_time(&sun.golden_hour))?;
        writeln!(f, "Morning GH ends: {:>7}", sun_time(&sun.golden_hour_end))?;
        writeln!(f)?;
        writeln!(f, "Safe Exposure Time [min]:")?;
        for row in 1..=3u8 {
            writeln!(
                f,
                "  {}: {:>5}   |   {}: {:>5}",
                row,
                minutes(set.for_skin_type(row)),
                row + 3,
                minutes(set.for_skin_type(row + 3)),
            )?;
        }
        Ok(())
    }
}

/// Blocking OpenUV client.
pub struct UvClient {
    agent: ureq::Agent,
    key: String,
}

impl UvClient {
    pub fn new(agent: ureq::Agent, key: impl Into<String>) -> Self {
        Self { agent, key: key.into() }
    }

    /// Fetch the current report for `location`.
    pub fn report(&self, location: &Location) -> Result<UvReport, UvError> {
        debug!(lat = location.lat, lon = location.lon, "requesting OpenUV report");

        let response = self
            .agent
            .get(OPEN_UV_URL)
            .query("lat", &location.lat.to_string())
            .query("lng", &location.lon.to_string())
            .set("x-access-token", &self.key)
            .call()
            .map_err(|e| UvError::Network(e.to_string()))?;

        response
            .into_json()
            .map_err(|e| UvError::InvalidResponse(e.to_string()))
    }
}
