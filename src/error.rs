//! Crate-wide error type.

use crate::location::LocationError;
use crate::quota::QuotaError;
use crate::settings::SettingsError;
use crate::uv::UvError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Location(#[from] LocationError),
    #[error(transparent)]
    Quota(#[from] QuotaError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Uv(#[from] UvError),
    #[error("bad request limit: request_limit must be positive, or negative to disable the cache")]
    BadRequestLimit,
    #[error("no location specified and no default location set (use -l or -m)")]
    NoLocation,
}

pub type Result<T> = std::result::Result<T, Error>;
