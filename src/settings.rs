//! Application root and the JSON settings file at `<root>/settings/uv.json`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::location::Location;

const SETTINGS_FILE: &str = "settings/uv.json";
const CACHE_FILE: &str = "cache/uv_rc";

/// Files owned by the application, all below one root directory.
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `<config dir>/uv-report`, or the executable's directory when the
    /// platform has no config dir.
    pub fn discover() -> Self {
        let root = dirs::config_dir()
            .map(|dir| dir.join("uv-report"))
            .or_else(|| {
                std::env::current_exe()
                    .ok()
                    .and_then(|exe| exe.parent().map(Path::to_path_buf))
            })
            .unwrap_or_else(|| PathBuf::from("."));
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings_file(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.root.join(CACHE_FILE)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed settings file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write settings file {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{0} API key not provided")]
    MissingKey(&'static str),
}

/// How the OpenUV request quota is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestLimit {
    /// Negative setting: the quota cache is not consulted at all.
    Disabled,
    /// Zero: a misconfiguration, reporting is refused.
    Invalid,
    /// Daily ceiling for the quota cache.
    Daily(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// OpenWeather key, used for geocoding.
    #[serde(default)]
    pub open_weather_key: String,
    #[serde(default)]
    pub open_uv_key: String,
    /// Used when no location is given on the command line.
    #[serde(default)]
    pub default_location: Option<Location>,
    /// Daily OpenUV request limit; `-1` disables the quota cache.
    #[serde(default = "default_request_limit")]
    pub request_limit: i64,
}

fn default_request_limit() -> i64 {
    -1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            open_weather_key: String::new(),
            open_uv_key: String::new(),
            default_location: None,
            request_limit: default_request_limit(),
        }
    }
}

impl Settings {
    pub fn request_limit(&self) -> RequestLimit {
        match self.request_limit {
            n if n < 0 => RequestLimit::Disabled,
            0 => RequestLimit::Invalid,
            n => RequestLimit::Daily(n as u64),
        }
    }

    /// Both API keys must be present.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.open_weather_key.trim().is_empty() {
            return Err(SettingsError::MissingKey("OpenWeather"));
        }
        if self.open_uv_key.trim().is_empty() {
            return Err(SettingsError::MissingKey("OpenUV"));
        }
        Ok(())
    }
}

/// Reads and writes [`Settings`] as pretty-printed JSON.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the settings. When the file does not exist yet, an empty one is
    /// generated and `Ok(None)` is returned.
    pub fn load(&self) -> Result<Option<Settings>, SettingsError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "generating settings file");
                self.save(&Settings::default())?;
                return Ok(None);
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&data)
            .map(Some)
            .map_err(|source| SettingsError::Parse {
                path: self.path.clone(),
                source,
            })
    }

    pub fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        let persist = |source| SettingsError::Persist {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(persist)?;
        }
        let json = serde_json::to_string_pretty(settings).map_err(|e| persist(e.into()))?;
        fs::write(&self.path, json).map_err(persist)
    }
}
