use std::path::{Path, PathBuf};

use chargemap_core::{DEFAULT_LOCATION, DEFAULT_LOCATION_LABEL, GeoPoint, InputError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REGISTRY_FILE: &str = "providers.json";
pub const DEFAULT_GEOLOCATION_SERVICES: [&str; 2] =
    ["https://ipinfo.io/json", "https://ipapi.co/json/"];
pub const DEFAULT_USER_AGENT: &str = concat!("chargemap/", env!("CARGO_PKG_VERSION"));

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Application configuration, loaded from an optional JSON file.
/// Every field has a default so a partial file is enough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ChargemapConfig {
    /// Where provider registrations are persisted
    pub registry_path: PathBuf,
    pub default_location: DefaultLocation,
    pub geolocation: GeolocationConfig,
    pub search: SearchConfig,
    pub map: MapConfig,
}

impl Default for ChargemapConfig {
    fn default() -> Self {
        ChargemapConfig {
            registry_path: PathBuf::from(DEFAULT_REGISTRY_FILE),
            default_location: DefaultLocation::default(),
            geolocation: GeolocationConfig::default(),
            search: SearchConfig::default(),
            map: MapConfig::default(),
        }
    }
}

impl ChargemapConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: ChargemapConfig =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let search = &self.search;
        if !(search.min_radius_km > 0.0 && search.min_radius_km <= search.max_radius_km) {
            return Err(ConfigError::Invalid(format!(
                "radius range {}..={} km is empty or not positive",
                search.min_radius_km, search.max_radius_km
            )));
        }
        if search.check_radius(search.default_radius_km).is_err() {
            return Err(ConfigError::Invalid(format!(
                "default radius {} km is outside {}..={} km",
                search.default_radius_km, search.min_radius_km, search.max_radius_km
            )));
        }
        let point = self.default_location.point();
        if !((-90.0..=90.0).contains(&point.latitude)
            && (-180.0..=180.0).contains(&point.longitude))
        {
            return Err(ConfigError::Invalid(format!(
                "default location {}, {} is not a valid coordinate",
                point.latitude, point.longitude
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DefaultLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub label: String,
}

impl Default for DefaultLocation {
    fn default() -> Self {
        DefaultLocation {
            latitude: DEFAULT_LOCATION.latitude,
            longitude: DEFAULT_LOCATION.longitude,
            label: DEFAULT_LOCATION_LABEL.to_string(),
        }
    }
}

impl DefaultLocation {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GeolocationConfig {
    /// Tried in order, first success wins
    pub services: Vec<String>,
    /// Per-attempt timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for GeolocationConfig {
    fn default() -> Self {
        GeolocationConfig {
            services: DEFAULT_GEOLOCATION_SERVICES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            timeout_secs: 5,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchConfig {
    pub default_radius_km: f64,
    pub min_radius_km: f64,
    pub max_radius_km: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            default_radius_km: 25.0,
            min_radius_km: 1.0,
            max_radius_km: 50.0,
        }
    }
}

impl SearchConfig {
    pub fn check_radius(&self, radius_km: f64) -> Result<f64, InputError> {
        if (self.min_radius_km..=self.max_radius_km).contains(&radius_km) {
            Ok(radius_km)
        } else {
            Err(InputError::RadiusOutOfRange {
                value: radius_km,
                min: self.min_radius_km,
                max: self.max_radius_km,
            })
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub zoom: u8,
    /// Open exported maps in the default viewer
    pub open_viewer: bool,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            zoom: 12,
            open_viewer: true,
        }
    }
}
