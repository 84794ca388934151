use chargemap_core::{GeoPoint, ProviderRecord, SearchOutcome, Station, builtin_stations};
use serde::{Deserialize, Serialize};

use crate::locate::DetectedLocation;
use crate::registry::ProviderRegistry;

/// Where the reference point came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum LocationSource {
    Default { label: String },
    Detected { city: String, country: String },
    Manual,
}

/// The point searches start from unless the query overrides it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceLocation {
    pub point: GeoPoint,
    pub source: LocationSource,
}

impl ReferenceLocation {
    pub fn fallback(point: GeoPoint, label: impl Into<String>) -> Self {
        ReferenceLocation {
            point,
            source: LocationSource::Default {
                label: label.into(),
            },
        }
    }

    pub fn detected(location: &DetectedLocation) -> Self {
        ReferenceLocation {
            point: location.point,
            source: LocationSource::Detected {
                city: location.city.clone(),
                country: location.country.clone(),
            },
        }
    }

    pub fn manual(point: GeoPoint) -> Self {
        ReferenceLocation {
            point,
            source: LocationSource::Manual,
        }
    }

    pub fn label(&self) -> String {
        match &self.source {
            LocationSource::Default { label } => format!("{label} (Default)"),
            LocationSource::Detected { city, country } => format!("{city}, {country}"),
            LocationSource::Manual => format!(
                "{:.4}, {:.4} (Manual)",
                self.point.latitude, self.point.longitude
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum DetectionStatus {
    #[default]
    Idle,
    Detecting,
    Detected { label: String },
    Failed { reason: String },
}

/// Everything the application knows. Only [`crate::Engine`] mutates it.
#[derive(Debug, Clone)]
pub struct AppState {
    builtin: Vec<Station>,
    pub(crate) registry: ProviderRegistry,
    /// Built-ins followed by provider stations in registration order
    stations: Vec<Station>,
    /// Default or last detected location
    pub(crate) automatic: ReferenceLocation,
    /// User-entered location; wins over `automatic` while set
    pub(crate) manual: Option<GeoPoint>,
    pub(crate) detection: DetectionStatus,
    pub(crate) last_search: Option<SearchOutcome>,
    pub(crate) status: String,
}

impl AppState {
    pub fn new(registry: ProviderRegistry, fallback: ReferenceLocation) -> Self {
        let mut state = AppState {
            builtin: builtin_stations(),
            registry,
            stations: Vec::new(),
            automatic: fallback,
            manual: None,
            detection: DetectionStatus::Idle,
            last_search: None,
            status: String::new(),
        };
        state.rebuild_dataset();
        state
    }

    /// Recombine built-ins and registered providers.
    pub(crate) fn rebuild_dataset(&mut self) {
        self.stations = self
            .builtin
            .iter()
            .cloned()
            .chain(self.registry.stations())
            .collect();
        self.status = format!(
            "Loaded {} charging stations ({} from providers)",
            self.stations.len(),
            self.registry.len()
        );
        tracing::info!("{}", self.status);
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn providers(&self) -> &[ProviderRecord] {
        self.registry.records()
    }

    /// The reference point searches use when the query has no origin
    pub fn reference(&self) -> ReferenceLocation {
        match self.manual {
            Some(point) => ReferenceLocation::manual(point),
            None => self.automatic.clone(),
        }
    }

    pub fn detection(&self) -> &DetectionStatus {
        &self.detection
    }

    pub fn last_search(&self) -> Option<&SearchOutcome> {
        self.last_search.as_ref()
    }

    /// One-line summary of the latest state change
    pub fn status(&self) -> &str {
        &self.status
    }
}
