//! ChargeMap engine
//!
//! Owns the application state and every side effect: the provider registry
//! file, location detection and map documents. Callers drive it through
//! [`Engine`], which is the only thing that mutates [`AppState`].

pub mod config;
pub mod listing;
pub mod locate;
pub mod map;
pub mod registry;
pub mod state;

use std::path::PathBuf;

use chargemap_core::{
    AccessFilter, GeoPoint, InputError, PowerFilter, ProviderForm, SearchContext, SearchOutcome,
    Station, run_search,
};
use crossbeam_channel::{Receiver, Sender};
use serde::Serialize;
use thiserror::Error;

use crate::config::ChargemapConfig;
use crate::locate::{LocateError, LocationOutcome, LocationResolver};
use crate::map::MapError;
use crate::registry::ProviderRegistry;
use crate::state::{AppState, DetectionStatus, ReferenceLocation};

#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error(transparent)]
    Invalid(#[from] InputError),
    #[error("{name:?} is already registered as provider station {existing_id}")]
    Duplicate { existing_id: u32, name: String },
}

/// Parameters of one search. Unset fields fall back to the reference
/// location and the configured default radius.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SearchQuery {
    /// Manually entered origin, takes precedence over the reference location
    pub origin: Option<GeoPoint>,
    pub radius_km: Option<f64>,
    pub access: AccessFilter,
    pub power: PowerFilter,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub station: Station,
    /// False when the registry file could not be written
    pub persisted: bool,
    pub provider_count: usize,
}

pub struct Engine {
    config: ChargemapConfig,
    state: AppState,
    resolver: LocationResolver,
    location_tx: Sender<LocationOutcome>,
    location_rx: Receiver<LocationOutcome>,
}

impl Engine {
    pub fn new(config: ChargemapConfig) -> Self {
        let resolver = LocationResolver::from_config(&config.geolocation);
        Self::with_resolver(config, resolver)
    }

    /// Build the engine, load the registry and run the startup search
    /// around the default location.
    pub fn with_resolver(config: ChargemapConfig, resolver: LocationResolver) -> Self {
        let registry = ProviderRegistry::load(&config.registry_path);
        let fallback = ReferenceLocation::fallback(
            config.default_location.point(),
            config.default_location.label.as_str(),
        );
        let (location_tx, location_rx) = crossbeam_channel::unbounded();

        let mut engine = Engine {
            state: AppState::new(registry, fallback),
            config,
            resolver,
            location_tx,
            location_rx,
        };
        if let Err(e) = engine.search(SearchQuery::default()) {
            tracing::warn!("Startup search failed: {}", e);
        }
        engine
    }

    pub fn config(&self) -> &ChargemapConfig {
        &self.config
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn stations(&self) -> &[Station] {
        self.state.stations()
    }

    /// Run the distance and attribute filters and remember the outcome.
    pub fn search(&mut self, query: SearchQuery) -> Result<&SearchOutcome, InputError> {
        let radius_km = self.config.search.check_radius(
            query
                .radius_km
                .unwrap_or(self.config.search.default_radius_km),
        )?;
        let origin = query
            .origin
            .unwrap_or_else(|| self.state.reference().point);
        let context = SearchContext {
            origin,
            radius_km,
            access: query.access,
            power: query.power,
        };

        let outcome = run_search(self.state.stations(), &context);
        self.state.status = format!(
            "Found {} stations within {} km",
            outcome.within_radius, radius_km
        );
        tracing::info!(
            "{} ({} after filters {} / {})",
            self.state.status,
            outcome.hits.len(),
            context.access,
            context.power
        );
        Ok(self.state.last_search.insert(outcome))
    }

    fn refresh_last_search(&mut self) {
        let Some(context) = self.state.last_search.as_ref().map(SearchOutcome::context) else {
            return;
        };
        self.state.last_search = Some(run_search(self.state.stations(), &context));
    }

    /// Validate, assign an id, persist and make the station searchable.
    ///
    /// Invalid or duplicate input leaves the registry untouched. A failed
    /// write keeps the station for this session and is reported through
    /// [`RegistrationReceipt::persisted`].
    pub fn register_provider(
        &mut self,
        form: &ProviderForm,
    ) -> Result<RegistrationReceipt, RegistrationError> {
        let draft = form.validate()?;
        if let Some(existing) = self.state.registry.find_duplicate(&draft) {
            return Err(RegistrationError::Duplicate {
                existing_id: existing.id,
                name: draft.name,
            });
        }

        let id = self.state.registry.next_id();
        let record = draft.into_record(id, chrono::Local::now().naive_local());
        let station = record.to_station();

        let persisted = match self.state.registry.append(record) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Provider {} kept in memory only: {}", id, e);
                false
            }
        };

        self.state.rebuild_dataset();
        self.refresh_last_search();
        self.state.status = format!("Registered {:?} as provider station {}", station.name, id);
        tracing::info!("{}", self.state.status);

        Ok(RegistrationReceipt {
            station,
            persisted,
            provider_count: self.state.registry.len(),
        })
    }

    pub fn set_manual_location(&mut self, point: GeoPoint) {
        self.state.manual = Some(point);
        self.state.status = format!(
            "Using manual location {:.4}, {:.4}",
            point.latitude, point.longitude
        );
        tracing::info!("{}", self.state.status);
    }

    /// Drop the manual location and go back to the detected or default one.
    pub fn clear_manual_location(&mut self) {
        self.state.manual = None;
        self.state.status = format!("Using {}", self.state.automatic.label());
        tracing::info!("{}", self.state.status);
    }

    /// Start background detection. Refused while a detection is in flight.
    pub fn detect_location(&mut self) -> Result<(), LocateError> {
        if self.state.detection == DetectionStatus::Detecting {
            return Err(LocateError::AlreadyDetecting);
        }
        // Dropping the handle detaches the worker
        self.resolver.spawn(self.location_tx.clone())?;
        self.state.detection = DetectionStatus::Detecting;
        self.state.status = "Detecting your location...".to_string();
        tracing::info!("{}", self.state.status);
        Ok(())
    }

    /// Apply every outcome the detection worker has posted so far.
    pub fn pump_location_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(outcome) = self.location_rx.try_recv() {
            self.apply_location(outcome);
            applied += 1;
        }
        applied
    }

    fn apply_location(&mut self, outcome: LocationOutcome) {
        match outcome {
            LocationOutcome::Detected(location) => {
                let label = location.label();
                self.state.automatic = ReferenceLocation::detected(&location);
                self.state.status = format!("Location detected: {label}");
                self.state.detection = DetectionStatus::Detected { label };
                if self.state.manual.is_some() {
                    tracing::info!("Manual location still takes precedence over detection");
                }
            }
            LocationOutcome::Failed { reason } => {
                self.state.status = "Location detection failed".to_string();
                self.state.detection = DetectionStatus::Failed { reason };
            }
        }
    }

    /// Map document for the last search.
    pub fn map_document(&self) -> Result<String, MapError> {
        let last = self.state.last_search().ok_or(MapError::NothingToShow)?;
        map::render_map(last.origin, &last.hits, self.config.map.zoom)
    }

    /// Write the map of the last search to a temporary file and, if
    /// configured, open it in the default viewer.
    pub fn export_map(&mut self) -> Result<PathBuf, MapError> {
        let html = self.map_document()?;
        let mut path = map::write_temp_document(&html)?;
        if self.config.map.open_viewer {
            path = map::open_in_viewer(path)?;
            self.state.status = "Map opened in viewer".to_string();
        } else {
            self.state.status = format!("Map written to {}", path.display());
        }
        tracing::info!("{}", self.state.status);
        Ok(path)
    }
}
