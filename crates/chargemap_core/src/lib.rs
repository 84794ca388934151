//! ChargeMap core
//!
//! Station model, great-circle distance, and the search/filter pipeline.
//! Everything in this crate is pure; state and I/O live in `chargemap_engine`.

mod builtin;
mod geo;
mod models;
mod registration;
mod search;

pub use crate::builtin::{DEFAULT_LOCATION, DEFAULT_LOCATION_LABEL, builtin_stations};
pub use crate::geo::{EARTH_RADIUS_KM, GeoPoint, distance_km};
pub use crate::models::*;
pub use crate::registration::{
    DEFAULT_PRICING_MODEL, DEFAULT_TIME_LIMITS, PROVIDER_ID_BASE, ProviderDraft, ProviderForm,
    ProviderRecord,
};
pub use crate::search::{
    ALL_KEY, AccessFilter, PowerFilter, SearchContext, SearchHit, SearchOutcome,
    apply_attribute_filters, run_search, search,
};

use thiserror::Error;

/// Rejected user input. State is never modified when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{field} must be a number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("{field} is out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
    #[error("available slots ({available}) cannot exceed total slots ({total})")]
    SlotsExceedTotal { available: u32, total: u32 },
    #[error("unknown power type {0:?}")]
    UnknownPowerType(String),
    #[error("unknown access type {0:?}")]
    UnknownAccessType(String),
    #[error("radius must be between {min} and {max} km, got {value}")]
    RadiusOutOfRange { value: f64, min: f64, max: f64 },
}
