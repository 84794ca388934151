//! Nearest-station search and attribute filtering.
//!
//! Both stages are pure: they take the dataset by reference and return owned
//! hits, so callers can rerun them freely without touching shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;
use crate::{AccessType, InputError, PowerType, Station};

/// Key used by both selectors to mean "no filtering"
pub const ALL_KEY: &str = "all";

/// A station that passed the distance filter, with its distance from the origin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub station: Station,
    pub distance_km: f64,
}

impl SearchHit {
    /// Distance rounded to two decimals for display
    pub fn rounded_distance(&self) -> f64 {
        (self.distance_km * 100.0).round() / 100.0
    }
}

/// Return every station with a free slot within `radius_km` of `origin`,
/// nearest first.
///
/// The radius is inclusive. Stations at equal distance keep dataset order.
pub fn search(stations: &[Station], origin: GeoPoint, radius_km: f64) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = stations
        .iter()
        .filter(|station| station.has_free_slot())
        .filter_map(|station| {
            let distance_km = origin.distance_to(&station.location());
            (distance_km <= radius_km).then(|| SearchHit {
                station: station.clone(),
                distance_km,
            })
        })
        .collect();

    // sort_by is stable, which gives the dataset-order tie-break
    hits.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    hits
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum AccessFilter {
    #[default]
    All,
    Only(AccessType),
}

impl AccessFilter {
    pub fn matches(&self, station: &Station) -> bool {
        match self {
            AccessFilter::All => true,
            AccessFilter::Only(access) => station.access_type == *access,
        }
    }
}

impl fmt::Display for AccessFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessFilter::All => f.write_str(ALL_KEY),
            AccessFilter::Only(access) => access.fmt(f),
        }
    }
}

impl FromStr for AccessFilter {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_KEY) {
            return Ok(AccessFilter::All);
        }
        s.parse().map(AccessFilter::Only)
    }
}

impl From<AccessFilter> for String {
    fn from(filter: AccessFilter) -> Self {
        filter.to_string()
    }
}

impl TryFrom<String> for AccessFilter {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PowerFilter {
    #[default]
    All,
    Only(PowerType),
}

impl PowerFilter {
    pub fn matches(&self, station: &Station) -> bool {
        match self {
            PowerFilter::All => true,
            PowerFilter::Only(power) => station.supports(*power),
        }
    }
}

impl fmt::Display for PowerFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerFilter::All => f.write_str(ALL_KEY),
            PowerFilter::Only(power) => power.fmt(f),
        }
    }
}

impl FromStr for PowerFilter {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case(ALL_KEY) {
            return Ok(PowerFilter::All);
        }
        s.parse().map(PowerFilter::Only)
    }
}

impl From<PowerFilter> for String {
    fn from(filter: PowerFilter) -> Self {
        filter.to_string()
    }
}

impl TryFrom<String> for PowerFilter {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Keep only hits matching both selectors, preserving their order.
pub fn apply_attribute_filters(
    mut results: Vec<SearchHit>,
    access: AccessFilter,
    power: PowerFilter,
) -> Vec<SearchHit> {
    results.retain(|hit| access.matches(&hit.station) && power.matches(&hit.station));
    results
}

/// Everything one search needs. Rebuilt for every search, never stored
/// beyond the outcome it produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchContext {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub access: AccessFilter,
    pub power: PowerFilter,
}

/// Result of running the whole pipeline once
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchOutcome {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub access: AccessFilter,
    pub power: PowerFilter,
    /// Hits before the attribute filters were applied
    pub within_radius: usize,
    pub hits: Vec<SearchHit>,
}

impl SearchOutcome {
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// The context that produced this outcome, for rerunning it
    pub fn context(&self) -> SearchContext {
        SearchContext {
            origin: self.origin,
            radius_km: self.radius_km,
            access: self.access,
            power: self.power,
        }
    }
}

/// Distance filter followed by the attribute filters.
pub fn run_search(stations: &[Station], context: &SearchContext) -> SearchOutcome {
    let nearby = search(stations, context.origin, context.radius_km);
    let within_radius = nearby.len();
    let hits = apply_attribute_filters(nearby, context.access, context.power);
    tracing::debug!(
        within_radius,
        matched = hits.len(),
        radius_km = context.radius_km,
        "search complete"
    );
    SearchOutcome {
        origin: context.origin,
        radius_km: context.radius_km,
        access: context.access,
        power: context.power,
        within_radius,
        hits,
    }
}
