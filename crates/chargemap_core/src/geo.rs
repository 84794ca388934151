use serde::{Deserialize, Serialize};

use crate::InputError;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points using the haversine formula.
///
/// Inputs are decimal degrees. NaN or out-of-range coordinates are not checked.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let dlat = lat2_rad - lat1_rad;
    let dlon = (lon2 - lon1).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// A WGS-84 coordinate pair in decimal degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint {
            latitude,
            longitude,
        }
    }

    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        distance_km(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }

    /// Parse user-entered coordinates.
    pub fn parse(latitude: &str, longitude: &str) -> Result<Self, InputError> {
        let latitude = parse_coordinate("latitude", latitude, 90.0)?;
        let longitude = parse_coordinate("longitude", longitude, 180.0)?;
        Ok(GeoPoint::new(latitude, longitude))
    }

    /// Build a point from numbers received from elsewhere, with the same
    /// range checks as [`GeoPoint::parse`].
    pub fn checked(latitude: f64, longitude: f64) -> Result<Self, InputError> {
        check_range("latitude", latitude, 90.0)?;
        check_range("longitude", longitude, 180.0)?;
        Ok(GeoPoint::new(latitude, longitude))
    }
}

fn check_range(field: &'static str, value: f64, limit: f64) -> Result<(), InputError> {
    if !(-limit..=limit).contains(&value) {
        return Err(InputError::OutOfRange {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn parse_coordinate(field: &'static str, raw: &str, limit: f64) -> Result<f64, InputError> {
    let value = parse_number(field, raw)?;
    check_range(field, value, limit).map_err(|_| InputError::OutOfRange {
        field,
        value: raw.trim().to_string(),
    })?;
    Ok(value)
}

/// Parse a finite float, trimming surrounding whitespace.
pub(crate) fn parse_number(field: &'static str, raw: &str) -> Result<f64, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::MissingField(field));
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(InputError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        }),
    }
}
