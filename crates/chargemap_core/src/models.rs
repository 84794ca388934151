use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::InputError;
use crate::geo::GeoPoint;

/// Connector kinds a station can offer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
pub enum PowerType {
    #[serde(rename = "Type 2")]
    Type2,
    #[serde(rename = "CCS")]
    Ccs,
    #[serde(rename = "CHAdeMO")]
    Chademo,
}

impl PowerType {
    pub const ALL: [PowerType; 3] = [PowerType::Type2, PowerType::Ccs, PowerType::Chademo];

    pub fn label(&self) -> &'static str {
        match self {
            PowerType::Type2 => "Type 2",
            PowerType::Ccs => "CCS",
            PowerType::Chademo => "CHAdeMO",
        }
    }
}

impl fmt::Display for PowerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for PowerType {
    type Err = InputError;

    /// Accepts the display label in any case, with or without the space in "Type 2".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "type2" => Ok(PowerType::Type2),
            "ccs" => Ok(PowerType::Ccs),
            "chademo" => Ok(PowerType::Chademo),
            _ => Err(InputError::UnknownPowerType(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    Public,
    Private,
    Provider,
}

impl AccessType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessType::Public => "public",
            AccessType::Private => "private",
            AccessType::Provider => "provider",
        }
    }
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessType {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(AccessType::Public),
            "private" => Ok(AccessType::Private),
            "provider" => Ok(AccessType::Provider),
            _ => Err(InputError::UnknownAccessType(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    Commercial,
    Provider,
}

/// Display status of a station. Never consulted by the search pipeline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Eq, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StationStatus {
    Open,
    #[default]
    Available,
    Closed,
    #[serde(other)]
    Unknown,
}

/// Extra fields carried only by provider-registered stations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ProviderDetails {
    pub contact_info: String,
    pub email: String,
    pub pricing_model: String,
    pub time_limits: String,
    pub registered_date: Option<NaiveDateTime>,
}

/// A charging location.
///
/// `available_slots` never exceeds `total_slots` for stations built through
/// [`crate::ProviderForm::validate`] or the built-in dataset.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Station {
    pub id: u32,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_slots: u32,
    pub available_slots: u32,
    pub power_types: Vec<PowerType>,
    /// Maximum power in kW
    pub max_power: f64,
    pub price_per_kwh: f64,
    pub status: StationStatus,
    pub access_type: AccessType,
    pub owner_type: OwnerType,
    pub operating_hours: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderDetails>,
}

impl Station {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn has_free_slot(&self) -> bool {
        self.available_slots > 0
    }

    pub fn supports(&self, power_type: PowerType) -> bool {
        self.power_types.contains(&power_type)
    }

    pub fn is_provider(&self) -> bool {
        self.access_type == AccessType::Provider
    }
}
