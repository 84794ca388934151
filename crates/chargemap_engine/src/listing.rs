//! List view of search results

use chargemap_core::{AccessType, SearchHit, SearchOutcome};
use serde::{Deserialize, Serialize};

pub const EMPTY_STATE_MESSAGE: &str = "No stations found";
pub const EMPTY_STATE_HINT: &str = "Register as a provider or search for nearby stations";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderInfo {
    pub contact: Option<String>,
    pub pricing: Option<String>,
    pub time_limit: Option<String>,
}

/// One result row, already formatted for display
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationCard {
    pub id: u32,
    pub badge: String,
    pub name: String,
    pub address: String,
    pub distance_km: f64,
    pub slots: String,
    pub power: String,
    pub price: String,
    pub connectors: String,
    pub hours: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderInfo>,
}

fn badge(access: AccessType) -> &'static str {
    match access {
        AccessType::Public => "Public",
        AccessType::Private => "Private",
        AccessType::Provider => "Registered Provider",
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl StationCard {
    pub fn from_hit(hit: &SearchHit) -> Self {
        let station = &hit.station;
        let provider = station
            .provider
            .as_ref()
            .filter(|_| station.is_provider())
            .map(|details| ProviderInfo {
                contact: non_empty(&details.contact_info),
                pricing: non_empty(&details.pricing_model),
                time_limit: non_empty(&details.time_limits),
            });

        StationCard {
            id: station.id,
            badge: badge(station.access_type).to_string(),
            name: station.name.clone(),
            address: station.address.clone(),
            distance_km: hit.rounded_distance(),
            slots: format!(
                "{}/{} slots",
                station.available_slots, station.total_slots
            ),
            power: format!("{} kW", station.max_power),
            price: format!("${}/kWh", station.price_per_kwh),
            connectors: station
                .power_types
                .iter()
                .map(|p| p.label())
                .collect::<Vec<_>>()
                .join(", "),
            hours: non_empty(&station.operating_hours).unwrap_or_else(|| "Unknown".into()),
            provider,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ListView {
    pub count: usize,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty_message: Option<String>,
    pub cards: Vec<StationCard>,
}

impl ListView {
    pub fn from_outcome(outcome: &SearchOutcome) -> Self {
        let cards: Vec<StationCard> = outcome.hits.iter().map(StationCard::from_hit).collect();
        let count = cards.len();
        ListView {
            count,
            summary: format!("{count} stations found"),
            empty_message: cards
                .is_empty()
                .then(|| format!("{EMPTY_STATE_MESSAGE}. {EMPTY_STATE_HINT}")),
            cards,
        }
    }
}
