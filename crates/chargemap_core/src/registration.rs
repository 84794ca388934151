use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::geo::{GeoPoint, parse_number};
use crate::{AccessType, InputError, OwnerType, PowerType, ProviderDetails, Station, StationStatus};

/// Provider ids start here so they never collide with built-in ids
pub const PROVIDER_ID_BASE: u32 = 1000;

pub const DEFAULT_PRICING_MODEL: &str = "per_kwh";
pub const DEFAULT_TIME_LIMITS: &str = "no_limit";

fn default_pricing_model() -> String {
    DEFAULT_PRICING_MODEL.to_string()
}

fn default_time_limits() -> String {
    DEFAULT_TIME_LIMITS.to_string()
}

/// Raw registration input, exactly as typed into the form.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ProviderForm {
    pub name: String,
    pub address: String,
    pub contact_info: String,
    pub email: String,
    pub latitude: String,
    pub longitude: String,
    pub total_slots: String,
    pub available_slots: String,
    pub max_power: String,
    /// Comma-separated connector names
    pub power_types: String,
    pub price_per_kwh: String,
    pub pricing_model: String,
    pub time_limits: String,
    pub operating_hours: String,
}

impl ProviderForm {
    /// A form pre-filled with example values, as first shown to a provider.
    pub fn prefilled() -> Self {
        ProviderForm {
            name: "My Home Charging Station".into(),
            address: "Enter your address".into(),
            contact_info: "Phone: +91 98765 43210".into(),
            email: "provider@example.com".into(),
            latitude: "9.9312".into(),
            longitude: "76.2673".into(),
            total_slots: "1".into(),
            available_slots: "1".into(),
            max_power: "22".into(),
            power_types: "Type 2".into(),
            price_per_kwh: "0.15".into(),
            pricing_model: DEFAULT_PRICING_MODEL.into(),
            time_limits: "2_hours".into(),
            operating_hours: "6PM-10PM".into(),
        }
    }

    /// Check every field and convert to typed values.
    ///
    /// Nothing is allocated an id here; that is the registry's job.
    pub fn validate(&self) -> Result<ProviderDraft, InputError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(InputError::MissingField("name"));
        }

        let location = GeoPoint::parse(&self.latitude, &self.longitude)?;

        let total_slots = parse_count("total_slots", &self.total_slots)?;
        if total_slots == 0 {
            return Err(InputError::OutOfRange {
                field: "total_slots",
                value: self.total_slots.trim().to_string(),
            });
        }
        let available_slots = parse_count("available_slots", &self.available_slots)?;
        if available_slots > total_slots {
            return Err(InputError::SlotsExceedTotal {
                available: available_slots,
                total: total_slots,
            });
        }

        let max_power = parse_number("max_power", &self.max_power)?;
        if max_power <= 0.0 {
            return Err(InputError::OutOfRange {
                field: "max_power",
                value: self.max_power.trim().to_string(),
            });
        }

        let price_per_kwh = parse_number("price_per_kwh", &self.price_per_kwh)?;
        if price_per_kwh < 0.0 {
            return Err(InputError::OutOfRange {
                field: "price_per_kwh",
                value: self.price_per_kwh.trim().to_string(),
            });
        }

        let power_types = parse_power_types(&self.power_types)?;

        Ok(ProviderDraft {
            name: name.to_string(),
            address: self.address.trim().to_string(),
            contact_info: self.contact_info.trim().to_string(),
            email: self.email.trim().to_string(),
            location,
            total_slots,
            available_slots,
            max_power,
            power_types,
            price_per_kwh,
            pricing_model: non_blank_or(&self.pricing_model, DEFAULT_PRICING_MODEL),
            time_limits: non_blank_or(&self.time_limits, DEFAULT_TIME_LIMITS),
            operating_hours: self.operating_hours.trim().to_string(),
        })
    }
}

fn parse_count(field: &'static str, raw: &str) -> Result<u32, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::MissingField(field));
    }
    trimmed.parse::<u32>().map_err(|_| InputError::InvalidNumber {
        field,
        value: trimmed.to_string(),
    })
}

fn parse_power_types(raw: &str) -> Result<Vec<PowerType>, InputError> {
    let mut power_types: Vec<PowerType> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let power_type: PowerType = part.parse()?;
        if !power_types.contains(&power_type) {
            power_types.push(power_type);
        }
    }
    if power_types.is_empty() {
        return Err(InputError::MissingField("power_types"));
    }
    Ok(power_types)
}

fn non_blank_or(value: &str, fallback: &str) -> String {
    match value.trim() {
        "" => fallback.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// A validated registration that has not been assigned an id yet
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderDraft {
    pub name: String,
    pub address: String,
    pub contact_info: String,
    pub email: String,
    pub location: GeoPoint,
    pub total_slots: u32,
    pub available_slots: u32,
    pub max_power: f64,
    pub power_types: Vec<PowerType>,
    pub price_per_kwh: f64,
    pub pricing_model: String,
    pub time_limits: String,
    pub operating_hours: String,
}

impl ProviderDraft {
    pub fn into_record(self, id: u32, registered_date: NaiveDateTime) -> ProviderRecord {
        ProviderRecord {
            id,
            name: self.name,
            address: self.address,
            contact_info: self.contact_info,
            email: self.email,
            latitude: self.location.latitude,
            longitude: self.location.longitude,
            total_slots: self.total_slots,
            available_slots: self.available_slots,
            max_power: self.max_power,
            power_types: self.power_types,
            price_per_kwh: self.price_per_kwh,
            pricing_model: self.pricing_model,
            time_limits: self.time_limits,
            operating_hours: self.operating_hours,
            status: StationStatus::Available,
            registered_date: Some(registered_date),
        }
    }
}

/// One entry of the provider registry file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderRecord {
    pub id: u32,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_info: String,
    #[serde(default)]
    pub email: String,
    pub latitude: f64,
    pub longitude: f64,
    pub total_slots: u32,
    pub available_slots: u32,
    pub max_power: f64,
    pub power_types: Vec<PowerType>,
    pub price_per_kwh: f64,
    #[serde(default = "default_pricing_model")]
    pub pricing_model: String,
    #[serde(default = "default_time_limits")]
    pub time_limits: String,
    #[serde(default)]
    pub operating_hours: String,
    #[serde(default)]
    pub status: StationStatus,
    #[serde(default)]
    pub registered_date: Option<NaiveDateTime>,
}

impl ProviderRecord {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    pub fn to_station(&self) -> Station {
        Station {
            id: self.id,
            name: self.name.clone(),
            address: self.address.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
            total_slots: self.total_slots,
            available_slots: self.available_slots,
            power_types: self.power_types.clone(),
            max_power: self.max_power,
            price_per_kwh: self.price_per_kwh,
            status: self.status,
            access_type: AccessType::Provider,
            owner_type: OwnerType::Provider,
            operating_hours: self.operating_hours.clone(),
            provider: Some(ProviderDetails {
                contact_info: self.contact_info.clone(),
                email: self.email.clone(),
                pricing_model: self.pricing_model.clone(),
                time_limits: self.time_limits.clone(),
                registered_date: self.registered_date,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn registered_at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(18, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_prefilled_form_is_valid() {
        let draft = ProviderForm::prefilled().validate().unwrap();
        assert_eq!(draft.name, "My Home Charging Station");
        assert_eq!(draft.location, GeoPoint::new(9.9312, 76.2673));
        assert_eq!(draft.power_types, vec![PowerType::Type2]);
        assert_eq!(draft.max_power, 22.0);
        assert_eq!(draft.time_limits, "2_hours");
    }

    #[test]
    fn test_non_numeric_latitude_is_rejected() {
        let form = ProviderForm {
            latitude: "nine".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(
            form.validate(),
            Err(InputError::InvalidNumber {
                field: "latitude",
                value: "nine".into()
            })
        );
    }

    #[test]
    fn test_slot_rules() {
        let negative = ProviderForm {
            available_slots: "-1".into(),
            ..ProviderForm::prefilled()
        };
        assert!(matches!(
            negative.validate(),
            Err(InputError::InvalidNumber {
                field: "available_slots",
                ..
            })
        ));

        let too_many = ProviderForm {
            total_slots: "2".into(),
            available_slots: "3".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(
            too_many.validate(),
            Err(InputError::SlotsExceedTotal {
                available: 3,
                total: 2
            })
        );

        let no_slots = ProviderForm {
            total_slots: "0".into(),
            available_slots: "0".into(),
            ..ProviderForm::prefilled()
        };
        assert!(matches!(
            no_slots.validate(),
            Err(InputError::OutOfRange {
                field: "total_slots",
                ..
            })
        ));

        let fully_booked = ProviderForm {
            total_slots: "2".into(),
            available_slots: "0".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(fully_booked.validate().unwrap().available_slots, 0);
    }

    #[test]
    fn test_price_and_power_rules() {
        let negative_price = ProviderForm {
            price_per_kwh: "-0.1".into(),
            ..ProviderForm::prefilled()
        };
        assert!(matches!(
            negative_price.validate(),
            Err(InputError::OutOfRange {
                field: "price_per_kwh",
                ..
            })
        ));

        let free = ProviderForm {
            price_per_kwh: "0".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(free.validate().unwrap().price_per_kwh, 0.0);

        let no_power = ProviderForm {
            max_power: "0".into(),
            ..ProviderForm::prefilled()
        };
        assert!(no_power.validate().is_err());
    }

    #[test]
    fn test_power_type_list() {
        let form = ProviderForm {
            power_types: "CCS, type 2,ccs,".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(
            form.validate().unwrap().power_types,
            vec![PowerType::Ccs, PowerType::Type2]
        );

        let empty = ProviderForm {
            power_types: " , ".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(empty.validate(), Err(InputError::MissingField("power_types")));

        let unknown = ProviderForm {
            power_types: "Type 2, Schuko".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(
            unknown.validate(),
            Err(InputError::UnknownPowerType("Schuko".into()))
        );
    }

    #[test]
    fn test_blank_name_and_defaults() {
        let unnamed = ProviderForm {
            name: "   ".into(),
            ..ProviderForm::prefilled()
        };
        assert_eq!(unnamed.validate(), Err(InputError::MissingField("name")));

        let blank_terms = ProviderForm {
            pricing_model: "".into(),
            time_limits: " ".into(),
            ..ProviderForm::prefilled()
        };
        let draft = blank_terms.validate().unwrap();
        assert_eq!(draft.pricing_model, DEFAULT_PRICING_MODEL);
        assert_eq!(draft.time_limits, DEFAULT_TIME_LIMITS);
    }

    #[test]
    fn test_record_becomes_provider_station() {
        let record = ProviderForm::prefilled()
            .validate()
            .unwrap()
            .into_record(1000, registered_at());
        let station = record.to_station();

        assert_eq!(station.id, 1000);
        assert_eq!(station.access_type, AccessType::Provider);
        assert_eq!(station.owner_type, OwnerType::Provider);
        assert_eq!(station.status, StationStatus::Available);
        let details = station.provider.expect("provider details");
        assert_eq!(details.email, "provider@example.com");
        assert_eq!(details.registered_date, Some(registered_at()));
    }

    #[test]
    fn test_record_file_format() {
        let record = ProviderForm::prefilled()
            .validate()
            .unwrap()
            .into_record(1003, registered_at());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["id"], 1003);
        assert_eq!(json["power_types"], serde_json::json!(["Type 2"]));
        assert_eq!(json["status"], "available");
        assert_eq!(json["registered_date"], "2024-03-01T18:30:00");
        assert!(json.get("access_type").is_none());
    }

    #[test]
    fn test_sparse_record_uses_defaults() {
        let json = r#"
        {
          "id": 1000,
          "name": "Garage charger",
          "latitude": 9.95,
          "longitude": 76.3,
          "total_slots": 1,
          "available_slots": 1,
          "max_power": 7,
          "power_types": ["Type 2"],
          "price_per_kwh": 0.1,
          "registered_date": "2024-05-02T09:15:42.123456"
        }
        "#;
        let record: ProviderRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.pricing_model, DEFAULT_PRICING_MODEL);
        assert_eq!(record.time_limits, DEFAULT_TIME_LIMITS);
        assert_eq!(record.status, StationStatus::Available);
        assert_eq!(record.max_power, 7.0);
        assert!(record.registered_date.is_some());
    }
}
