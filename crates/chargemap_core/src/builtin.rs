use crate::geo::GeoPoint;
use crate::{AccessType, OwnerType, PowerType, Station, StationStatus};

/// Fallback reference point used until a location is detected or entered
pub const DEFAULT_LOCATION: GeoPoint = GeoPoint::new(9.9312, 76.2673);
pub const DEFAULT_LOCATION_LABEL: &str = "Kochi, Kerala";

#[allow(clippy::too_many_arguments)]
fn public_station(
    id: u32,
    name: &str,
    address: &str,
    (latitude, longitude): (f64, f64),
    (available_slots, total_slots): (u32, u32),
    power_types: &[PowerType],
    max_power: f64,
    price_per_kwh: f64,
    operating_hours: &str,
) -> Station {
    Station {
        id,
        name: name.into(),
        address: address.into(),
        latitude,
        longitude,
        total_slots,
        available_slots,
        power_types: power_types.to_vec(),
        max_power,
        price_per_kwh,
        status: StationStatus::Open,
        access_type: AccessType::Public,
        owner_type: OwnerType::Commercial,
        operating_hours: operating_hours.into(),
        provider: None,
    }
}

/// The public stations shipped with the application. Rebuilt on every call.
pub fn builtin_stations() -> Vec<Station> {
    use PowerType::*;

    vec![
        public_station(
            1,
            "Tesla Supercharger - Kochi",
            "MG Road, Ernakulam",
            (9.9312, 76.2673),
            (3, 8),
            &[Type2, Ccs, Chademo],
            250.0,
            0.28,
            "24/7",
        ),
        public_station(
            2,
            "ChargePoint Station - Lulu Mall",
            "Lulu Mall, Edappally, Kochi",
            (9.9836, 76.2855),
            (2, 4),
            &[Type2, Ccs],
            150.0,
            0.32,
            "10AM-10PM",
        ),
        public_station(
            3,
            "EVgo Station - Cochin Airport",
            "Cochin International Airport, Nedumbassery",
            (10.1518, 76.4019),
            (1, 6),
            &[Ccs, Chademo],
            350.0,
            0.35,
            "24/7",
        ),
        public_station(
            4,
            "Public Charging - Kalady Town",
            "Near Sree Sankara Temple, Kalady",
            (9.7480, 76.4880),
            (2, 4),
            &[Type2, Ccs],
            50.0,
            0.22,
            "8AM-8PM",
        ),
    ]
}
