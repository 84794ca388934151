use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chargemap_core::{AccessFilter, GeoPoint, InputError, PowerFilter, Station};
use chargemap_engine::SearchQuery;
use chargemap_engine::listing::ListView;
use serde::{Deserialize, Serialize};

use crate::{SharedEngine, error_response, lock};

/// Query string of `GET /stations/search`; values arrive as typed text
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchParams {
    pub lat: Option<String>,
    pub lon: Option<String>,
    pub radius: Option<String>,
    pub access: Option<String>,
    pub power: Option<String>,
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl SearchParams {
    fn to_query(&self) -> Result<SearchQuery, InputError> {
        let origin = match (filled(&self.lat), filled(&self.lon)) {
            (None, None) => None,
            (lat, lon) => Some(GeoPoint::parse(
                lat.unwrap_or_default(),
                lon.unwrap_or_default(),
            )?),
        };

        let radius_km = filled(&self.radius)
            .map(|raw| match raw.parse::<f64>() {
                Ok(value) => Ok(value),
                Err(_) => Err(InputError::InvalidNumber {
                    field: "radius",
                    value: raw.to_string(),
                }),
            })
            .transpose()?;

        let access = filled(&self.access)
            .map(str::parse::<AccessFilter>)
            .transpose()?
            .unwrap_or_default();
        let power = filled(&self.power)
            .map(str::parse::<PowerFilter>)
            .transpose()?
            .unwrap_or_default();

        Ok(SearchQuery {
            origin,
            radius_km,
            access,
            power,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub origin: GeoPoint,
    pub radius_km: f64,
    pub access: AccessFilter,
    pub power: PowerFilter,
    pub within_radius: usize,
    pub status: String,
    #[serde(flatten)]
    pub list: ListView,
}

/// List every known station, built-in and registered
pub async fn list_stations(State(engine): State<SharedEngine>) -> Json<Vec<Station>> {
    tracing::info!("Listing stations");
    let engine = lock(&engine);
    Json(engine.stations().to_vec())
}

/// Search around the reference point (or the given coordinates)
pub async fn search_stations(
    State(engine): State<SharedEngine>,
    Query(params): Query<SearchParams>,
) -> Response {
    let query = match params.to_query() {
        Ok(query) => query,
        Err(error) => return error_response(StatusCode::BAD_REQUEST, error),
    };

    let mut engine = lock(&engine);
    let response = match engine.search(query) {
        Ok(outcome) => SearchResponse {
            origin: outcome.origin,
            radius_km: outcome.radius_km,
            access: outcome.access,
            power: outcome.power,
            within_radius: outcome.within_radius,
            list: ListView::from_outcome(outcome),
            status: String::new(),
        },
        Err(error) => return error_response(StatusCode::BAD_REQUEST, error),
    };
    let status = engine.state().status().to_string();

    (StatusCode::OK, Json(SearchResponse { status, ..response })).into_response()
}
