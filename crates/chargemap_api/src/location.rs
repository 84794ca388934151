use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chargemap_core::{GeoPoint, InputError};
use chargemap_engine::Engine;
use chargemap_engine::locate::LocateError;
use chargemap_engine::state::{DetectionStatus, ReferenceLocation};
use serde::{Deserialize, Serialize};

use crate::{SharedEngine, error_response, lock};

/// A coordinate as a JSON number or as the text typed into an entry field
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum CoordinateInput {
    Number(f64),
    Text(String),
}

impl CoordinateInput {
    fn as_text(&self) -> String {
        match self {
            CoordinateInput::Number(value) => value.to_string(),
            CoordinateInput::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualLocationRequest {
    pub latitude: CoordinateInput,
    pub longitude: CoordinateInput,
}

impl ManualLocationRequest {
    pub fn point(&self) -> Result<GeoPoint, InputError> {
        GeoPoint::parse(&self.latitude.as_text(), &self.longitude.as_text())
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationResponse {
    pub reference: ReferenceLocation,
    pub label: String,
    pub detection: DetectionStatus,
    pub status: String,
}

impl LocationResponse {
    fn from_engine(engine: &Engine) -> Self {
        let state = engine.state();
        let reference = state.reference();
        LocationResponse {
            label: reference.label(),
            reference,
            detection: state.detection().clone(),
            status: state.status().to_string(),
        }
    }
}

/// Current reference location and detection state
pub async fn get_location(State(engine): State<SharedEngine>) -> Json<LocationResponse> {
    let engine = lock(&engine);
    Json(LocationResponse::from_engine(&engine))
}

/// Use typed-in coordinates until they are cleared
pub async fn set_manual_location(
    State(engine): State<SharedEngine>,
    Json(request): Json<ManualLocationRequest>,
) -> Response {
    let point = match request.point() {
        Ok(point) => point,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let mut engine = lock(&engine);
    engine.set_manual_location(point);
    Json(LocationResponse::from_engine(&engine)).into_response()
}

pub async fn clear_manual_location(State(engine): State<SharedEngine>) -> Json<LocationResponse> {
    let mut engine = lock(&engine);
    engine.clear_manual_location();
    Json(LocationResponse::from_engine(&engine))
}

/// Start detection in the background; the outcome is applied on a later request
pub async fn detect_location(State(engine): State<SharedEngine>) -> Response {
    let mut engine = lock(&engine);
    match engine.detect_location() {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(LocationResponse::from_engine(&engine)),
        )
            .into_response(),
        Err(e @ LocateError::AlreadyDetecting) => error_response(StatusCode::CONFLICT, e),
        Err(e) => {
            tracing::error!("Location detection could not start: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}
