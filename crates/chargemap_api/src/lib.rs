//! ChargeMap API Library
//!
//! This library exposes the charging-station finder over a local HTTP API:
//! location controls, search with filters, provider registration and maps.

mod location;
mod map;
mod provider;
mod station;

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chargemap_engine::Engine;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

pub use crate::location::{CoordinateInput, LocationResponse, ManualLocationRequest};
pub use crate::map::ExportResponse;
pub use crate::station::{SearchParams, SearchResponse};

pub type SharedEngine = Arc<Mutex<Engine>>;

pub fn share(engine: Engine) -> SharedEngine {
    Arc::new(Mutex::new(engine))
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "OK"
}

/// Create the application router with all endpoints
pub fn create_app(engine: SharedEngine) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stations", get(station::list_stations))
        .route("/stations/search", get(station::search_stations))
        .route(
            "/providers",
            get(provider::list_providers).post(provider::register_provider),
        )
        .route("/providers/form", get(provider::registration_form))
        .route(
            "/location",
            get(location::get_location)
                .put(location::set_manual_location)
                .delete(location::clear_manual_location),
        )
        .route("/location/detect", post(location::detect_location))
        .route("/map", get(map::get_map))
        .route("/map/export", post(map::export_map))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

/// Lock the engine, applying any location outcome posted since the last
/// request before the handler sees the state.
pub(crate) fn lock(engine: &SharedEngine) -> MutexGuard<'_, Engine> {
    let mut guard = engine.lock().unwrap_or_else(|e| e.into_inner());
    guard.pump_location_events();
    guard
}

/// Drain detection outcomes periodically so they land even when no request
/// comes in.
pub fn spawn_location_pump(engine: SharedEngine, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            drop(lock(&engine));
        }
    })
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chargemap_engine::config::ChargemapConfig;
    use chargemap_engine::locate::LocationResolver;
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    /// Engine with a registry in `dir`, no network and no viewer
    pub fn test_engine(dir: &TempDir) -> SharedEngine {
        let mut config = ChargemapConfig::default();
        config.registry_path = dir.path().join("providers.json");
        config.map.open_viewer = false;
        share(Engine::with_resolver(config, LocationResolver::new(Vec::new())))
    }

    pub async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let dir = TempDir::new().unwrap();
        let app = create_app(test_engine(&dir));

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"OK");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let dir = TempDir::new().unwrap();
        let app = create_app(test_engine(&dir));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/nonexistent")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_location_pump_applies_outcomes() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);
        engine.lock().unwrap().detect_location().unwrap();

        let pump = spawn_location_pump(engine.clone(), Duration::from_millis(10));
        let mut settled = false;
        for _ in 0..200 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let detection = engine.lock().unwrap().state().detection().clone();
            if detection != chargemap_engine::state::DetectionStatus::Detecting {
                settled = true;
                break;
            }
        }
        pump.abort();
        assert!(settled, "detection outcome was never applied");
    }
}
