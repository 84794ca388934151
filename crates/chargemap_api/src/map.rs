use std::path::PathBuf;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chargemap_engine::map::MapError;
use serde::{Deserialize, Serialize};

use crate::{SharedEngine, error_response, lock};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResponse {
    pub path: PathBuf,
    pub status: String,
}

fn map_error_to_response(error: MapError) -> Response {
    match error {
        MapError::NothingToShow => error_response(StatusCode::NOT_FOUND, error),
        other => {
            tracing::error!("Map export failed: {}", other);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, other)
        }
    }
}

/// Leaflet page for the last search
pub async fn get_map(State(engine): State<SharedEngine>) -> Response {
    let engine = lock(&engine);
    match engine.map_document() {
        Ok(html) => Html(html).into_response(),
        Err(e) => map_error_to_response(e),
    }
}

/// Write the map to a temporary file, opening it when configured to
pub async fn export_map(State(engine): State<SharedEngine>) -> Response {
    let mut engine = lock(&engine);
    match engine.export_map() {
        Ok(path) => Json(ExportResponse {
            path,
            status: engine.state().status().to_string(),
        })
        .into_response(),
        Err(e) => map_error_to_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_app;
    use crate::tests::{body_json, test_engine};
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_map_of_startup_search() {
        let dir = TempDir::new().unwrap();
        let response = create_app(test_engine(&dir))
            .oneshot(request("GET", "/map"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("text/html"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let html = String::from_utf8(body.to_vec()).unwrap();
        assert!(html.contains("leaflet"));
        assert!(html.contains("ChargePoint Station - Lulu Mall"));
    }

    #[tokio::test]
    async fn test_map_without_results() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);

        let search = create_app(engine.clone())
            .oneshot(request("GET", "/stations/search?lat=51.5&lon=-0.12"))
            .await
            .unwrap();
        assert_eq!(search.status(), StatusCode::OK);

        let response = create_app(engine.clone())
            .oneshot(request("GET", "/map"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = create_app(engine)
            .oneshot(request("POST", "/map/export"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_export_map() {
        let dir = TempDir::new().unwrap();
        let response = create_app(test_engine(&dir))
            .oneshot(request("POST", "/map/export"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let export: ExportResponse = body_json(response).await;
        let html = std::fs::read_to_string(&export.path).unwrap();
        assert!(html.contains("Tesla Supercharger - Kochi"));
        assert!(export.status.starts_with("Map written to"));
        std::fs::remove_file(export.path).unwrap();
    }
}
