use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chargemap_core::{ProviderForm, ProviderRecord};
use chargemap_engine::RegistrationError;

use crate::{SharedEngine, error_response, lock};

/// Map registration errors to HTTP responses
fn registration_error_to_response(error: RegistrationError) -> Response {
    let status = match &error {
        RegistrationError::Invalid(_) => StatusCode::BAD_REQUEST,
        RegistrationError::Duplicate { .. } => StatusCode::CONFLICT,
    };
    error_response(status, error)
}

/// Register a provider station from the raw form fields
pub async fn register_provider(
    State(engine): State<SharedEngine>,
    Json(form): Json<ProviderForm>,
) -> Response {
    tracing::info!("Registering provider {:?}", form.name);

    let mut engine = lock(&engine);
    match engine.register_provider(&form) {
        Ok(receipt) => (StatusCode::CREATED, Json(receipt)).into_response(),
        Err(e) => registration_error_to_response(e),
    }
}

/// Registered providers as stored in the registry file
pub async fn list_providers(State(engine): State<SharedEngine>) -> Json<Vec<ProviderRecord>> {
    let engine = lock(&engine);
    Json(engine.state().providers().to_vec())
}

/// Form values a new provider starts from
pub async fn registration_form() -> Json<ProviderForm> {
    Json(ProviderForm::prefilled())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::{body_json, test_engine};
    use crate::{ErrorResponse, create_app};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use chargemap_core::{AccessType, Station};
    use tempfile::TempDir;
    use tower::util::ServiceExt;

    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Receipt {
        station: Station,
        persisted: bool,
        provider_count: usize,
    }

    fn post_form(form: &ProviderForm) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/providers")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(form).unwrap()))
            .unwrap()
    }

    fn form(name: &str) -> ProviderForm {
        ProviderForm {
            name: name.into(),
            latitude: "9.9400".into(),
            longitude: "76.2700".into(),
            ..ProviderForm::prefilled()
        }
    }

    #[tokio::test]
    async fn test_register_provider() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);

        let response = create_app(engine.clone())
            .oneshot(post_form(&form("Backyard Charger")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let receipt: Receipt = body_json(response).await;
        assert!(receipt.persisted);
        assert_eq!(receipt.provider_count, 1);
        assert_eq!(receipt.station.id, 1000);
        assert_eq!(receipt.station.access_type, AccessType::Provider);
        assert!(dir.path().join("providers.json").exists());

        let response = create_app(engine)
            .oneshot(
                Request::builder()
                    .uri("/providers")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let providers: Vec<ProviderRecord> = body_json(response).await;
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "Backyard Charger");
    }

    #[tokio::test]
    async fn test_register_invalid_provider() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);

        let invalid = ProviderForm {
            total_slots: "2".into(),
            available_slots: "5".into(),
            ..form("Overbooked")
        };
        let response = create_app(engine.clone())
            .oneshot(post_form(&invalid))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: ErrorResponse = body_json(response).await;
        assert!(error.error.contains("available"));

        assert!(engine.lock().unwrap().state().providers().is_empty());
        assert!(!dir.path().join("providers.json").exists());
    }

    #[tokio::test]
    async fn test_register_duplicate_provider() {
        let dir = TempDir::new().unwrap();
        let engine = test_engine(&dir);

        let first = create_app(engine.clone())
            .oneshot(post_form(&form("Garage")))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = create_app(engine.clone())
            .oneshot(post_form(&form("GARAGE")))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
        assert_eq!(engine.lock().unwrap().state().providers().len(), 1);
    }

    #[tokio::test]
    async fn test_registration_form_is_prefilled() {
        let dir = TempDir::new().unwrap();
        let response = create_app(test_engine(&dir))
            .oneshot(
                Request::builder()
                    .uri("/providers/form")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let form: ProviderForm = body_json(response).await;
        assert_eq!(form, ProviderForm::prefilled());
    }
}
