//! Reference-location detection
//!
//! IP geolocation services are tried in order on a worker thread. The worker
//! only ever sends a [`LocationOutcome`] back; applying it is up to the owner
//! of the receiving end.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use chargemap_core::{GeoPoint, InputError};
use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::GeolocationConfig;

const UNKNOWN_PLACE: &str = "Unknown";

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("request to {service} failed: {source}")]
    Http {
        service: String,
        source: reqwest::Error,
    },
    #[error("{service} returned no coordinates")]
    MissingCoordinates { service: String },
    #[error("{service} returned unusable coordinates: {source}")]
    BadCoordinates {
        service: String,
        source: InputError,
    },
    #[error("no geolocation services configured")]
    NoServices,
    #[error("location detection is already running")]
    AlreadyDetecting,
    #[error("could not start the detection worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedLocation {
    pub point: GeoPoint,
    pub city: String,
    pub country: String,
    /// Service that answered
    pub service: String,
}

impl DetectedLocation {
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.country)
    }
}

/// Message posted by the detection worker
#[derive(Debug, Clone, PartialEq)]
pub enum LocationOutcome {
    Detected(DetectedLocation),
    Failed { reason: String },
}

/// A source of the caller's approximate position
pub trait GeolocationService: Send + Sync {
    /// Identifier used in logs and in [`DetectedLocation::service`]
    fn name(&self) -> &str;

    /// Blocking lookup. Only call off the primary thread.
    fn lookup(&self) -> Result<DetectedLocation, LocateError>;
}

/// Response body shared by the common IP geolocation APIs.
///
/// ipinfo.io sends `loc: "lat,lon"`, ipapi.co sends numeric `latitude` and
/// `longitude`; either is accepted.
#[derive(Debug, Default, Deserialize)]
struct IpLocationResponse {
    loc: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    city: Option<String>,
    country: Option<String>,
}

impl IpLocationResponse {
    fn into_location(self, service: &str) -> Result<DetectedLocation, LocateError> {
        let point = match (&self.loc, self.latitude, self.longitude) {
            (Some(loc), _, _) => {
                let (lat, lon) =
                    loc.split_once(',')
                        .ok_or_else(|| LocateError::MissingCoordinates {
                            service: service.to_string(),
                        })?;
                GeoPoint::parse(lat, lon).map_err(|source| LocateError::BadCoordinates {
                    service: service.to_string(),
                    source,
                })?
            }
            (None, Some(latitude), Some(longitude)) => GeoPoint::checked(latitude, longitude)
                .map_err(|source| LocateError::BadCoordinates {
                    service: service.to_string(),
                    source,
                })?,
            _ => {
                return Err(LocateError::MissingCoordinates {
                    service: service.to_string(),
                });
            }
        };

        Ok(DetectedLocation {
            point,
            city: non_empty_or_unknown(self.city),
            country: non_empty_or_unknown(self.country),
            service: service.to_string(),
        })
    }
}

fn non_empty_or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_PLACE.to_string())
}

/// HTTP GET against a JSON IP-geolocation endpoint
pub struct HttpGeolocationService {
    url: String,
    timeout: Duration,
    user_agent: String,
}

impl HttpGeolocationService {
    pub fn new(url: impl Into<String>, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout,
            user_agent: user_agent.into(),
        }
    }

    fn http_error(&self, source: reqwest::Error) -> LocateError {
        LocateError::Http {
            service: self.url.clone(),
            source,
        }
    }
}

impl GeolocationService for HttpGeolocationService {
    fn name(&self) -> &str {
        &self.url
    }

    fn lookup(&self) -> Result<DetectedLocation, LocateError> {
        // The blocking client owns a runtime, so it is built and dropped on
        // the worker thread rather than stored.
        let client = reqwest::blocking::Client::builder()
            .user_agent(self.user_agent.as_str())
            .connect_timeout(self.timeout)
            .timeout(self.timeout)
            .build()
            .map_err(|e| self.http_error(e))?;

        let response = client
            .get(self.url.as_str())
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.http_error(e))?;
        let body: IpLocationResponse = response.json().map_err(|e| self.http_error(e))?;
        body.into_location(&self.url)
    }
}

/// Ordered list of services, each tried once
#[derive(Clone)]
pub struct LocationResolver {
    services: Vec<Arc<dyn GeolocationService>>,
}

impl LocationResolver {
    pub fn new(services: Vec<Arc<dyn GeolocationService>>) -> Self {
        Self { services }
    }

    pub fn from_config(config: &GeolocationConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        let services = config
            .services
            .iter()
            .map(|url| {
                Arc::new(HttpGeolocationService::new(
                    url.as_str(),
                    timeout,
                    config.user_agent.as_str(),
                )) as Arc<dyn GeolocationService>
            })
            .collect();
        Self::new(services)
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|s| s.name().to_string()).collect()
    }

    /// Try each service in turn and stop at the first success. Blocking.
    pub fn resolve(&self) -> LocationOutcome {
        if self.services.is_empty() {
            return LocationOutcome::Failed {
                reason: LocateError::NoServices.to_string(),
            };
        }

        let mut last_error = None;
        for service in &self.services {
            match service.lookup() {
                Ok(location) => {
                    tracing::info!(
                        "Location detected by {}: {}",
                        service.name(),
                        location.label()
                    );
                    return LocationOutcome::Detected(location);
                }
                Err(e) => {
                    tracing::debug!("Geolocation via {} failed: {}", service.name(), e);
                    last_error = Some(e);
                }
            }
        }

        let reason = match last_error {
            Some(e) => format!("all geolocation services failed (last error: {e})"),
            None => LocateError::NoServices.to_string(),
        };
        tracing::warn!("Location detection failed: {}", reason);
        LocationOutcome::Failed { reason }
    }

    /// Run [`Self::resolve`] on a detached worker thread and post the outcome.
    pub fn spawn(&self, outcome_tx: Sender<LocationOutcome>) -> Result<JoinHandle<()>, LocateError> {
        let resolver = self.clone();
        let handle = std::thread::Builder::new()
            .name("chargemap-locate".into())
            .spawn(move || {
                let outcome = resolver.resolve();
                // The receiver is gone only when the engine was dropped
                let _ = outcome_tx.send(outcome);
            })?;
        Ok(handle)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted service used instead of the network
    pub(crate) struct FakeService {
        pub name: &'static str,
        pub result: Option<DetectedLocation>,
        pub calls: AtomicUsize,
    }

    impl FakeService {
        pub(crate) fn ok(name: &'static str, point: GeoPoint, city: &str) -> Arc<Self> {
            Arc::new(FakeService {
                name,
                result: Some(DetectedLocation {
                    point,
                    city: city.into(),
                    country: "IN".into(),
                    service: name.into(),
                }),
                calls: AtomicUsize::new(0),
            })
        }

        pub(crate) fn failing(name: &'static str) -> Arc<Self> {
            Arc::new(FakeService {
                name,
                result: None,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl GeolocationService for FakeService {
        fn name(&self) -> &str {
            self.name
        }

        fn lookup(&self) -> Result<DetectedLocation, LocateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .ok_or_else(|| LocateError::MissingCoordinates {
                    service: self.name.into(),
                })
        }
    }

    pub(crate) fn resolver_of(services: &[Arc<FakeService>]) -> LocationResolver {
        LocationResolver::new(
            services
                .iter()
                .map(|s| s.clone() as Arc<dyn GeolocationService>)
                .collect(),
        )
    }

    fn parse(json: &str) -> Result<DetectedLocation, LocateError> {
        serde_json::from_str::<IpLocationResponse>(json)
            .unwrap()
            .into_location("test")
    }

    #[test]
    fn test_ipinfo_style_response() {
        let location =
            parse(r#"{"ip": "1.2.3.4", "city": "Thrissur", "country": "IN", "loc": "10.5276,76.2144"}"#)
                .unwrap();
        assert_eq!(location.point, GeoPoint::new(10.5276, 76.2144));
        assert_eq!(location.label(), "Thrissur, IN");
    }

    #[test]
    fn test_ipapi_style_response() {
        let location =
            parse(r#"{"city": "Kochi", "country": "IN", "latitude": 9.97, "longitude": 76.28}"#)
                .unwrap();
        assert_eq!(location.point, GeoPoint::new(9.97, 76.28));
    }

    #[test]
    fn test_ipapi_style_response_out_of_range_fails() {
        assert!(matches!(
            parse(r#"{"latitude": 123.0, "longitude": 76.28}"#),
            Err(LocateError::BadCoordinates { .. })
        ));
        assert!(matches!(
            parse(r#"{"latitude": 9.97, "longitude": 200.0}"#),
            Err(LocateError::BadCoordinates { .. })
        ));
    }

    #[test]
    fn test_out_of_range_service_falls_through() {
        struct OutOfRange;

        impl GeolocationService for OutOfRange {
            fn name(&self) -> &str {
                "bogus"
            }

            fn lookup(&self) -> Result<DetectedLocation, LocateError> {
                serde_json::from_str::<IpLocationResponse>(
                    r#"{"city": "Nowhere", "latitude": 999.0, "longitude": 76.0}"#,
                )
                .unwrap()
                .into_location("bogus")
            }
        }

        let fallback = FakeService::ok("fallback", GeoPoint::new(10.0, 76.0), "Aluva");
        let resolver = LocationResolver::new(vec![
            Arc::new(OutOfRange) as Arc<dyn GeolocationService>,
            fallback.clone() as Arc<dyn GeolocationService>,
        ]);

        match resolver.resolve() {
            LocationOutcome::Detected(location) => assert_eq!(location.service, "fallback"),
            other => panic!("Expected a detected location, got {:?}", other),
        }
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_response_without_city_uses_unknown() {
        let location = parse(r#"{"loc": "9.9,76.2", "city": ""}"#).unwrap();
        assert_eq!(location.city, "Unknown");
        assert_eq!(location.country, "Unknown");
    }

    #[test]
    fn test_response_without_coordinates_fails() {
        assert!(matches!(
            parse(r#"{"city": "Kochi", "country": "IN"}"#),
            Err(LocateError::MissingCoordinates { .. })
        ));
        assert!(matches!(
            parse(r#"{"loc": "somewhere"}"#),
            Err(LocateError::MissingCoordinates { .. })
        ));
        assert!(matches!(
            parse(r#"{"loc": "95.0,76.0"}"#),
            Err(LocateError::BadCoordinates { .. })
        ));
    }

    #[test]
    fn test_first_success_wins() {
        let broken = FakeService::failing("broken");
        let first = FakeService::ok("first", GeoPoint::new(10.0, 76.0), "Aluva");
        let second = FakeService::ok("second", GeoPoint::new(11.0, 77.0), "Coimbatore");
        let resolver = resolver_of(&[broken.clone(), first.clone(), second.clone()]);

        match resolver.resolve() {
            LocationOutcome::Detected(location) => assert_eq!(location.service, "first"),
            other => panic!("Expected a detected location, got {:?}", other),
        }
        assert_eq!(broken.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.calls.load(Ordering::SeqCst), 1);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_all_failing_services_report_failure() {
        let a = FakeService::failing("a");
        let b = FakeService::failing("b");
        let resolver = resolver_of(&[a.clone(), b.clone()]);

        match resolver.resolve() {
            LocationOutcome::Failed { reason } => assert!(reason.contains("b returned no coordinates")),
            other => panic!("Expected failure, got {:?}", other),
        }
        assert_eq!(a.calls.load(Ordering::SeqCst), 1);
        assert_eq!(b.calls.load(Ordering::SeqCst), 1);

        assert!(matches!(
            LocationResolver::new(Vec::new()).resolve(),
            LocationOutcome::Failed { .. }
        ));
    }

    #[test]
    fn test_spawn_posts_outcome() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let resolver = resolver_of(&[FakeService::ok(
            "fake",
            GeoPoint::new(9.0, 76.0),
            "Kottayam",
        )]);

        resolver.spawn(tx).unwrap().join().unwrap();
        match rx.try_recv().unwrap() {
            LocationOutcome::Detected(location) => assert_eq!(location.city, "Kottayam"),
            other => panic!("Expected a detected location, got {:?}", other),
        }
    }

    #[test]
    fn test_resolver_from_config_keeps_order() {
        let resolver = LocationResolver::from_config(&GeolocationConfig::default());
        assert_eq!(
            resolver.service_names(),
            vec!["https://ipinfo.io/json", "https://ipapi.co/json/"]
        );
    }
}
