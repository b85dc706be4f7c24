//! Device location with a fixed fallback.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use crate::types::{Coordinate, LocationError, FALLBACK_COORDINATE, FALLBACK_NOTICE};

const IP_LOCATION_URL: &str = "http://ip-api.com/json/?fields=status,message,lat,lon";

/// Source of the device's current position
#[async_trait]
pub trait LocationSensor: Send + Sync + fmt::Debug {
    async fn current_position(&self) -> Result<Coordinate, LocationError>;
}

/// Sensor for platforms without any location capability
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableSensor;

#[async_trait]
impl LocationSensor for UnavailableSensor {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    status: String,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Approximate position from the public IP address.
#[derive(Debug, Clone)]
pub struct IpLocationSensor {
    url: String,
    client: Arc<Client>,
}

impl IpLocationSensor {
    pub fn new(timeout: Duration) -> Result<Self, LocationError> {
        Self::new_with_url(IP_LOCATION_URL, timeout)
    }

    /// Sensor querying a custom endpoint (for testing)
    pub fn new_with_url(url: &str, timeout: Duration) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LocationError::Other(e.to_string()))?;

        Ok(Self {
            url: url.to_string(),
            client: Arc::new(client),
        })
    }
}

#[async_trait]
impl LocationSensor for IpLocationSensor {
    async fn current_position(&self) -> Result<Coordinate, LocationError> {
        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                LocationError::Timeout
            } else {
                tracing::debug!("IP location request failed: {}", e);
                LocationError::ServiceUnavailable
            }
        })?;

        if !response.status().is_success() {
            tracing::debug!("IP location returned status {}", response.status());
            return Err(LocationError::ServiceUnavailable);
        }

        let body: IpLocationResponse = response
            .json()
            .await
            .map_err(|e| LocationError::Other(format!("parse error: {}", e)))?;

        if body.status != "success" {
            return Err(LocationError::Other(
                body.message.unwrap_or_else(|| body.status.clone()),
            ));
        }

        match (body.lat, body.lon) {
            (Some(lat), Some(lon)) => Ok(Coordinate::new(lat, lon)),
            _ => Err(LocationError::Other("response missing coordinates".to_string())),
        }
    }
}

/// Resolves the position used for weather, falling back to
/// [`FALLBACK_COORDINATE`] when the sensor denies, fails or is too slow.
#[derive(Debug)]
pub struct LocationResolver {
    sensor: Arc<dyn LocationSensor>,
    timeout: Duration,
    fallback: Mutex<Option<LocationError>>,
}

impl LocationResolver {
    pub fn new(sensor: Arc<dyn LocationSensor>, timeout: Duration) -> Self {
        Self {
            sensor,
            timeout,
            fallback: Mutex::new(None),
        }
    }

    /// Never fails. Records why the fallback was used, if it was.
    pub async fn resolve(&self) -> Coordinate {
        let result = match tokio::time::timeout(self.timeout, self.sensor.current_position()).await
        {
            Ok(Ok(coordinate)) if coordinate.is_valid() => Ok(coordinate),
            Ok(Ok(coordinate)) => Err(LocationError::Other(format!(
                "invalid coordinate ({}, {})",
                coordinate.latitude, coordinate.longitude
            ))),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(LocationError::Timeout),
        };

        match result {
            Ok(coordinate) => {
                *self.fallback.lock() = None;
                tracing::debug!(
                    "Resolved location ({:.4}, {:.4})",
                    coordinate.latitude,
                    coordinate.longitude
                );
                coordinate
            }
            Err(e) => {
                tracing::info!("Using default location: {}", e);
                *self.fallback.lock() = Some(e);
                FALLBACK_COORDINATE
            }
        }
    }

    /// Whether the last `resolve` returned the fallback coordinate
    pub fn fallback_occurred(&self) -> bool {
        self.fallback.lock().is_some()
    }

    pub fn fallback_reason(&self) -> Option<LocationError> {
        self.fallback.lock().clone()
    }

    /// Notice to show next to the weather, if any
    pub fn notice(&self) -> Option<&'static str> {
        self.fallback_occurred().then_some(FALLBACK_NOTICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug)]
    struct FixedSensor(Result<Coordinate, LocationError>);

    #[async_trait]
    impl LocationSensor for FixedSensor {
        async fn current_position(&self) -> Result<Coordinate, LocationError> {
            self.0.clone()
        }
    }

    #[derive(Debug)]
    struct HangingSensor;

    #[async_trait]
    impl LocationSensor for HangingSensor {
        async fn current_position(&self) -> Result<Coordinate, LocationError> {
            std::future::pending::<Result<Coordinate, LocationError>>().await
        }
    }

    fn resolver(sensor: impl LocationSensor + 'static) -> LocationResolver {
        LocationResolver::new(Arc::new(sensor), Duration::from_secs(10))
    }

    #[tokio::test]
    async fn test_resolves_sensor_position() {
        let r = resolver(FixedSensor(Ok(Coordinate::new(51.5, -0.12))));
        assert_eq!(r.resolve().await, Coordinate::new(51.5, -0.12));
        assert!(!r.fallback_occurred());
        assert!(r.notice().is_none());
    }

    #[tokio::test]
    async fn test_denied_falls_back() {
        let r = resolver(FixedSensor(Err(LocationError::PermissionDenied)));
        assert_eq!(r.resolve().await, FALLBACK_COORDINATE);
        assert!(r.fallback_occurred());
        assert_eq!(r.fallback_reason(), Some(LocationError::PermissionDenied));
        assert_eq!(r.notice(), Some(FALLBACK_NOTICE));
    }

    #[tokio::test]
    async fn test_unavailable_sensor_falls_back() {
        let r = resolver(UnavailableSensor);
        assert_eq!(r.resolve().await, FALLBACK_COORDINATE);
        assert_eq!(r.fallback_reason(), Some(LocationError::ServiceUnavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_sensor_times_out() {
        let r = resolver(HangingSensor);
        assert_eq!(r.resolve().await, FALLBACK_COORDINATE);
        assert_eq!(r.fallback_reason(), Some(LocationError::Timeout));
    }

    #[tokio::test]
    async fn test_invalid_sensor_coordinate_falls_back() {
        let r = resolver(FixedSensor(Ok(Coordinate::new(123.0, 0.0))));
        assert_eq!(r.resolve().await, FALLBACK_COORDINATE);
        assert!(matches!(r.fallback_reason(), Some(LocationError::Other(_))));
    }

    #[tokio::test]
    async fn test_ip_sensor_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "success",
                "lat": 47.6062,
                "lon": -122.3321
            })))
            .mount(&server)
            .await;

        let sensor = IpLocationSensor::new_with_url(&server.uri(), Duration::from_secs(5)).unwrap();
        let position = sensor.current_position().await.unwrap();
        assert_eq!(position, Coordinate::new(47.6062, -122.3321));
    }

    #[tokio::test]
    async fn test_ip_sensor_failure_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "fail",
                "message": "private range"
            })))
            .mount(&server)
            .await;

        let sensor = IpLocationSensor::new_with_url(&server.uri(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            sensor.current_position().await,
            Err(LocationError::Other("private range".to_string()))
        );
    }

    #[tokio::test]
    async fn test_ip_sensor_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let sensor = IpLocationSensor::new_with_url(&server.uri(), Duration::from_secs(5)).unwrap();
        assert_eq!(
            sensor.current_position().await,
            Err(LocationError::ServiceUnavailable)
        );
    }

    #[tokio::test]
    async fn test_ip_sensor_honours_request_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "success", "lat": 1.0, "lon": 2.0}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let sensor =
            IpLocationSensor::new_with_url(&server.uri(), Duration::from_millis(100)).unwrap();
        assert_eq!(sensor.current_position().await, Err(LocationError::Timeout));
    }
}
