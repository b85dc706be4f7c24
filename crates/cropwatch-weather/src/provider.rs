//! Open-Meteo forecast client.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::types::{Coordinate, CurrentConditions, DailyForecast, WeatherError, WeatherSnapshot};

pub const OPEN_METEO_URL: &str = "https://api.open-meteo.com/v1/forecast";

const CURRENT_FIELDS: &str =
    "temperature_2m,relative_humidity_2m,weather_code,wind_speed_10m,uv_index";
const DAILY_FIELDS: &str = "weather_code,temperature_2m_max,temperature_2m_min";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentResponse,
    daily: DailyResponse,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    temperature_2m: f64,
    relative_humidity_2m: f64,
    weather_code: u32,
    wind_speed_10m: f64,
    // null at night for some models
    uv_index: Option<f64>,
}

/// Daily values arrive as parallel arrays indexed by day
#[derive(Debug, Deserialize)]
struct DailyResponse {
    time: Vec<NaiveDate>,
    weather_code: Vec<u32>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
}

impl DailyResponse {
    fn into_forecasts(self) -> Result<Vec<DailyForecast>, WeatherError> {
        let days = self.time.len();
        if self.weather_code.len() != days
            || self.temperature_2m_max.len() != days
            || self.temperature_2m_min.len() != days
        {
            return Err(WeatherError::FetchFailed(
                "daily arrays have mismatched lengths".to_string(),
            ));
        }

        Ok(self
            .time
            .into_iter()
            .zip(self.weather_code)
            .zip(self.temperature_2m_max.into_iter().zip(self.temperature_2m_min))
            .map(|((date, weather_code), (temp_max, temp_min))| DailyForecast {
                date,
                weather_code,
                temp_max,
                temp_min,
            })
            .collect())
    }
}

/// Fetches current conditions plus a multi-day forecast for a coordinate.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    api_url: String,
    client: Arc<Client>,
    forecast_days: u8,
}

impl WeatherClient {
    pub fn new(forecast_days: u8, timeout: Duration) -> Result<Self, WeatherError> {
        Self::new_with_url(OPEN_METEO_URL, forecast_days, timeout)
    }

    pub fn new_with_url(
        api_url: &str,
        forecast_days: u8,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            api_url: api_url.to_string(),
            client: Arc::new(client),
            forecast_days: forecast_days.max(1),
        })
    }

    pub fn forecast_days(&self) -> u8 {
        self.forecast_days
    }

    /// One-shot fetch. Any transport, status or decode failure yields
    /// `FetchFailed`; partial snapshots are never returned.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, coordinate: Coordinate) -> Result<WeatherSnapshot, WeatherError> {
        let response = self
            .client
            .get(&self.api_url)
            .query(&[
                ("latitude", coordinate.latitude.to_string()),
                ("longitude", coordinate.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
                ("daily", DAILY_FIELDS.to_string()),
                ("forecast_days", self.forecast_days.to_string()),
                ("timezone", "auto".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Weather API returned status {}", status);
            return Err(WeatherError::FetchFailed(format!("status {}", status.as_u16())));
        }

        let body: ForecastResponse = response.json().await?;

        let snapshot = WeatherSnapshot {
            current: CurrentConditions {
                temperature: body.current.temperature_2m,
                humidity: body.current.relative_humidity_2m,
                weather_code: body.current.weather_code,
                wind_speed: body.current.wind_speed_10m,
                uv_index: body.current.uv_index.unwrap_or(0.0),
            },
            daily: body.daily.into_forecasts()?,
        };

        tracing::info!(
            "Fetched weather: {:.1}°C, {} forecast days",
            snapshot.current.temperature,
            snapshot.daily.len()
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn forecast_json() -> serde_json::Value {
        serde_json::json!({
            "latitude": 40.71,
            "longitude": -74.01,
            "timezone": "America/New_York",
            "current": {
                "time": "2026-03-14T10:15",
                "interval": 900,
                "temperature_2m": 12.4,
                "relative_humidity_2m": 58,
                "weather_code": 3,
                "wind_speed_10m": 14.8,
                "uv_index": 2.35
            },
            "daily": {
                "time": ["2026-03-14", "2026-03-15", "2026-03-16"],
                "weather_code": [3, 61, 0],
                "temperature_2m_max": [14.1, 11.0, 16.3],
                "temperature_2m_min": [6.2, 5.8, 7.9]
            }
        })
    }

    #[tokio::test]
    async fn test_fetch_parses_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/forecast"))
            .and(query_param("latitude", "51.5"))
            .and(query_param("longitude", "-0.12"))
            .and(query_param("current", CURRENT_FIELDS))
            .and(query_param("daily", DAILY_FIELDS))
            .and(query_param("forecast_days", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json()))
            .mount(&server)
            .await;

        let url = format!("{}/v1/forecast", server.uri());
        let client = WeatherClient::new_with_url(&url, 3, TIMEOUT).unwrap();
        let snapshot = client.fetch(Coordinate::new(51.5, -0.12)).await.unwrap();

        assert_eq!(snapshot.current.weather_code, 3);
        assert_eq!(snapshot.current.humidity, 58.0);
        assert_eq!(snapshot.daily.len(), 3);
        assert_eq!(
            snapshot.daily[1].date,
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap()
        );
        assert_eq!(snapshot.daily[1].weather_code, 61);
        assert_eq!(snapshot.daily[2].temp_min, 7.9);
    }

    #[tokio::test]
    async fn test_null_uv_index_reads_as_zero() {
        let mut body = forecast_json();
        body["current"]["uv_index"] = serde_json::Value::Null;

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = WeatherClient::new_with_url(&server.uri(), 3, TIMEOUT).unwrap();
        let snapshot = client.fetch(Coordinate::new(0.0, 0.0)).await.unwrap();
        assert_eq!(snapshot.current.uv_index, 0.0);
    }

    #[tokio::test]
    async fn test_server_error_is_fetch_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WeatherClient::new_with_url(&server.uri(), 3, TIMEOUT).unwrap();
        let err = client.fetch(Coordinate::new(0.0, 0.0)).await.unwrap_err();
        assert_eq!(err, WeatherError::FetchFailed("status 500".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_body_is_fetch_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"current": {}})),
            )
            .mount(&server)
            .await;

        let client = WeatherClient::new_with_url(&server.uri(), 3, TIMEOUT).unwrap();
        assert!(matches!(
            client.fetch(Coordinate::new(0.0, 0.0)).await,
            Err(WeatherError::FetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_mismatched_daily_arrays_rejected() {
        let mut body = forecast_json();
        body["daily"]["temperature_2m_min"] = serde_json::json!([6.2]);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        let client = WeatherClient::new_with_url(&server.uri(), 3, TIMEOUT).unwrap();
        assert!(matches!(
            client.fetch(Coordinate::new(0.0, 0.0)).await,
            Err(WeatherError::FetchFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_fetch_failed() {
        let client =
            WeatherClient::new_with_url("http://127.0.0.1:1/v1/forecast", 3, TIMEOUT).unwrap();
        assert!(client.fetch(Coordinate::new(0.0, 0.0)).await.is_err());
    }

    #[tokio::test]
    async fn test_slow_api_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(forecast_json())
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client =
            WeatherClient::new_with_url(&server.uri(), 3, Duration::from_millis(100)).unwrap();
        assert_eq!(
            client.fetch(Coordinate::new(0.0, 0.0)).await.unwrap_err(),
            WeatherError::FetchFailed("request timed out".to_string())
        );
    }
}
