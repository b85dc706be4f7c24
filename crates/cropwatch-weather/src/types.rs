use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Geographic position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Both components finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Used whenever the device position cannot be obtained (New York City)
pub const FALLBACK_COORDINATE: Coordinate = Coordinate::new(40.7128, -74.0060);

/// Informational notice shown when weather is for the fallback position
pub const FALLBACK_NOTICE: &str = "Location permission denied. Showing default (New York).";

/// Current conditions at the requested coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity, percent
    pub humidity: f64,
    /// WMO weather code
    pub weather_code: u32,
    /// km/h
    pub wind_speed: f64,
    pub uv_index: f64,
}

/// One day of the multi-day forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub weather_code: u32,
    pub temp_max: f64,
    pub temp_min: f64,
}

/// Complete result of one weather fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub current: CurrentConditions,
    /// Ordered by date, earliest first
    pub daily: Vec<DailyForecast>,
}

/// Location sensor errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Location service unavailable")]
    ServiceUnavailable,
    #[error("Location request timed out")]
    Timeout,
    #[error("Location error: {0}")]
    Other(String),
}

/// Weather provider errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather fetch failed: {0}")]
    FetchFailed(String),
}

impl WeatherError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::FetchFailed(_) => "Weather is unavailable right now.",
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::FetchFailed("request timed out".to_string())
        } else if e.is_decode() {
            Self::FetchFailed(format!("invalid response: {}", e))
        } else {
            Self::FetchFailed(e.to_string())
        }
    }
}
