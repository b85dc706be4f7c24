//! Weather for the CropWatch dashboard
//!
//! Resolves the device location (with a fixed fallback), fetches current
//! conditions and a short forecast from Open-Meteo, and classifies WMO
//! weather codes for display.

pub mod classifier;
pub mod location;
pub mod provider;
pub mod report;
pub mod types;

pub use classifier::{classify, WeatherCategory, WeatherClassification, WeatherIcon};
pub use location::{IpLocationSensor, LocationResolver, LocationSensor, UnavailableSensor};
pub use provider::{WeatherClient, OPEN_METEO_URL};
pub use report::{fetch_weather_report, WeatherReport, DISPLAY_FORECAST_DAYS};
pub use types::*;
