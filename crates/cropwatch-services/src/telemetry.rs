//! Wire types for `/api/dashboard` and `/api/history`.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Latest sensor readings as reported by the field node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorValues {
    pub temperature: f64,
    pub humidity: f64,
    pub soil_moisture: f64,
    pub light_intensity: f64,
    pub water_level: f64,
    pub intrusion_count: u32,
}

impl SensorValues {
    pub fn security_status(&self) -> SecurityStatus {
        if self.intrusion_count > 0 {
            SecurityStatus::Breach
        } else {
            SecurityStatus::Secure
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityStatus {
    Secure,
    Breach,
}

impl SecurityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Secure => "Secure",
            Self::Breach => "Breach",
        }
    }
}

/// Current state of the monitored sector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// Crop Stress Index, 0-100
    pub csi: f64,
    pub primary_stress_factor: String,
    pub sensor_values: SensorValues,
    /// Server-side classification label ("No Data" before the first reading)
    #[serde(default)]
    pub status: Option<String>,
    /// Reading time; absent when the server has no data yet
    #[serde(default)]
    pub timestamp: Option<NaiveDateTime>,
}

impl DashboardSnapshot {
    /// Check the CSI range. Returns a description of the violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.csi.is_finite() && (0.0..=100.0).contains(&self.csi) {
            Ok(())
        } else {
            Err(format!("csi out of range: {}", self.csi))
        }
    }

    pub fn stress_level(&self) -> StressLevel {
        StressLevel::from_csi(self.csi)
    }
}

/// One sample in the history series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Time of day the reading was taken (`HH:MM:SS` on the wire)
    pub time: NaiveTime,
    pub temperature: f64,
    pub humidity: f64,
    pub csi: f64,
}

/// Display band for the Crop Stress Index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressLevel {
    Low,
    Moderate,
    High,
}

impl StressLevel {
    pub fn from_csi(csi: f64) -> Self {
        if csi < 40.0 {
            Self::Low
        } else if csi < 70.0 {
            Self::Moderate
        } else {
            Self::High
        }
    }

    /// Gauge color
    pub fn color(&self) -> &'static str {
        match self {
            Self::Low => "emerald",
            Self::Moderate => "yellow",
            Self::High => "red",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "Low Stress",
            Self::Moderate => "Moderate Stress",
            Self::High => "High Stress",
        }
    }
}
