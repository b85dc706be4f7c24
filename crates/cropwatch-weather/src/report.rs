//! Display-ready weather: a snapshot with both classifications applied.

use chrono::NaiveDate;
use serde::Serialize;

use crate::classifier::{classify, WeatherClassification, WeatherIcon};
use crate::location::LocationResolver;
use crate::provider::WeatherClient;
use crate::types::{Coordinate, CurrentConditions, WeatherError, WeatherSnapshot};

/// Number of forecast days shown in the weather panel
pub const DISPLAY_FORECAST_DAYS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentReport {
    pub conditions: CurrentConditions,
    pub classification: WeatherClassification,
    pub icon: WeatherIcon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayReport {
    pub date: NaiveDate,
    pub temp_max: f64,
    pub temp_min: f64,
    pub classification: WeatherClassification,
    pub icon: WeatherIcon,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeatherReport {
    pub coordinate: Coordinate,
    pub current: CurrentReport,
    pub days: Vec<DayReport>,
    /// Set when the coordinate is the fallback position
    pub notice: Option<&'static str>,
}

impl WeatherReport {
    pub fn from_snapshot(
        snapshot: WeatherSnapshot,
        coordinate: Coordinate,
        notice: Option<&'static str>,
        max_days: usize,
    ) -> Self {
        let code = snapshot.current.weather_code;
        let current = CurrentReport {
            conditions: snapshot.current,
            classification: classify(code),
            icon: WeatherIcon::from_code(code),
        };

        let days = snapshot
            .daily
            .into_iter()
            .take(max_days)
            .map(|day| DayReport {
                date: day.date,
                temp_max: day.temp_max,
                temp_min: day.temp_min,
                classification: classify(day.weather_code),
                icon: WeatherIcon::from_code(day.weather_code),
            })
            .collect();

        Self {
            coordinate,
            current,
            days,
            notice,
        }
    }
}

/// Resolve the location once and fetch weather for it.
pub async fn fetch_weather_report(
    resolver: &LocationResolver,
    client: &WeatherClient,
    max_days: usize,
) -> Result<WeatherReport, WeatherError> {
    let coordinate = resolver.resolve().await;
    let snapshot = client.fetch(coordinate).await?;
    Ok(WeatherReport::from_snapshot(
        snapshot,
        coordinate,
        resolver.notice(),
        max_days,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::WeatherCategory;
    use crate::types::DailyForecast;

    fn snapshot(days: u32) -> WeatherSnapshot {
        WeatherSnapshot {
            current: CurrentConditions {
                temperature: 18.0,
                humidity: 70.0,
                weather_code: 45,
                wind_speed: 5.0,
                uv_index: 1.0,
            },
            daily: (0..days)
                .map(|i| DailyForecast {
                    date: NaiveDate::from_ymd_opt(2026, 6, 1 + i).unwrap(),
                    weather_code: [0, 63, 75, 95, 2][i as usize % 5],
                    temp_max: 25.0,
                    temp_min: 15.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_report_applies_both_tables() {
        let report =
            WeatherReport::from_snapshot(snapshot(3), Coordinate::new(1.0, 2.0), None, 3);
        assert_eq!(report.current.classification.category, WeatherCategory::Foggy);
        assert_eq!(report.current.icon, WeatherIcon::CloudRain);
        assert_eq!(report.days[2].classification.description, "Snowy");
        assert_eq!(report.days[2].icon, WeatherIcon::CloudRainHeavy);
    }

    #[test]
    fn test_report_trims_days() {
        let report = WeatherReport::from_snapshot(
            snapshot(7),
            Coordinate::new(1.0, 2.0),
            None,
            DISPLAY_FORECAST_DAYS,
        );
        assert_eq!(report.days.len(), 3);
        assert_eq!(report.days[0].date, NaiveDate::from_ymd_opt(2026, 6, 1).unwrap());
    }

    #[test]
    fn test_report_with_fewer_days_than_horizon() {
        let report = WeatherReport::from_snapshot(snapshot(1), Coordinate::new(1.0, 2.0), None, 3);
        assert_eq!(report.days.len(), 1);
    }
}
