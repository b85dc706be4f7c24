//! WMO weather code classification.
//!
//! Two tables are kept apart on purpose: the description table and the
//! coarser icon table disagree between codes 49 and 77, and the dashboard
//! shows both.
//! See: https://open-meteo.com/en/docs#weathervariables

use serde::{Deserialize, Serialize};

/// Description category for a weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    Clear,
    PartlyCloudy,
    Foggy,
    Rainy,
    Snowy,
    Stormy,
}

impl WeatherCategory {
    /// First matching upper bound wins
    pub fn from_code(code: u32) -> Self {
        match code {
            0..=1 => Self::Clear,
            2..=3 => Self::PartlyCloudy,
            4..=48 => Self::Foggy,
            49..=67 => Self::Rainy,
            68..=77 => Self::Snowy,
            _ => Self::Stormy,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear Sky",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Foggy => "Foggy",
            Self::Rainy => "Rainy",
            Self::Snowy => "Snowy",
            Self::Stormy => "Stormy",
        }
    }
}

/// Display icon for a weather code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherIcon {
    Sun,
    Cloud,
    CloudRain,
    CloudRainHeavy,
}

impl WeatherIcon {
    pub fn from_code(code: u32) -> Self {
        match code {
            0..=1 => Self::Sun,
            2..=3 => Self::Cloud,
            4..=67 => Self::CloudRain,
            _ => Self::CloudRainHeavy,
        }
    }

    /// Icon name for the rendering layer
    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Sun => "sun",
            Self::Cloud => "cloud",
            Self::CloudRain => "cloud_rain",
            Self::CloudRainHeavy => "cloud_rain_heavy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeatherClassification {
    pub category: WeatherCategory,
    pub description: &'static str,
}

/// Classify a WMO code into its description category.
pub fn classify(code: u32) -> WeatherClassification {
    let category = WeatherCategory::from_code(code);
    WeatherClassification {
        category,
        description: category.description(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_clear() {
        assert_eq!(classify(0).category, WeatherCategory::Clear);
        assert_eq!(classify(0).description, "Clear Sky");
        assert_eq!(classify(1).category, WeatherCategory::Clear);
    }

    #[test]
    fn test_classify_partly_cloudy() {
        assert_eq!(classify(2).category, WeatherCategory::PartlyCloudy);
        assert_eq!(classify(3).description, "Partly Cloudy");
    }

    #[test]
    fn test_classify_fog() {
        assert_eq!(classify(4).category, WeatherCategory::Foggy);
        assert_eq!(classify(45).category, WeatherCategory::Foggy);
        assert_eq!(classify(48).category, WeatherCategory::Foggy);
    }

    #[test]
    fn test_classify_rain() {
        assert_eq!(classify(49).category, WeatherCategory::Rainy);
        assert_eq!(classify(51).category, WeatherCategory::Rainy);
        assert_eq!(classify(67).description, "Rainy");
    }

    #[test]
    fn test_classify_snow() {
        assert_eq!(classify(68).category, WeatherCategory::Snowy);
        assert_eq!(classify(77).category, WeatherCategory::Snowy);
    }

    #[test]
    fn test_classify_storm_and_above() {
        assert_eq!(classify(78).category, WeatherCategory::Stormy);
        assert_eq!(classify(80).description, "Stormy");
        assert_eq!(classify(95).category, WeatherCategory::Stormy);
        assert_eq!(classify(u32::MAX).category, WeatherCategory::Stormy);
    }

    #[test]
    fn test_classify_is_monotone() {
        // Categories never go backwards as the code increases
        let mut previous = classify(0).category as u8;
        for code in 0..=200 {
            let current = classify(code).category as u8;
            assert!(current >= previous, "code {}", code);
            previous = current;
        }
    }

    #[test]
    fn test_icon_thresholds() {
        assert_eq!(WeatherIcon::from_code(1), WeatherIcon::Sun);
        assert_eq!(WeatherIcon::from_code(3), WeatherIcon::Cloud);
        assert_eq!(WeatherIcon::from_code(45), WeatherIcon::CloudRain);
        assert_eq!(WeatherIcon::from_code(67), WeatherIcon::CloudRain);
        assert_eq!(WeatherIcon::from_code(71), WeatherIcon::CloudRainHeavy);
    }

    #[test]
    fn test_icon_and_description_tables_differ() {
        // Fog is described as fog but drawn with the rain icon
        assert_eq!(classify(45).category, WeatherCategory::Foggy);
        assert_eq!(WeatherIcon::from_code(45), WeatherIcon::CloudRain);
        // Snow is described as snow but drawn with the heavy rain icon
        assert_eq!(classify(73).category, WeatherCategory::Snowy);
        assert_eq!(WeatherIcon::from_code(73), WeatherIcon::CloudRainHeavy);
    }

    #[test]
    fn test_icon_name() {
        assert_eq!(WeatherIcon::Sun.icon_name(), "sun");
        assert_eq!(WeatherIcon::CloudRainHeavy.icon_name(), "cloud_rain_heavy");
    }
}
