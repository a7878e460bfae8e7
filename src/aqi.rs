//! AQI severity bands, labels and advice

use colored::{Color, Colorize};

/// US-EPA style AQI severity band
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AqiCategory {
    Good,
    Moderate,
    UnhealthySensitive,
    Unhealthy,
    VeryUnhealthy,
    Hazardous,
}

impl AqiCategory {
    /// Classify an AQI value into its band
    pub fn from_aqi(aqi: i64) -> Self {
        match aqi {
            i64::MIN..=50 => AqiCategory::Good,
            51..=100 => AqiCategory::Moderate,
            101..=150 => AqiCategory::UnhealthySensitive,
            151..=200 => AqiCategory::Unhealthy,
            201..=300 => AqiCategory::VeryUnhealthy,
            _ => AqiCategory::Hazardous,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Good",
            AqiCategory::Moderate => "Moderate",
            AqiCategory::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            AqiCategory::Unhealthy => "Unhealthy",
            AqiCategory::VeryUnhealthy => "Very Unhealthy",
            AqiCategory::Hazardous => "Hazardous",
        }
    }

    pub fn color(&self) -> Color {
        match self {
            AqiCategory::Good => Color::Green,
            AqiCategory::Moderate => Color::Yellow,
            AqiCategory::UnhealthySensitive => Color::TrueColor {
                r: 255,
                g: 140,
                b: 0,
            },
            AqiCategory::Unhealthy => Color::Red,
            AqiCategory::VeryUnhealthy => Color::Magenta,
            AqiCategory::Hazardous => Color::TrueColor { r: 128, g: 0, b: 0 },
        }
    }

    pub fn advice(&self) -> &'static str {
        match self {
            AqiCategory::Good => "Air is clean. Great day to go outside!",
            AqiCategory::Moderate => {
                "Air is acceptable. Sensitive groups can still go out, but take it easy."
            }
            AqiCategory::UnhealthySensitive => {
                "Unhealthy for sensitive people (asthma, elderly). Limit outdoor activities."
            }
            AqiCategory::Unhealthy => {
                "Unhealthy. Everyone should reduce prolonged outdoor exertion."
            }
            AqiCategory::VeryUnhealthy => {
                "Very unhealthy. Stay indoors with windows closed if possible."
            }
            AqiCategory::Hazardous => {
                "Hazardous. Avoid all outdoor activity. Use air purifiers if available."
            }
        }
    }
}

/// Render an AQI value colored by its band
pub fn colorize_aqi(aqi: i64) -> String {
    let category = AqiCategory::from_aqi(aqi);
    aqi.to_string().color(category.color()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(AqiCategory::from_aqi(0), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(50), AqiCategory::Good);
        assert_eq!(AqiCategory::from_aqi(51), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(100), AqiCategory::Moderate);
        assert_eq!(AqiCategory::from_aqi(101), AqiCategory::UnhealthySensitive);
        assert_eq!(AqiCategory::from_aqi(150), AqiCategory::UnhealthySensitive);
        assert_eq!(AqiCategory::from_aqi(151), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(200), AqiCategory::Unhealthy);
        assert_eq!(AqiCategory::from_aqi(201), AqiCategory::VeryUnhealthy);
        assert_eq!(AqiCategory::from_aqi(300), AqiCategory::VeryUnhealthy);
        assert_eq!(AqiCategory::from_aqi(301), AqiCategory::Hazardous);
    }

    #[test]
    fn test_labels() {
        assert_eq!(AqiCategory::from_aqi(42).label(), "Good");
        assert_eq!(
            AqiCategory::from_aqi(120).label(),
            "Unhealthy for Sensitive Groups"
        );
        assert_eq!(AqiCategory::from_aqi(500).label(), "Hazardous");
    }

    #[test]
    fn test_advice_mentions_severity() {
        assert!(AqiCategory::Good.advice().contains("clean"));
        assert!(AqiCategory::Hazardous.advice().contains("Avoid"));
    }
}
