//! Weather hazard scoring for flight risk assessment
//!
//! Converts a point weather observation into a 0-10 hazard score plus a
//! human-readable condition label:
//! - Wind speed (pointing/turbulence hazard, heaviest weight)
//! - Precipitation (visibility and icing)
//! - Temperature extremes in either direction
//! - Cloud cover and humidity (secondary factors)
//!
//! Scoring never fails. When an upstream observation cannot be obtained the
//! caller substitutes [`WeatherRisk::fallback`] instead of blocking the risk
//! pipeline.

use serde::{Deserialize, Serialize};

/// Factor weights for the composite score
/// Sum = 1.0
pub const W_WIND: f64 = 0.30;
pub const W_PRECIP: f64 = 0.25;
pub const W_CLOUD: f64 = 0.15;
pub const W_TEMPERATURE: f64 = 0.20;
pub const W_HUMIDITY: f64 = 0.10;

/// A point weather observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherObservation {
    /// Temperature (Celsius)
    pub temperature_c: f64,
    /// Relative humidity (0-100)
    pub humidity_pct: f64,
    /// Wind speed (km/h)
    pub wind_speed_kmh: f64,
    /// Precipitation rate (mm)
    pub precipitation_mm: f64,
    /// Cloud cover percentage (0-100)
    pub cloud_cover_pct: f64,
    /// Unix timestamp of the observation
    pub timestamp: i64,
}

/// Condition label derived from raw observation values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherCondition {
    #[serde(rename = "Heavy Rain")]
    HeavyRain,
    Rain,
    Windy,
    Overcast,
    #[serde(rename = "Partly Cloudy")]
    PartlyCloudy,
    Clear,
}

impl std::fmt::Display for WeatherCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::HeavyRain => "Heavy Rain",
            Self::Rain => "Rain",
            Self::Windy => "Windy",
            Self::Overcast => "Overcast",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Clear => "Clear",
        };
        f.write_str(label)
    }
}

/// Scored weather hazard for one observation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherRisk {
    /// Composite hazard score (0-10)
    pub score: u8,
    pub condition: WeatherCondition,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub wind_speed_kmh: f64,
}

impl WeatherRisk {
    /// Neutral stand-in used when no observation is available
    pub fn fallback() -> Self {
        Self {
            score: 1,
            condition: WeatherCondition::Clear,
            temperature_c: 20.0,
            humidity_pct: 50.0,
            wind_speed_kmh: 5.0,
        }
    }
}

/// Wind hazard sub-score (0-10)
fn wind_score(kmh: f64) -> u8 {
    match kmh {
        w if w > 30.0 => 10,
        w if w > 20.0 => 7,
        w if w > 12.0 => 4,
        w if w > 6.0 => 2,
        _ => 1,
    }
}

/// Precipitation hazard sub-score (0-10)
fn precipitation_score(mm: f64) -> u8 {
    match mm {
        p if p > 10.0 => 10,
        p if p > 5.0 => 7,
        p if p > 2.0 => 5,
        p if p > 0.5 => 3,
        _ => 1,
    }
}

/// Cloud cover sub-score (0-5)
fn cloud_score(pct: f64) -> u8 {
    match pct {
        c if c > 90.0 => 5,
        c if c > 70.0 => 3,
        c if c > 30.0 => 2,
        _ => 1,
    }
}

/// Temperature hazard sub-score (0-10), symmetric around the comfort band
fn temperature_score(celsius: f64) -> u8 {
    match celsius {
        t if t > 35.0 || t < -10.0 => 10,
        t if t > 30.0 || t < -5.0 => 7,
        t if t > 25.0 || t < 0.0 => 4,
        _ => 1,
    }
}

/// Humidity sub-score (0-5); very dry air also scores above baseline
fn humidity_score(pct: f64) -> u8 {
    match pct {
        h if h > 90.0 => 5,
        h if h > 70.0 => 3,
        h if h < 30.0 => 2,
        _ => 1,
    }
}

/// Condition label from raw observation values, first match wins
fn condition_for(obs: &WeatherObservation) -> WeatherCondition {
    if obs.precipitation_mm > 5.0 {
        WeatherCondition::HeavyRain
    } else if obs.precipitation_mm > 0.5 {
        WeatherCondition::Rain
    } else if obs.wind_speed_kmh > 25.0 {
        WeatherCondition::Windy
    } else if obs.cloud_cover_pct > 80.0 {
        WeatherCondition::Overcast
    } else if obs.cloud_cover_pct > 50.0 {
        WeatherCondition::PartlyCloudy
    } else {
        WeatherCondition::Clear
    }
}

/// Score an observation into a 0-10 hazard
///
/// The five-point factors (cloud, humidity) are doubled onto the common
/// ten-point scale before weighting, so a fully saturated observation
/// reaches 10 and a calm one rounds down to 1.
pub fn score(obs: &WeatherObservation) -> WeatherRisk {
    let wind = wind_score(obs.wind_speed_kmh) as f64;
    let precip = precipitation_score(obs.precipitation_mm) as f64;
    let cloud = (cloud_score(obs.cloud_cover_pct) * 2) as f64;
    let temperature = temperature_score(obs.temperature_c) as f64;
    let humidity = (humidity_score(obs.humidity_pct) * 2) as f64;

    let weighted = W_WIND * wind
        + W_PRECIP * precip
        + W_CLOUD * cloud
        + W_TEMPERATURE * temperature
        + W_HUMIDITY * humidity;

    WeatherRisk {
        score: weighted.round().clamp(0.0, 10.0) as u8,
        condition: condition_for(obs),
        temperature_c: obs.temperature_c,
        humidity_pct: obs.humidity_pct,
        wind_speed_kmh: obs.wind_speed_kmh,
    }
}

/// Weather data provider interface
pub trait WeatherProvider: Send + Sync {
    /// Get the current observation for a location, `None` when unavailable
    fn get_current(&self, lat: f64, lon: f64) -> Option<WeatherObservation>;
}

/// Mock weather provider for testing/demo
pub struct MockWeatherProvider;

impl MockWeatherProvider {
    pub fn new() -> Self {
        Self
    }

    /// Generate plausible weather based on latitude
    pub fn generate_for_location(&self, lat: f64, lon: f64) -> WeatherObservation {
        let abs_lat = lat.abs();

        let (cloud_base, precip_base) = if abs_lat > 15.0 && abs_lat < 35.0 {
            (20.0, 0.0) // Subtropical arid
        } else if abs_lat < 15.0 {
            (60.0, 1.5) // Tropical
        } else if abs_lat < 55.0 {
            (40.0, 0.3) // Temperate
        } else {
            (70.0, 0.8) // High latitude
        };

        // Longitude-driven variation stands in for time-of-day effects
        let hour_factor = (lon.to_radians().sin() + 1.0) / 2.0;

        WeatherObservation {
            temperature_c: 25.0 - abs_lat * 0.5,
            humidity_pct: 40.0 + cloud_base * 0.5,
            wind_speed_kmh: 8.0 + hour_factor * 15.0,
            precipitation_mm: precip_base,
            cloud_cover_pct: (cloud_base + hour_factor * 20.0).min(100.0),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

impl Default for MockWeatherProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherProvider for MockWeatherProvider {
    fn get_current(&self, lat: f64, lon: f64) -> Option<WeatherObservation> {
        Some(self.generate_for_location(lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calm() -> WeatherObservation {
        WeatherObservation {
            temperature_c: 20.0,
            humidity_pct: 50.0,
            wind_speed_kmh: 5.0,
            precipitation_mm: 0.0,
            cloud_cover_pct: 10.0,
            timestamp: 0,
        }
    }

    #[test]
    fn test_calm_weather_scores_one() {
        let risk = score(&calm());
        assert_eq!(risk.score, 1, "calm conditions should score 1");
        assert_eq!(risk.condition, WeatherCondition::Clear);
    }

    #[test]
    fn test_saturated_weather_scores_ten() {
        let obs = WeatherObservation {
            temperature_c: 38.0,
            humidity_pct: 95.0,
            wind_speed_kmh: 35.0,
            precipitation_mm: 12.0,
            cloud_cover_pct: 95.0,
            timestamp: 0,
        };

        let risk = score(&obs);
        assert_eq!(risk.score, 10, "saturated conditions should peg the scale");
        assert_eq!(risk.condition, WeatherCondition::HeavyRain);
    }

    #[test]
    fn test_cold_extreme_matches_hot_extreme() {
        let mut hot = calm();
        hot.temperature_c = 38.0;
        let mut cold = calm();
        cold.temperature_c = -15.0;

        assert_eq!(score(&hot).score, score(&cold).score);
    }

    #[test]
    fn test_condition_precedence_rain_over_wind() {
        let mut obs = calm();
        obs.precipitation_mm = 1.0;
        obs.wind_speed_kmh = 30.0;

        // Rain outranks Windy even when both thresholds are crossed
        assert_eq!(score(&obs).condition, WeatherCondition::Rain);
    }

    #[test]
    fn test_condition_windy_without_rain() {
        let mut obs = calm();
        obs.wind_speed_kmh = 28.0;
        assert_eq!(score(&obs).condition, WeatherCondition::Windy);
    }

    #[test]
    fn test_condition_cloud_labels() {
        let mut obs = calm();
        obs.cloud_cover_pct = 85.0;
        assert_eq!(score(&obs).condition, WeatherCondition::Overcast);

        obs.cloud_cover_pct = 60.0;
        assert_eq!(score(&obs).condition, WeatherCondition::PartlyCloudy);

        obs.cloud_cover_pct = 20.0;
        assert_eq!(score(&obs).condition, WeatherCondition::Clear);
    }

    #[test]
    fn test_fallback_matches_calm_score() {
        let fallback = WeatherRisk::fallback();
        assert_eq!(fallback.score, 1);
        assert_eq!(fallback.condition, WeatherCondition::Clear);
        assert_eq!(fallback.temperature_c, 20.0);
    }

    #[test]
    fn test_condition_serializes_with_spaces() {
        let json = serde_json::to_string(&WeatherCondition::HeavyRain).unwrap();
        assert_eq!(json, "\"Heavy Rain\"");
        let json = serde_json::to_string(&WeatherCondition::PartlyCloudy).unwrap();
        assert_eq!(json, "\"Partly Cloudy\"");
    }

    #[test]
    fn test_mock_provider_tropics_wetter_than_desert() {
        let provider = MockWeatherProvider::new();
        let desert = provider.generate_for_location(25.0, 0.0);
        let tropics = provider.generate_for_location(5.0, 0.0);

        assert!(
            tropics.precipitation_mm > desert.precipitation_mm,
            "tropics should out-rain the desert"
        );
    }
}
