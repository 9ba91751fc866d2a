//! Risk aggregation for a tracked flight
//!
//! Blends the weather hazard score with the three conflict exposure scores
//! into the assessment attached to each flight snapshot. Pure functions,
//! recomputed from scratch every tick. The two stages are split so callers
//! can compute conflict exposure while a weather fetch is still in flight.

use conflict_risk::{
    airport_risk, composite_risk, nearest_conflict, path_risk, position_risk, ConflictZone,
    DEFAULT_CORRIDOR_KM, DEFAULT_PROXIMITY_RADIUS_KM,
};
use geo_math::GeoPoint;
use serde::{Deserialize, Serialize};
use weather_risk::WeatherRisk;

/// Combined risk snapshot for one flight
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Weather hazard score (0-10)
    pub weather_risk: u8,
    /// Mean of the three conflict exposure scores (0-5)
    pub conflict_risk: u8,
    /// Blend of weather and the weighted conflict composite (0-10)
    pub overall_risk: u8,
    /// Closest zone to the live position, when one is within range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest_conflict: Option<ConflictZone>,
}

/// Conflict exposure scores for one route + optional live position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictExposure {
    pub airport_score: u8,
    pub path_score: u8,
    /// Absent when there is no live position to query
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_score: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nearest: Option<ConflictZone>,
}

/// Mean of two pre-clamped 0-10 scores
///
/// Inputs are assumed already clamped by their producers; this does not
/// defend against out-of-range values.
pub fn overall(weather_risk: u8, conflict_risk: u8) -> u8 {
    ((weather_risk as f64 + conflict_risk as f64) / 2.0).round() as u8
}

/// Run the three conflict queries for a route
///
/// `position` is the live fix when one exists. Without it the position
/// exposure is absent and no nearest zone is reported.
pub fn conflict_exposure(
    origin: GeoPoint,
    destination: GeoPoint,
    position: Option<GeoPoint>,
    zones: &[ConflictZone],
) -> ConflictExposure {
    let airport = airport_risk(origin, destination, zones, DEFAULT_PROXIMITY_RADIUS_KM);
    let path = path_risk(origin, destination, zones, DEFAULT_CORRIDOR_KM);
    let at_position = position.map(|p| position_risk(p, zones, DEFAULT_PROXIMITY_RADIUS_KM));

    let nearest = match (position, at_position.as_ref()) {
        (Some(p), Some(matches)) => nearest_conflict(p, &matches.zones).cloned(),
        _ => None,
    };

    ConflictExposure {
        airport_score: airport.score,
        path_score: path.score,
        position_score: at_position.map(|m| m.score),
        nearest,
    }
}

/// Fold a weather score and conflict exposure into one assessment
///
/// An absent position score contributes zero in both blends; missing data
/// lowers confidence-weighted exposure instead of inventing it.
pub fn assemble(weather: &WeatherRisk, exposure: ConflictExposure) -> RiskAssessment {
    let position = exposure.position_score.unwrap_or(0);
    let composite = composite_risk(
        exposure.airport_score,
        exposure.path_score,
        exposure.position_score,
    );

    let tri_blend = (exposure.airport_score as f64
        + exposure.path_score as f64
        + position as f64)
        / 3.0;

    RiskAssessment {
        weather_risk: weather.score,
        conflict_risk: tri_blend.round() as u8,
        overall_risk: overall(weather.score, composite),
        nearest_conflict: exposure.nearest,
    }
}

/// Assess a route against the conflict dataset and a weather score
pub fn assess(
    weather: &WeatherRisk,
    origin: GeoPoint,
    destination: GeoPoint,
    position: Option<GeoPoint>,
    zones: &[ConflictZone],
) -> RiskAssessment {
    assemble(weather, conflict_exposure(origin, destination, position, zones))
}

#[cfg(test)]
mod tests {
    use super::*;

    const JFK: GeoPoint = GeoPoint {
        latitude: 40.6413,
        longitude: -73.7781,
    };
    const LAX: GeoPoint = GeoPoint {
        latitude: 33.9425,
        longitude: -118.4081,
    };

    fn zone(id: &str, lat: f64, lon: f64) -> ConflictZone {
        ConflictZone {
            id: id.to_string(),
            date: "2026-05-01".to_string(),
            zone_type: "armed-conflict".to_string(),
            location: "Test Region".to_string(),
            notes: None,
            position: [lat, lon],
        }
    }

    #[test]
    fn test_overall_rounds_half_up() {
        assert_eq!(overall(10, 10), 10);
        assert_eq!(overall(0, 0), 0);
        assert_eq!(overall(1, 2), 2); // 1.5 rounds away from zero
        assert_eq!(overall(3, 4), 4);
    }

    #[test]
    fn test_assess_empty_dataset_is_weather_only() {
        let weather = WeatherRisk::fallback();
        let assessment = assess(&weather, JFK, LAX, Some(JFK), &[]);

        assert_eq!(assessment.conflict_risk, 0);
        assert!(assessment.nearest_conflict.is_none());
        // round((1 + 0) / 2) = 1 (fallback weather, zero conflict)
        assert_eq!(assessment.overall_risk, 1);
    }

    #[test]
    fn test_assess_vegas_zone_on_jfk_lax_route() {
        let weather = WeatherRisk::fallback();
        let zones = vec![zone("vegas", 36.1, -115.1)];
        let over_kansas = GeoPoint::new(38.5, -98.0);

        let assessment = assess(&weather, JFK, LAX, Some(over_kansas), &zones);

        // One corridor hit, no airport or position hits:
        // airport 0, path 2, position 0 -> tri-blend round(2/3) = 1
        assert_eq!(assessment.conflict_risk, 1);
        // composite round(0.4*0 + 0.4*2 + 0.2*0) = 1; overall round((1+1)/2) = 1
        assert_eq!(assessment.overall_risk, 1);
        assert!(
            assessment.nearest_conflict.is_none(),
            "zone is outside position radius over Kansas"
        );
    }

    #[test]
    fn test_assess_position_over_conflict_reports_nearest() {
        let weather = WeatherRisk::fallback();
        let zones = vec![zone("vegas", 36.1, -115.1)];
        let near_vegas = GeoPoint::new(36.0, -114.9);

        let assessment = assess(&weather, JFK, LAX, Some(near_vegas), &zones);

        let nearest = assessment.nearest_conflict.expect("zone within radius");
        assert_eq!(nearest.id, "vegas");
        // airport 0, path 2, position 2 -> round(4/3) = 1
        assert_eq!(assessment.conflict_risk, 1);
    }

    #[test]
    fn test_assess_without_position_substitutes_zero() {
        let weather = WeatherRisk::fallback();
        let zones = vec![zone("vegas", 36.1, -115.1)];

        let with_pos_far = assess(&weather, JFK, LAX, Some(GeoPoint::new(38.5, -98.0)), &zones);
        let without_pos = assess(&weather, JFK, LAX, None, &zones);

        assert_eq!(with_pos_far.conflict_risk, without_pos.conflict_risk);
        assert_eq!(with_pos_far.overall_risk, without_pos.overall_risk);
        assert!(without_pos.nearest_conflict.is_none());
    }

    #[test]
    fn test_exposure_without_position_has_no_position_score() {
        let zones = vec![zone("vegas", 36.1, -115.1)];
        let exposure = conflict_exposure(JFK, LAX, None, &zones);
        assert!(exposure.position_score.is_none());
        assert!(exposure.nearest.is_none());
        assert_eq!(exposure.path_score, 2);
    }

    #[test]
    fn test_assemble_matches_assess() {
        let weather = WeatherRisk::fallback();
        let zones = vec![zone("vegas", 36.1, -115.1), zone("other", 35.0, -110.0)];
        let position = GeoPoint::new(36.0, -114.0);

        let staged = assemble(
            &weather,
            conflict_exposure(JFK, LAX, Some(position), &zones),
        );
        let direct = assess(&weather, JFK, LAX, Some(position), &zones);

        assert_eq!(staged.conflict_risk, direct.conflict_risk);
        assert_eq!(staged.overall_risk, direct.overall_risk);
    }

    #[test]
    fn test_assess_is_idempotent() {
        let weather = WeatherRisk::fallback();
        let zones = vec![zone("vegas", 36.1, -115.1), zone("other", 35.0, -110.0)];
        let position = GeoPoint::new(36.0, -114.0);

        let first = assess(&weather, JFK, LAX, Some(position), &zones);
        let second = assess(&weather, JFK, LAX, Some(position), &zones);

        assert_eq!(first.weather_risk, second.weather_risk);
        assert_eq!(first.conflict_risk, second.conflict_risk);
        assert_eq!(first.overall_risk, second.overall_risk);
    }
}
