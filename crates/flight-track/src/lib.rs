//! Canonical flight state for the AeroRisk tracking pipeline
//!
//! One shape for a tracked flight regardless of which upstream feed produced
//! it: route endpoints, live kinematics, a bounded path history, and the most
//! recent risk assessment. Extrapolation and risk math live in submodules.

use chrono::{DateTime, Utc};
use geo_math::GeoPoint;
use serde::{Deserialize, Serialize};

pub mod extrapolation;
pub mod risk;

pub use risk::RiskAssessment;

/// Path history cap per tracked flight
pub const MAX_PATH_POINTS: usize = 512;

/// An airport endpoint of a tracked route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirportInfo {
    /// IATA or ICAO code as reported upstream
    pub code: String,
    pub name: String,
    pub city: String,
    pub country: String,
    pub position: GeoPoint,
}

/// Operating airline metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirlineInfo {
    pub name: String,
    pub code: String,
    pub callsign: String,
}

/// Instantaneous motion state of a flight
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlightKinematics {
    pub position: GeoPoint,
    /// Track heading in degrees, [0, 360)
    pub heading_deg: f64,
    /// Ground speed in mph, as reported by the live feed
    pub speed_mph: f64,
    pub altitude_ft: f64,
}

/// Whether the current position came from a live fix or extrapolation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlightStatus {
    Live,
    DeadReckoning,
}

/// A flight under active tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedFlight {
    pub callsign: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub airline: Option<AirlineInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aircraft_type: Option<String>,
    pub status: FlightStatus,
    pub origin: AirportInfo,
    pub destination: AirportInfo,
    pub kinematics: FlightKinematics,
    /// Recent positions, oldest first, capped at [`MAX_PATH_POINTS`]
    pub path: Vec<GeoPoint>,
    /// When the last live fix was received
    pub last_fix: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskAssessment>,
}

impl TrackedFlight {
    pub fn new(
        callsign: String,
        airline: Option<AirlineInfo>,
        aircraft_type: Option<String>,
        origin: AirportInfo,
        destination: AirportInfo,
        kinematics: FlightKinematics,
        fix_time: DateTime<Utc>,
    ) -> Self {
        Self {
            callsign,
            airline,
            aircraft_type,
            status: FlightStatus::Live,
            origin,
            destination,
            path: vec![kinematics.position],
            kinematics,
            last_fix: fix_time,
            risk: None,
        }
    }

    /// Replace kinematics wholesale from a live fix
    pub fn apply_telemetry(&mut self, kinematics: FlightKinematics, fix_time: DateTime<Utc>) {
        self.kinematics = kinematics;
        self.status = FlightStatus::Live;
        self.last_fix = fix_time;
        self.push_path_point(kinematics.position);
    }

    /// Extrapolate forward when no live fix is available
    ///
    /// `last_fix` is left alone; an extrapolated position is not a fix.
    pub fn advance_dead_reckoning(&mut self, elapsed_seconds: f64) {
        self.kinematics = extrapolation::advance(&self.kinematics, elapsed_seconds);
        self.status = FlightStatus::DeadReckoning;
        self.push_path_point(self.kinematics.position);
    }

    fn push_path_point(&mut self, point: GeoPoint) {
        if self.path.len() >= MAX_PATH_POINTS {
            self.path.remove(0);
        }
        self.path.push(point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(code: &str, lat: f64, lon: f64) -> AirportInfo {
        AirportInfo {
            code: code.to_string(),
            name: format!("{} International", code),
            city: "Test City".to_string(),
            country: "US".to_string(),
            position: GeoPoint::new(lat, lon),
        }
    }

    fn sample_flight() -> TrackedFlight {
        TrackedFlight::new(
            "AAL100".to_string(),
            Some(AirlineInfo {
                name: "American Airlines".to_string(),
                code: "AA".to_string(),
                callsign: "AMERICAN".to_string(),
            }),
            Some("B738".to_string()),
            airport("JFK", 40.6413, -73.7781),
            airport("LAX", 33.9425, -118.4081),
            FlightKinematics {
                position: GeoPoint::new(40.0, -80.0),
                heading_deg: 260.0,
                speed_mph: 540.0,
                altitude_ft: 35000.0,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_flight_starts_live_with_seed_path() {
        let flight = sample_flight();
        assert_eq!(flight.status, FlightStatus::Live);
        assert_eq!(flight.path.len(), 1);
        assert!(flight.risk.is_none());
    }

    #[test]
    fn test_apply_telemetry_replaces_kinematics() {
        let mut flight = sample_flight();
        let fix_time = Utc::now();
        let fix = FlightKinematics {
            position: GeoPoint::new(39.5, -85.0),
            heading_deg: 255.0,
            speed_mph: 530.0,
            altitude_ft: 36000.0,
        };

        flight.advance_dead_reckoning(6.0);
        assert_eq!(flight.status, FlightStatus::DeadReckoning);

        flight.apply_telemetry(fix, fix_time);
        assert_eq!(flight.status, FlightStatus::Live);
        assert_eq!(flight.last_fix, fix_time);
        assert_eq!(flight.kinematics.speed_mph, 530.0);
        assert_eq!(flight.path.len(), 3);
    }

    #[test]
    fn test_dead_reckoning_keeps_last_fix() {
        let mut flight = sample_flight();
        let fix_time = flight.last_fix;
        flight.advance_dead_reckoning(6.0);
        assert_eq!(flight.last_fix, fix_time);
        assert_eq!(flight.status, FlightStatus::DeadReckoning);
    }

    #[test]
    fn test_path_history_is_capped() {
        let mut flight = sample_flight();
        for _ in 0..(MAX_PATH_POINTS * 2) {
            flight.advance_dead_reckoning(6.0);
        }
        assert_eq!(flight.path.len(), MAX_PATH_POINTS);

        // Oldest points were evicted, the newest is the current position
        let newest = *flight.path.last().unwrap();
        assert_eq!(newest.latitude, flight.kinematics.position.latitude);
    }

    #[test]
    fn test_status_serializes_kebab_case() {
        let json = serde_json::to_string(&FlightStatus::DeadReckoning).unwrap();
        assert_eq!(json, "\"dead-reckoning\"");
    }
}
