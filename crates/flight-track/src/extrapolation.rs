//! Dead-reckoning extrapolation along the current heading
//!
//! Straight-line great-circle motion only. Heading, speed, and altitude are
//! held constant over the step; the live feed corrects any drift on the next
//! real fix.

use crate::FlightKinematics;

/// Ground-speed conversion from the feed's mph to m/s
pub const MPH_TO_MS: f64 = 1609.34 / 3600.0;

/// Advance kinematics by `elapsed_seconds` along the current heading
pub fn advance(kinematics: &FlightKinematics, elapsed_seconds: f64) -> FlightKinematics {
    let speed_ms = kinematics.speed_mph * MPH_TO_MS;
    let distance_km = speed_ms * elapsed_seconds / 1000.0;
    let position = geo_math::project(kinematics.position, kinematics.heading_deg, distance_km);

    FlightKinematics {
        position,
        ..*kinematics
    }
}
