//! Conflict-zone geospatial risk queries
//!
//! Pure queries over a loaded set of conflict zones: proximity to the
//! endpoints of a route, corridor intersection along the route's great
//! circle, and proximity to a live position. Match counts are bucketed into
//! 0-5 scores and blended into a weighted composite.
//!
//! All queries take `&[ConflictZone]`. A dataset that failed to load is
//! represented upstream as an empty slice, so every query degrades to a zero
//! score with no matches instead of erroring.

use geo_math::{cross_track_distance_km, distance_km, GeoPoint};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod loader;

/// Radius around an airport or live position that counts as exposure
pub const DEFAULT_PROXIMITY_RADIUS_KM: f64 = 300.0;

/// Half-width of the corridor along the route's great circle
pub const DEFAULT_CORRIDOR_KM: f64 = 150.0;

#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ConflictError>;

/// A geolocated conflict zone record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictZone {
    pub id: String,
    /// Report date, as published by the dataset
    pub date: String,
    #[serde(rename = "type")]
    pub zone_type: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// [latitude, longitude] in decimal degrees
    pub position: [f64; 2],
}

impl ConflictZone {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.position[0], self.position[1])
    }
}

/// Result of one proximity or corridor query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneMatches {
    /// Bucketed exposure score (0-5)
    pub score: u8,
    /// Zones that satisfied the query, in dataset order
    pub zones: Vec<ConflictZone>,
}

impl ZoneMatches {
    fn from_zones(zones: Vec<ConflictZone>) -> Self {
        Self {
            score: count_to_score(zones.len()),
            zones,
        }
    }
}

/// Bucket a match count into a 0-5 exposure score
pub fn count_to_score(count: usize) -> u8 {
    match count {
        c if c >= 6 => 5,
        c if c >= 4 => 4,
        c if c >= 2 => 3,
        c if c >= 1 => 2,
        _ => 0,
    }
}

/// Zones within `radius_km` of either route endpoint
pub fn airport_risk(
    origin: GeoPoint,
    destination: GeoPoint,
    zones: &[ConflictZone],
    radius_km: f64,
) -> ZoneMatches {
    let matched = zones
        .iter()
        .filter(|z| {
            let p = z.point();
            distance_km(p, origin) <= radius_km || distance_km(p, destination) <= radius_km
        })
        .cloned()
        .collect();
    ZoneMatches::from_zones(matched)
}

/// Zones within `corridor_km` of the great circle through the route
///
/// The corridor is measured against the full great circle with no
/// along-track bound, so a zone on the same circle beyond the destination
/// still matches. Accepted approximation for the route lengths involved.
pub fn path_risk(
    origin: GeoPoint,
    destination: GeoPoint,
    zones: &[ConflictZone],
    corridor_km: f64,
) -> ZoneMatches {
    let matched = zones
        .iter()
        .filter(|z| cross_track_distance_km(z.point(), origin, destination) <= corridor_km)
        .cloned()
        .collect();
    ZoneMatches::from_zones(matched)
}

/// Zones within `radius_km` of a live position
pub fn position_risk(position: GeoPoint, zones: &[ConflictZone], radius_km: f64) -> ZoneMatches {
    let matched = zones
        .iter()
        .filter(|z| distance_km(z.point(), position) <= radius_km)
        .cloned()
        .collect();
    ZoneMatches::from_zones(matched)
}

/// The zone closest to `position`, ties broken by input order
///
/// Folded with a strict comparison on purpose; `Iterator::min_by` keeps the
/// last minimum on ties.
pub fn nearest_conflict<'a>(
    position: GeoPoint,
    zones: &'a [ConflictZone],
) -> Option<&'a ConflictZone> {
    let mut best: Option<(&ConflictZone, f64)> = None;
    for zone in zones {
        let d = distance_km(zone.point(), position);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((zone, d)),
        }
    }
    best.map(|(z, _)| z)
}

/// Weighted composite of the three exposure scores, rounded to an integer
///
/// An unknown live position contributes 0 rather than renormalizing the
/// weights; missing data lowers confidence-weighted exposure instead of
/// inventing it.
pub fn composite_risk(airport_score: u8, path_score: u8, position_score: Option<u8>) -> u8 {
    let position = position_score.unwrap_or(0) as f64;
    let weighted =
        0.4 * airport_score as f64 + 0.4 * path_score as f64 + 0.2 * position;
    weighted.round() as u8
}
