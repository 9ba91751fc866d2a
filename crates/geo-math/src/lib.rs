//! Great-circle geometry on a spherical Earth model
//!
//! All functions treat the Earth as a sphere of radius 6371 km and work in
//! degrees at the API boundary, radians internally. There is no error type:
//! degenerate input (NaN coordinates, antipodal bearing requests) produces
//! degenerate output, and callers validate coordinates before they get here.

use serde::{Deserialize, Serialize};

/// Mean Earth radius in km
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A position on the sphere in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when both coordinates are finite and inside the usual ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Haversine distance between two points in km
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

/// Initial great-circle bearing from `a` to `b` in degrees, [0, 360)
///
/// Coincident and antipodal pairs fall out of atan2(0, 0) as 0 degrees.
/// That is an accepted approximation; a flight sitting on top of its
/// destination has no meaningful heading anyway.
pub fn bearing_deg(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Unsigned perpendicular distance in km from `point` to the great circle
/// through `path_start` -> `path_end`
///
/// This measures against the full great circle, not the segment between the
/// endpoints. A point abeam the track beyond either endpoint still reports
/// its distance to the circle.
pub fn cross_track_distance_km(point: GeoPoint, path_start: GeoPoint, path_end: GeoPoint) -> f64 {
    let d13 = distance_km(path_start, point) / EARTH_RADIUS_KM;
    let theta13 = bearing_deg(path_start, point).to_radians();
    let theta12 = bearing_deg(path_start, path_end).to_radians();

    (d13.sin() * (theta13 - theta12).sin()).asin().abs() * EARTH_RADIUS_KM
}

/// Direct geodesic: the point reached from `origin` after travelling
/// `distance_km` along the initial heading `heading_deg`
pub fn project(origin: GeoPoint, heading_deg: f64, distance_km: f64) -> GeoPoint {
    let delta = distance_km / EARTH_RADIUS_KM;
    let theta = heading_deg.to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * delta.sin() * lat1.cos()).atan2(delta.cos() - lat1.sin() * lat2.sin());

    GeoPoint {
        latitude: lat2.to_degrees(),
        longitude: normalize_longitude_deg(lon2.to_degrees()),
    }
}

/// Wrap a longitude into [-180, 180)
pub fn normalize_longitude_deg(lon: f64) -> f64 {
    ((lon + 540.0) % 360.0) - 180.0
}
