//! Live flight data adapters
//!
//! Wires up the two upstream feeds a track session needs:
//! - ADSBDB for route metadata (airline, origin, destination)
//! - adsb.lol for live state vectors (position, track, speed, altitude)
//!
//! Both are free and unauthenticated. Responses are merged into one
//! [`FlightSnapshot`] and cached for 30 seconds per callsign so a busy SSE
//! client cannot hammer the upstreams.

use chrono::{DateTime, Utc};
use flight_track::{AirlineInfo, AirportInfo, FlightKinematics};
use geo_math::GeoPoint;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

const ADSBDB_BASE: &str = "https://api.adsbdb.com/v0";
const ADSB_LOL_BASE: &str = "https://api.adsb.lol/v2";

/// Attempts per upstream request before giving up
const FETCH_ATTEMPTS: usize = 3;
/// Delay between attempts, matching upstream rate-limit guidance
const RETRY_DELAY: Duration = Duration::from_secs(2);
/// Per-callsign snapshot cache lifetime
const CACHE_TTL: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum TelemetryError {
    /// No route metadata upstream; the callsign cannot be tracked at all
    #[error("flight not found: {0}")]
    FlightNotFound(String),
    /// Route exists but no usable live fix; an active track dead-reckons
    #[error("no live data for {0}")]
    NoLiveData(String),
    #[error("upstream request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("upstream error: {0}")]
    Upstream(String),
}

pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Merged route + live state for one callsign
#[derive(Debug, Clone)]
pub struct FlightSnapshot {
    pub callsign: String,
    pub airline: Option<AirlineInfo>,
    pub aircraft_type: Option<String>,
    pub origin: AirportInfo,
    pub destination: AirportInfo,
    pub kinematics: FlightKinematics,
    pub fetched_at: DateTime<Utc>,
}

struct CacheEntry {
    snapshot: FlightSnapshot,
    expires_at: Instant,
}

/// Client for the merged telemetry feeds
pub struct FlightFetcher {
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl FlightFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Canonical callsign form used as the cache and registry key
    pub fn normalize_callsign(raw: &str) -> String {
        raw.trim().to_uppercase()
    }

    /// Fetch and merge route + live state for a callsign
    pub async fn fetch(&self, callsign: &str) -> Result<FlightSnapshot> {
        let callsign = Self::normalize_callsign(callsign);

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&callsign) {
                if entry.expires_at > Instant::now() {
                    return Ok(entry.snapshot.clone());
                }
            }
        }

        let route_url = format!("{}/callsign/{}", ADSBDB_BASE, callsign);
        let live_url = format!("{}/callsign/{}", ADSB_LOL_BASE, callsign);
        let (route, live) = tokio::join!(self.get_json(&route_url), self.get_json(&live_url));

        let (airline, origin, destination) = parse_route(&route?)
            .ok_or_else(|| TelemetryError::FlightNotFound(callsign.clone()))?;
        let (kinematics, aircraft_type) =
            parse_live(&live?).ok_or_else(|| TelemetryError::NoLiveData(callsign.clone()))?;

        let snapshot = FlightSnapshot {
            callsign: callsign.clone(),
            airline,
            aircraft_type,
            origin,
            destination,
            kinematics,
            fetched_at: Utc::now(),
        };

        {
            let mut cache = self.cache.write().await;
            cache.insert(
                callsign,
                CacheEntry {
                    snapshot: snapshot.clone(),
                    expires_at: Instant::now() + CACHE_TTL,
                },
            );
        }

        Ok(snapshot)
    }

    /// GET with retry on failure or rate limiting
    async fn get_json(&self, url: &str) -> Result<Value> {
        let mut last_err = TelemetryError::Upstream(format!("no attempts made for {}", url));

        for attempt in 1..=FETCH_ATTEMPTS {
            match self.client.get(url).send().await {
                Ok(response) if response.status().as_u16() == 429 => {
                    warn!(
                        "rate limited by {} (attempt {}/{})",
                        url, attempt, FETCH_ATTEMPTS
                    );
                    last_err = TelemetryError::Upstream(format!("429 from {}", url));
                }
                Ok(response) => match response.error_for_status() {
                    Ok(response) => match response.json::<Value>().await {
                        Ok(value) => return Ok(value),
                        Err(e) => {
                            warn!("bad payload from {}: {}", url, e);
                            last_err = TelemetryError::RequestFailed(e);
                        }
                    },
                    Err(e) => {
                        warn!(
                            "upstream status from {} (attempt {}/{}): {}",
                            url, attempt, FETCH_ATTEMPTS, e
                        );
                        last_err = TelemetryError::RequestFailed(e);
                    }
                },
                Err(e) => {
                    warn!(
                        "request to {} failed (attempt {}/{}): {}",
                        url, attempt, FETCH_ATTEMPTS, e
                    );
                    last_err = TelemetryError::RequestFailed(e);
                }
            }

            if attempt < FETCH_ATTEMPTS {
                tokio::time::sleep(RETRY_DELAY).await;
            }
        }

        Err(last_err)
    }
}

impl Default for FlightFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract airline and route endpoints from an ADSBDB payload
///
/// ADSBDB answers unknown callsigns with a string `response`, so missing
/// structure means "not found" rather than a parse failure. Origin and
/// destination are both required for a trackable route.
fn parse_route(value: &Value) -> Option<(Option<AirlineInfo>, AirportInfo, AirportInfo)> {
    let route = value.get("response")?.get("flightroute")?;

    let origin = parse_airport(route.get("origin")?)?;
    let destination = parse_airport(route.get("destination")?)?;

    let airline = route.get("airline").and_then(|a| {
        Some(AirlineInfo {
            name: a.get("name")?.as_str()?.to_string(),
            code: a
                .get("icao")
                .or_else(|| a.get("iata"))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            callsign: a
                .get("callsign")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        })
    });

    Some((airline, origin, destination))
}

fn parse_airport(value: &Value) -> Option<AirportInfo> {
    let latitude = value.get("latitude")?.as_f64()?;
    let longitude = value.get("longitude")?.as_f64()?;
    let position = GeoPoint::new(latitude, longitude);
    if !position.is_valid() {
        return None;
    }

    let code = value
        .get("iata_code")
        .or_else(|| value.get("icao_code"))
        .and_then(Value::as_str)?
        .to_string();

    Some(AirportInfo {
        code,
        name: str_field(value, "name"),
        city: str_field(value, "municipality"),
        country: str_field(value, "country_name"),
        position,
    })
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Extract the first usable state vector from an adsb.lol payload
///
/// Entries without a position, or parked at the (0, 0) null island the feed
/// uses for "unknown", are passed over.
fn parse_live(value: &Value) -> Option<(FlightKinematics, Option<String>)> {
    let aircraft = value.get("ac")?.as_array()?;

    for entry in aircraft {
        let lat = entry.get("lat").and_then(Value::as_f64);
        let lon = entry.get("lon").and_then(Value::as_f64);
        let (Some(lat), Some(lon)) = (lat, lon) else {
            continue;
        };

        let position = GeoPoint::new(lat, lon);
        if !position.is_valid() || (lat == 0.0 && lon == 0.0) {
            debug!("rejecting unusable position ({}, {})", lat, lon);
            continue;
        }

        let kinematics = FlightKinematics {
            position,
            heading_deg: entry.get("track").and_then(Value::as_f64).unwrap_or(0.0),
            speed_mph: entry.get("gs").and_then(Value::as_f64).unwrap_or(0.0),
            // alt_baro is the string "ground" while taxiing
            altitude_ft: entry.get("alt_baro").and_then(Value::as_f64).unwrap_or(0.0),
        };
        let aircraft_type = entry
            .get("t")
            .and_then(Value::as_str)
            .map(|s| s.to_string());

        return Some((kinematics, aircraft_type));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_callsign() {
        assert_eq!(FlightFetcher::normalize_callsign("  ual123 "), "UAL123");
        assert_eq!(FlightFetcher::normalize_callsign("BAW9"), "BAW9");
    }

    fn route_payload() -> Value {
        json!({
            "response": {
                "flightroute": {
                    "callsign": "UAL123",
                    "airline": {
                        "name": "United Airlines",
                        "icao": "UAL",
                        "iata": "UA",
                        "callsign": "UNITED"
                    },
                    "origin": {
                        "iata_code": "JFK",
                        "icao_code": "KJFK",
                        "name": "John F Kennedy International",
                        "municipality": "New York",
                        "country_name": "United States",
                        "latitude": 40.6413,
                        "longitude": -73.7781
                    },
                    "destination": {
                        "iata_code": "LAX",
                        "icao_code": "KLAX",
                        "name": "Los Angeles International",
                        "municipality": "Los Angeles",
                        "country_name": "United States",
                        "latitude": 33.9425,
                        "longitude": -118.4081
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_route_full_payload() {
        let (airline, origin, destination) = parse_route(&route_payload()).unwrap();

        let airline = airline.unwrap();
        assert_eq!(airline.name, "United Airlines");
        assert_eq!(airline.code, "UAL");

        assert_eq!(origin.code, "JFK");
        assert_eq!(origin.city, "New York");
        assert_eq!(destination.code, "LAX");
        assert!((destination.position.latitude - 33.9425).abs() < 1e-9);
    }

    #[test]
    fn test_parse_route_unknown_callsign_is_none() {
        let payload = json!({"response": "unknown callsign"});
        assert!(parse_route(&payload).is_none());
    }

    #[test]
    fn test_parse_route_missing_destination_is_none() {
        let mut payload = route_payload();
        payload["response"]["flightroute"]
            .as_object_mut()
            .unwrap()
            .remove("destination");
        assert!(parse_route(&payload).is_none());
    }

    #[test]
    fn test_parse_route_without_airline_still_works() {
        let mut payload = route_payload();
        payload["response"]["flightroute"]
            .as_object_mut()
            .unwrap()
            .remove("airline");
        let (airline, _, _) = parse_route(&payload).unwrap();
        assert!(airline.is_none());
    }

    #[test]
    fn test_parse_live_picks_first_usable_aircraft() {
        let payload = json!({
            "ac": [
                {"flight": "UAL123", "lat": 0.0, "lon": 0.0, "track": 90.0, "gs": 500.0},
                {"flight": "UAL123", "t": "B738", "lat": 39.1, "lon": -94.5,
                 "track": 255.0, "gs": 510.0, "alt_baro": 36000}
            ]
        });

        let (kinematics, aircraft_type) = parse_live(&payload).unwrap();
        assert_eq!(aircraft_type.as_deref(), Some("B738"));
        assert!((kinematics.position.latitude - 39.1).abs() < 1e-9);
        assert_eq!(kinematics.speed_mph, 510.0);
        assert_eq!(kinematics.altitude_ft, 36000.0);
    }

    #[test]
    fn test_parse_live_on_ground_altitude_defaults_to_zero() {
        let payload = json!({
            "ac": [
                {"flight": "UAL123", "lat": 40.64, "lon": -73.78,
                 "track": 0.0, "gs": 15.0, "alt_baro": "ground"}
            ]
        });

        let (kinematics, _) = parse_live(&payload).unwrap();
        assert_eq!(kinematics.altitude_ft, 0.0);
    }

    #[test]
    fn test_parse_live_empty_list_is_none() {
        assert!(parse_live(&json!({"ac": []})).is_none());
        assert!(parse_live(&json!({})).is_none());
    }

    #[test]
    fn test_parse_live_all_null_island_is_none() {
        let payload = json!({
            "ac": [{"flight": "UAL123", "lat": 0.0, "lon": 0.0, "gs": 400.0}]
        });
        assert!(parse_live(&payload).is_none());
    }
}
