//! Open-Meteo weather adapter
//!
//! Fetches the hourly forecast for a coordinate and scores the first slot
//! with the weather-risk model. Responses are cached per rounded coordinate
//! for five minutes so a flight circling one region does not hammer the API.
//!
//! Weather is advisory: every failure path degrades to the fallback score
//! rather than surfacing an error to the tracker.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use weather_risk::{score, WeatherObservation, WeatherRisk};

const OPEN_METEO_BASE: &str = "https://api.open-meteo.com/v1";

/// How long a scored observation stays valid for one rounded coordinate
pub const CACHE_TTL: Duration = Duration::from_secs(300);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum WeatherApiError {
    #[error("weather request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("forecast response contained no hourly data")]
    EmptyForecast,
}

pub type Result<T> = std::result::Result<T, WeatherApiError>;

struct CacheEntry {
    risk: WeatherRisk,
    expires_at: Instant,
}

/// Open-Meteo client with a per-coordinate score cache
pub struct WeatherApi {
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl WeatherApi {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            client,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Cache key from coordinates rounded to two decimal places (~1 km)
    fn cache_key(lat: f64, lon: f64) -> String {
        format!("{:.2},{:.2}", lat, lon)
    }

    /// Score the weather at a coordinate, falling back on any failure
    ///
    /// The fallback score is never cached, so a transient outage clears as
    /// soon as the API answers again.
    pub async fn risk_for(&self, lat: f64, lon: f64) -> WeatherRisk {
        let key = Self::cache_key(lat, lon);

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > Instant::now() {
                    return entry.risk.clone();
                }
            }
        }

        match self.fetch_observation(lat, lon).await {
            Ok(obs) => {
                let risk = score(&obs);
                let mut cache = self.cache.write().await;
                cache.insert(
                    key,
                    CacheEntry {
                        risk: risk.clone(),
                        expires_at: Instant::now() + CACHE_TTL,
                    },
                );
                risk
            }
            Err(err) => {
                tracing::debug!(lat, lon, error = %err, "weather fetch failed, using fallback");
                WeatherRisk::fallback()
            }
        }
    }

    async fn fetch_observation(&self, lat: f64, lon: f64) -> Result<WeatherObservation> {
        let url = format!(
            "{}/forecast?latitude={:.4}&longitude={:.4}\
             &hourly=temperature_2m,relative_humidity_2m,wind_speed_10m,precipitation,cloudcover\
             &forecast_days=1",
            OPEN_METEO_BASE, lat, lon
        );

        let body: Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        parse_first_hour(&body).ok_or(WeatherApiError::EmptyForecast)
    }
}

impl Default for WeatherApi {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the first hourly slot from an Open-Meteo forecast payload
fn parse_first_hour(body: &Value) -> Option<WeatherObservation> {
    let hourly = body.get("hourly")?;

    let first = |field: &str| -> Option<f64> {
        hourly.get(field)?.as_array()?.first()?.as_f64()
    };

    let timestamp = hourly
        .get("time")
        .and_then(|t| t.as_array())
        .and_then(|a| a.first())
        .and_then(|v| v.as_str())
        .and_then(|s| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M").ok())
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_else(|| Utc::now().timestamp());

    Some(WeatherObservation {
        temperature_c: first("temperature_2m")?,
        humidity_pct: first("relative_humidity_2m")?,
        wind_speed_kmh: first("wind_speed_10m")?,
        precipitation_mm: first("precipitation")?,
        cloud_cover_pct: first("cloudcover")?,
        timestamp,
    })
}
