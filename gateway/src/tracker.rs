//! Per-flight tracking loop
//!
//! Each tracked callsign gets its own interval task that refreshes telemetry,
//! dead-reckons when the feed goes quiet, reassesses risk, and broadcasts the
//! updated flight to any stream subscribers. A per-flight guard keeps ticks
//! from overlapping when one runs long.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use conflict_risk::ConflictZone;
use flight_track::{risk, TrackedFlight};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::telemetry::{FlightFetcher, TelemetryError};
use crate::weather_api::WeatherApi;

/// Refresh cadence for every tracked flight
pub const TICK_INTERVAL: Duration = Duration::from_secs(6);

/// Broadcast channel depth; slow subscribers lag rather than block the tick
const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// One broadcast update, tagged with the session that produced it
#[derive(Debug, Clone, Serialize)]
pub struct FlightUpdate {
    pub session_id: Uuid,
    pub flight: TrackedFlight,
}

struct TrackSession {
    id: Uuid,
    handle: JoinHandle<()>,
}

/// Registry of tracked flights and their refresh tasks
pub struct FlightTracker {
    flights: Arc<RwLock<HashMap<String, TrackedFlight>>>,
    sessions: RwLock<HashMap<String, TrackSession>>,
    updates: broadcast::Sender<FlightUpdate>,
    fetcher: Arc<FlightFetcher>,
    weather: Arc<WeatherApi>,
    zones: Arc<Vec<ConflictZone>>,
}

impl FlightTracker {
    pub fn new(
        fetcher: Arc<FlightFetcher>,
        weather: Arc<WeatherApi>,
        zones: Arc<Vec<ConflictZone>>,
    ) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            flights: Arc::new(RwLock::new(HashMap::new())),
            sessions: RwLock::new(HashMap::new()),
            updates,
            fetcher,
            weather,
            zones,
        }
    }

    /// Subscribe to the update feed for all tracked flights
    pub fn subscribe(&self) -> broadcast::Receiver<FlightUpdate> {
        self.updates.subscribe()
    }

    /// Current state of one tracked flight
    pub async fn get_flight(&self, callsign: &str) -> Option<TrackedFlight> {
        let callsign = FlightFetcher::normalize_callsign(callsign);
        self.flights.read().await.get(&callsign).cloned()
    }

    /// Begin tracking a callsign, or return the existing session
    ///
    /// The initial fetch happens inline so the caller gets a fully assessed
    /// flight back; the refresh task takes over from the next tick.
    pub async fn start_tracking(
        self: &Arc<Self>,
        callsign: &str,
    ) -> crate::telemetry::Result<(Uuid, TrackedFlight)> {
        let callsign = FlightFetcher::normalize_callsign(callsign);

        {
            let sessions = self.sessions.read().await;
            if let Some(session) = sessions.get(&callsign) {
                if let Some(flight) = self.flights.read().await.get(&callsign) {
                    return Ok((session.id, flight.clone()));
                }
            }
        }

        let snapshot = self.fetcher.fetch(&callsign).await?;
        let mut flight = TrackedFlight::new(
            snapshot.callsign.clone(),
            snapshot.airline,
            snapshot.aircraft_type,
            snapshot.origin,
            snapshot.destination,
            snapshot.kinematics,
            snapshot.fetched_at,
        );
        flight.risk = Some(self.assess(&flight).await);

        let session_id = Uuid::new_v4();
        self.flights
            .write()
            .await
            .insert(callsign.clone(), flight.clone());

        let handle = tokio::spawn(Arc::clone(self).run_ticks(callsign.clone(), session_id));
        self.sessions.write().await.insert(
            callsign.clone(),
            TrackSession {
                id: session_id,
                handle,
            },
        );

        tracing::info!(%callsign, %session_id, "tracking started");
        Ok((session_id, flight))
    }

    /// Stop tracking a callsign; true when a session existed
    pub async fn stop_tracking(&self, callsign: &str) -> bool {
        let callsign = FlightFetcher::normalize_callsign(callsign);

        let session = self.sessions.write().await.remove(&callsign);
        match session {
            Some(session) => {
                session.handle.abort();
                self.flights.write().await.remove(&callsign);
                tracing::info!(%callsign, session_id = %session.id, "tracking stopped");
                true
            }
            None => false,
        }
    }

    async fn run_ticks(self: Arc<Self>, callsign: String, session_id: Uuid) {
        let guard = Arc::new(Mutex::new(()));
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        interval.tick().await;

        loop {
            interval.tick().await;

            // Skip the tick outright if the previous one is still running;
            // dead reckoning on the next tick covers the gap.
            let permit = match Arc::clone(&guard).try_lock_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    tracing::debug!(%callsign, "tick still running, skipping");
                    continue;
                }
            };

            let tracker = Arc::clone(&self);
            let callsign = callsign.clone();
            tokio::spawn(async move {
                let _permit = permit;
                tracker.tick_once(&callsign, session_id).await;
            });
        }
    }

    /// One refresh cycle: telemetry, risk, broadcast
    async fn tick_once(&self, callsign: &str, session_id: Uuid) {
        // Fetch before taking the registry lock; a slow upstream must not
        // stall reads of other flights.
        let fetched = self.fetcher.fetch(callsign).await;

        let updated = {
            let mut flights = self.flights.write().await;
            let Some(flight) = flights.get_mut(callsign) else {
                return;
            };

            match fetched {
                Ok(snapshot) => {
                    flight.apply_telemetry(snapshot.kinematics, snapshot.fetched_at);
                }
                Err(TelemetryError::NoLiveData(_)) => {
                    flight.advance_dead_reckoning(TICK_INTERVAL.as_secs_f64());
                }
                Err(err) => {
                    tracing::warn!(%callsign, error = %err, "telemetry refresh failed");
                    flight.advance_dead_reckoning(TICK_INTERVAL.as_secs_f64());
                }
            }
            flight.clone()
        };

        let mut assessed = updated;
        assessed.risk = Some(self.assess(&assessed).await);

        if let Some(flight) = self.flights.write().await.get_mut(callsign) {
            flight.risk = assessed.risk.clone();
        }

        let _ = self.updates.send(FlightUpdate {
            session_id,
            flight: assessed,
        });
    }

    /// Assess a flight, running the weather fetch and conflict queries together
    async fn assess(&self, flight: &TrackedFlight) -> risk::RiskAssessment {
        let position = flight.kinematics.position;
        let (weather, exposure) = tokio::join!(
            self.weather.risk_for(position.latitude, position.longitude),
            async {
                risk::conflict_exposure(
                    flight.origin.position,
                    flight.destination.position,
                    Some(position),
                    &self.zones,
                )
            }
        );
        risk::assemble(&weather, exposure)
    }
}
