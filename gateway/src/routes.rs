//! AeroRisk API routes
//!
//! Flight tracking lifecycle, the per-flight SSE stream, the conflict zone
//! listing, and ad-hoc route assessment. All handlers hang off /api/v1.

use std::convert::Infallible;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use conflict_risk::ConflictZone;
use flight_track::{risk, RiskAssessment, TrackedFlight};
use geo_math::GeoPoint;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use uuid::Uuid;
use weather_risk::WeatherRisk;

use crate::telemetry::{FlightFetcher, TelemetryError};
use crate::AppState;

#[derive(Serialize)]
pub struct TrackResponse {
    pub session_id: Uuid,
    pub flight: TrackedFlight,
}

#[derive(Serialize)]
pub struct ConflictListResponse {
    pub count: usize,
    pub zones: Vec<ConflictZone>,
}

#[derive(Deserialize)]
pub struct RouteRiskRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    /// Live position, when the caller has one
    #[serde(default)]
    pub position: Option<GeoPoint>,
}

#[derive(Serialize)]
pub struct RouteRiskResponse {
    pub weather: WeatherRisk,
    pub assessment: RiskAssessment,
}

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/flights/:callsign", get(get_flight))
        .route("/flights/:callsign/track", post(start_track))
        .route("/flights/:callsign/track", delete(stop_track))
        .route("/flights/:callsign/stream", get(stream_flight))
        .route("/conflicts", get(list_conflicts))
        .route("/risk/route", post(assess_route))
}

fn telemetry_status(err: &TelemetryError) -> StatusCode {
    match err {
        TelemetryError::FlightNotFound(_) | TelemetryError::NoLiveData(_) => StatusCode::NOT_FOUND,
        TelemetryError::RequestFailed(_) | TelemetryError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

pub async fn start_track(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Result<Json<TrackResponse>, (StatusCode, String)> {
    let (session_id, flight) = state
        .tracker
        .start_tracking(&callsign)
        .await
        .map_err(|e| (telemetry_status(&e), e.to_string()))?;

    Ok(Json(TrackResponse { session_id, flight }))
}

pub async fn get_flight(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Result<Json<TrackedFlight>, (StatusCode, String)> {
    let flight = state.tracker.get_flight(&callsign).await.ok_or((
        StatusCode::NOT_FOUND,
        format!("Flight {} is not being tracked", callsign.trim().to_uppercase()),
    ))?;

    Ok(Json(flight))
}

pub async fn stop_track(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.tracker.stop_tracking(&callsign).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((
            StatusCode::NOT_FOUND,
            format!("Flight {} is not being tracked", callsign.trim().to_uppercase()),
        ))
    }
}

/// SSE feed of updates for one callsign
///
/// Subscribes to the shared broadcast and drops updates for other flights.
/// Updates an overloaded subscriber misses are skipped, not replayed.
pub async fn stream_flight(
    State(state): State<AppState>,
    Path(callsign): Path<String>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let callsign = FlightFetcher::normalize_callsign(&callsign);
    let updates = BroadcastStream::new(state.tracker.subscribe());

    let stream = updates.filter_map(move |update| match update {
        Ok(update) if update.flight.callsign == callsign => {
            Event::default().json_data(&update).ok().map(Ok)
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

pub async fn list_conflicts(State(state): State<AppState>) -> Json<ConflictListResponse> {
    Json(ConflictListResponse {
        count: state.zones.len(),
        zones: state.zones.as_ref().clone(),
    })
}

/// Assess an arbitrary route without starting a track
pub async fn assess_route(
    State(state): State<AppState>,
    Json(request): Json<RouteRiskRequest>,
) -> Result<Json<RouteRiskResponse>, (StatusCode, String)> {
    for (label, point) in [("origin", request.origin), ("destination", request.destination)] {
        if !point.is_valid() {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Invalid {} coordinates", label),
            ));
        }
    }
    if let Some(position) = request.position {
        if !position.is_valid() {
            return Err((
                StatusCode::BAD_REQUEST,
                "Invalid position coordinates".to_string(),
            ));
        }
    }

    let weather = match request.position {
        Some(p) => state.weather.risk_for(p.latitude, p.longitude).await,
        None => WeatherRisk::fallback(),
    };
    let exposure = risk::conflict_exposure(
        request.origin,
        request.destination,
        request.position,
        &state.zones,
    );
    let assessment = risk::assemble(&weather, exposure);

    Ok(Json(RouteRiskResponse {
        weather,
        assessment,
    }))
}
