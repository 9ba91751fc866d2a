use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Json, Router};
use conflict_risk::ConflictZone;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod routes;
mod telemetry;
mod tracker;
mod weather_api;

use telemetry::FlightFetcher;
use tracker::FlightTracker;
use weather_api::WeatherApi;

const DEFAULT_CONFLICT_DATA: &str = "data/conflict-zones.json";

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<FlightTracker>,
    pub weather: Arc<WeatherApi>,
    pub zones: Arc<Vec<ConflictZone>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "aerorisk_gateway=debug,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing or broken dataset downgrades conflict scoring to zero
    // everywhere; the gateway still serves weather and tracking.
    let data_path = std::env::var("AERORISK_CONFLICT_DATA")
        .unwrap_or_else(|_| DEFAULT_CONFLICT_DATA.to_string());
    let zones = match conflict_risk::loader::load_conflict_zones(&data_path) {
        Ok(zones) => {
            tracing::info!("   Loaded {} conflict zones from {}", zones.len(), data_path);
            zones
        }
        Err(err) => {
            tracing::warn!("   Conflict data unavailable ({}): {}", data_path, err);
            Vec::new()
        }
    };
    let zones = Arc::new(zones);

    let weather = Arc::new(WeatherApi::new());
    let tracker = Arc::new(FlightTracker::new(
        Arc::new(FlightFetcher::new()),
        Arc::clone(&weather),
        Arc::clone(&zones),
    ));

    let state = AppState {
        tracker,
        weather,
        zones,
    };

    let app = Router::new()
        .route("/health", get(health))
        .nest("/api/v1", routes::api_routes().with_state(state))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let port = std::env::var("AERORISK_GATEWAY_PORT")
        .or_else(|_| std::env::var("PORT"))
        .unwrap_or_else(|_| "18701".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("✈️  AeroRisk Gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "aerorisk-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
