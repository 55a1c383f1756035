//! REST API over the telemetry generator, forecast engine, and grid-shift
//! controller.
//!
//! - `GET /api/microgrid-data` — a fresh snapshot, also fed to the controller
//! - `GET /api/ai-predictions?type=…` — forecasts for one kind or `all`
//! - `GET /api/grid-shift` — controller state and shifting status
//! - `POST /api/grid-shift/{auto-shift,connect,disconnect,shedding}` — operator commands
//!
//! Every response is marked uncacheable.

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::response::Response;
use axum::routing::{get, post};
use chrono::Utc;
use tokio::task::JoinHandle;

use crate::config::MicrogridConfig;
use crate::forecast::ForecastEngine;
use crate::grid_shift::{GridShiftController, GridShiftHandle};
use crate::telemetry::TelemetryGenerator;

pub use types::{ErrorResponse, GridShiftResponse, PredictionQuery, SheddingRequest};

/// How often the background task fires due controller transitions.
const TIMER_TICK: Duration = Duration::from_millis(250);

/// Application state shared across all request handlers.
///
/// The generator and forecast engine are read-only; the controller
/// serializes its own mutations.
pub struct AppState {
    pub generator: TelemetryGenerator,
    pub forecasts: ForecastEngine,
    pub grid: GridShiftHandle,
}

impl AppState {
    /// Builds every component from one configuration. The controller is
    /// seeded from `simulation.seed` when set.
    pub fn from_config(config: &MicrogridConfig) -> Self {
        let controller = match config.simulation.seed {
            Some(seed) => GridShiftController::seeded(config.grid_shift.clone(), seed),
            None => GridShiftController::from_config(config.grid_shift.clone()),
        };
        Self {
            generator: TelemetryGenerator::from_config(config),
            forecasts: ForecastEngine::new(config.forecast.clone()),
            grid: GridShiftHandle::new(controller),
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/microgrid-data", get(handlers::get_microgrid_data))
        .route("/api/ai-predictions", get(handlers::get_predictions))
        .route("/api/grid-shift", get(handlers::get_grid_shift))
        .route("/api/grid-shift/auto-shift", post(handlers::toggle_auto_shift))
        .route("/api/grid-shift/connect", post(handlers::connect))
        .route("/api/grid-shift/disconnect", post(handlers::disconnect))
        .route("/api/grid-shift/shedding", post(handlers::set_shedding))
        .layer(middleware::map_response(no_cache))
        .with_state(state)
}

async fn no_cache(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-store, must-revalidate"),
    );
    response
}

/// Spawns the task that fires the controller's deferred transitions.
pub fn spawn_timer_task(state: Arc<AppState>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TIMER_TICK);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            state.grid.advance(Utc::now());
        }
    })
}

/// Binds to the given address and serves the API until the server stops.
///
/// # Arguments
///
/// * `state` - Shared application state
/// * `addr` - Socket address to bind to
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let timers = spawn_timer_task(Arc::clone(&state));
    tracing::info!(%addr, "API server listening");
    let result = axum::serve(listener, router(state)).await;
    timers.abort();
    result
}
