//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use chrono::Utc;

use super::AppState;
use super::types::{ApiError, GridShiftResponse, PredictionQuery, SheddingRequest};
use crate::forecast::ForecastBundle;
use crate::grid_shift::GridShiftState;
use crate::sim::clock::ClockSample;
use crate::telemetry::TelemetrySnapshot;

/// Generates a fresh snapshot and feeds it to the controller.
///
/// `GET /api/microgrid-data` → 200 + `TelemetrySnapshot` JSON. Alerts raised
/// by real controller transitions since the last poll are appended.
pub async fn get_microgrid_data(State(state): State<Arc<AppState>>) -> Json<TelemetrySnapshot> {
    let mut snapshot = state.generator.sample_now();
    let (_, notes) = state.grid.observe_and_drain(&snapshot, Utc::now());
    snapshot.alerts.extend(notes);
    Json(snapshot)
}

/// Runs the selected forecasts from the current instant.
///
/// `GET /api/ai-predictions?type=solar` → 200 + `ForecastBundle` JSON
/// `GET /api/ai-predictions?type=tidal` → 400 + `ErrorResponse`
pub async fn get_predictions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PredictionQuery>,
) -> Result<Json<ForecastBundle>, ApiError> {
    let kind = query.kind.as_deref().unwrap_or("all");
    let bundle = state
        .forecasts
        .query_str(kind, &ClockSample::now(), &mut rand::rng())?;
    Ok(Json(bundle))
}

/// `GET /api/grid-shift` → 200 + `GridShiftResponse` JSON
pub async fn get_grid_shift(State(state): State<Arc<AppState>>) -> Json<GridShiftResponse> {
    let grid = state.grid.state();
    Json(GridShiftResponse {
        shedding: grid.shedding_level.descriptor(),
        shifting_status: state.grid.shifting_status(),
        state: grid,
    })
}

pub async fn toggle_auto_shift(State(state): State<Arc<AppState>>) -> Json<GridShiftState> {
    Json(state.grid.toggle_auto_shift())
}

pub async fn connect(State(state): State<Arc<AppState>>) -> Json<GridShiftState> {
    Json(state.grid.manual_grid_shift(Utc::now()))
}

pub async fn disconnect(State(state): State<Arc<AppState>>) -> Json<GridShiftState> {
    Json(state.grid.disconnect_grid())
}

/// `POST /api/grid-shift/shedding` with `{"level": n}`; 400 if `n > 3` or
/// the body is malformed.
pub async fn set_shedding(
    State(state): State<Arc<AppState>>,
    body: Result<Json<SheddingRequest>, JsonRejection>,
) -> Result<Json<GridShiftState>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError(e.body_text()))?;
    Ok(Json(state.grid.set_shedding_level(req.level)?))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use tower::util::ServiceExt;

    use super::*;
    use crate::api::router;
    use crate::config::MicrogridConfig;

    fn make_test_state() -> Arc<AppState> {
        let mut config = MicrogridConfig::default();
        config.simulation.seed = Some(42);
        Arc::new(AppState::from_config(&config))
    }

    async fn send(state: &Arc<AppState>, req: Request<Body>) -> Response {
        router(Arc::clone(state)).oneshot(req).await.unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn microgrid_data_is_fresh_snapshot() {
        let state = make_test_state();
        let resp = send(&state, get("/api/microgrid-data")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CACHE_CONTROL],
            "no-cache, no-store, must-revalidate"
        );
        let json = json_body(resp).await;
        for key in ["timestamp", "totalGenerationKw", "loadSheddingLevel", "weather", "alerts"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
        let level = json["loadSheddingLevel"].as_u64().unwrap();
        assert!(level <= 3);
    }

    #[tokio::test]
    async fn predictions_select_one_kind() {
        let state = make_test_state();
        let resp = send(&state, get("/api/ai-predictions?type=load")).await;

        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert!(json["loadPredictions"]["predictedLoad"].as_f64().unwrap() > 0.0);
        assert!(json.get("solarPredictions").is_none());
    }

    #[tokio::test]
    async fn predictions_default_to_all() {
        let state = make_test_state();
        let json = json_body(send(&state, get("/api/ai-predictions")).await).await;
        for key in ["loadPredictions", "solarPredictions", "batteryPredictions", "weatherPredictions"] {
            assert!(json.get(key).is_some(), "missing {key}");
        }
    }

    #[tokio::test]
    async fn unknown_prediction_type_returns_400() {
        let state = make_test_state();
        let resp = send(&state, get("/api/ai-predictions?type=tidal")).await;

        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = json_body(resp).await;
        assert!(json["error"].as_str().unwrap().contains("tidal"));
    }

    #[tokio::test]
    async fn grid_shift_starts_islanded() {
        let state = make_test_state();
        let json = json_body(send(&state, get("/api/grid-shift")).await).await;
        assert_eq!(json["isConnected"], false);
        assert_eq!(json["syncStatus"], "disconnected");
        assert_eq!(json["autoShiftEnabled"], true);
        assert_eq!(json["shedding"]["level"], 0);
    }

    #[tokio::test]
    async fn operator_commands() {
        let state = make_test_state();

        let json = json_body(send(&state, post("/api/grid-shift/auto-shift", "")).await).await;
        assert_eq!(json["autoShiftEnabled"], false);

        let json = json_body(send(&state, post("/api/grid-shift/connect", "")).await).await;
        assert_eq!(json["syncStatus"], "synchronizing");
        assert_eq!(json["shiftingInProgress"], true);

        let json = json_body(send(&state, post("/api/grid-shift/disconnect", "")).await).await;
        assert_eq!(json["syncStatus"], "disconnected");
        assert_eq!(json["shiftingInProgress"], false);
    }

    #[tokio::test]
    async fn shedding_override() {
        let state = make_test_state();

        let resp = send(&state, post("/api/grid-shift/shedding", r#"{"level":2}"#)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["sheddingLevel"], 2);

        let resp = send(&state, post("/api/grid-shift/shedding", r#"{"level":7}"#)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(resp).await.get("error").is_some());

        let resp = send(&state, post("/api/grid-shift/shedding", "not json")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        assert_eq!(state.grid.state().shedding_level.as_u8(), 2);
    }
}
