//! API request, response, and error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::error::MicrogridError;
use crate::grid_shift::{GridShiftState, ShiftingStatus};
use crate::sim::shedding::SheddingDescriptor;

/// Query parameters for the forecast endpoint.
#[derive(Debug, Deserialize)]
pub struct PredictionQuery {
    /// Forecast selector; `all` when absent.
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Body of `POST /api/grid-shift/shedding`.
#[derive(Debug, Deserialize)]
pub struct SheddingRequest {
    pub level: u8,
}

/// Controller state plus the derived status label and active shedding step.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GridShiftResponse {
    #[serde(flatten)]
    pub state: GridShiftState,
    pub shifting_status: ShiftingStatus,
    pub shedding: &'static SheddingDescriptor,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}

/// Rejected request; always rendered as 400 with an [`ErrorResponse`] body.
#[derive(Debug)]
pub struct ApiError(pub String);

impl From<MicrogridError> for ApiError {
    fn from(e: MicrogridError) -> Self {
        Self(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: self.0 })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_shift_response_flattens_state() {
        let state = GridShiftState::islanded(true);
        let resp = GridShiftResponse {
            shedding: state.shedding_level.descriptor(),
            state,
            shifting_status: ShiftingStatus::MicrogridMode,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["isConnected"], false);
        assert_eq!(json["syncStatus"], "disconnected");
        assert_eq!(json["sheddingLevel"], 0);
        assert_eq!(json["shiftingStatus"], "Microgrid Mode");
        assert_eq!(json["shedding"]["name"], "Normal Operation");
    }

    #[test]
    fn prediction_query_reads_type() {
        let q: PredictionQuery = serde_json::from_str(r#"{"type":"solar"}"#).unwrap();
        assert_eq!(q.kind.as_deref(), Some("solar"));
    }
}
