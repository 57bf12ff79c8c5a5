//! Position evaluation endpoint.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chess_eval::{Depth, Evaluation, EvaluationResult, Fault};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Query parameters for an evaluation request.
#[derive(Debug, Deserialize)]
pub struct EvalQuery {
    /// Position in FEN notation.
    pub fen: String,
    /// Search depth, `1..=30`. Falls back to the configured default.
    pub depth: Option<i64>,
}

/// `{"cached": bool, "score_cp": int, "pv": string}`
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct EvalResponse {
    pub cached: bool,
    #[serde(flatten)]
    pub result: EvaluationResult,
}

impl From<Evaluation> for EvalResponse {
    fn from(evaluation: Evaluation) -> Self {
        Self {
            cached: evaluation.cached,
            result: evaluation.result,
        }
    }
}

/// Body of a rejected request.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub detail: String,
}

fn bad_request(detail: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { detail })).into_response()
}

/// GET /eval?fen=...&depth=15
///
/// # Responses
/// * 200 - evaluation, possibly carrying an `ERROR:` tag in `pv`
/// * 400 - missing or unparsable FEN, depth out of range
/// * 503 - no engine could be started (`pv` is `ERROR:ENGINE_UNAVAILABLE`)
pub async fn get_eval(
    State(state): State<AppState>,
    query: Result<Query<EvalQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let depth = resolve_depth(query.depth, state.default_depth);

    let evaluation = match state.service.evaluate(&query.fen, depth).await {
        Ok(evaluation) => evaluation,
        Err(e) => return bad_request(e.to_string()),
    };

    let status = match evaluation.fault {
        Some(Fault::EngineUnavailable) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (status, Json(EvalResponse::from(evaluation))).into_response()
}

fn resolve_depth(requested: Option<i64>, default: Depth) -> i64 {
    requested.unwrap_or_else(|| i64::from(default.get()))
}
