// =============================================================================
// REST API Endpoints - Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/`:
//
//   GET  /api/v1/health
//   GET  /api/v1/signals?signal_type=<key>
//   POST /api/v1/refresh
//   GET  /api/v1/symbols/:code/frame
//   GET  /api/v1/symbols/:code/evaluation?horizon=<n>&signal_type=<key>
//
// The signals endpoint refreshes the cached set first when it is stale. If
// the refresh fails the previous set is served and the error is reported in
// the body. The symbol endpoints fetch one history on demand and never touch
// the cached set.
//
// CORS is configured permissively for development.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

use crate::app_state::{AppState, RunSummary};
use crate::error::SignalError;
use crate::market_data::OhlcSource;
use crate::signals::snapshot::update_time_format;
use crate::signals::{
    evaluate_history, filter_signals, hit_rate, ForwardEvaluation, SignalKind, SignalSnapshot,
};

const DEFAULT_HORIZON: usize = 5;
const MAX_HORIZON: usize = 60;

// =============================================================================
// Router construction
// =============================================================================

/// Build the REST API router with CORS middleware and shared state.
pub fn router<S: OhlcSource>(state: Arc<AppState<S>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health::<S>))
        .route("/api/v1/signals", get(signals::<S>))
        .route("/api/v1/refresh", post(refresh::<S>))
        .route("/api/v1/symbols/:code/frame", get(symbol_frame::<S>))
        .route("/api/v1/symbols/:code/evaluation", get(symbol_evaluation::<S>))
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    signals: usize,
    #[serde(with = "update_time_format")]
    update_time: Option<NaiveDateTime>,
    uptime_secs: u64,
    last_run: Option<RunSummary>,
}

async fn health<S: OhlcSource>(State(state): State<Arc<AppState<S>>>) -> impl IntoResponse {
    let current = state.cache.current();
    Json(HealthResponse {
        status: "ok",
        signals: current.len(),
        update_time: state.cache.last_refresh(),
        uptime_secs: state.uptime_secs(),
        last_run: state.last_run.read().clone(),
    })
}

// =============================================================================
// Signals
// =============================================================================

#[derive(Debug, Deserialize)]
struct SignalQuery {
    signal_type: Option<String>,
}

#[derive(Serialize)]
struct SignalsResponse {
    signal_type: Option<SignalKind>,
    count: usize,
    signals: Vec<SignalSnapshot>,
    #[serde(with = "update_time_format")]
    update_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    refresh_error: Option<String>,
}

fn parse_signal_type(raw: Option<&str>) -> Result<Option<SignalKind>, String> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some),
    }
}

async fn signals<S: OhlcSource>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SignalQuery>,
) -> Response {
    let kind = match parse_signal_type(query.signal_type.as_deref()) {
        Ok(kind) => kind,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };

    let now = chrono::Local::now().naive_local();
    let (set, refresh_error) = match state.refresh_if_stale(now).await {
        Ok(set) => (set, None),
        Err(e) => {
            warn!(error = %e, "Refresh failed, serving previous signal set");
            (state.cache.current(), Some(format!("{e:#}")))
        }
    };

    let signals: Vec<SignalSnapshot> = filter_signals(&set.signals, kind)
        .into_iter()
        .cloned()
        .collect();

    Json(SignalsResponse {
        signal_type: kind,
        count: signals.len(),
        signals,
        update_time: set.update_time,
        refresh_error,
    })
    .into_response()
}

// =============================================================================
// Manual refresh
// =============================================================================

#[derive(Serialize)]
struct RefreshResponse {
    count: usize,
    #[serde(with = "update_time_format")]
    update_time: Option<NaiveDateTime>,
    last_run: Option<RunSummary>,
}

async fn refresh<S: OhlcSource>(State(state): State<Arc<AppState<S>>>) -> Response {
    let now = chrono::Local::now().naive_local();
    match state.force_refresh(now).await {
        Ok(set) => Json(RefreshResponse {
            count: set.len(),
            update_time: set.update_time,
            last_run: state.last_run.read().clone(),
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Manual refresh failed");
            error_response(StatusCode::SERVICE_UNAVAILABLE, format!("{e:#}"))
        }
    }
}

// =============================================================================
// Per-symbol frame & evaluation
// =============================================================================

#[derive(Debug, Deserialize)]
struct EvaluationQuery {
    horizon: Option<usize>,
    signal_type: Option<String>,
}

#[derive(Serialize)]
struct EvaluationResponse {
    code: String,
    name: String,
    signal_type: Option<SignalKind>,
    horizon: usize,
    evaluated: usize,
    hit_rate: Option<f64>,
    evaluations: Vec<ForwardEvaluation>,
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

fn signal_error_status(e: &SignalError) -> StatusCode {
    match e {
        SignalError::MalformedUniverseEntry { .. } => StatusCode::BAD_REQUEST,
        SignalError::InsufficientHistory { .. } | SignalError::MalformedSeries { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SignalError::UpstreamUnavailable { .. } => StatusCode::BAD_GATEWAY,
        SignalError::Computation { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn symbol_frame<S: OhlcSource>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
) -> Response {
    let today = chrono::Local::now().date_naive();
    match state.symbol_frame(&code, today).await {
        Ok(Some((_, frame))) => Json(frame).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("no price history for {code}")),
        Err(e) => error_response(signal_error_status(&e), e.to_string()),
    }
}

async fn symbol_evaluation<S: OhlcSource>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
    Query(query): Query<EvaluationQuery>,
) -> Response {
    let kind = match parse_signal_type(query.signal_type.as_deref()) {
        Ok(kind) => kind,
        Err(message) => return error_response(StatusCode::BAD_REQUEST, message),
    };
    let horizon = query.horizon.unwrap_or(DEFAULT_HORIZON).clamp(1, MAX_HORIZON);

    let today = chrono::Local::now().date_naive();
    let (series, frame) = match state.symbol_frame(&code, today).await {
        Ok(Some(pair)) => pair,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("no price history for {code}"))
        }
        Err(e) => return error_response(signal_error_status(&e), e.to_string()),
    };

    let entry = state.entry_for(&code);
    let evaluations = evaluate_history(&frame, &entry, &series, kind, horizon);
    Json(EvaluationResponse {
        code: entry.code,
        name: entry.name,
        signal_type: kind,
        horizon,
        evaluated: evaluations.len(),
        hit_rate: hit_rate(&evaluations),
        evaluations,
    })
    .into_response()
}
