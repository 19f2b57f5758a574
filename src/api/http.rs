use std::net::SocketAddr;

use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use super::{
    ComparePayload, ProjectionPayload, RecoveryPayload, SolvePayload, build_request, compare,
    compare_request_from_payload, presets, recovery, recovery_request_from_payload, simulate,
    solve, solve_request_from_payload,
};
use crate::core::InputError;

pub fn router() -> Router {
    Router::new()
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .route("/api/compare", post(compare_handler))
        .route("/api/recovery", post(recovery_handler))
        .route("/api/solve", post(solve_handler))
        .route("/api/presets", get(presets_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "wealthcast HTTP API listening");
    axum::serve(listener, router()).await
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn presets_handler() -> Response {
    json_response(StatusCode::OK, presets())
}

async fn simulate_get_handler(
    payload: Result<Query<ProjectionPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => malformed(rejection.body_text()),
    }
}

async fn simulate_post_handler(
    payload: Result<Json<ProjectionPayload>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => malformed(rejection.body_text()),
    }
}

async fn simulate_handler_impl(payload: ProjectionPayload) -> Response {
    let request = match build_request(&payload.into_args()) {
        Ok(request) => request,
        Err(e) => return rejected(&e),
    };
    respond(run_blocking(move || simulate(&request)).await)
}

async fn compare_handler(payload: Result<Json<ComparePayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed(rejection.body_text()),
    };
    let (request, scenarios) = match compare_request_from_payload(payload) {
        Ok(parts) => parts,
        Err(e) => return rejected(&e),
    };
    respond(run_blocking(move || compare(&request, &scenarios)).await)
}

async fn recovery_handler(payload: Result<Json<RecoveryPayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed(rejection.body_text()),
    };
    let (request, event) = match recovery_request_from_payload(payload) {
        Ok(parts) => parts,
        Err(e) => return rejected(&e),
    };
    respond(run_blocking(move || recovery(&request, &event)).await)
}

async fn solve_handler(payload: Result<Json<SolvePayload>, JsonRejection>) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return malformed(rejection.body_text()),
    };
    let (request, config) = match solve_request_from_payload(payload) {
        Ok(parts) => parts,
        Err(e) => return rejected(&e),
    };
    match run_blocking(move || solve(&request, &config)).await {
        Ok(Ok(result)) => json_response(StatusCode::OK, result),
        Ok(Err(e)) => rejected(&e),
        Err(response) => response,
    }
}

/// Simulations are CPU-bound; keep them off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, Response>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work).await.map_err(|e| {
        error!(error = %e, "simulation task failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation failed")
    })
}

fn respond<T: Serialize>(outcome: Result<T, Response>) -> Response {
    match outcome {
        Ok(body) => json_response(StatusCode::OK, body),
        Err(response) => response,
    }
}

fn rejected(err: &InputError) -> Response {
    warn!(field = err.field(), error = %err, "rejected request");
    error_response(StatusCode::BAD_REQUEST, &err.to_string())
}

/// Bodies or query strings that never reached validation.
fn malformed(detail: String) -> Response {
    warn!(error = %detail, "malformed request");
    error_response(StatusCode::BAD_REQUEST, &detail)
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}
