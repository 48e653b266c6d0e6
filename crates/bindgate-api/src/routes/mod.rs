//! Gateway HTTP routes

mod schemas;

pub use schemas::{AuthResponse, ErrorDetail, HealthResponse};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bindgate_auth::Credential;
use std::time::Instant;
use tracing::debug;

use crate::metrics::{record_auth_attempt, AuthOutcome};
use crate::server::AppState;

/// Message returned for every failed authentication
pub const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// GET /healthz - Liveness probe
pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// POST /auth/ldap - Authenticate against the directory
pub async fn auth_ldap(
    State(state): State<AppState>,
    payload: Result<Json<Credential>, JsonRejection>,
) -> Response {
    let Json(credential) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            debug!(status = %rejection.status(), "Rejected authentication request body");
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorDetail::new(rejection.body_text())),
            )
                .into_response();
        }
    };

    let Some(authenticator) = state.authenticator.as_ref() else {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorDetail::new(bindgate_core::Error::MissingConfiguration.to_string())),
        )
            .into_response();
    };

    let start = Instant::now();
    let result = authenticator
        .authenticate(&credential.login, &credential.password)
        .await;
    let duration = start.elapsed().as_secs_f64();

    match result {
        Ok(entry) => {
            record_auth_attempt(AuthOutcome::Success, duration);
            (StatusCode::OK, Json(AuthResponse::success(entry))).into_response()
        }
        Err(_) => {
            record_auth_attempt(AuthOutcome::Failure, duration);
            (
                StatusCode::UNAUTHORIZED,
                Json(AuthResponse::failure(INVALID_CREDENTIALS)),
            )
                .into_response()
        }
    }
}
