use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;

use super::AuthState;
use crate::{
    api::{
        handlers::payload_error,
        types::{
            ErrorResponse, SendOtpRequest, SendOtpResponse, VerifyOtpRequest, VerifyOtpResponse,
        },
    },
    otp::Purpose,
};

/// Issue a code for registration or password recovery.
#[utoipa::path(
    post,
    path = "/api/auth/send-otp",
    request_body = SendOtpRequest,
    responses(
        (status = 200, description = "Code issued", body = SendOtpResponse),
        (status = 400, description = "Invalid identifier or purpose, or identifier already registered", body = ErrorResponse),
        (status = 403, description = "OTP registration disabled", body = ErrorResponse),
        (status = 404, description = "No account for a password reset", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn send_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<SendOtpRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    let result = request
        .purpose
        .parse::<Purpose>()
        .and_then(|purpose| auth_state.workflow().send_otp(&request.identifier, purpose));

    match result {
        Ok(issued) => (
            StatusCode::OK,
            Json(SendOtpResponse {
                success: true,
                message: "Verification code sent".to_string(),
                expires_in: issued.expires_in,
                expires_at: issued.expires_at,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Check a code; the response names the purpose it was issued for.
#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code verified", body = VerifyOtpResponse),
        (status = 400, description = "No pending code, expired, used, mismatched, or too many attempts", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn verify_otp(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .verify_otp(&request.identifier, &request.code)
    {
        Ok(purpose) => (
            StatusCode::OK,
            Json(VerifyOtpResponse {
                success: true,
                message: "Code verified".to_string(),
                purpose,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
