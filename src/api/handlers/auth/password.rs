use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;

use super::AuthState;
use crate::api::{
    handlers::payload_error,
    types::{ErrorResponse, MessageResponse, ResetPasswordRequest},
};

/// Set a new credential after a verified `ForgotPassword` code.
#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Credential replaced; existing sessions revoked", body = MessageResponse),
        (status = 400, description = "Invalid secret or verification required", body = ErrorResponse),
        (status = 404, description = "No account for the identifier", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn reset_password(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<ResetPasswordRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .reset_password(&request.identifier, &request.new_credential_secret)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::ok("Password reset successful")),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
