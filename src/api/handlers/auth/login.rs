use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::{debug, instrument};

use super::AuthState;
use crate::api::{
    handlers::{guard::AuthenticatedAccount, payload_error},
    types::{ErrorResponse, LoginRequest, LoginResponse, MessageResponse},
};

/// Exchange credentials for a bearer token.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid identifier or credential secret", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn login(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .login(&request.identifier, &request.credential_secret)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                message: "Login successful".to_string(),
                user: outcome.account.view(),
                token: outcome.token,
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Revoke the presented session.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Missing or invalid session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
#[instrument(skip_all)]
pub async fn logout(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
) -> impl IntoResponse {
    let revoked = auth_state.workflow().logout(&session.token);
    debug!(account_id = session.account.id, revoked, "logout");
    (StatusCode::OK, Json(MessageResponse::ok("Logged out")))
}
