use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::instrument;

use super::AuthState;
use crate::{
    account::{Account, Registration},
    api::{
        handlers::payload_error,
        types::{ErrorResponse, RegisterRequest, UserResponse},
    },
    error::Result,
};

impl From<RegisterRequest> for Registration {
    fn from(request: RegisterRequest) -> Self {
        Self {
            identifier: request.identifier,
            secret: request.credential_secret,
            display_name: request.display_name,
            contact_phone: request.contact_phone,
        }
    }
}

fn created(result: Result<Account>) -> Response {
    match result {
        Ok(account) => (
            StatusCode::CREATED,
            Json(UserResponse {
                success: true,
                message: "Registration successful".to_string(),
                user: account.view(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Create an account for an identifier verified with a `Register` code.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input, duplicate identifier, or verification required", body = ErrorResponse),
        (status = 403, description = "OTP registration disabled", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn register(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };
    created(auth_state.workflow().register(request.into()).await)
}

/// Create an account without a code.
#[utoipa::path(
    post,
    path = "/api/auth/register-simple",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid input or duplicate identifier", body = ErrorResponse),
        (status = 403, description = "Simple registration disabled", body = ErrorResponse)
    ),
    tag = "auth"
)]
#[instrument(skip(auth_state, payload))]
pub async fn register_simple(
    auth_state: Extension<Arc<AuthState>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };
    created(auth_state.workflow().register_simple(request.into()).await)
}
