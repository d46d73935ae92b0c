use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use tracing::instrument;

use crate::api::{
    handlers::{auth::AuthState, guard::AuthenticatedAccount, payload_error},
    types::{
        ChangePasswordRequest, ErrorResponse, MessageResponse, UpdateProfileRequest, UserResponse,
    },
};

/// Current account.
#[utoipa::path(
    get,
    path = "/api/user/profile",
    responses(
        (status = 200, description = "Current account", body = UserResponse),
        (status = 401, description = "Missing, invalid, or expired session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn get_profile(session: AuthenticatedAccount) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(UserResponse {
            success: true,
            message: "Profile loaded".to_string(),
            user: session.account.view(),
        }),
    )
}

#[utoipa::path(
    put,
    path = "/api/user/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Blank display name", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip_all, fields(account_id = session.account.id))]
pub async fn update_profile(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .update_profile(session.account.id, &request.display_name)
        .await
    {
        Ok(account) => (
            StatusCode::OK,
            Json(UserResponse {
                success: true,
                message: "Profile updated".to_string(),
                user: account.view(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

#[utoipa::path(
    post,
    path = "/api/user/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Credential changed", body = MessageResponse),
        (status = 400, description = "New secret too short", body = ErrorResponse),
        (status = 401, description = "Wrong current secret or invalid session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
#[instrument(skip_all, fields(account_id = session.account.id))]
pub async fn change_password(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> impl IntoResponse {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .change_password(
            session.account.id,
            &request.current_credential_secret,
            &request.new_credential_secret,
        )
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(MessageResponse::ok("Password changed")),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}
