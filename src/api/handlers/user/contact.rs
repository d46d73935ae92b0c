use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::instrument;

use crate::{
    account::ContactKind,
    api::{
        handlers::{auth::AuthState, guard::AuthenticatedAccount, payload_error},
        types::{
            ContactUpdateRequest, ContactVerifyRequest, ErrorResponse, SendOtpResponse,
            UserResponse,
        },
    },
};

#[instrument(skip(auth_state, session, payload), fields(account_id = session.account.id))]
fn request_update(
    auth_state: &AuthState,
    session: &AuthenticatedAccount,
    kind: ContactKind,
    payload: Result<Json<ContactUpdateRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .request_contact_update(session.account.id, kind, &request.new_value)
    {
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

#[instrument(skip(auth_state, session, payload), fields(account_id = session.account.id))]
async fn verify_update(
    auth_state: &AuthState,
    session: &AuthenticatedAccount,
    kind: ContactKind,
    payload: Result<Json<ContactVerifyRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return payload_error(&rejection),
    };

    match auth_state
        .workflow()
        .confirm_contact_update(session.account.id, kind, &request.new_value, &request.code)
        .await
    {
        Ok(account) => (
            StatusCode::OK,
            Json(UserResponse {
                success: true,
                message: "Contact updated".to_string(),
                user: account.view(),
            }),
        )
            .into_response(),
        Err(err) => err.into_response(),
    }
}

/// Send a code to a new email address.
#[utoipa::path(
    post,
    path = "/api/user/request-update-email",
    request_body = ContactUpdateRequest,
    responses(
        (status = 200, description = "Code sent to the new email", body = SendOtpResponse),
        (status = 400, description = "Invalid or already used email", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn request_update_email(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
    payload: Result<Json<ContactUpdateRequest>, JsonRejection>,
) -> impl IntoResponse {
    request_update(&auth_state, &session, ContactKind::Email, payload)
}

/// Send a code to a new phone number.
#[utoipa::path(
    post,
    path = "/api/user/request-update-phone",
    request_body = ContactUpdateRequest,
    responses(
        (status = 200, description = "Code sent to the new phone", body = SendOtpResponse),
        (status = 400, description = "Invalid phone number", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn request_update_phone(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
    payload: Result<Json<ContactUpdateRequest>, JsonRejection>,
) -> impl IntoResponse {
    request_update(&auth_state, &session, ContactKind::Phone, payload)
}

/// Verify the code sent to the new email and make it the login identifier.
#[utoipa::path(
    post,
    path = "/api/user/verify-update-email",
    request_body = ContactVerifyRequest,
    responses(
        (status = 200, description = "Email updated", body = UserResponse),
        (status = 400, description = "Code rejected or email taken meanwhile", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn verify_update_email(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
    payload: Result<Json<ContactVerifyRequest>, JsonRejection>,
) -> impl IntoResponse {
    verify_update(&auth_state, &session, ContactKind::Email, payload).await
}

/// Verify the code sent to the new phone and store it as contact phone.
#[utoipa::path(
    post,
    path = "/api/user/verify-update-phone",
    request_body = ContactVerifyRequest,
    responses(
        (status = 200, description = "Phone updated", body = UserResponse),
        (status = 400, description = "Code rejected", body = ErrorResponse),
        (status = 401, description = "Missing, invalid, or expired session", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "user"
)]
pub async fn verify_update_phone(
    auth_state: Extension<Arc<AuthState>>,
    session: AuthenticatedAccount,
    payload: Result<Json<ContactVerifyRequest>, JsonRejection>,
) -> impl IntoResponse {
    verify_update(&auth_state, &session, ContactKind::Phone, payload).await
}
