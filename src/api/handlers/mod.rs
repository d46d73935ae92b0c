//! API handlers and the shared response plumbing.
//!
//! Every failure leaves through [`crate::Error`]'s `IntoResponse`, so clients
//! always get the `{success:false, message:<code>, detail}` envelope.

pub mod auth;
pub mod guard;
pub mod health;
pub mod user;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Json, Response},
};
use tracing::{debug, error};

use crate::{api::types::ErrorResponse, error::Error};

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let detail = if let Self::Internal(err) = &self {
            error!("request failed: {err:#}");
            "Internal server error".to_string()
        } else {
            debug!(code = self.code(), "request rejected: {self}");
            self.to_string()
        };
        let body = ErrorResponse {
            success: false,
            message: self.code().to_string(),
            detail: Some(detail),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Map an unreadable JSON body onto the envelope.
pub(crate) fn payload_error(rejection: &JsonRejection) -> Response {
    Error::InvalidPayload(rejection.body_text()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use axum::{body::to_bytes, http::StatusCode};

    async fn body_json(response: Response) -> anyhow::Result<serde_json::Value> {
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    #[tokio::test]
    async fn domain_errors_use_the_envelope() -> anyhow::Result<()> {
        let response = Error::CodeMismatch.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await?;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "CodeMismatch");
        assert_eq!(body["detail"], "code does not match");
        Ok(())
    }

    #[tokio::test]
    async fn internal_errors_hide_the_cause() -> anyhow::Result<()> {
        let response = Error::Internal(anyhow!("db password is hunter2")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await?;
        assert_eq!(body["message"], "Internal");
        assert!(!body.to_string().contains("hunter2"));
        Ok(())
    }
}
