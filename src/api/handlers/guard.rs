//! Bearer-session guard for account endpoints.

use anyhow::anyhow;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;

use super::auth::AuthState;
use crate::{account::Account, error::Error};

/// The account behind a valid `Authorization: Bearer <token>` header.
///
/// Rejects with `SessionRequired` (missing/unknown token or vanished account)
/// or `SessionExpired`, both 401.
#[derive(Clone, Debug)]
pub struct AuthenticatedAccount {
    pub account: Account,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthenticatedAccount
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = parts
            .extensions
            .get::<Arc<AuthState>>()
            .cloned()
            .ok_or_else(|| Error::Internal(anyhow!("auth state extension missing")))?;
        let token = extract_bearer_token(&parts.headers).ok_or(Error::SessionRequired)?;
        let account = auth_state.workflow().authenticate(&token)?;
        Ok(Self { account, token })
    }
}

pub(crate) fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
