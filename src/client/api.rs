use reqwest::{Client, RequestBuilder, Response};
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use std::{
    sync::{Arc, PoisonError, RwLock},
    time::Duration,
};
use tracing::{debug, instrument};
use url::Url;

use super::error::ClientError;
use crate::{
    account::ContactKind,
    api::types::{
        ChangePasswordRequest, ContactUpdateRequest, ContactVerifyRequest, ErrorResponse,
        HealthResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        ResetPasswordRequest, SendOtpRequest, SendOtpResponse, UpdateProfileRequest, UserResponse,
        VerifyOtpRequest, VerifyOtpResponse,
    },
    otp::Purpose,
    APP_USER_AGENT,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

type Result<T> = std::result::Result<T, ClientError>;

/// HTTP client for the account API.
///
/// Clones share the connection pool and the bearer token, so a login through
/// one clone authenticates all of them. Requests are never retried.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: Client,
    base: Url,
    token: Arc<RwLock<Option<String>>>,
}

impl ApiClient {
    /// `base_url` may be the server root or the `/api` prefix.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            base: api_base(base_url)?,
            token: Arc::new(RwLock::new(None)),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    #[instrument(skip(self))]
    pub async fn send_otp(&self, identifier: &str, purpose: Purpose) -> Result<SendOtpResponse> {
        let body = SendOtpRequest {
            identifier: identifier.to_string(),
            purpose: purpose.as_str().to_string(),
        };
        self.send(self.http.post(self.url("auth/send-otp")?).json(&body))
            .await
    }

    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, identifier: &str, code: &str) -> Result<VerifyOtpResponse> {
        let body = VerifyOtpRequest {
            identifier: identifier.to_string(),
            code: code.to_string(),
        };
        self.send(self.http.post(self.url("auth/verify-otp")?).json(&body))
            .await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<UserResponse> {
        self.send(self.http.post(self.url("auth/register")?).json(request))
            .await
    }

    pub async fn register_simple(&self, request: &RegisterRequest) -> Result<UserResponse> {
        self.send(self.http.post(self.url("auth/register-simple")?).json(request))
            .await
    }

    /// Log in and keep the returned token for later calls.
    #[instrument(skip(self, secret))]
    pub async fn login(&self, identifier: &str, secret: &SecretString) -> Result<LoginResponse> {
        let body = LoginRequest {
            identifier: identifier.to_string(),
            credential_secret: secret.clone(),
        };
        let response: LoginResponse = self
            .send(self.http.post(self.url("auth/login")?).json(&body))
            .await?;
        self.set_token(Some(response.token.clone()));
        Ok(response)
    }

    /// Revoke the current session. The local token is dropped either way.
    pub async fn logout(&self) -> Result<MessageResponse> {
        let result = self
            .send(self.authorized(self.http.post(self.url("auth/logout")?)))
            .await;
        self.set_token(None);
        result
    }

    #[instrument(skip(self, new_secret))]
    pub async fn reset_password(
        &self,
        identifier: &str,
        new_secret: &SecretString,
    ) -> Result<MessageResponse> {
        let body = ResetPasswordRequest {
            identifier: identifier.to_string(),
            new_credential_secret: new_secret.clone(),
        };
        self.send(self.http.post(self.url("auth/reset-password")?).json(&body))
            .await
    }

    pub async fn profile(&self) -> Result<UserResponse> {
        self.send(self.authorized(self.http.get(self.url("user/profile")?)))
            .await
    }

    pub async fn update_profile(&self, display_name: &str) -> Result<UserResponse> {
        let body = UpdateProfileRequest {
            display_name: display_name.to_string(),
        };
        self.send(self.authorized(self.http.put(self.url("user/profile")?).json(&body)))
            .await
    }

    pub async fn change_password(
        &self,
        current: &SecretString,
        new_secret: &SecretString,
    ) -> Result<MessageResponse> {
        let body = ChangePasswordRequest {
            current_credential_secret: current.clone(),
            new_credential_secret: new_secret.clone(),
        };
        self.send(self.authorized(self.http.post(self.url("user/change-password")?).json(&body)))
            .await
    }

    #[instrument(skip(self))]
    pub async fn request_contact_update(
        &self,
        kind: ContactKind,
        new_value: &str,
    ) -> Result<SendOtpResponse> {
        let body = ContactUpdateRequest {
            new_value: new_value.to_string(),
        };
        let path = format!("user/request-update-{}", kind.as_str());
        self.send(self.authorized(self.http.post(self.url(&path)?).json(&body)))
            .await
    }

    #[instrument(skip(self, code))]
    pub async fn verify_contact_update(
        &self,
        kind: ContactKind,
        new_value: &str,
        code: &str,
    ) -> Result<UserResponse> {
        let body = ContactVerifyRequest {
            new_value: new_value.to_string(),
            code: code.to_string(),
        };
        let path = format!("user/verify-update-{}", kind.as_str());
        self.send(self.authorized(self.http.post(self.url(&path)?).json(&body)))
            .await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.send(self.http.get(self.url("health")?)).await
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path)?)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        decode(response).await
    }
}

fn api_base(base_url: &str) -> Result<Url> {
    let mut base = Url::parse(base_url)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    if !base.path().ends_with("/api/") {
        base = base.join("api/")?;
    }
    Ok(base)
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if status.is_success() {
        return serde_json::from_slice(&bytes).map_err(|err| ClientError::Decode(err.to_string()));
    }

    match serde_json::from_slice::<ErrorResponse>(&bytes) {
        Ok(envelope) => {
            debug!(status = status.as_u16(), code = %envelope.message, "request rejected");
            Err(ClientError::Rejected {
                status: status.as_u16(),
                code: envelope.message,
                message: envelope.detail.unwrap_or_default(),
            })
        }
        Err(_) => Err(ClientError::Decode(format!(
            "HTTP {status} without an error envelope"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_gets_api_prefix() -> anyhow::Result<()> {
        assert_eq!(
            api_base("http://localhost:3000")?.as_str(),
            "http://localhost:3000/api/"
        );
        assert_eq!(
            api_base("http://localhost:3000/api")?.as_str(),
            "http://localhost:3000/api/"
        );
        assert_eq!(
            api_base("http://shop.example.com/backend/api/")?.as_str(),
            "http://shop.example.com/backend/api/"
        );
        assert_eq!(
            api_base("http://shop.example.com/backend")?.as_str(),
            "http://shop.example.com/backend/api/"
        );
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(matches!(
            ApiClient::new("not a url"),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn clones_share_the_token() -> anyhow::Result<()> {
        let client = ApiClient::new("http://localhost:3000")?;
        let clone = client.clone();
        client.set_token(Some("abc".to_string()));
        assert_eq!(clone.token().as_deref(), Some("abc"));
        clone.set_token(None);
        assert_eq!(client.token(), None);
        Ok(())
    }

    #[test]
    fn endpoint_urls_resolve_under_api() -> anyhow::Result<()> {
        let client = ApiClient::new("http://localhost:3000")?;
        assert_eq!(
            client.url("user/verify-update-email")?.as_str(),
            "http://localhost:3000/api/user/verify-update-email"
        );
        Ok(())
    }
}
