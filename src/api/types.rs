//! Request/response bodies shared by the server handlers and the client.
//!
//! Field names are camelCase; the legacy names (`email`, `password`,
//! `fullName`, `phone`, `otp`, `newPassword`) are accepted as aliases.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use utoipa::ToSchema;

use crate::{account::AccountView, otp::Purpose};

fn expose<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpRequest {
    #[serde(alias = "email")]
    pub identifier: String,
    /// `Register` or `ForgotPassword` (kebab-case accepted).
    pub purpose: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpRequest {
    #[serde(alias = "email")]
    pub identifier: String,
    #[serde(alias = "otp")]
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(alias = "email")]
    pub identifier: String,
    #[serde(alias = "password", serialize_with = "expose")]
    #[schema(value_type = String)]
    pub credential_secret: SecretString,
    #[serde(alias = "fullName")]
    pub display_name: String,
    #[serde(default, alias = "phone", skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(alias = "email")]
    pub identifier: String,
    #[serde(alias = "password", serialize_with = "expose")]
    #[schema(value_type = String)]
    pub credential_secret: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(alias = "email")]
    pub identifier: String,
    #[serde(alias = "newPassword", serialize_with = "expose")]
    #[schema(value_type = String)]
    pub new_credential_secret: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(alias = "fullName")]
    pub display_name: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(alias = "oldPassword", serialize_with = "expose")]
    #[schema(value_type = String)]
    pub current_credential_secret: SecretString,
    #[serde(alias = "newPassword", serialize_with = "expose")]
    #[schema(value_type = String)]
    pub new_credential_secret: SecretString,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdateRequest {
    #[serde(alias = "newEmail", alias = "newPhone")]
    pub new_value: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ContactVerifyRequest {
    #[serde(alias = "newEmail", alias = "newPhone")]
    pub new_value: String,
    #[serde(alias = "otp")]
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    #[must_use]
    pub fn ok(message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SendOtpResponse {
    pub success: bool,
    pub message: String,
    /// Seconds until the code expires.
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpResponse {
    pub success: bool,
    pub message: String,
    /// The purpose the code was issued for; clients pick the next step from it.
    pub purpose: Purpose,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub success: bool,
    pub message: String,
    pub user: AccountView,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: AccountView,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub success: bool,
    pub message: String,
    pub name: String,
    pub version: String,
    pub commit: String,
    pub accounts: usize,
    pub pending_codes: usize,
}

/// Failure envelope: `message` carries the machine code, `detail` the text.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
