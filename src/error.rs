//! Domain errors for the OTP registry and account workflows.
//!
//! Every variant maps to a stable machine code (sent as the `message` of the
//! JSON envelope), a category, and an HTTP status.

use axum::http::StatusCode;
use thiserror::Error;

/// Coarse classification used by clients to decide how to recover.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input; fix the field and resubmit.
    Validation,
    /// The flow is in the wrong state; input must change before retrying.
    State,
    /// The code is no longer usable; only a new code helps.
    Expiry,
    /// Wrong code; re-entering the code may succeed.
    Mismatch,
    /// Missing or rejected credentials/session.
    Auth,
    NotFound,
    Internal,
}

impl ErrorCategory {
    /// Category for a machine code received over the wire. Unknown codes are
    /// treated as internal failures.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "InvalidIdentifier" | "InvalidPurpose" | "InvalidCode" | "InvalidCredentialSecret"
            | "InvalidDisplayName" | "InvalidPayload" => Self::Validation,
            "DuplicateRegistration" | "IdentifierInUse" | "NoPendingCode" | "CodeAlreadyUsed"
            | "VerificationRequired" | "RegistrationDisabled" => Self::State,
            "IdentifierNotFound" => Self::NotFound,
            "CodeExpired" | "TooManyAttempts" => Self::Expiry,
            "CodeMismatch" => Self::Mismatch,
            "InvalidCredentials" | "SessionRequired" | "SessionExpired" => Self::Auth,
            _ => Self::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("identifier is not a valid email address or phone number")]
    InvalidIdentifier,
    #[error("unknown purpose")]
    InvalidPurpose,
    #[error("code must be 6 digits")]
    InvalidCode,
    #[error("credential secret must be at least {min} characters")]
    InvalidCredentialSecret { min: usize },
    #[error("display name is required")]
    InvalidDisplayName,
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),
    #[error("identifier is already registered")]
    DuplicateRegistration,
    #[error("identifier is already used by another account")]
    IdentifierInUse,
    #[error("no account exists for this identifier")]
    IdentifierNotFound,
    #[error("no pending code for this identifier")]
    NoPendingCode,
    #[error("code has already been used")]
    CodeAlreadyUsed,
    #[error("verify a code before performing this action")]
    VerificationRequired,
    #[error("this registration flow is disabled")]
    RegistrationDisabled,
    #[error("code has expired, request a new one")]
    CodeExpired,
    #[error("too many failed attempts, request a new code")]
    TooManyAttempts,
    #[error("code does not match")]
    CodeMismatch,
    #[error("invalid identifier or credential secret")]
    InvalidCredentials,
    #[error("authentication required")]
    SessionRequired,
    #[error("session has expired")]
    SessionExpired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Stable machine-readable code for the wire envelope.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidIdentifier => "InvalidIdentifier",
            Self::InvalidPurpose => "InvalidPurpose",
            Self::InvalidCode => "InvalidCode",
            Self::InvalidCredentialSecret { .. } => "InvalidCredentialSecret",
            Self::InvalidDisplayName => "InvalidDisplayName",
            Self::InvalidPayload(_) => "InvalidPayload",
            Self::DuplicateRegistration => "DuplicateRegistration",
            Self::IdentifierInUse => "IdentifierInUse",
            Self::IdentifierNotFound => "IdentifierNotFound",
            Self::NoPendingCode => "NoPendingCode",
            Self::CodeAlreadyUsed => "CodeAlreadyUsed",
            Self::VerificationRequired => "VerificationRequired",
            Self::RegistrationDisabled => "RegistrationDisabled",
            Self::CodeExpired => "CodeExpired",
            Self::TooManyAttempts => "TooManyAttempts",
            Self::CodeMismatch => "CodeMismatch",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::SessionRequired => "SessionRequired",
            Self::SessionExpired => "SessionExpired",
            Self::Internal(_) => "Internal",
        }
    }

    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidIdentifier
            | Self::InvalidPurpose
            | Self::InvalidCode
            | Self::InvalidCredentialSecret { .. }
            | Self::InvalidDisplayName
            | Self::InvalidPayload(_) => ErrorCategory::Validation,
            Self::DuplicateRegistration
            | Self::IdentifierInUse
            | Self::NoPendingCode
            | Self::CodeAlreadyUsed
            | Self::VerificationRequired
            | Self::RegistrationDisabled => ErrorCategory::State,
            Self::IdentifierNotFound => ErrorCategory::NotFound,
            Self::CodeExpired | Self::TooManyAttempts => ErrorCategory::Expiry,
            Self::CodeMismatch => ErrorCategory::Mismatch,
            Self::InvalidCredentials | Self::SessionRequired | Self::SessionExpired => {
                ErrorCategory::Auth
            }
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::RegistrationDisabled => StatusCode::FORBIDDEN,
            _ => match self.category() {
                ErrorCategory::Validation
                | ErrorCategory::State
                | ErrorCategory::Expiry
                | ErrorCategory::Mismatch => StatusCode::BAD_REQUEST,
                ErrorCategory::Auth => StatusCode::UNAUTHORIZED,
                ErrorCategory::NotFound => StatusCode::NOT_FOUND,
                ErrorCategory::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}
