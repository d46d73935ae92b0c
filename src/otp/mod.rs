//! One-time code issuance and verification.
//!
//! There is at most one outstanding record per normalized identifier. A
//! record moves through: issued -> verified (`consumed`) -> spent (deleted by
//! the workflow step it authorizes). Expired or exhausted records are
//! removed lazily on access and periodically by the reaper.

pub mod code;
pub mod identifier;
pub mod notify;
pub mod registry;
pub mod store;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use crate::{clock::saturating_seconds, error::Error};
use identifier::IdentifierKind;

pub use code::{CodeGenerator, FixedCodeGenerator, RandomCodeGenerator};
pub use notify::{
    spawn_outbox, LogNotifier, Notifier, NotifyWorkerConfig, OtpMessage, OutboxNotifier,
};
pub use registry::OtpRegistry;
pub use store::{MemoryOtpStore, OtpStore};

const DEFAULT_TTL_SECONDS: i64 = 300;
const DEFAULT_MAX_ATTEMPTS: u32 = 5;
const DEFAULT_VERIFIED_TTL_SECONDS: i64 = 900;

/// The operation a code authorizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Purpose {
    #[serde(alias = "register")]
    Register,
    #[serde(alias = "forgot-password")]
    ForgotPassword,
    #[serde(alias = "update-email")]
    UpdateEmail,
    #[serde(alias = "update-phone")]
    UpdatePhone,
}

impl Purpose {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Register => "Register",
            Self::ForgotPassword => "ForgotPassword",
            Self::UpdateEmail => "UpdateEmail",
            Self::UpdatePhone => "UpdatePhone",
        }
    }

    /// Whether an identifier of `kind` may receive a code for this purpose.
    #[must_use]
    pub const fn accepts(self, kind: IdentifierKind) -> bool {
        match self {
            Self::Register | Self::ForgotPassword => true,
            Self::UpdateEmail => matches!(kind, IdentifierKind::Email),
            Self::UpdatePhone => matches!(kind, IdentifierKind::Phone),
        }
    }

    /// Purposes that can be requested without a session.
    #[must_use]
    pub const fn is_public(self) -> bool {
        matches!(self, Self::Register | Self::ForgotPassword)
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Purpose {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Register" | "register" => Ok(Self::Register),
            "ForgotPassword" | "forgot-password" => Ok(Self::ForgotPassword),
            "UpdateEmail" | "update-email" => Ok(Self::UpdateEmail),
            "UpdatePhone" | "update-phone" => Ok(Self::UpdatePhone),
            _ => Err(Error::InvalidPurpose),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpRecord {
    pub identifier: String,
    pub code: String,
    pub purpose: Purpose,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// Set once the code was verified; the record then authorizes one action.
    pub consumed: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub attempt_count: u32,
}

impl OtpRecord {
    /// Expiry is exclusive: the record is still valid at exactly `expires_at`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    #[must_use]
    pub fn verification_valid(&self, now: DateTime<Utc>, verified_ttl: Duration) -> bool {
        // A window reaching past the representable range never lapses.
        self.consumed
            && self.verified_at.is_some_and(|at| {
                at.checked_add_signed(verified_ttl)
                    .map_or(true, |until| now <= until)
            })
    }

    /// Whether the reaper may drop this record.
    #[must_use]
    pub fn is_stale(&self, now: DateTime<Utc>, verified_ttl: Duration) -> bool {
        if self.consumed {
            !self.verification_valid(now, verified_ttl)
        } else {
            self.is_expired(now)
        }
    }
}

/// Result of a successful issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssuedCode {
    pub expires_at: DateTime<Utc>,
    pub expires_in: u64,
}

#[derive(Clone, Copy, Debug)]
pub struct OtpConfig {
    ttl_seconds: i64,
    max_attempts: u32,
    verified_ttl_seconds: i64,
}

impl OtpConfig {
    /// Default config: 300s code TTL, 5 attempts, 900s verified window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl_seconds: DEFAULT_TTL_SECONDS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            verified_ttl_seconds: DEFAULT_VERIFIED_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// `0` disables the attempt cap.
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_verified_ttl_seconds(mut self, seconds: i64) -> Self {
        self.verified_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        saturating_seconds(self.ttl_seconds)
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn verified_ttl(&self) -> Duration {
        saturating_seconds(self.verified_ttl_seconds)
    }
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self::new()
    }
}
