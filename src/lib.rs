//! # otpgate (OTP-gated account service)
//!
//! `otpgate` is a small account backend whose mutations are gated by
//! short-lived, purpose-scoped one-time codes, plus a client library that
//! drives the multi-step flows against it.
//!
//! ## One-Time Codes
//!
//! A code is issued for an identifier (email or phone) and a purpose
//! (`Register`, `ForgotPassword`, `UpdateEmail`, `UpdatePhone`).
//!
//! - **Single live record:** issuing again for the same identifier replaces the
//!   previous record, so an older code stops working immediately.
//! - **Lazy expiry:** codes are valid for 5 minutes; expiry is checked at verify
//!   time and expired records are dropped. A background reaper bounds memory
//!   for codes and sessions alike.
//! - **Consumption:** a successful verify marks the record consumed. The gated
//!   action (register, reset, contact update) then consumes it exactly once.
//! - **Attempt cap:** wrong codes are counted; reaching the cap invalidates the
//!   record.
//!
//! ## Accounts and Sessions
//!
//! Credentials are stored as argon2 hashes. Login issues an opaque bearer token
//! whose SHA-256 hash is kept server-side; every account-mutation endpoint goes
//! through the same session guard.
//!
//! Storage is in-memory and behind the `OtpStore` / `AccountStore` traits.

pub mod account;
pub mod api;
pub mod cli;
pub mod client;
pub mod clock;
pub mod error;
pub mod otp;
pub mod reaper;

pub use error::{Error, ErrorCategory};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
