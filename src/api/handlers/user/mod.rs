//! Session-guarded account endpoints.
//!
//! Contact changes are two-step: `request-update-*` sends a code to the new
//! value, `verify-update-*` checks it and applies the change.

pub mod contact;
pub mod profile;
