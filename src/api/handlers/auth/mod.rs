//! Unauthenticated account endpoints: codes, registration, login, reset.
//!
//! ## Flows
//!
//! - **Register:** `send-otp` (Register) -> `verify-otp` -> `register`.
//!   `register-simple` skips the code; the registration mode decides which of
//!   the two is served.
//! - **Forgot password:** `send-otp` (ForgotPassword) -> `verify-otp` ->
//!   `reset-password`. A reset revokes every session of the account.
//!
//! A verified code authorizes exactly one action and only within the verified
//! window (15 minutes by default).

pub mod login;
pub mod otp;
pub mod password;
pub mod register;
mod state;

pub use state::{AuthComponents, AuthConfig, AuthState};
