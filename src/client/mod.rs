//! Client side of the account API.
//!
//! [`ApiClient`] wraps the HTTP endpoints. The flows in [`flow`] drive the
//! multi-step exchanges (send a code, verify it, finish the gated action) and
//! only advance on server answers. [`SessionStorage`] persists the login.

pub mod api;
pub mod error;
pub mod flow;
pub mod session_cache;

pub use api::{ApiClient, DEFAULT_TIMEOUT};
pub use error::{ClientCategory, ClientError};
pub use flow::{ContactUpdateFlow, Countdown, FlowKind, FlowStep, LoginFlow, OtpFlow};
pub use session_cache::{FileSessionCache, MemorySessionCache, SessionCache, SessionStorage};
