//! Multi-step flows driven against the account API.
//!
//! A flow's step is presentation state: it only moves when the server answers,
//! and only [`OtpFlow::back_to_identifier`] (or its contact counterpart) moves
//! it backwards. Each step admits one request at a time; a second concurrent
//! submission fails with [`ClientError::Busy`].

use secrecy::SecretString;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex, MutexGuard, PoisonError,
    },
    time::Duration,
};
use tokio::time::Instant;
use tracing::debug;

use super::{api::ApiClient, error::ClientError, session_cache::SessionStorage};
use crate::{
    account::{AccountView, ContactKind},
    api::types::RegisterRequest,
    otp::Purpose,
};

type Result<T> = std::result::Result<T, ClientError>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowStep {
    Identifier,
    Code,
    Credential,
    Complete,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlowKind {
    Register,
    ForgotPassword,
}

impl FlowKind {
    #[must_use]
    pub const fn purpose(self) -> Purpose {
        match self {
            Self::Register => Purpose::Register,
            Self::ForgotPassword => Purpose::ForgotPassword,
        }
    }
}

/// Time left on an issued code, started from the server's `expiresIn`.
#[derive(Clone, Copy, Debug)]
pub struct Countdown {
    started: Instant,
    total: Duration,
}

impl Countdown {
    #[must_use]
    pub fn start(expires_in_seconds: u64) -> Self {
        Self {
            started: Instant::now(),
            total: Duration::from_secs(expires_in_seconds),
        }
    }

    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.total.saturating_sub(self.started.elapsed())
    }

    #[must_use]
    pub fn seconds_left(&self) -> u64 {
        self.remaining().as_secs()
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }
}

#[derive(Debug)]
struct FlowState {
    step: FlowStep,
    target: String,
    code: String,
    countdown: Option<Countdown>,
    verified: Option<Purpose>,
}

impl FlowState {
    fn reset(&mut self) {
        self.step = FlowStep::Identifier;
        self.code.clear();
        self.countdown = None;
        self.verified = None;
    }
}

/// Clears the in-flight flag when the request finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
struct FlowCore {
    state: Mutex<FlowState>,
    in_flight: AtomicBool,
}

impl FlowCore {
    fn new() -> Self {
        Self {
            state: Mutex::new(FlowState {
                step: FlowStep::Identifier,
                target: String::new(),
                code: String::new(),
                countdown: None,
                verified: None,
            }),
            in_flight: AtomicBool::new(false),
        }
    }

    fn state(&self) -> MutexGuard<'_, FlowState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim the step for one request. The state lock is never held across
    /// an await.
    fn begin(&self, expected: FlowStep) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        let guard = InFlight(&self.in_flight);

        let step = self.state().step;
        if step == expected {
            Ok(guard)
        } else {
            Err(ClientError::InvalidStep(step))
        }
    }

    fn target(&self) -> String {
        self.state().target.clone()
    }

    fn code_sent(&self, target: &str, expires_in: u64) {
        let mut state = self.state();
        state.target = target.to_string();
        state.code.clear();
        state.verified = None;
        state.countdown = Some(Countdown::start(expires_in));
        state.step = FlowStep::Code;
    }
}

/// Register or forgot-password flow: identifier, code, credential, done.
#[derive(Debug)]
pub struct OtpFlow {
    api: ApiClient,
    kind: FlowKind,
    core: FlowCore,
}

impl OtpFlow {
    #[must_use]
    pub fn new(api: ApiClient, kind: FlowKind) -> Self {
        Self {
            api,
            kind,
            core: FlowCore::new(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> FlowKind {
        self.kind
    }

    #[must_use]
    pub fn step(&self) -> FlowStep {
        self.core.state().step
    }

    #[must_use]
    pub fn identifier(&self) -> String {
        self.core.target()
    }

    /// The code as last entered; cleared after a rejected attempt.
    #[must_use]
    pub fn entered_code(&self) -> String {
        self.core.state().code.clone()
    }

    #[must_use]
    pub fn countdown(&self) -> Option<Countdown> {
        self.core.state().countdown
    }

    /// Purpose reported by the server for the verified code.
    #[must_use]
    pub fn verified_purpose(&self) -> Option<Purpose> {
        self.core.state().verified
    }

    /// Ask the server for a code and move to the code step.
    ///
    /// # Errors
    /// `InvalidStep` outside the identifier step, `Busy` while another request
    /// runs, or the server/transport error.
    pub async fn send_code(&self, identifier: &str) -> Result<Countdown> {
        let _guard = self.core.begin(FlowStep::Identifier)?;
        let sent = self.api.send_otp(identifier, self.kind.purpose()).await?;
        self.core.code_sent(identifier, sent.expires_in);
        Ok(Countdown::start(sent.expires_in))
    }

    /// Issue a fresh code for the same identifier and restart the countdown.
    ///
    /// # Errors
    /// `InvalidStep` outside the code step, `Busy`, or the server error.
    pub async fn resend(&self) -> Result<Countdown> {
        let _guard = self.core.begin(FlowStep::Code)?;
        let identifier = self.core.target();
        let sent = self.api.send_otp(&identifier, self.kind.purpose()).await?;
        self.core.code_sent(&identifier, sent.expires_in);
        Ok(Countdown::start(sent.expires_in))
    }

    /// Verify the entered code. On failure the code is cleared and the flow
    /// stays on the code step.
    ///
    /// # Errors
    /// `InvalidStep` outside the code step, `Busy`, or the server error.
    pub async fn submit_code(&self, code: &str) -> Result<Purpose> {
        let _guard = self.core.begin(FlowStep::Code)?;
        let identifier = {
            let mut state = self.core.state();
            state.code = code.to_string();
            state.target.clone()
        };

        match self.api.verify_otp(&identifier, code).await {
            Ok(verified) => {
                let mut state = self.core.state();
                state.verified = Some(verified.purpose);
                state.step = FlowStep::Credential;
                Ok(verified.purpose)
            }
            Err(err) => {
                debug!(error = %err, "code rejected");
                self.core.state().code.clear();
                Err(err)
            }
        }
    }

    /// Create the account for the verified identifier.
    ///
    /// # Errors
    /// `InvalidStep` unless a `Register` code was verified, `Busy`, or the
    /// server error.
    pub async fn finish_registration(
        &self,
        secret: SecretString,
        display_name: &str,
        contact_phone: Option<&str>,
    ) -> Result<AccountView> {
        let _guard = self.core.begin(FlowStep::Credential)?;
        let identifier = self.verified_target(Purpose::Register)?;

        let request = RegisterRequest {
            identifier,
            credential_secret: secret,
            display_name: display_name.to_string(),
            contact_phone: contact_phone.map(str::to_string),
        };
        let created = self.api.register(&request).await?;
        self.core.state().step = FlowStep::Complete;
        Ok(created.user)
    }

    /// Set a new credential secret for the verified identifier.
    ///
    /// # Errors
    /// `InvalidStep` unless a `ForgotPassword` code was verified, `Busy`, or
    /// the server error.
    pub async fn finish_reset(&self, new_secret: &SecretString) -> Result<()> {
        let _guard = self.core.begin(FlowStep::Credential)?;
        let identifier = self.verified_target(Purpose::ForgotPassword)?;

        self.api.reset_password(&identifier, new_secret).await?;
        self.core.state().step = FlowStep::Complete;
        Ok(())
    }

    /// Start over with a different identifier.
    pub fn back_to_identifier(&self) {
        self.core.state().reset();
    }

    fn verified_target(&self, purpose: Purpose) -> Result<String> {
        let state = self.core.state();
        if state.verified == Some(purpose) {
            Ok(state.target.clone())
        } else {
            Err(ClientError::InvalidStep(state.step))
        }
    }
}

/// Change the login email or the contact phone of the signed-in account.
#[derive(Debug)]
pub struct ContactUpdateFlow {
    api: ApiClient,
    kind: ContactKind,
    core: FlowCore,
}

impl ContactUpdateFlow {
    #[must_use]
    pub fn new(api: ApiClient, kind: ContactKind) -> Self {
        Self {
            api,
            kind,
            core: FlowCore::new(),
        }
    }

    #[must_use]
    pub fn step(&self) -> FlowStep {
        self.core.state().step
    }

    #[must_use]
    pub fn new_value(&self) -> String {
        self.core.target()
    }

    #[must_use]
    pub fn entered_code(&self) -> String {
        self.core.state().code.clone()
    }

    #[must_use]
    pub fn countdown(&self) -> Option<Countdown> {
        self.core.state().countdown
    }

    /// # Errors
    /// `InvalidStep` outside the identifier step, `Busy`, or the server error.
    pub async fn request(&self, new_value: &str) -> Result<Countdown> {
        let _guard = self.core.begin(FlowStep::Identifier)?;
        let sent = self.api.request_contact_update(self.kind, new_value).await?;
        self.core.code_sent(new_value, sent.expires_in);
        Ok(Countdown::start(sent.expires_in))
    }

    /// # Errors
    /// `InvalidStep` outside the code step, `Busy`, or the server error.
    pub async fn resend(&self) -> Result<Countdown> {
        let _guard = self.core.begin(FlowStep::Code)?;
        let new_value = self.core.target();
        let sent = self
            .api
            .request_contact_update(self.kind, &new_value)
            .await?;
        self.core.code_sent(&new_value, sent.expires_in);
        Ok(Countdown::start(sent.expires_in))
    }

    /// Verify the code; success applies the change and completes the flow.
    ///
    /// # Errors
    /// `InvalidStep` outside the code step, `Busy`, or the server error.
    pub async fn submit_code(&self, code: &str) -> Result<AccountView> {
        let _guard = self.core.begin(FlowStep::Code)?;
        let new_value = {
            let mut state = self.core.state();
            state.code = code.to_string();
            state.target.clone()
        };

        match self
            .api
            .verify_contact_update(self.kind, &new_value, code)
            .await
        {
            Ok(updated) => {
                let mut state = self.core.state();
                state.verified = Some(self.kind.purpose());
                state.step = FlowStep::Complete;
                Ok(updated.user)
            }
            Err(err) => {
                self.core.state().code.clear();
                Err(err)
            }
        }
    }

    pub fn back_to_identifier(&self) {
        self.core.state().reset();
    }
}

/// Login and logout, persisting `{token, user}` through a [`SessionStorage`].
#[derive(Debug)]
pub struct LoginFlow {
    api: ApiClient,
    storage: SessionStorage,
    in_flight: AtomicBool,
}

impl LoginFlow {
    #[must_use]
    pub fn new(api: ApiClient, storage: SessionStorage) -> Self {
        Self {
            api,
            storage,
            in_flight: AtomicBool::new(false),
        }
    }

    fn claim(&self) -> Result<InFlight<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ClientError::Busy)?;
        Ok(InFlight(&self.in_flight))
    }

    /// # Errors
    /// `Busy`, the server error, or a storage failure.
    pub async fn login(&self, identifier: &str, secret: &SecretString) -> Result<AccountView> {
        let _guard = self.claim()?;
        let response = self.api.login(identifier, secret).await?;
        self.storage.save_auth(&response.token, &response.user)?;
        Ok(response.user)
    }

    /// Reuse a persisted session. Returns whether one was found.
    ///
    /// # Errors
    /// Returns a storage failure.
    pub fn restore(&self) -> Result<bool> {
        if !self.storage.is_logged_in()? {
            return Ok(false);
        }
        self.api.set_token(self.storage.token()?);
        Ok(true)
    }

    /// Revoke the session server-side and clear local storage. Local state is
    /// cleared even when the server call fails.
    ///
    /// # Errors
    /// `Busy`, or the first of the server and storage errors.
    pub async fn logout(&self) -> Result<()> {
        let _guard = self.claim()?;
        let remote = self.api.logout().await;
        self.storage.clear()?;
        remote.map(|_| ())
    }

    /// # Errors
    /// Returns a storage failure.
    pub fn is_logged_in(&self) -> Result<bool> {
        self.storage.is_logged_in()
    }
}
