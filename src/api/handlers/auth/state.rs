//! Auth state and configuration shared by every handler.

use std::sync::Arc;
use std::time::Duration;

use crate::{
    account::{
        session::DEFAULT_SESSION_TTL_SECONDS, AccountStore, AccountWorkflow, Argon2Hasher,
        CredentialHasher, MemoryAccountStore, RegistrationMode, SessionStore,
    },
    clock::{Clock, SystemClock},
    otp::{
        CodeGenerator, LogNotifier, MemoryOtpStore, Notifier, OtpConfig, OtpRegistry,
        RandomCodeGenerator,
    },
};

const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 60;

#[derive(Clone, Copy, Debug)]
pub struct AuthConfig {
    otp: OtpConfig,
    reaper_interval_seconds: u64,
    session_ttl_seconds: i64,
    registration_mode: RegistrationMode,
}

impl AuthConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            otp: OtpConfig::new(),
            reaper_interval_seconds: DEFAULT_REAPER_INTERVAL_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            registration_mode: RegistrationMode::default(),
        }
    }

    #[must_use]
    pub fn with_otp(mut self, otp: OtpConfig) -> Self {
        self.otp = otp;
        self
    }

    /// `0` disables the background reaper.
    #[must_use]
    pub fn with_reaper_interval_seconds(mut self, seconds: u64) -> Self {
        self.reaper_interval_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_registration_mode(mut self, mode: RegistrationMode) -> Self {
        self.registration_mode = mode;
        self
    }

    #[must_use]
    pub fn otp(&self) -> OtpConfig {
        self.otp
    }

    #[must_use]
    pub fn reaper_interval(&self) -> Option<Duration> {
        (self.reaper_interval_seconds > 0)
            .then(|| Duration::from_secs(self.reaper_interval_seconds))
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub fn registration_mode(&self) -> RegistrationMode {
        self.registration_mode
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Replaceable collaborators. Defaults suit a local dev server.
#[derive(Clone)]
pub struct AuthComponents {
    notifier: Arc<dyn Notifier>,
    codes: Arc<dyn CodeGenerator>,
    clock: Arc<dyn Clock>,
    hasher: Arc<dyn CredentialHasher>,
}

impl AuthComponents {
    #[must_use]
    pub fn new() -> Self {
        Self {
            notifier: Arc::new(LogNotifier),
            codes: Arc::new(RandomCodeGenerator),
            clock: Arc::new(SystemClock),
            hasher: Arc::new(Argon2Hasher::new()),
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_code_generator(mut self, codes: Arc<dyn CodeGenerator>) -> Self {
        self.codes = codes;
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_hasher(mut self, hasher: Arc<dyn CredentialHasher>) -> Self {
        self.hasher = hasher;
        self
    }
}

impl Default for AuthComponents {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AuthState {
    config: AuthConfig,
    workflow: AccountWorkflow,
}

impl AuthState {
    /// Wire in-memory stores with the given collaborators.
    #[must_use]
    pub fn new(config: AuthConfig, components: AuthComponents) -> Self {
        let AuthComponents {
            notifier,
            codes,
            clock,
            hasher,
        } = components;

        let accounts: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
        let registry = Arc::new(OtpRegistry::new(
            config.otp(),
            Arc::new(MemoryOtpStore::new()),
            Arc::clone(&accounts),
            codes,
            notifier,
            Arc::clone(&clock),
        ));
        let sessions = Arc::new(SessionStore::new(
            config.session_ttl_seconds(),
            Arc::clone(&clock),
        ));
        let workflow = AccountWorkflow::new(
            registry,
            accounts,
            hasher,
            sessions,
            clock,
            config.registration_mode(),
        );

        Self { config, workflow }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn workflow(&self) -> &AccountWorkflow {
        &self.workflow
    }
}
