//! Account workflows gated by the OTP registry.
//!
//! Mutations that depend on a check (identifier free, code verified) run under
//! one async gate so the check and the write are a single step.

use anyhow::{anyhow, Context};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::{
    Account, AccountStore, ContactKind, CredentialHasher, NewAccount, SessionStore, StoreError,
    MIN_SECRET_LENGTH,
};
use crate::{
    clock::Clock,
    error::{Error, Result},
    otp::{
        identifier::{classify, normalize_identifier, normalize_phone, valid_phone},
        IssuedCode, OtpRegistry, Purpose,
    },
};

/// Which registration endpoints are served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationMode {
    #[default]
    Both,
    OtpOnly,
    SimpleOnly,
}

impl RegistrationMode {
    #[must_use]
    pub const fn allows_otp(self) -> bool {
        matches!(self, Self::Both | Self::OtpOnly)
    }

    #[must_use]
    pub const fn allows_simple(self) -> bool {
        matches!(self, Self::Both | Self::SimpleOnly)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Both => "both",
            Self::OtpOnly => "otp",
            Self::SimpleOnly => "simple",
        }
    }
}

impl fmt::Display for RegistrationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegistrationMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "both" => Ok(Self::Both),
            "otp" => Ok(Self::OtpOnly),
            "simple" => Ok(Self::SimpleOnly),
            other => Err(anyhow!("unknown registration mode: {other}")),
        }
    }
}

#[derive(Debug)]
pub struct Registration {
    pub identifier: String,
    pub secret: SecretString,
    pub display_name: String,
    pub contact_phone: Option<String>,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub account: Account,
    pub token: String,
}

pub struct AccountWorkflow {
    registry: Arc<OtpRegistry>,
    accounts: Arc<dyn AccountStore>,
    credentials: Arc<dyn CredentialHasher>,
    sessions: Arc<SessionStore>,
    clock: Arc<dyn Clock>,
    mode: RegistrationMode,
    gate: Mutex<()>,
}

impl AccountWorkflow {
    #[must_use]
    pub fn new(
        registry: Arc<OtpRegistry>,
        accounts: Arc<dyn AccountStore>,
        credentials: Arc<dyn CredentialHasher>,
        sessions: Arc<SessionStore>,
        clock: Arc<dyn Clock>,
        mode: RegistrationMode,
    ) -> Self {
        Self {
            registry,
            accounts,
            credentials,
            sessions,
            clock,
            mode,
            gate: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<OtpRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    #[must_use]
    pub fn mode(&self) -> RegistrationMode {
        self.mode
    }

    #[must_use]
    pub fn account_count(&self) -> usize {
        self.accounts.count()
    }

    /// Issue a code for an unauthenticated flow.
    ///
    /// # Errors
    /// `InvalidPurpose` for contact-update purposes, which need a session,
    /// plus anything [`OtpRegistry::issue`] returns.
    pub fn send_otp(&self, identifier: &str, purpose: Purpose) -> Result<IssuedCode> {
        if !purpose.is_public() {
            return Err(Error::InvalidPurpose);
        }
        if purpose == Purpose::Register && !self.mode.allows_otp() {
            return Err(Error::RegistrationDisabled);
        }
        self.registry.issue(identifier, purpose)
    }

    /// # Errors
    /// See [`OtpRegistry::verify`].
    pub fn verify_otp(&self, identifier: &str, code: &str) -> Result<Purpose> {
        self.registry.verify(identifier, code)
    }

    /// Create an account after the identifier was verified with a
    /// `Register` code.
    ///
    /// # Errors
    /// Validation errors, `DuplicateRegistration`, `VerificationRequired`,
    /// or `RegistrationDisabled` when OTP registration is off.
    #[instrument(skip_all)]
    pub async fn register(&self, registration: Registration) -> Result<Account> {
        if !self.mode.allows_otp() {
            return Err(Error::RegistrationDisabled);
        }
        let candidate = self.prepare(registration).await?;

        let _gate = self.gate.lock().await;
        if self
            .accounts
            .find_by_identifier(&candidate.identifier)
            .is_some()
        {
            return Err(Error::DuplicateRegistration);
        }
        if !self
            .registry
            .consume(&candidate.identifier, Purpose::Register)
        {
            return Err(Error::VerificationRequired);
        }
        self.create(candidate)
    }

    /// Create an account without an OTP step.
    ///
    /// # Errors
    /// Validation errors, `DuplicateRegistration`, or `RegistrationDisabled`.
    #[instrument(skip_all)]
    pub async fn register_simple(&self, registration: Registration) -> Result<Account> {
        if !self.mode.allows_simple() {
            return Err(Error::RegistrationDisabled);
        }
        let candidate = self.prepare(registration).await?;

        let _gate = self.gate.lock().await;
        self.create(candidate)
    }

    /// # Errors
    /// `InvalidCredentials` for an unknown identifier or a wrong secret.
    #[instrument(skip_all)]
    pub async fn login(&self, identifier: &str, secret: &SecretString) -> Result<LoginOutcome> {
        let identifier = normalize_identifier(identifier);
        let Some(account) = self.accounts.find_by_identifier(&identifier) else {
            return Err(Error::InvalidCredentials);
        };
        if !self.check_secret(secret, &account.credential_hash).await? {
            return Err(Error::InvalidCredentials);
        }
        let token = self.sessions.issue(account.id)?;
        info!(account_id = account.id, "login succeeded");
        Ok(LoginOutcome { account, token })
    }

    pub fn logout(&self, token: &str) -> bool {
        self.sessions.revoke(token)
    }

    /// Resolve a bearer token to its account.
    ///
    /// # Errors
    /// `SessionRequired` or `SessionExpired`.
    pub fn authenticate(&self, token: &str) -> Result<Account> {
        let session = self.sessions.resolve(token)?;
        self.accounts
            .find_by_id(session.account_id)
            .ok_or(Error::SessionRequired)
    }

    /// Replace the credential after a verified `ForgotPassword` code, then
    /// revoke every session of the account.
    ///
    /// # Errors
    /// Validation errors, `IdentifierNotFound`, or `VerificationRequired`.
    #[instrument(skip_all)]
    pub async fn reset_password(&self, identifier: &str, new_secret: &SecretString) -> Result<()> {
        let identifier = normalize_identifier(identifier);
        validate_secret(new_secret)?;
        let credential_hash = self.hash_secret(new_secret).await?;

        let _gate = self.gate.lock().await;
        let mut account = self
            .accounts
            .find_by_identifier(&identifier)
            .ok_or(Error::IdentifierNotFound)?;
        if !self.registry.consume(&identifier, Purpose::ForgotPassword) {
            return Err(Error::VerificationRequired);
        }
        account.credential_hash = credential_hash;
        let account = self.save(account)?;
        let revoked = self.sessions.revoke_account(account.id);
        info!(account_id = account.id, revoked, "credential reset");
        Ok(())
    }

    /// # Errors
    /// `SessionRequired` when the account no longer exists.
    pub fn profile(&self, account_id: u64) -> Result<Account> {
        self.accounts
            .find_by_id(account_id)
            .ok_or(Error::SessionRequired)
    }

    /// # Errors
    /// `InvalidDisplayName` for a blank name.
    pub async fn update_profile(&self, account_id: u64, display_name: &str) -> Result<Account> {
        let display_name = validate_display_name(display_name)?;

        let _gate = self.gate.lock().await;
        let mut account = self.profile(account_id)?;
        account.display_name = display_name;
        self.save(account)
    }

    /// # Errors
    /// `InvalidCredentials` when `current` is wrong; validation errors for `new`.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        account_id: u64,
        current: &SecretString,
        new: &SecretString,
    ) -> Result<()> {
        validate_secret(new)?;
        let account = self.profile(account_id)?;
        if !self.check_secret(current, &account.credential_hash).await? {
            return Err(Error::InvalidCredentials);
        }
        let credential_hash = self.hash_secret(new).await?;

        let _gate = self.gate.lock().await;
        let mut account = self.profile(account_id)?;
        account.credential_hash = credential_hash;
        self.save(account)?;
        info!(account_id, "credential changed");
        Ok(())
    }

    /// Send a code to the new contact value. The code is bound to that value,
    /// not to the account's current identifier.
    ///
    /// # Errors
    /// `InvalidIdentifier` when the value does not fit `kind`,
    /// `IdentifierInUse` for an email owned by an account.
    pub fn request_contact_update(
        &self,
        account_id: u64,
        kind: ContactKind,
        new_value: &str,
    ) -> Result<IssuedCode> {
        self.profile(account_id)?;
        self.registry.issue(new_value, kind.purpose())
    }

    /// Verify the code sent to `new_value` and apply the change.
    ///
    /// # Errors
    /// Any verify failure, `VerificationRequired` when the code was issued for
    /// another purpose, or `IdentifierInUse` when the email got taken meanwhile.
    #[instrument(skip_all, fields(kind = kind.as_str()))]
    pub async fn confirm_contact_update(
        &self,
        account_id: u64,
        kind: ContactKind,
        new_value: &str,
        code: &str,
    ) -> Result<Account> {
        let purpose = self.registry.verify_for(new_value, code, kind.purpose())?;
        let value = normalize_identifier(new_value);

        let _gate = self.gate.lock().await;
        let mut account = self.profile(account_id)?;
        if kind == ContactKind::Email
            && self
                .accounts
                .find_by_identifier(&value)
                .is_some_and(|owner| owner.id != account.id)
        {
            return Err(Error::IdentifierInUse);
        }
        if !self.registry.consume(&value, purpose) {
            return Err(Error::VerificationRequired);
        }
        match kind {
            ContactKind::Email => account.identifier = value,
            ContactKind::Phone => account.contact_phone = value,
        }
        let account = self.save(account)?;
        info!(account_id, "contact updated");
        Ok(account)
    }

    async fn prepare(&self, registration: Registration) -> Result<NewAccount> {
        let identifier = normalize_identifier(&registration.identifier);
        classify(&identifier).ok_or(Error::InvalidIdentifier)?;
        validate_secret(&registration.secret)?;
        let display_name = validate_display_name(&registration.display_name)?;
        let contact_phone = match registration.contact_phone.as_deref().map(str::trim) {
            None | Some("") => String::new(),
            Some(raw) => {
                let phone = normalize_phone(raw);
                if !valid_phone(&phone) {
                    return Err(Error::InvalidIdentifier);
                }
                phone
            }
        };
        let credential_hash = self.hash_secret(&registration.secret).await?;
        Ok(NewAccount {
            identifier,
            credential_hash,
            display_name,
            contact_phone,
            created_at: self.clock.now(),
        })
    }

    fn create(&self, candidate: NewAccount) -> Result<Account> {
        let account = self.accounts.insert(candidate).map_err(|err| match err {
            StoreError::Duplicate => Error::DuplicateRegistration,
            StoreError::NotFound => Error::Internal(anyhow!(err)),
        })?;
        info!(account_id = account.id, "account created");
        Ok(account)
    }

    fn save(&self, account: Account) -> Result<Account> {
        self.accounts.update(account).map_err(|err| match err {
            StoreError::Duplicate => Error::IdentifierInUse,
            StoreError::NotFound => Error::SessionRequired,
        })
    }

    // Hashing is CPU bound; keep it off the async workers.
    async fn hash_secret(&self, secret: &SecretString) -> Result<String> {
        let hasher = Arc::clone(&self.credentials);
        let secret = SecretString::from(secret.expose_secret().to_owned());
        let hash = tokio::task::spawn_blocking(move || hasher.hash(secret.expose_secret()))
            .await
            .context("credential hashing task failed")??;
        Ok(hash)
    }

    async fn check_secret(&self, secret: &SecretString, stored: &str) -> Result<bool> {
        let hasher = Arc::clone(&self.credentials);
        let secret = SecretString::from(secret.expose_secret().to_owned());
        let stored = stored.to_owned();
        let matches = tokio::task::spawn_blocking(move || {
            hasher.verify_credential(secret.expose_secret(), &stored)
        })
        .await
        .context("credential verification task failed")??;
        Ok(matches)
    }
}

fn validate_secret(secret: &SecretString) -> Result<()> {
    if secret.expose_secret().chars().count() < MIN_SECRET_LENGTH {
        return Err(Error::InvalidCredentialSecret {
            min: MIN_SECRET_LENGTH,
        });
    }
    Ok(())
}

fn validate_display_name(display_name: &str) -> Result<String> {
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidDisplayName);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{credential::fast_hasher, MemoryAccountStore};
    use crate::clock::ManualClock;
    use crate::otp::{FixedCodeGenerator, LogNotifier, MemoryOtpStore, OtpConfig};
    use chrono::Duration;

    const CODE: &str = "482913";

    struct Fixture {
        workflow: AccountWorkflow,
        clock: Arc<ManualClock>,
    }

    fn fixture_with(mode: RegistrationMode) -> Fixture {
        let clock = Arc::new(ManualClock::default());
        let accounts: Arc<dyn AccountStore> = Arc::new(MemoryAccountStore::new());
        let registry = Arc::new(OtpRegistry::new(
            OtpConfig::new(),
            Arc::new(MemoryOtpStore::new()),
            accounts.clone(),
            Arc::new(FixedCodeGenerator::new(CODE)),
            Arc::new(LogNotifier),
            clock.clone(),
        ));
        let sessions = Arc::new(SessionStore::new(3_600, clock.clone()));
        let workflow = AccountWorkflow::new(
            registry,
            accounts,
            Arc::new(fast_hasher()),
            sessions,
            clock.clone(),
            mode,
        );
        Fixture { workflow, clock }
    }

    fn fixture() -> Fixture {
        fixture_with(RegistrationMode::Both)
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn registration(identifier: &str) -> Registration {
        Registration {
            identifier: identifier.to_string(),
            secret: secret("secret1"),
            display_name: "Alice".to_string(),
            contact_phone: None,
        }
    }

    async fn register_verified(f: &Fixture, identifier: &str) -> Result<Account> {
        f.workflow.send_otp(identifier, Purpose::Register)?;
        f.workflow.verify_otp(identifier, CODE)?;
        f.workflow.register(registration(identifier)).await
    }

    #[tokio::test]
    async fn register_after_verify() -> anyhow::Result<()> {
        let f = fixture();
        let issued = f.workflow.send_otp("a@x.com", Purpose::Register)?;
        assert_eq!(issued.expires_in, 300);
        assert_eq!(f.workflow.verify_otp("a@x.com", CODE)?, Purpose::Register);
        let account = f.workflow.register(registration("a@x.com")).await?;
        assert_eq!(account.id, 1);
        assert_eq!(account.identifier, "a@x.com");
        assert_ne!(account.credential_hash, "secret1");
        assert_eq!(f.workflow.registry().pending_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn register_without_verify_is_refused() -> anyhow::Result<()> {
        let f = fixture();
        f.workflow.send_otp("a@x.com", Purpose::Register)?;
        let result = f.workflow.register(registration("a@x.com")).await;
        assert!(matches!(result, Err(Error::VerificationRequired)));
        assert_eq!(f.workflow.account_count(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn register_consumes_the_verification_once() -> anyhow::Result<()> {
        let f = fixture();
        register_verified(&f, "a@x.com").await?;
        let again = f.workflow.register(registration("a@x.com")).await;
        assert!(matches!(again, Err(Error::DuplicateRegistration)));
        Ok(())
    }

    #[tokio::test]
    async fn register_validates_input_before_anything_else() -> anyhow::Result<()> {
        let f = fixture();
        f.workflow.send_otp("a@x.com", Purpose::Register)?;
        f.workflow.verify_otp("a@x.com", CODE)?;

        let mut short = registration("a@x.com");
        short.secret = secret("12345");
        assert!(matches!(
            f.workflow.register(short).await,
            Err(Error::InvalidCredentialSecret { min: 6 })
        ));

        let mut blank = registration("a@x.com");
        blank.display_name = "   ".to_string();
        assert!(matches!(
            f.workflow.register(blank).await,
            Err(Error::InvalidDisplayName)
        ));

        let mut bad_phone = registration("a@x.com");
        bad_phone.contact_phone = Some("call me".to_string());
        assert!(matches!(
            f.workflow.register(bad_phone).await,
            Err(Error::InvalidIdentifier)
        ));

        // The verification survived the rejected attempts.
        let mut ok = registration("a@x.com");
        ok.contact_phone = Some("+84 912 345 678".to_string());
        let account = f.workflow.register(ok).await?;
        assert_eq!(account.contact_phone, "+84912345678");
        Ok(())
    }

    #[tokio::test]
    async fn simple_registration_and_modes() -> anyhow::Result<()> {
        let f = fixture();
        let account = f.workflow.register_simple(registration("a@x.com")).await?;
        assert_eq!(account.id, 1);
        assert!(matches!(
            f.workflow.register_simple(registration("A@x.com")).await,
            Err(Error::DuplicateRegistration)
        ));

        let otp_only = fixture_with(RegistrationMode::OtpOnly);
        assert!(matches!(
            otp_only.workflow.register_simple(registration("a@x.com")).await,
            Err(Error::RegistrationDisabled)
        ));

        let simple_only = fixture_with(RegistrationMode::SimpleOnly);
        assert!(matches!(
            simple_only.workflow.send_otp("a@x.com", Purpose::Register),
            Err(Error::RegistrationDisabled)
        ));
        assert!(matches!(
            simple_only.workflow.register(registration("a@x.com")).await,
            Err(Error::RegistrationDisabled)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn send_otp_refuses_contact_purposes() {
        let f = fixture();
        assert!(matches!(
            f.workflow.send_otp("b@x.com", Purpose::UpdateEmail),
            Err(Error::InvalidPurpose)
        ));
    }

    #[tokio::test]
    async fn login_and_authenticate() -> anyhow::Result<()> {
        let f = fixture();
        register_verified(&f, "a@x.com").await?;

        assert!(matches!(
            f.workflow.login("a@x.com", &secret("wrong12")).await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            f.workflow.login("nobody@x.com", &secret("secret1")).await,
            Err(Error::InvalidCredentials)
        ));

        let outcome = f.workflow.login(" A@X.com", &secret("secret1")).await?;
        assert_eq!(outcome.account.id, 1);
        assert_eq!(f.workflow.authenticate(&outcome.token)?.id, 1);

        assert!(f.workflow.logout(&outcome.token));
        assert!(matches!(
            f.workflow.authenticate(&outcome.token),
            Err(Error::SessionRequired)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn sessions_expire() -> anyhow::Result<()> {
        let f = fixture();
        register_verified(&f, "a@x.com").await?;
        let outcome = f.workflow.login("a@x.com", &secret("secret1")).await?;
        f.clock.advance(Duration::seconds(3_601));
        assert!(matches!(
            f.workflow.authenticate(&outcome.token),
            Err(Error::SessionExpired)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_flow() -> anyhow::Result<()> {
        let f = fixture();
        register_verified(&f, "a@x.com").await?;
        let session = f.workflow.login("a@x.com", &secret("secret1")).await?;

        assert!(matches!(
            f.workflow
                .reset_password("a@x.com", &secret("newsecret"))
                .await,
            Err(Error::VerificationRequired)
        ));

        f.workflow.send_otp("a@x.com", Purpose::ForgotPassword)?;
        assert_eq!(
            f.workflow.verify_otp("a@x.com", CODE)?,
            Purpose::ForgotPassword
        );
        f.workflow
            .reset_password("a@x.com", &secret("newsecret"))
            .await?;

        assert!(matches!(
            f.workflow.authenticate(&session.token),
            Err(Error::SessionRequired)
        ));
        assert!(matches!(
            f.workflow.login("a@x.com", &secret("secret1")).await,
            Err(Error::InvalidCredentials)
        ));
        f.workflow.login("a@x.com", &secret("newsecret")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn reset_password_for_unknown_identifier() {
        let f = fixture();
        assert!(matches!(
            f.workflow.send_otp("nobody@x.com", Purpose::ForgotPassword),
            Err(Error::IdentifierNotFound)
        ));
        assert!(matches!(
            f.workflow
                .reset_password("nobody@x.com", &secret("newsecret"))
                .await,
            Err(Error::IdentifierNotFound)
        ));
    }

    #[tokio::test]
    async fn code_for_other_purpose_cannot_reset_password() -> anyhow::Result<()> {
        let f = fixture();
        f.workflow
            .register_simple(registration("0912345678"))
            .await?;
        let other = f.workflow.register_simple(registration("b@x.com")).await?;

        f.workflow
            .request_contact_update(other.id, ContactKind::Phone, "0912345678")?;
        assert_eq!(
            f.workflow.verify_otp("0912345678", CODE)?,
            Purpose::UpdatePhone
        );
        assert!(matches!(
            f.workflow
                .reset_password("0912345678", &secret("newsecret"))
                .await,
            Err(Error::VerificationRequired)
        ));
        f.workflow.login("0912345678", &secret("secret1")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn profile_update_and_password_change() -> anyhow::Result<()> {
        let f = fixture();
        let account = register_verified(&f, "a@x.com").await?;

        assert!(matches!(
            f.workflow.update_profile(account.id, " ").await,
            Err(Error::InvalidDisplayName)
        ));
        let updated = f.workflow.update_profile(account.id, " Alice B ").await?;
        assert_eq!(updated.display_name, "Alice B");
        assert_eq!(f.workflow.profile(account.id)?.display_name, "Alice B");

        assert!(matches!(
            f.workflow
                .change_password(account.id, &secret("wrong12"), &secret("newsecret"))
                .await,
            Err(Error::InvalidCredentials)
        ));
        assert!(matches!(
            f.workflow
                .change_password(account.id, &secret("secret1"), &secret("short"))
                .await,
            Err(Error::InvalidCredentialSecret { .. })
        ));
        f.workflow
            .change_password(account.id, &secret("secret1"), &secret("newsecret"))
            .await?;
        f.workflow.login("a@x.com", &secret("newsecret")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn contact_email_update_binds_code_to_new_value() -> anyhow::Result<()> {
        let f = fixture();
        let account = register_verified(&f, "a@x.com").await?;

        let issued = f
            .workflow
            .request_contact_update(account.id, ContactKind::Email, "B@x.com")?;
        assert_eq!(issued.expires_in, 300);
        assert!(f.workflow.registry().record("b@x.com").is_some());
        assert!(f.workflow.registry().record("a@x.com").is_none());

        assert!(matches!(
            f.workflow
                .confirm_contact_update(account.id, ContactKind::Email, "b@x.com", "000000")
                .await,
            Err(Error::CodeMismatch)
        ));
        let updated = f
            .workflow
            .confirm_contact_update(account.id, ContactKind::Email, "b@x.com", CODE)
            .await?;
        assert_eq!(updated.identifier, "b@x.com");
        f.workflow.login("b@x.com", &secret("secret1")).await?;
        assert!(matches!(
            f.workflow.login("a@x.com", &secret("secret1")).await,
            Err(Error::InvalidCredentials)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn contact_update_rejects_taken_or_mismatched_values() -> anyhow::Result<()> {
        let f = fixture();
        let account = register_verified(&f, "a@x.com").await?;
        f.workflow.register_simple(registration("b@x.com")).await?;

        assert!(matches!(
            f.workflow
                .request_contact_update(account.id, ContactKind::Email, "b@x.com"),
            Err(Error::IdentifierInUse)
        ));
        assert!(matches!(
            f.workflow
                .request_contact_update(account.id, ContactKind::Phone, "c@x.com"),
            Err(Error::InvalidIdentifier)
        ));

        // A register code for the value does not authorize a contact change.
        f.workflow.send_otp("c@x.com", Purpose::Register)?;
        assert!(matches!(
            f.workflow
                .confirm_contact_update(account.id, ContactKind::Email, "c@x.com", CODE)
                .await,
            Err(Error::VerificationRequired)
        ));
        assert_eq!(f.workflow.profile(account.id)?.identifier, "a@x.com");
        Ok(())
    }

    #[tokio::test]
    async fn rejected_contact_confirm_keeps_other_flow_intact() -> anyhow::Result<()> {
        let f = fixture();
        let account = register_verified(&f, "a@x.com").await?;
        f.workflow.send_otp("c@x.com", Purpose::Register)?;

        assert!(matches!(
            f.workflow
                .confirm_contact_update(account.id, ContactKind::Email, "c@x.com", CODE)
                .await,
            Err(Error::VerificationRequired)
        ));
        let record = f
            .workflow
            .registry()
            .record("c@x.com")
            .ok_or_else(|| anyhow::anyhow!("register code was dropped"))?;
        assert!(!record.consumed);
        assert_eq!(record.purpose, Purpose::Register);

        // The code alone authorizes nothing until its own flow verifies it.
        assert!(matches!(
            f.workflow.register(registration("c@x.com")).await,
            Err(Error::VerificationRequired)
        ));
        assert_eq!(f.workflow.verify_otp("c@x.com", CODE)?, Purpose::Register);
        f.workflow.register(registration("c@x.com")).await?;
        Ok(())
    }

    #[tokio::test]
    async fn contact_phone_update() -> anyhow::Result<()> {
        let f = fixture();
        let account = register_verified(&f, "a@x.com").await?;
        f.workflow
            .request_contact_update(account.id, ContactKind::Phone, "0912-345-678")?;
        let updated = f
            .workflow
            .confirm_contact_update(account.id, ContactKind::Phone, "0912345678", CODE)
            .await?;
        assert_eq!(updated.contact_phone, "0912345678");
        assert_eq!(updated.identifier, "a@x.com");
        Ok(())
    }

    #[test]
    fn registration_mode_parsing() -> anyhow::Result<()> {
        assert_eq!("both".parse::<RegistrationMode>()?, RegistrationMode::Both);
        assert_eq!("OTP".parse::<RegistrationMode>()?, RegistrationMode::OtpOnly);
        assert_eq!(
            "simple".parse::<RegistrationMode>()?,
            RegistrationMode::SimpleOnly
        );
        assert!("sometimes".parse::<RegistrationMode>().is_err());
        assert!(RegistrationMode::Both.allows_otp() && RegistrationMode::Both.allows_simple());
        Ok(())
    }
}
