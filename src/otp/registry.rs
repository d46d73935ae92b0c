//! OTP registry: issue, verify, consume.

use anyhow::anyhow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use super::{
    identifier::{classify, code_shaped, normalize_identifier},
    CodeGenerator, IssuedCode, Notifier, OtpConfig, OtpMessage, OtpRecord, OtpStore, Purpose,
};
use crate::{
    account::store::AccountStore,
    clock::Clock,
    error::{Error, Result},
};

pub struct OtpRegistry {
    config: OtpConfig,
    store: Arc<dyn OtpStore>,
    accounts: Arc<dyn AccountStore>,
    codes: Arc<dyn CodeGenerator>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    // Serializes read-modify-write sequences on the store.
    lock: Mutex<()>,
}

impl OtpRegistry {
    #[must_use]
    pub fn new(
        config: OtpConfig,
        store: Arc<dyn OtpStore>,
        accounts: Arc<dyn AccountStore>,
        codes: Arc<dyn CodeGenerator>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            store,
            accounts,
            codes,
            notifier,
            clock,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issue a fresh code, replacing any record held for the identifier.
    ///
    /// # Errors
    /// Returns a validation error for a malformed identifier, a state error
    /// when the purpose precondition on existing accounts does not hold, or
    /// `Internal` when the configured TTL overflows the clock.
    #[instrument(skip(self, identifier))]
    pub fn issue(&self, identifier: &str, purpose: Purpose) -> Result<IssuedCode> {
        let identifier = normalize_identifier(identifier);
        let kind = classify(&identifier).ok_or(Error::InvalidIdentifier)?;
        if !purpose.accepts(kind) {
            return Err(Error::InvalidIdentifier);
        }

        let existing = self.accounts.find_by_identifier(&identifier);
        match purpose {
            Purpose::Register if existing.is_some() => return Err(Error::DuplicateRegistration),
            Purpose::ForgotPassword if existing.is_none() => {
                return Err(Error::IdentifierNotFound)
            }
            Purpose::UpdateEmail if existing.is_some() => return Err(Error::IdentifierInUse),
            _ => {}
        }

        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.config.ttl()).ok_or_else(|| {
            Error::Internal(anyhow!(
                "otp ttl of {}s is out of range",
                self.config.ttl_seconds()
            ))
        })?;
        let record = OtpRecord {
            identifier: identifier.clone(),
            code: self.codes.generate(),
            purpose,
            issued_at: now,
            expires_at,
            consumed: false,
            verified_at: None,
            attempt_count: 0,
        };
        let message = OtpMessage {
            to: identifier,
            code: record.code.clone(),
            purpose,
            expires_at,
        };

        {
            let _guard = self.guard();
            if let Some(previous) = self.store.upsert(record) {
                debug!(previous = %previous.purpose, "replaced outstanding code");
            }
        }

        if let Err(err) = self.notifier.notify(&message) {
            warn!("failed to hand off otp for delivery: {err}");
        }
        info!("otp issued");

        Ok(IssuedCode {
            expires_at,
            expires_in: u64::try_from(self.config.ttl_seconds()).unwrap_or_default(),
        })
    }

    /// Check a code. On success the record is marked verified and its purpose
    /// returned; it stays until the gated action consumes it.
    ///
    /// # Errors
    /// `NoPendingCode`, `CodeExpired`, `CodeAlreadyUsed`, `CodeMismatch` or
    /// `TooManyAttempts` as the record dictates; `InvalidCode` when the code
    /// is not six digits.
    pub fn verify(&self, identifier: &str, code: &str) -> Result<Purpose> {
        self.verify_record(identifier, code, None)
    }

    /// Like [`verify`](Self::verify), restricted to a record issued for
    /// `expected`. A record of another purpose answers `VerificationRequired`
    /// and is left as it was.
    ///
    /// # Errors
    /// As [`verify`](Self::verify), plus `VerificationRequired`.
    pub fn verify_for(&self, identifier: &str, code: &str, expected: Purpose) -> Result<Purpose> {
        self.verify_record(identifier, code, Some(expected))
    }

    #[instrument(skip_all, name = "verify")]
    fn verify_record(
        &self,
        identifier: &str,
        code: &str,
        expected: Option<Purpose>,
    ) -> Result<Purpose> {
        let code = code.trim();
        if !code_shaped(code) {
            return Err(Error::InvalidCode);
        }
        let identifier = normalize_identifier(identifier);
        let now = self.clock.now();

        let _guard = self.guard();
        let mut record = self.store.find(&identifier).ok_or(Error::NoPendingCode)?;

        if expected.is_some_and(|purpose| purpose != record.purpose) {
            return Err(Error::VerificationRequired);
        }
        if record.consumed {
            return Err(Error::CodeAlreadyUsed);
        }
        if record.is_expired(now) {
            self.store.remove(&identifier);
            return Err(Error::CodeExpired);
        }
        if record.code != code {
            record.attempt_count += 1;
            let max_attempts = self.config.max_attempts();
            if max_attempts > 0 && record.attempt_count >= max_attempts {
                self.store.remove(&identifier);
                warn!(purpose = %record.purpose, "otp attempt cap reached");
                return Err(Error::TooManyAttempts);
            }
            self.store.upsert(record);
            return Err(Error::CodeMismatch);
        }

        record.consumed = true;
        record.verified_at = Some(now);
        let purpose = record.purpose;
        self.store.upsert(record);
        debug!(purpose = %purpose, "otp verified");
        Ok(purpose)
    }

    /// Spend a verified record for `purpose`. Returns false, leaving the
    /// record untouched, unless it is verified, matches, and is in window.
    pub fn consume(&self, identifier: &str, purpose: Purpose) -> bool {
        let identifier = normalize_identifier(identifier);
        let now = self.clock.now();

        let _guard = self.guard();
        let usable = self.store.find(&identifier).is_some_and(|record| {
            record.purpose == purpose
                && record.verification_valid(now, self.config.verified_ttl())
        });
        if usable {
            self.store.remove(&identifier);
        }
        usable
    }

    /// Drop unverified records past expiry and verified ones past their window.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let verified_ttl = self.config.verified_ttl();
        let _guard = self.guard();
        self.store
            .retain(&|record: &OtpRecord| !record.is_stale(now, verified_ttl))
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.store.len()
    }

    #[must_use]
    pub fn record(&self, identifier: &str) -> Option<OtpRecord> {
        self.store.find(&normalize_identifier(identifier))
    }
}
