//! Accounts, credentials, sessions and the workflows that mutate them.

pub mod credential;
pub mod session;
pub mod store;
pub mod workflow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::otp::Purpose;

pub use credential::{Argon2Hasher, CredentialHasher};
pub use session::{SessionRecord, SessionStore};
pub use store::{AccountStore, MemoryAccountStore, NewAccount, StoreError};
pub use workflow::{AccountWorkflow, LoginOutcome, Registration, RegistrationMode};

pub const MIN_SECRET_LENGTH: usize = 6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: u64,
    pub identifier: String,
    /// PHC string; never leaves the server.
    pub credential_hash: String,
    pub display_name: String,
    /// Empty when unset.
    pub contact_phone: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    #[must_use]
    pub fn view(&self) -> AccountView {
        AccountView::from(self)
    }
}

/// Public projection of an account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: u64,
    pub identifier: String,
    pub display_name: String,
    pub contact_phone: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            identifier: account.identifier.clone(),
            display_name: account.display_name.clone(),
            contact_phone: account.contact_phone.clone(),
            created_at: account.created_at,
        }
    }
}

/// Which contact attribute a contact update targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactKind {
    Email,
    Phone,
}

impl ContactKind {
    #[must_use]
    pub const fn purpose(self) -> Purpose {
        match self {
            Self::Email => Purpose::UpdateEmail,
            Self::Phone => Purpose::UpdatePhone,
        }
    }

    /// Path segment used by the contact update endpoints.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}
