//! Account repository.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

use super::Account;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("identifier already exists")]
    Duplicate,
    #[error("account not found")]
    NotFound,
}

#[derive(Clone, Debug)]
pub struct NewAccount {
    pub identifier: String,
    pub credential_hash: String,
    pub display_name: String,
    pub contact_phone: String,
    pub created_at: DateTime<Utc>,
}

/// Storage for accounts. Identifiers are unique and compared after
/// normalization by the caller.
pub trait AccountStore: Send + Sync {
    fn find_by_identifier(&self, identifier: &str) -> Option<Account>;

    fn find_by_id(&self, id: u64) -> Option<Account>;

    /// Create an account with the next sequential id.
    ///
    /// # Errors
    /// `StoreError::Duplicate` when the identifier is taken.
    fn insert(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Replace an existing account.
    ///
    /// # Errors
    /// `StoreError::NotFound` for an unknown id, `StoreError::Duplicate` when
    /// the new identifier belongs to another account.
    fn update(&self, account: Account) -> Result<Account, StoreError>;

    fn count(&self) -> usize;
}

#[derive(Debug, Default)]
struct Accounts {
    by_id: HashMap<u64, Account>,
    by_identifier: HashMap<String, u64>,
    last_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryAccountStore {
    inner: RwLock<Accounts>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AccountStore for MemoryAccountStore {
    fn find_by_identifier(&self, identifier: &str) -> Option<Account> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_identifier
            .get(identifier)
            .and_then(|id| inner.by_id.get(id))
            .cloned()
    }

    fn find_by_id(&self, id: u64) -> Option<Account> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .get(&id)
            .cloned()
    }

    fn insert(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.by_identifier.contains_key(&account.identifier) {
            return Err(StoreError::Duplicate);
        }
        inner.last_id += 1;
        let created = Account {
            id: inner.last_id,
            identifier: account.identifier,
            credential_hash: account.credential_hash,
            display_name: account.display_name,
            contact_phone: account.contact_phone,
            created_at: account.created_at,
        };
        inner
            .by_identifier
            .insert(created.identifier.clone(), created.id);
        inner.by_id.insert(created.id, created.clone());
        Ok(created)
    }

    fn update(&self, account: Account) -> Result<Account, StoreError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let previous_identifier = inner
            .by_id
            .get(&account.id)
            .map(|existing| existing.identifier.clone())
            .ok_or(StoreError::NotFound)?;

        if previous_identifier != account.identifier {
            if inner.by_identifier.contains_key(&account.identifier) {
                return Err(StoreError::Duplicate);
            }
            inner.by_identifier.remove(&previous_identifier);
            inner
                .by_identifier
                .insert(account.identifier.clone(), account.id);
        }
        inner.by_id.insert(account.id, account.clone());
        Ok(account)
    }

    fn count(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_id
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn new_account(identifier: &str) -> NewAccount {
        NewAccount {
            identifier: identifier.to_string(),
            credential_hash: "hash".to_string(),
            display_name: "Alice".to_string(),
            contact_phone: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn ids_are_sequential_from_one() -> anyhow::Result<()> {
        let store = MemoryAccountStore::new();
        assert_eq!(store.insert(new_account("a@x.com"))?.id, 1);
        assert_eq!(store.insert(new_account("b@x.com"))?.id, 2);
        assert_eq!(store.count(), 2);
        Ok(())
    }

    #[test]
    fn duplicate_identifier_rejected() -> anyhow::Result<()> {
        let store = MemoryAccountStore::new();
        store.insert(new_account("a@x.com"))?;
        assert_eq!(
            store.insert(new_account("a@x.com")).err(),
            Some(StoreError::Duplicate)
        );
        assert_eq!(store.count(), 1);
        Ok(())
    }

    #[test]
    fn update_reindexes_identifier() -> anyhow::Result<()> {
        let store = MemoryAccountStore::new();
        let mut account = store.insert(new_account("a@x.com"))?;
        store.insert(new_account("b@x.com"))?;

        account.identifier = "b@x.com".to_string();
        assert_eq!(
            store.update(account.clone()).err(),
            Some(StoreError::Duplicate)
        );

        account.identifier = "c@x.com".to_string();
        store.update(account)?;
        assert!(store.find_by_identifier("a@x.com").is_none());
        let moved = store
            .find_by_identifier("c@x.com")
            .ok_or_else(|| anyhow!("account missing"))?;
        assert_eq!(moved.id, 1);
        Ok(())
    }

    #[test]
    fn update_unknown_account() {
        let store = MemoryAccountStore::new();
        let ghost = Account {
            id: 42,
            identifier: "ghost@x.com".to_string(),
            credential_hash: String::new(),
            display_name: "Ghost".to_string(),
            contact_phone: String::new(),
            created_at: Utc::now(),
        };
        assert_eq!(store.update(ghost).err(), Some(StoreError::NotFound));
    }
}
