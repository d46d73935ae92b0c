//! OTP record repository.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::OtpRecord;

/// Storage for OTP records, keyed by normalized identifier.
///
/// Implementations only need per-call atomicity; the registry serializes
/// read-modify-write sequences itself.
pub trait OtpStore: Send + Sync {
    fn find(&self, identifier: &str) -> Option<OtpRecord>;

    /// Insert or overwrite, returning the replaced record.
    fn upsert(&self, record: OtpRecord) -> Option<OtpRecord>;

    fn remove(&self, identifier: &str) -> Option<OtpRecord>;

    /// Drop every record for which `keep` returns false; returns how many went.
    fn retain(&self, keep: &dyn Fn(&OtpRecord) -> bool) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryOtpStore {
    records: RwLock<HashMap<String, OtpRecord>>,
}

impl MemoryOtpStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl OtpStore for MemoryOtpStore {
    fn find(&self, identifier: &str) -> Option<OtpRecord> {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identifier)
            .cloned()
    }

    fn upsert(&self, record: OtpRecord) -> Option<OtpRecord> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.identifier.clone(), record)
    }

    fn remove(&self, identifier: &str) -> Option<OtpRecord> {
        self.records
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identifier)
    }

    fn retain(&self, keep: &dyn Fn(&OtpRecord) -> bool) -> usize {
        let mut records = self.records.write().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, record| keep(record));
        before - records.len()
    }

    fn len(&self) -> usize {
        self.records
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::otp::Purpose;
    use chrono::{Duration, Utc};

    fn record(identifier: &str, code: &str) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            identifier: identifier.to_string(),
            code: code.to_string(),
            purpose: Purpose::Register,
            issued_at: now,
            expires_at: now + Duration::seconds(300),
            consumed: false,
            verified_at: None,
            attempt_count: 0,
        }
    }

    #[test]
    fn upsert_overwrites_by_identifier() {
        let store = MemoryOtpStore::new();
        assert!(store.upsert(record("a@x.com", "111111")).is_none());
        let replaced = store.upsert(record("a@x.com", "222222"));
        assert_eq!(replaced.map(|r| r.code), Some("111111".to_string()));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.find("a@x.com").map(|r| r.code),
            Some("222222".to_string())
        );
    }

    #[test]
    fn retain_reports_removed() {
        let store = MemoryOtpStore::new();
        store.upsert(record("a@x.com", "111111"));
        store.upsert(record("b@x.com", "222222"));
        let removed = store.retain(&|r| r.identifier == "a@x.com");
        assert_eq!(removed, 1);
        assert!(store.find("b@x.com").is_none());
        assert!(!store.is_empty());
        assert!(store.remove("a@x.com").is_some());
        assert!(store.is_empty());
    }
}
