//! In-memory certificate store.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::info;

use crate::capability::CertificateStore;
use crate::error::StoreError;
use crate::model::{CertificateRecord, CertificateStatus};

/// [`CertificateStore`] backed by a process-local list.
///
/// Duplicate `(serial, aki)` rows are kept as inserted; lookups return all of them.
#[derive(Default)]
pub struct MemoryCertificateStore {
    records: RwLock<Vec<CertificateRecord>>,
}

impl MemoryCertificateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn insert(&self, record: CertificateRecord) {
        self.write().push(record);
    }

    /// Mark every record matching `(serial, aki)` as revoked, returning how many changed.
    pub fn revoke(&self, serial: &str, aki: &str) -> usize {
        let mut records = self.write();
        let mut revoked = 0;
        for record in records
            .iter_mut()
            .filter(|record| record.serial_number == serial && record.authority_key_id == aki)
        {
            if record.status != CertificateStatus::Revoked {
                record.status = CertificateStatus::Revoked;
                revoked += 1;
            }
        }
        drop(records);
        if revoked > 0 {
            info!(serial, aki, revoked, "certificate revoked");
        }
        revoked
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<CertificateRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<CertificateRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CertificateStore for MemoryCertificateStore {
    async fn get_certificate(
        &self,
        serial: &str,
        aki: &str,
    ) -> Result<Vec<CertificateRecord>, StoreError> {
        Ok(self
            .read()
            .iter()
            .filter(|record| record.serial_number == serial && record.authority_key_id == aki)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(serial: &str, aki: &str, status: &str) -> CertificateRecord {
        CertificateRecord {
            serial_number: serial.to_string(),
            authority_key_id: aki.to_string(),
            status: CertificateStatus::from(status),
        }
    }

    #[tokio::test]
    async fn lookup_matches_on_both_keys() -> Result<(), StoreError> {
        let store = MemoryCertificateStore::new();
        store.insert(record("01AB", "deadbeef", "good"));
        store.insert(record("01AB", "cafebabe", "good"));

        let found = store.get_certificate("01AB", "deadbeef").await?;
        assert_eq!(found.len(), 1);
        assert!(store.get_certificate("01AC", "deadbeef").await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn duplicates_are_all_returned() -> Result<(), StoreError> {
        let store = MemoryCertificateStore::new();
        store.insert(record("7", "aa", "good"));
        store.insert(record("7", "aa", "good"));
        assert_eq!(store.get_certificate("7", "aa").await?.len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn revoke_updates_status_once() -> Result<(), StoreError> {
        let store = MemoryCertificateStore::new();
        store.insert(record("7", "aa", "good"));

        assert_eq!(store.revoke("7", "aa"), 1);
        assert_eq!(store.revoke("7", "aa"), 0);
        let found = store.get_certificate("7", "aa").await?;
        assert_eq!(found[0].status, CertificateStatus::Revoked);
        Ok(())
    }
}
