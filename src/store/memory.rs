use std::sync::Mutex;

use super::{CredentialRecord, TokenStore};
use crate::error::StoreError;

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    record: Mutex<Option<CredentialRecord>>,
    saves: Mutex<usize>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(record: CredentialRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
            saves: Mutex::new(0),
        }
    }

    pub fn current(&self) -> Option<CredentialRecord> {
        self.record.lock().unwrap().clone()
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Option<CredentialRecord> {
        self.current()
    }

    fn save(&self, record: &CredentialRecord) -> Result<(), StoreError> {
        *self.record.lock().unwrap() = Some(record.clone());
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}
